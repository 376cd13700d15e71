//! error types for setup-time failures.
//!
//! operators and the evaluator never fail at runtime; everything here is
//! raised while building the run and is fatal to it.

use std::path::PathBuf;
use thiserror::Error;

/// invalid operator bounds, probabilities or run parameters
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} probability must be in [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },

    #[error("polygons need at least 3 points, min_points is {0}")]
    TooFewPoints(usize),

    #[error("invalid {what} bounds: min {min} > max {max}")]
    Bounds { what: &'static str, min: usize, max: usize },

    #[error("max_polygons must be at least 1")]
    NoPolygons,

    #[error("invalid canvas dimensions {width}x{height}")]
    Canvas { width: u32, height: u32 },

    #[error("canvas must be square, got {width}x{height} (set working_size to resize)")]
    NonSquareCanvas { width: u32, height: u32 },

    #[error("{0} must be greater than 0")]
    Zero(&'static str),

    #[error("elite count {elite} must be smaller than population size {population}")]
    EliteCount { elite: usize, population: usize },

    #[error("selection ratio must be in (0, 1], got {0}")]
    SelectionRatio(f64),
}

/// reference image / renderer initialisation failures
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("can't open reference image {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("can't write image {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("raster buffer of {len} bytes doesn't match {width}x{height} RGBA")]
    BufferSize { width: u32, height: u32, len: usize },

    #[error("can't allocate a {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// statistics store / notification channel failures
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("observer frequency can't be 0")]
    ZeroFrequency,
}

/// settings file failures
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("can't read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't write settings {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
