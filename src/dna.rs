use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::CandidateFactory;
use crate::error::ConfigError;
use crate::geom::{self, Point};
use crate::mutation_config::{MutateConfig, ShapeMode};

/// alpha band of random polygon colors: [ALPHA_MIN, ALPHA_MIN + ALPHA_SPAN)
/// low alpha keeps overlapping polygons blending instead of occluding each other
pub const ALPHA_MIN: u8 = 10;
pub const ALPHA_SPAN: u8 = 50;

/// a closed ring of integer vertices filled with one un-premultiplied RGBA8 color
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
    pub rgba: [u8; 4],
}

impl Polygon {
    /// insert `pt` before the vertex currently at `idx` (ring order preserved)
    pub fn insert_point(&mut self, idx: usize, pt: Point) {
        self.points.insert(idx, pt);
    }
}

/// a candidate image: fixed canvas, optional solid background, polygons painted back-to-front.
/// `Clone` is a deep copy, no point list or color is shared with the source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genome {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub background: Option<[u8; 4]>,
    pub polys: Vec<Polygon>,
}

impl Genome {
    pub fn new_blank(width: u32, height: u32) -> Self {
        Self { width, height, background: None, polys: Vec::new() }
    }
}

/// sum of absolute per-channel differences of two RGBA colors
#[inline]
pub fn diff_color(a: [u8; 4], b: [u8; 4]) -> u32 {
    a.iter().zip(b.iter()).map(|(&x, &y)| x.abs_diff(y) as u32).sum()
}

/// uniform count in [min, max), or `min` when the range is empty
#[inline]
fn count_in<R: Rng>(min: usize, max: usize, rng: &mut R) -> usize {
    if max > min {
        rng.random_range(min..max)
    } else {
        min
    }
}

/// uniform point at least `margin` px from every canvas edge.
/// the margin shrinks on canvases too small for it.
pub fn random_point<R: Rng>(width: u32, height: u32, margin: u32, rng: &mut R) -> Point {
    let mx = margin.min(width.saturating_sub(1) / 2);
    let my = margin.min(height.saturating_sub(1) / 2);
    let x = mx + rng.random_range(0..(width - 2 * mx).max(1));
    let y = my + rng.random_range(0..(height - 2 * my).max(1));
    (x as i32, y as i32)
}

/// random fill color, alpha kept in the low blending band
pub fn random_color<R: Rng>(rng: &mut R) -> [u8; 4] {
    [
        rng.random::<u8>(),
        rng.random::<u8>(),
        rng.random::<u8>(),
        ALPHA_MIN + rng.random_range(0..ALPHA_SPAN),
    ]
}

/// random fully opaque color (backgrounds)
pub fn random_opaque_color<R: Rng>(rng: &mut R) -> [u8; 4] {
    [rng.random::<u8>(), rng.random::<u8>(), rng.random::<u8>(), 255]
}

/// random polygon with a point count in [min_pts, max_pts)
pub fn random_polygon<R: Rng>(
    width: u32,
    height: u32,
    min_pts: usize,
    max_pts: usize,
    shape: ShapeMode,
    rng: &mut R,
) -> Polygon {
    profiling::scope!("random_polygon");
    let num_pts = count_in(min_pts, max_pts, rng);

    let points = match shape {
        ShapeMode::Scatter => (0..num_pts).map(|_| random_point(width, height, 0, rng)).collect(),
        ShapeMode::Simple => {
            // average radius (and center margin) between 5% and 30% of the canvas width
            let min_radius = width * 5 / 100;
            let max_radius = width * 30 / 100;
            let margin = if max_radius > min_radius {
                rng.random_range(min_radius..max_radius)
            } else {
                min_radius
            };
            let center = random_point(width, height, margin, rng);
            geom::generate_polygon(
                center,
                margin as f64,
                geom::DEFAULT_IRREGULARITY,
                geom::DEFAULT_SPIKEYNESS,
                num_pts,
                rng,
            )
        }
    };

    Polygon { points, rgba: random_color(rng) }
}

/// random genome with a polygon count in [min_polys, max_polys)
#[allow(clippy::too_many_arguments)]
pub fn random_genome<R: Rng>(
    width: u32,
    height: u32,
    min_polys: usize,
    max_polys: usize,
    min_pts: usize,
    max_pts: usize,
    shape: ShapeMode,
    rng: &mut R,
) -> Genome {
    profiling::scope!("random_genome");
    let num_polys = count_in(min_polys, max_polys, rng);
    let polys = (0..num_polys)
        .map(|_| random_polygon(width, height, min_pts, max_pts, shape, rng))
        .collect();
    Genome { width, height, background: None, polys }
}

/// builds random genomes for one fixed square canvas and set of bounds
#[derive(Clone, Debug)]
pub struct GenomeFactory {
    width: u32,
    height: u32,
    cfg: MutateConfig,
}

impl GenomeFactory {
    pub fn new(width: u32, height: u32, cfg: MutateConfig) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::Canvas { width, height });
        }
        if width != height {
            return Err(ConfigError::NonSquareCanvas { width, height });
        }
        cfg.validate()?;
        Ok(Self { width, height, cfg })
    }

    pub fn random_genome<R: Rng>(&self, rng: &mut R) -> Genome {
        let b = &self.cfg.bounds;
        random_genome(
            self.width,
            self.height,
            b.min_polygons,
            b.max_polygons,
            b.min_points,
            b.max_points,
            self.cfg.shape,
            rng,
        )
    }
}

impl CandidateFactory<Genome> for GenomeFactory {
    fn generate_random_candidate<R: Rng>(&self, rng: &mut R) -> Genome {
        self.random_genome(rng)
    }
}
