/// run settings for polyevolve
/// loaded from a JSON file, then selectively overridden from the command line
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;
use crate::error::{ConfigError, SettingsError};
use crate::mutation_config::MutateConfig;
use crate::render::RenderConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// reference image to approximate
    pub ref_image: Option<PathBuf>,
    /// side of the square working canvas the reference is resized to (None = keep source size)
    pub working_size: Option<u32>,

    // population
    pub population_size: usize,
    pub elite_count: usize,
    pub crossover_points: usize,
    /// fraction of the ranked population allowed to breed
    pub selection_ratio: f64,

    // termination
    pub max_generations: Option<u64>,
    /// stop once the best fitness is at or below this value
    pub target_fitness: Option<f64>,

    // observation
    /// stats rows and snapshots every N generations
    pub observer_frequency: u64,
    pub output_dir: PathBuf,

    /// fixed seed for a reproducible run (None = seeded from the OS)
    pub seed: Option<u64>,
    pub antialias: bool,

    pub mutation: MutateConfig,
}

impl Default for Settings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            ref_image: None,
            working_size: Some(128),

            population_size: engine.population_size,
            elite_count: engine.elite_count,
            crossover_points: engine.crossover_points,
            selection_ratio: engine.selection_ratio,

            max_generations: engine.max_generations,
            target_fitness: engine.target_fitness,

            observer_frequency: 100,
            output_dir: PathBuf::from("_output"),

            seed: None,
            antialias: RenderConfig::default().antialias,

            mutation: MutateConfig::default(),
        }
    }
}

impl Settings {
    /// read and validate a settings file. any failure here is fatal to the run.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| SettingsError::Read { path: path.to_path_buf(), source })?;
        let settings: Settings = serde_json::from_str(&text)
            .map_err(|source| SettingsError::Parse { path: path.to_path_buf(), source })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let write_err = |source| SettingsError::Write { path: path.to_path_buf(), source };
        let text = serde_json::to_string_pretty(self).map_err(|e| write_err(std::io::Error::other(e)))?;
        fs::write(path, text).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine_config().validate()?;
        self.mutation.validate()?;
        if self.observer_frequency == 0 {
            return Err(ConfigError::Zero("observer_frequency"));
        }
        if self.working_size == Some(0) {
            return Err(ConfigError::Zero("working_size"));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            population_size: self.population_size,
            elite_count: self.elite_count,
            crossover_points: self.crossover_points,
            selection_ratio: self.selection_ratio,
            max_generations: self.max_generations,
            target_fitness: self.target_fitness,
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig { antialias: self.antialias }
    }
}
