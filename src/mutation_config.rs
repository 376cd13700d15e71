use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// how `random_polygon` places the vertices of a fresh polygon
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeMode {
    /// every vertex uniformly inside the canvas (may self-intersect)
    Scatter,
    /// vertices sampled around a random center, no self-intersection
    #[default]
    Simple,
}

/// structural limits every genome must respect
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolygonBounds {
    pub min_polygons: usize,
    pub max_polygons: usize,
    pub min_points: usize,
    pub max_points: usize,
}

impl Default for PolygonBounds {
    fn default() -> Self {
        Self {
            min_polygons: 20,
            max_polygons: 100,
            min_points: 3,
            max_points: 6,
        }
    }
}

/// per-trial probabilities of the mutation cascade
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationRates {
    // genome level
    pub add_polygon: f64,
    pub remove_polygon: f64,
    pub swap_polygons: f64,
    pub background_color: f64,

    // polygon level
    pub polygon_color: f64,
    pub add_point: f64,
    pub remove_point: f64,

    // vertex level
    pub move_point: f64,
}

impl Default for MutationRates {
    fn default() -> Self {
        Self {
            add_polygon: 0.02,
            remove_polygon: 0.02,
            swap_polygons: 0.02,
            background_color: 0.01,
            polygon_color: 0.01,
            add_point: 0.01,
            remove_point: 0.01,
            move_point: 0.005,
        }
    }
}

impl MutationRates {
    fn named(&self) -> [(&'static str, f64); 8] {
        [
            ("add_polygon", self.add_polygon),
            ("remove_polygon", self.remove_polygon),
            ("swap_polygons", self.swap_polygons),
            ("background_color", self.background_color),
            ("polygon_color", self.polygon_color),
            ("add_point", self.add_point),
            ("remove_point", self.remove_point),
            ("move_point", self.move_point),
        ]
    }
}

/// everything the factory and the mutation operator need, injected at construction
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MutateConfig {
    pub bounds: PolygonBounds,
    pub rates: MutationRates,
    pub shape: ShapeMode,
}

impl MutateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.rates.named() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }

        let b = &self.bounds;
        if b.min_points < 3 {
            return Err(ConfigError::TooFewPoints(b.min_points));
        }
        if b.max_points < b.min_points {
            return Err(ConfigError::Bounds { what: "point", min: b.min_points, max: b.max_points });
        }
        if b.max_polygons == 0 {
            return Err(ConfigError::NoPolygons);
        }
        if b.max_polygons < b.min_polygons {
            return Err(ConfigError::Bounds { what: "polygon", min: b.min_polygons, max: b.max_polygons });
        }
        Ok(())
    }
}
