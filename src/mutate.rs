use rand::Rng;

use crate::dna::{random_color, random_opaque_color, random_point, random_polygon, Genome};
use crate::engine::Mutation;
use crate::error::ConfigError;
use crate::geom::midpoint;
use crate::mutation_config::MutateConfig;

/// relocated vertices land at least this far from the canvas edges
pub const MOVE_POINT_MARGIN: u32 = 10;

/// cascade of independent Bernoulli trials over a cloned genome.
///
/// genome level (once each): add polygon, remove polygon, swap two polygons, new background.
/// then for every polygon: recolor, add vertex, remove vertex, and for every vertex: relocate.
/// a trial whose guard would break the configured bounds is skipped.
#[derive(Clone, Debug)]
pub struct Mutator {
    cfg: MutateConfig,
}

impl Mutator {
    pub fn new(cfg: MutateConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// mutated copy of `genome`; the input is left untouched
    pub fn mutate<R: Rng>(&self, genome: &Genome, rng: &mut R) -> Genome {
        profiling::scope!("mutate");
        let mut img = genome.clone();
        self.mutate_genome_level(&mut img, rng);
        self.mutate_polygons(&mut img, rng);
        img
    }

    fn mutate_genome_level<R: Rng>(&self, img: &mut Genome, rng: &mut R) {
        let rates = &self.cfg.rates;
        let bounds = &self.cfg.bounds;

        if rng.random_bool(rates.add_polygon) && img.polys.len() < bounds.max_polygons {
            let poly = random_polygon(
                img.width,
                img.height,
                bounds.min_points,
                bounds.max_points,
                self.cfg.shape,
                rng,
            );
            img.polys.push(poly);
        }

        if rng.random_bool(rates.remove_polygon) && img.polys.len() > bounds.min_polygons {
            let idx = rng.random_range(0..img.polys.len());
            img.polys.remove(idx);
        }

        if rng.random_bool(rates.swap_polygons) && img.polys.len() >= 2 {
            let i = rng.random_range(0..img.polys.len());
            let j = rng.random_range(0..img.polys.len());
            img.polys.swap(i, j);
        }

        if rng.random_bool(rates.background_color) {
            img.background = Some(random_opaque_color(rng));
        }
    }

    fn mutate_polygons<R: Rng>(&self, img: &mut Genome, rng: &mut R) {
        let rates = &self.cfg.rates;
        let bounds = &self.cfg.bounds;
        let (w, h) = (img.width, img.height);

        for poly in &mut img.polys {
            // full resample, not a nudge
            if rng.random_bool(rates.polygon_color) {
                poly.rgba = random_color(rng);
            }

            if rng.random_bool(rates.add_point) {
                let n = poly.points.len();
                if n < bounds.max_points && n >= 2 {
                    // between two existing neighbours, at their midpoint
                    let idx = 1 + rng.random_range(0..n - 1);
                    let pt = midpoint(poly.points[idx - 1], poly.points[idx]);
                    poly.insert_point(idx, pt);
                }
            }

            if rng.random_bool(rates.remove_point) {
                let n = poly.points.len();
                if n > bounds.min_points {
                    let idx = rng.random_range(0..n);
                    poly.points.remove(idx);
                }
            }

            for pt in &mut poly.points {
                if rng.random_bool(rates.move_point) {
                    *pt = random_point(w, h, MOVE_POINT_MARGIN, rng);
                }
            }
        }
    }
}

impl Mutation<Genome> for Mutator {
    fn mutate<R: Rng>(&self, candidate: &Genome, rng: &mut R) -> Genome {
        Mutator::mutate(self, candidate, rng)
    }
}
