// Fitness module organization
// sad: pixel difference kernels, metrics: human-readable progress numbers

pub mod metrics;
pub mod sad;

pub use metrics::MetricsSnapshot;
pub use sad::sad_rgba;

use tracing::warn;

use crate::dna::Genome;
use crate::engine::FitnessEvaluator;
use crate::error::RenderError;
use crate::render::{CpuRenderer, Raster};

/// scores genomes against a fixed reference raster. lower is better, 0 is a perfect match.
///
/// the score is the total of per-pixel, per-channel absolute differences between the
/// premultiplied reference and the render. the canvas is fixed for a run, so this
/// orders candidates exactly like the per-pixel mean (`MetricsSnapshot::sad_per_px`).
#[derive(Clone, Debug)]
pub struct ImageEvaluator {
    reference: Raster,
    renderer: CpuRenderer,
}

impl ImageEvaluator {
    pub fn new(reference: Raster, renderer: CpuRenderer) -> Result<Self, RenderError> {
        if reference.width == 0 || reference.height == 0 {
            return Err(crate::error::ConfigError::Canvas {
                width: reference.width,
                height: reference.height,
            }
            .into());
        }
        if reference.data.len() != reference.num_pixels() * 4 {
            return Err(RenderError::BufferSize {
                width: reference.width,
                height: reference.height,
                len: reference.data.len(),
            });
        }
        Ok(Self { reference, renderer })
    }

    /// render + diff. never mutates the genome.
    pub fn evaluate(&self, genome: &Genome) -> f64 {
        profiling::scope!("evaluate");
        if genome.width != self.reference.width || genome.height != self.reference.height {
            warn!(
                genome_w = genome.width,
                genome_h = genome.height,
                ref_w = self.reference.width,
                ref_h = self.reference.height,
                "genome canvas doesn't match the reference"
            );
            return f64::INFINITY;
        }

        match self.renderer.render(genome) {
            Ok(raster) => sad_rgba(&self.reference.data, &raster.data) as f64,
            Err(e) => {
                warn!(error = %e, "render failed");
                f64::INFINITY
            }
        }
    }

    pub fn metrics(&self, fitness: f64) -> MetricsSnapshot {
        MetricsSnapshot::from_sad(fitness, self.reference.num_pixels(), 255.0)
    }
}

impl FitnessEvaluator<Genome> for ImageEvaluator {
    fn fitness(&self, candidate: &Genome) -> f64 {
        self.evaluate(candidate)
    }

    fn is_natural(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dna::{random_genome, Polygon};
    use crate::mutation_config::ShapeMode;
    use crate::render::RenderConfig;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn monochrome_genome(w: u32, h: u32, rgba: [u8; 4]) -> Genome {
        let (wi, hi) = (w as i32, h as i32);
        Genome {
            width: w,
            height: h,
            background: None,
            polys: vec![Polygon { points: vec![(0, 0), (wi, 0), (wi, hi), (0, hi)], rgba }],
        }
    }

    fn evaluator(reference: Raster) -> ImageEvaluator {
        ImageEvaluator::new(reference, CpuRenderer::default()).unwrap()
    }

    #[test]
    fn test_same_color_scores_zero() {
        for rgba in [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]] {
            let ev = evaluator(Raster::filled(128, 128, rgba));
            assert_eq!(ev.fitness(&monochrome_genome(128, 128, rgba)), 0.0);
        }
    }

    #[test]
    fn test_black_vs_white() {
        let expected = (3 * 255 * 128 * 128) as f64;

        let ev = evaluator(Raster::filled(128, 128, [0, 0, 0, 255]));
        assert_eq!(ev.fitness(&monochrome_genome(128, 128, [255, 255, 255, 255])), expected);

        let ev = evaluator(Raster::filled(128, 128, [255, 255, 255, 255]));
        assert_eq!(ev.fitness(&monochrome_genome(128, 128, [0, 0, 0, 255])), expected);

        assert_eq!(ev.metrics(expected).sad_per_px, 765.0);
    }

    #[test]
    fn test_render_of_itself_scores_zero() {
        let mut rng = Pcg32::seed_from_u64(4);
        let genome = random_genome(64, 64, 20, 30, 3, 6, ShapeMode::Simple, &mut rng);
        let renderer = CpuRenderer::new(RenderConfig { antialias: true });
        let reference = renderer.render(&genome).unwrap();
        let ev = ImageEvaluator::new(reference, renderer).unwrap();
        assert_eq!(ev.fitness(&genome), 0.0);
    }

    #[test]
    fn test_evaluation_is_pure_and_repeatable() {
        let mut rng = Pcg32::seed_from_u64(5);
        let genome = random_genome(48, 48, 10, 20, 3, 6, ShapeMode::Scatter, &mut rng);
        let before = genome.clone();
        let ev = evaluator(Raster::filled(48, 48, [12, 34, 56, 255]));
        let a = ev.fitness(&genome);
        let b = ev.fitness(&genome);
        assert_eq!(a, b);
        assert!(a > 0.0);
        assert_eq!(genome, before);
        assert!(!ev.is_natural());
    }

    #[test]
    fn test_mismatched_canvas_scores_worst() {
        let ev = evaluator(Raster::filled(16, 16, [0, 0, 0, 255]));
        assert_eq!(ev.fitness(&Genome::new_blank(8, 8)), f64::INFINITY);
    }

    #[test]
    fn test_degenerate_reference_rejected() {
        let bad = Raster { width: 0, height: 4, data: vec![] };
        assert!(ImageEvaluator::new(bad, CpuRenderer::default()).is_err());
        let short = Raster { width: 2, height: 2, data: vec![0; 3] };
        assert!(ImageEvaluator::new(short, CpuRenderer::default()).is_err());
    }

    #[test]
    fn test_parallel_evaluation_matches_serial() {
        use rayon::prelude::*;
        let mut rng = Pcg32::seed_from_u64(6);
        let genomes: Vec<Genome> = (0..16)
            .map(|_| random_genome(40, 40, 5, 15, 3, 6, ShapeMode::Simple, &mut rng))
            .collect();
        let ev = evaluator(Raster::filled(40, 40, [200, 100, 0, 255]));
        let serial: Vec<f64> = genomes.iter().map(|g| ev.fitness(g)).collect();
        let parallel: Vec<f64> = genomes.par_iter().map(|g| ev.fitness(g)).collect();
        assert_eq!(serial, parallel);
    }
}
