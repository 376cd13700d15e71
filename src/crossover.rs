use rand::Rng;

use crate::dna::Genome;
use crate::engine::Crossover;

/// unequal-length crossover over polygon lists.
///
/// parents may hold different polygon counts. for each crossover point the shorter
/// list is aligned against a random contiguous window of the longer one, then the
/// first `k` aligned polygons are exchanged, `k` drawn in [1, L-1] where L is the
/// shorter length. offspring start as clones; parents are never modified.
#[derive(Clone, Copy, Debug)]
pub struct UnequalCrossover {
    crossover_points: usize,
}

impl UnequalCrossover {
    pub fn new(crossover_points: usize) -> Self {
        Self { crossover_points }
    }

    /// mate with the configured number of crossover points
    pub fn mate_default<R: Rng>(&self, parent1: &Genome, parent2: &Genome, rng: &mut R) -> (Genome, Genome) {
        self.mate(parent1, parent2, self.crossover_points, rng)
    }

    pub fn mate<R: Rng>(
        &self,
        parent1: &Genome,
        parent2: &Genome,
        crossover_points: usize,
        rng: &mut R,
    ) -> (Genome, Genome) {
        profiling::scope!("mate");
        let mut offspring1 = parent1.clone();
        let mut offspring2 = parent2.clone();

        for _ in 0..crossover_points {
            let len1 = offspring1.polys.len();
            let len2 = offspring2.polys.len();
            let shorter = len1.min(len2);
            if shorter < 2 {
                continue;
            }

            let (start1, start2) = alignment_offsets(len1, len2, rng);
            let cross_idx = rng.random_range(1..shorter);

            for j in 0..cross_idx {
                std::mem::swap(
                    &mut offspring1.polys[start1 + j],
                    &mut offspring2.polys[start2 + j],
                );
            }
        }

        (offspring1, offspring2)
    }
}

/// start of the window each list contributes: 0 for the shorter one, uniform in
/// [0, |len1 - len2|) for the longer one
fn alignment_offsets<R: Rng>(len1: usize, len2: usize, rng: &mut R) -> (usize, usize) {
    use std::cmp::Ordering;
    match len1.cmp(&len2) {
        Ordering::Equal => (0, 0),
        Ordering::Less => (0, rng.random_range(0..len2 - len1)),
        Ordering::Greater => (rng.random_range(0..len1 - len2), 0),
    }
}

impl Crossover<Genome> for UnequalCrossover {
    fn mate<R: Rng>(&self, parent1: &Genome, parent2: &Genome, crossover_points: usize, rng: &mut R) -> (Genome, Genome) {
        UnequalCrossover::mate(self, parent1, parent2, crossover_points, rng)
    }
}
