//! contracts between the generational driver and the candidate-specific parts.
//!
//! every call that draws randomness takes the random source as an argument,
//! so a fixed seed replays an identical evolutionary trace.

use rand::Rng;

use super::PopulationData;

/// builds the initial population
pub trait CandidateFactory<C>: Send + Sync {
    fn generate_random_candidate<R: Rng>(&self, rng: &mut R) -> C;
}

/// produces a mutated copy; the input is never modified
pub trait Mutation<C>: Send + Sync {
    fn mutate<R: Rng>(&self, candidate: &C, rng: &mut R) -> C;
}

/// recombines two parents into two offspring; parents are never modified
pub trait Crossover<C>: Send + Sync {
    fn mate<R: Rng>(&self, parent1: &C, parent2: &C, crossover_points: usize, rng: &mut R) -> (C, C);
}

/// scores a candidate. must be reentrant: the driver evaluates in parallel
pub trait FitnessEvaluator<C>: Send + Sync {
    fn fitness(&self, candidate: &C) -> f64;

    /// true when higher scores are better
    fn is_natural(&self) -> bool;
}

/// receives one statistics snapshot per generation
pub trait EvolutionObserver<C>: Send {
    fn population_update(&mut self, data: &PopulationData<C>);
}
