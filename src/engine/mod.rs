// Engine module organization
// traits: the contracts candidates plug into; this file: the generational driver

pub mod traits;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::ConfigError;
pub use traits::{CandidateFactory, Crossover, EvolutionObserver, FitnessEvaluator, Mutation};

/// read-only statistics of one evaluated generation
#[derive(Clone, Debug)]
pub struct PopulationData<C> {
    pub generation: u64,
    pub best_candidate: C,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub fitness_std_dev: f64,
    pub natural_fitness: bool,
    pub population_size: usize,
    pub elite_count: usize,
    pub elapsed: Duration,
}

#[derive(Clone, Debug)]
pub struct EvaluatedCandidate<C> {
    pub candidate: C,
    pub fitness: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    UserAbort,
    TargetFitness,
    GenerationLimit,
}

#[derive(Clone, Debug)]
pub struct EvolutionOutcome<C> {
    pub best: EvaluatedCandidate<C>,
    pub generations: u64,
    pub reason: TerminationReason,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    pub population_size: usize,
    pub elite_count: usize,
    pub crossover_points: usize,
    /// fraction of the ranked population eligible as parents (truncation selection)
    pub selection_ratio: f64,
    pub max_generations: Option<u64>,
    pub target_fitness: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            elite_count: 2,
            crossover_points: 1,
            selection_ratio: 0.5,
            max_generations: Some(10_000),
            target_fitness: Some(0.0),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::Zero("population_size"));
        }
        if self.elite_count >= self.population_size {
            return Err(ConfigError::EliteCount {
                elite: self.elite_count,
                population: self.population_size,
            });
        }
        if !(self.selection_ratio > 0.0 && self.selection_ratio <= 1.0) {
            return Err(ConfigError::SelectionRatio(self.selection_ratio));
        }
        Ok(())
    }
}

/// mean and population standard deviation
pub fn fitness_stats(scores: &[f64]) -> (f64, f64) {
    if scores.is_empty() {
        return (0.0, 0.0);
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let var = scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// generational loop: evaluate, observe, select, reproduce.
/// the abort flag is only read between generations; operators and
/// evaluations always run to completion.
pub struct GenerationalEngine<C, F, M, X, E> {
    factory: F,
    mutation: M,
    crossover: X,
    evaluator: E,
    cfg: EngineConfig,
    observers: Vec<Box<dyn EvolutionObserver<C>>>,
}

impl<C, F, M, X, E> GenerationalEngine<C, F, M, X, E>
where
    C: Clone + Send + Sync,
    F: CandidateFactory<C>,
    M: Mutation<C>,
    X: Crossover<C>,
    E: FitnessEvaluator<C>,
{
    pub fn new(factory: F, mutation: M, crossover: X, evaluator: E, cfg: EngineConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self { factory, mutation, crossover, evaluator, cfg, observers: Vec::new() })
    }

    pub fn add_observer(&mut self, observer: impl EvolutionObserver<C> + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn evolve<R: Rng>(&mut self, rng: &mut R, abort: &AtomicBool) -> EvolutionOutcome<C> {
        profiling::scope!("evolve");
        let start = Instant::now();
        let natural = self.evaluator.is_natural();

        let mut population: Vec<C> = (0..self.cfg.population_size)
            .map(|_| self.factory.generate_random_candidate(rng))
            .collect();

        let mut generation = 0u64;
        loop {
            let evaluated = self.evaluate(population);
            let scores: Vec<f64> = evaluated.iter().map(|e| e.fitness).collect();
            let (mean, std_dev) = fitness_stats(&scores);
            let best = &evaluated[0];

            let data = PopulationData {
                generation,
                best_candidate: best.candidate.clone(),
                best_fitness: best.fitness,
                mean_fitness: mean,
                fitness_std_dev: std_dev,
                natural_fitness: natural,
                population_size: evaluated.len(),
                elite_count: self.cfg.elite_count,
                elapsed: start.elapsed(),
            };
            for observer in &mut self.observers {
                observer.population_update(&data);
            }
            debug!(generation, best = best.fitness, mean, std_dev, "generation evaluated");

            if let Some(reason) = self.should_stop(generation, best.fitness, abort) {
                info!(generation, best = best.fitness, ?reason, "evolution ended");
                return EvolutionOutcome { best: best.clone(), generations: generation + 1, reason };
            }

            population = self.next_generation(&evaluated, rng);
            generation += 1;
        }
    }

    /// score every candidate in parallel, best first
    fn evaluate(&self, population: Vec<C>) -> Vec<EvaluatedCandidate<C>> {
        profiling::scope!("evaluate_population");
        // borrow only the evaluator: the observers are Send but not Sync
        let evaluator = &self.evaluator;
        let mut evaluated: Vec<EvaluatedCandidate<C>> = population
            .into_par_iter()
            .map(|candidate| {
                let fitness = evaluator.fitness(&candidate);
                EvaluatedCandidate { candidate, fitness }
            })
            .collect();

        if evaluator.is_natural() {
            evaluated.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        } else {
            evaluated.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
        }
        evaluated
    }

    fn should_stop(&self, generation: u64, best: f64, abort: &AtomicBool) -> Option<TerminationReason> {
        if abort.load(Ordering::Relaxed) {
            return Some(TerminationReason::UserAbort);
        }
        if let Some(target) = self.cfg.target_fitness {
            let reached = if self.evaluator.is_natural() { best >= target } else { best <= target };
            if reached {
                return Some(TerminationReason::TargetFitness);
            }
        }
        if let Some(limit) = self.cfg.max_generations {
            if generation + 1 >= limit {
                return Some(TerminationReason::GenerationLimit);
            }
        }
        None
    }

    /// elites survive unchanged; the rest are bred from the top `selection_ratio`
    /// by mutation followed by crossover.
    fn next_generation<R: Rng>(&self, ranked: &[EvaluatedCandidate<C>], rng: &mut R) -> Vec<C> {
        profiling::scope!("next_generation");
        let size = self.cfg.population_size;
        let mut next: Vec<C> = ranked
            .iter()
            .take(self.cfg.elite_count)
            .map(|e| e.candidate.clone())
            .collect();

        let pool = ((ranked.len() as f64 * self.cfg.selection_ratio).ceil() as usize).clamp(1, ranked.len());
        while next.len() < size {
            let p1 = &ranked[rng.random_range(0..pool)].candidate;
            let p2 = &ranked[rng.random_range(0..pool)].candidate;
            let m1 = self.mutation.mutate(p1, rng);
            let m2 = self.mutation.mutate(p2, rng);
            let (o1, o2) = self.crossover.mate(&m1, &m2, self.cfg.crossover_points, rng);
            next.push(o1);
            if next.len() < size {
                next.push(o2);
            }
        }
        next
    }
}
