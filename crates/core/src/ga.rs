//! Genetic Algorithm framework for packing searches.
//!
//! The framework is generic over the genome: a problem implements
//! [`GaProblem`] (population creation and fitness evaluation) and its
//! genome implements [`Individual`] (crossover and per-gene mutation).
//! [`GaRunner`] drives the loop
//!
//! evaluate → select → recombine → mutate → evaluate → ...
//!
//! until the [`CancelToken`] fires, the generation cap is hit or the
//! population stagnates. Selection is elitist: the best `elite_count`
//! individuals survive unchanged, the rest of the next generation is bred
//! from parents drawn with fitness-proportional (roulette) sampling.
//!
//! Fitness is always "higher is better" and must be non-negative.

use crate::cancel::CancelToken;
use crate::solver::Config;
use rand::prelude::*;
use rayon::prelude::*;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters of a [`GaRunner`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaConfig {
    /// Population size.
    pub population_size: usize,
    /// Maximum number of generations (None = until cancelled).
    pub max_generations: Option<u32>,
    /// Probability that a child is bred by crossover rather than cloned.
    pub crossover_rate: f64,
    /// Per-gene mutation probability (0.0 - 1.0).
    pub mutation_rate: f64,
    /// Best individuals copied unchanged into the next generation.
    pub elite_count: usize,
    /// Evaluate individuals on the rayon thread pool.
    pub parallel: bool,
    /// Target fitness to stop early (None = run until stopped otherwise).
    pub target_fitness: Option<f64>,
    /// Generations without improvement before early stop.
    pub stagnation_limit: Option<u32>,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: Some(500),
            crossover_rate: 0.8,
            mutation_rate: 0.05,
            elite_count: 1,
            parallel: true,
            target_fitness: None,
            stagnation_limit: None,
        }
    }
}

impl GaConfig {
    /// Same as [`GaConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the population size (at least 2).
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(2);
        self
    }

    /// Caps the number of generations.
    pub fn with_max_generations(mut self, gen: u32) -> Self {
        self.max_generations = Some(gen);
        self
    }

    /// Runs until cancelled.
    pub fn unbounded(mut self) -> Self {
        self.max_generations = None;
        self
    }

    /// Sets the crossover probability, clamped to `[0, 1]`.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the per-gene mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the elite count.
    pub fn with_elite_count(mut self, count: usize) -> Self {
        self.elite_count = count;
        self
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Stops as soon as the best fitness reaches `fitness`.
    pub fn with_target_fitness(mut self, fitness: f64) -> Self {
        self.target_fitness = Some(fitness);
        self
    }

    /// Sets the stagnation limit.
    pub fn with_stagnation_limit(mut self, generations: u32) -> Self {
        self.stagnation_limit = Some(generations);
        self
    }
}

impl From<&Config> for GaConfig {
    fn from(config: &Config) -> Self {
        Self {
            population_size: config.population_size.max(2),
            max_generations: config.max_generations,
            crossover_rate: config.crossover_rate,
            mutation_rate: config.mutation_rate,
            elite_count: config.elite_count,
            parallel: config.parallel_evaluation,
            target_fitness: None,
            stagnation_limit: None,
        }
    }
}

/// A genome in the genetic algorithm.
pub trait Individual: Clone + Send + Sync {
    /// Fitness from the last evaluation; higher is better, never negative.
    fn fitness(&self) -> f64;

    /// Breeds a child from `self` and `other`.
    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self;

    /// Mutates each gene independently with probability `rate`.
    fn mutate<R: Rng>(&mut self, rate: f64, rng: &mut R);
}

/// A search problem solved by a [`GaRunner`].
pub trait GaProblem: Send + Sync {
    /// Genome type.
    type Individual: Individual;

    /// Builds the first generation of `size` individuals.
    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Self::Individual>;

    /// Decodes `individual` and stores its fitness.
    fn evaluate(&self, individual: &mut Self::Individual);

    /// Evaluates a whole generation on the rayon pool.
    fn evaluate_parallel(&self, individuals: &mut [Self::Individual]) {
        individuals.par_iter_mut().for_each(|ind| {
            self.evaluate(ind);
        });
    }

    /// Hook run once per generation, after sorting.
    fn on_generation(
        &self,
        _generation: u32,
        _best: &Self::Individual,
        _population: &[Self::Individual],
    ) {
    }
}

/// Why a [`GaRunner`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancel token fired.
    Cancelled,
    /// `max_generations` was reached.
    GenerationLimit,
    /// The best fitness reached `target_fitness`.
    TargetReached,
    /// No improvement for `stagnation_limit` generations.
    Stagnation,
}

/// Result of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult<I: Individual> {
    /// Fittest individual seen.
    pub best: I,
    /// Generations completed.
    pub generations: u32,
    /// Total elapsed time.
    pub elapsed: Duration,
    /// The target fitness stopped the run.
    pub target_reached: bool,
    /// Whether the run stopped because of cancellation.
    pub cancelled: bool,
    /// Best fitness at the start of each generation.
    pub history: Vec<f64>,
    /// What ended the run.
    pub stop_reason: StopReason,
}

/// Elitist generational loop over a [`GaProblem`].
pub struct GaRunner<P: GaProblem> {
    config: GaConfig,
    problem: P,
    token: CancelToken,
}

impl<P: GaProblem> GaRunner<P> {
    /// Creates a new GA runner that stops when `token` is cancelled.
    pub fn new(config: GaConfig, problem: P, token: CancelToken) -> Self {
        Self {
            config,
            problem,
            token,
        }
    }

    /// The problem being solved.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Consumes the runner and returns the problem.
    pub fn into_problem(self) -> P {
        self.problem
    }

    /// Runs with the thread-local RNG.
    pub fn run(&self) -> GaResult<P::Individual> {
        self.run_with_rng(&mut thread_rng())
    }

    /// Runs with the given RNG; seeded RNGs make runs repeatable when
    /// evaluation is sequential.
    ///
    /// # Panics
    /// Panics if the problem creates an empty population.
    pub fn run_with_rng<R: Rng>(&self, rng: &mut R) -> GaResult<P::Individual> {
        let start = Instant::now();
        let mut history = Vec::new();
        let size = self.config.population_size.max(2);
        let elites = self.config.elite_count.min(size - 1);

        let mut population = self.problem.initialize_population(size, rng);
        assert!(!population.is_empty(), "initial population is empty");
        self.evaluate(&mut population);
        sort_by_fitness(&mut population);

        let mut best = population[0].clone();
        let mut stagnation_count = 0u32;
        let mut generation = 0u32;

        let stop_reason = loop {
            history.push(best.fitness());

            if self.token.is_cancelled() {
                break StopReason::Cancelled;
            }
            if matches!(self.config.max_generations, Some(max) if generation >= max) {
                break StopReason::GenerationLimit;
            }
            if matches!(self.config.target_fitness, Some(target) if best.fitness() >= target) {
                break StopReason::TargetReached;
            }
            if matches!(self.config.stagnation_limit, Some(limit) if stagnation_count >= limit) {
                break StopReason::Stagnation;
            }

            let mut next = Vec::with_capacity(size);
            next.extend(population.iter().take(elites).cloned());

            let total: f64 = population.iter().map(|ind| ind.fitness().max(0.0)).sum();
            while next.len() < size {
                let parent1 = roulette_select(&population, total, rng);
                let parent2 = roulette_select(&population, total, rng);

                let mut child = if rng.gen::<f64>() < self.config.crossover_rate {
                    parent1.crossover(parent2, rng)
                } else {
                    parent1.clone()
                };
                child.mutate(self.config.mutation_rate, rng);
                next.push(child);
            }

            // elites are evaluated again: fitness may depend on search state
            self.evaluate(&mut next);
            sort_by_fitness(&mut next);

            if next[0].fitness() > best.fitness() {
                best = next[0].clone();
                stagnation_count = 0;
            } else {
                stagnation_count += 1;
            }

            self.problem.on_generation(generation, &best, &next);

            population = next;
            generation += 1;
        };

        log::debug!(
            "GA stopped after {} generations ({:?}), best fitness {:.6}",
            generation,
            stop_reason,
            best.fitness()
        );
        GaResult {
            best,
            generations: generation,
            elapsed: start.elapsed(),
            target_reached: stop_reason == StopReason::TargetReached,
            cancelled: self.token.is_cancelled(),
            history,
            stop_reason,
        }
    }

    fn evaluate(&self, individuals: &mut [P::Individual]) {
        if self.config.parallel {
            self.problem.evaluate_parallel(individuals);
        } else {
            for individual in individuals.iter_mut() {
                self.problem.evaluate(individual);
            }
        }
    }
}

fn sort_by_fitness<I: Individual>(population: &mut [I]) {
    population.sort_by(|a, b| {
        b.fitness()
            .partial_cmp(&a.fitness())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Fitness-proportional selection; uniform when every fitness is zero.
fn roulette_select<'a, I: Individual, R: Rng>(
    population: &'a [I],
    total: f64,
    rng: &mut R,
) -> &'a I {
    if total <= 0.0 {
        return &population[rng.gen_range(0..population.len())];
    }
    let mut ticket = rng.gen::<f64>() * total;
    for individual in population {
        ticket -= individual.fitness().max(0.0);
        if ticket <= 0.0 {
            return individual;
        }
    }
    &population[population.len() - 1]
}

/// Chromosome for permutation-based packing: an entry order plus one
/// rotation flag per entry.
#[derive(Debug, Clone)]
pub struct PermutationChromosome {
    /// The permutation (entry indices in placement order).
    pub genes: Vec<usize>,
    /// Rotation flag per entry index (not per position).
    pub rotations: Vec<bool>,
    rotatable: bool,
    fitness: f64,
}

impl PermutationChromosome {
    /// Creates the identity chromosome.
    pub fn new(size: usize, rotatable: bool) -> Self {
        Self {
            genes: (0..size).collect(),
            rotations: vec![false; size],
            rotatable,
            fitness: 0.0,
        }
    }

    /// Creates a chromosome from an explicit order and rotations.
    pub fn from_parts(genes: Vec<usize>, rotations: Vec<bool>, rotatable: bool) -> Self {
        Self {
            genes,
            rotations,
            rotatable,
            fitness: 0.0,
        }
    }

    /// Shuffled order with random rotations (all clear if not rotatable).
    pub fn random<R: Rng>(size: usize, rotatable: bool, rng: &mut R) -> Self {
        let mut genes: Vec<usize> = (0..size).collect();
        genes.shuffle(rng);

        let rotations: Vec<bool> = (0..size).map(|_| rotatable && rng.gen()).collect();

        Self {
            genes,
            rotations,
            rotatable,
            fitness: 0.0,
        }
    }

    /// Whether rotation genes may be set.
    pub fn is_rotatable(&self) -> bool {
        self.rotatable
    }

    /// Stores an evaluated fitness.
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// True for the empty instance.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Order crossover (OX): keeps a random slice of `self` in place and
    /// fills the remaining slots with the missing entries in the order they
    /// appear in `other`, starting after the slice. Rotation flags are
    /// inherited per entry from either parent.
    pub fn order_crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let n = self.genes.len();
        if n < 2 {
            return self.clone();
        }

        let (lo, hi) = {
            let a = rng.gen_range(0..n);
            let b = rng.gen_range(0..n);
            (a.min(b), a.max(b))
        };

        let mut taken = vec![false; n];
        for &entry in &self.genes[lo..=hi] {
            taken[entry] = true;
        }
        let mut donor = (1..=n)
            .map(|offset| other.genes[(hi + offset) % n])
            .filter(|&entry| !taken[entry]);

        let mut genes = self.genes.clone();
        for offset in 1..=n - (hi - lo + 1) {
            let slot = (hi + offset) % n;
            if let Some(entry) = donor.next() {
                genes[slot] = entry;
            }
        }

        let rotations = self
            .rotations
            .iter()
            .zip(&other.rotations)
            .map(|(&mine, &theirs)| if rng.gen_bool(0.5) { mine } else { theirs })
            .collect();

        Self {
            genes,
            rotations,
            rotatable: self.rotatable,
            fitness: 0.0,
        }
    }

    /// Swaps the gene at `index` with a random position.
    pub fn swap_mutate<R: Rng>(&mut self, index: usize, rng: &mut R) {
        if self.genes.len() < 2 {
            return;
        }
        let other = rng.gen_range(0..self.genes.len());
        self.genes.swap(index, other);
        self.fitness = 0.0;
    }

    /// Flips the rotation of the entry placed at position `index`.
    pub fn rotation_mutate(&mut self, index: usize) {
        if !self.rotatable {
            return;
        }
        let entry = self.genes[index];
        self.rotations[entry] = !self.rotations[entry];
        self.fitness = 0.0;
    }

    /// Reverses a random slice of the order.
    pub fn inversion_mutate<R: Rng>(&mut self, rng: &mut R) {
        let n = self.genes.len();
        if n < 2 {
            return;
        }
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        self.genes[a.min(b)..=a.max(b)].reverse();
        self.fitness = 0.0;
    }
}

impl Individual for PermutationChromosome {
    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        self.order_crossover(other, rng)
    }

    fn mutate<R: Rng>(&mut self, rate: f64, rng: &mut R) {
        for index in 0..self.genes.len() {
            if rng.gen::<f64>() >= rate {
                continue;
            }
            // rotate or swap with equal odds when rotation is possible
            if self.rotatable && rng.gen_bool(0.5) {
                self.rotation_mutate(index);
            } else {
                self.swap_mutate(index, rng);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    #[derive(Clone)]
    struct SimpleIndividual {
        value: f64,
        fitness: f64,
    }

    impl Individual for SimpleIndividual {
        fn fitness(&self) -> f64 {
            self.fitness
        }

        fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
            Self {
                value: if rng.gen() { self.value } else { other.value },
                fitness: 0.0,
            }
        }

        fn mutate<R: Rng>(&mut self, rate: f64, rng: &mut R) {
            if rng.gen::<f64>() < rate {
                self.value += rng.gen_range(-10.0..10.0);
            }
        }
    }

    struct SimpleProblem;

    impl GaProblem for SimpleProblem {
        type Individual = SimpleIndividual;

        fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<SimpleIndividual> {
            (0..size)
                .map(|_| SimpleIndividual {
                    value: rng.gen_range(-100.0..100.0),
                    fitness: 0.0,
                })
                .collect()
        }

        fn evaluate(&self, individual: &mut SimpleIndividual) {
            // maximum at x = 0
            individual.fitness = 1.0 / (1.0 + individual.value * individual.value);
        }
    }

    #[test]
    fn test_ga_basic() {
        let config = GaConfig::default()
            .with_population_size(50)
            .with_max_generations(100)
            .with_mutation_rate(0.5)
            .with_target_fitness(0.99);

        let runner = GaRunner::new(config, SimpleProblem, CancelToken::new());
        let mut rng = StdRng::seed_from_u64(3);
        let result = runner.run_with_rng(&mut rng);

        assert!(result.best.value.abs() < 5.0);
        assert!(!result.cancelled);
        // best fitness never decreases
        assert!(result.history.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_ga_stops_when_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let runner = GaRunner::new(GaConfig::default().unbounded(), SimpleProblem, token);
        let result = runner.run();
        assert_eq!(result.generations, 0);
        assert!(result.cancelled);
        assert_eq!(result.stop_reason, StopReason::Cancelled);
    }

    #[test]
    fn test_stop_reasons() {
        // a constant fitness never improves
        struct Flat;
        impl GaProblem for Flat {
            type Individual = SimpleIndividual;

            fn initialize_population<R: Rng>(
                &self,
                size: usize,
                _rng: &mut R,
            ) -> Vec<SimpleIndividual> {
                let flat = SimpleIndividual {
                    value: 1.0,
                    fitness: 0.0,
                };
                vec![flat; size]
            }

            fn evaluate(&self, individual: &mut SimpleIndividual) {
                individual.fitness = 0.5;
            }
        }

        let run = |config: GaConfig| {
            GaRunner::new(config.with_parallel(false), Flat, CancelToken::new())
                .run_with_rng(&mut StdRng::seed_from_u64(1))
        };
        let stagnant = run(GaConfig::default().unbounded().with_stagnation_limit(3));
        assert_eq!(stagnant.stop_reason, StopReason::Stagnation);
        assert_eq!(stagnant.generations, 3);

        let capped = run(GaConfig::default().with_max_generations(2));
        assert_eq!(capped.stop_reason, StopReason::GenerationLimit);
        assert!(!capped.target_reached);

        let reached = run(GaConfig::default().with_target_fitness(0.5));
        assert_eq!(reached.stop_reason, StopReason::TargetReached);
        assert!(reached.target_reached);
        assert_eq!(reached.generations, 0);
    }

    #[test]
    fn test_permutation_crossover() {
        let mut rng = StdRng::seed_from_u64(11);
        let parent1 = PermutationChromosome::random(10, true, &mut rng);
        let parent2 = PermutationChromosome::random(10, true, &mut rng);

        for _ in 0..20 {
            let child = parent1.order_crossover(&parent2, &mut rng);
            let mut entries = child.genes.clone();
            entries.sort_unstable();
            assert_eq!(entries, (0..10).collect::<Vec<_>>());
            assert!(child
                .rotations
                .iter()
                .enumerate()
                .all(|(i, &r)| r == parent1.rotations[i] || r == parent2.rotations[i]));
        }
    }

    #[test]
    fn test_permutation_mutation() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut chromosome = PermutationChromosome::random(10, false, &mut rng);

        chromosome.mutate(1.0, &mut rng);

        let mut entries = chromosome.genes.clone();
        entries.sort_unstable();
        assert_eq!(entries, (0..10).collect::<Vec<_>>());
        assert!(chromosome.rotations.iter().all(|r| !r));
    }

    #[test]
    fn test_rotation_mutate_targets_entry() {
        let mut chromosome = PermutationChromosome::from_parts(vec![2, 0, 1], vec![false; 3], true);
        chromosome.rotation_mutate(0);
        assert_eq!(chromosome.rotations, vec![false, false, true]);
    }
}
