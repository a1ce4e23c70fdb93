//! Genetic search over placement orders and orientations.
//!
//! A chromosome is a [`PermutationChromosome`]: the order in which the
//! sheet packer receives the entries plus one rotation flag per entry. The
//! strip height is fixed (the instance's, or the greedy packing's) and the
//! trial width is the best width found so far, so an individual is
//! feasible only if it does at least as well as the best packing.
//!
//! Fitness is `1 / (area - total + 1)`: a packing without waste scores 1.

use super::upper_bound::{prepare, upper_bound};
use super::{finish, seeded_rng};
use crate::sheet::SheetPacker;
use rand::Rng;
use rectpack_core::{
    Config, EntryOrder, Error, GaConfig, GaProblem, GaRunner, Generator, Individual, Instance,
    PackResult, Packer, PermutationChromosome, Result, RotationPolicy, SearchContext,
    SearchableEntry,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

pub(crate) fn waste_fitness(area: u64, total: u64) -> f64 {
    1.0 / (area.saturating_sub(total) + 1) as f64
}

struct StripProblem<'a> {
    instance: &'a Instance,
    ctx: &'a SearchContext,
    height: u32,
    trial_width: AtomicU32,
    total: u64,
    best: Mutex<PackResult>,
}

impl<'a> StripProblem<'a> {
    fn decode(&self, chromosome: &PermutationChromosome) -> Option<Instance> {
        let mut trial = self.instance.clone();
        trial.clear_positions();
        if trial.allows_rotation() {
            for (index, &rotated) in chromosome.rotations.iter().enumerate() {
                let entry = trial.entry(index);
                let height = if rotated {
                    entry.raw_width()
                } else {
                    entry.raw_height()
                };
                trial.set_rotation(index, rotated != (height > self.height));
            }
        }
        trial.reorder(&chromosome.genes);
        trial.set_box(self.trial_width.load(Ordering::Relaxed), self.height);
        SheetPacker::new().pack(&mut trial, self.ctx)
    }

    /// Chromosome reproducing the greedy height-first order.
    fn heuristic(&self) -> PermutationChromosome {
        let policy = if self.instance.allows_rotation() {
            RotationPolicy::LongestSideVertical
        } else {
            RotationPolicy::Never
        };
        let sorted = prepare(self.instance, EntryOrder::Height, policy);
        let genes: Vec<usize> = sorted
            .entries()
            .iter()
            .filter_map(|e| self.instance.index_of(e.id()))
            .collect();
        let mut rotations = vec![false; self.instance.size()];
        for entry in sorted.entries() {
            if let Some(index) = self.instance.index_of(entry.id()) {
                rotations[index] = entry.rotated();
            }
        }
        PermutationChromosome::from_parts(genes, rotations, self.instance.allows_rotation())
    }

    fn into_result(self) -> PackResult {
        self.best.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<'a> GaProblem for StripProblem<'a> {
    type Individual = PermutationChromosome;

    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Self::Individual> {
        let n = self.instance.size();
        let rotatable = self.instance.allows_rotation();
        let mut population = Vec::with_capacity(size);
        population.push(self.heuristic());
        while population.len() < size {
            population.push(PermutationChromosome::random(n, rotatable, rng));
        }
        population
    }

    fn evaluate(&self, individual: &mut Self::Individual) {
        let Some(mut placed) = self.decode(individual) else {
            individual.set_fitness(0.0);
            return;
        };
        placed.shrink_to_fit();
        if self.instance.fixed_height().is_some() {
            let width = placed.width();
            placed.set_box(width, self.height);
        }
        individual.set_fitness(waste_fitness(placed.area(), self.total));

        let Ok(mut best) = self.best.lock() else {
            return;
        };
        let width = placed.width();
        if self.ctx.offer(&mut best, placed) {
            self.trial_width.fetch_min(width, Ordering::Relaxed);
            log::debug!(
                "{}: genetic search improved to area {}",
                self.ctx.label(),
                best.area().unwrap_or(0)
            );
        }
    }

    fn on_generation(
        &self,
        generation: u32,
        best: &Self::Individual,
        _population: &[Self::Individual],
    ) {
        log::debug!(
            "{}: generation {} best fitness {:.6} trial width {}",
            self.ctx.label(),
            generation,
            best.fitness(),
            self.trial_width.load(Ordering::Relaxed)
        );
    }
}

/// Genetic search with the sheet packer as decoder.
#[derive(Debug, Clone, Default)]
pub struct GeneticGenerator {
    ga: GaConfig,
    seed: Option<u64>,
}

impl GeneticGenerator {
    /// Creates a generator with the given GA parameters.
    pub fn new(ga: GaConfig) -> Self {
        Self { ga, seed: None }
    }

    /// Creates a generator from a run configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            ga: GaConfig::from(config),
            seed: config.seed,
        }
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Generator for GeneticGenerator {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn generate(&mut self, instance: &Instance, ctx: &SearchContext) -> Result<PackResult> {
        instance.validate()?;
        let mut result = PackResult::new(self.name());
        let greedy = upper_bound(instance, ctx).ok_or(Error::Cancelled)?;
        let height = instance.fixed_height().unwrap_or_else(|| greedy.height());
        let width = greedy.width();
        ctx.offer(&mut result, greedy);

        let problem = StripProblem {
            instance,
            ctx,
            height,
            trial_width: AtomicU32::new(width),
            total: instance.total_area(),
            best: Mutex::new(result),
        };
        let config = self.ga.clone().with_target_fitness(1.0);
        let runner = GaRunner::new(config, problem, ctx.token().clone());
        let mut rng = seeded_rng(self.seed);
        let outcome = runner.run_with_rng(&mut rng);

        let mut result = runner.into_problem().into_result();
        result.generations = Some(outcome.generations);
        result.cancelled = outcome.cancelled;
        if outcome.cancelled {
            log::info!(
                "{}: genetic search cancelled after {} generations",
                ctx.label(),
                outcome.generations
            );
        }
        Ok(finish(result, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn instance() -> Instance {
        Instance::from_dimensions(
            true,
            None,
            &[(3, 2), (2, 3), (1, 4), (4, 1), (2, 2), (2, 2), (1, 1), (3, 3)],
        )
    }

    #[test]
    fn test_waste_fitness() {
        assert_relative_eq!(waste_fitness(20, 20), 1.0);
        assert_relative_eq!(waste_fitness(24, 20), 0.2);
    }

    #[test]
    fn test_genetic_result() {
        let instance = instance();
        let ctx = SearchContext::unbounded();
        let greedy = upper_bound(&instance, &ctx).unwrap();
        let ga = GaConfig::default()
            .with_population_size(12)
            .with_max_generations(15)
            .with_parallel(false);
        let result = GeneticGenerator::new(ga)
            .with_seed(11)
            .generate(&instance, &ctx)
            .unwrap();
        assert_eq!(result.strategy, "genetic");
        assert!(result.generations.unwrap() <= 15);
        let best = result.best.unwrap();
        assert!(best.verify_matches(&instance).is_ok());
        assert!(best.area() <= greedy.area());
        // every improvement is strictly smaller
        assert!(result.history.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_genetic_fixed_height() {
        let instance = Instance::from_dimensions(false, Some(4), &[(2, 4), (2, 2), (2, 2), (1, 3)]);
        let ga = GaConfig::default()
            .with_population_size(6)
            .with_max_generations(5);
        let result = GeneticGenerator::new(ga)
            .with_seed(2)
            .generate(&instance, &SearchContext::unbounded())
            .unwrap();
        let best = result.best.unwrap();
        assert_eq!(best.height(), 4);
        assert!(best.verify_matches(&instance).is_ok());
    }

    #[test]
    fn test_heuristic_chromosome_is_permutation() {
        let instance = instance();
        let ctx = SearchContext::unbounded();
        let problem = StripProblem {
            instance: &instance,
            ctx: &ctx,
            height: 8,
            trial_width: AtomicU32::new(30),
            total: instance.total_area(),
            best: Mutex::new(PackResult::new("genetic")),
        };
        let mut chromosome = problem.heuristic();
        let mut genes = chromosome.genes.clone();
        genes.sort_unstable();
        assert_eq!(genes, (0..instance.size()).collect::<Vec<_>>());
        problem.evaluate(&mut chromosome);
        assert!(chromosome.fitness() > 0.0);
        assert!(problem.into_result().is_feasible());
    }
}
