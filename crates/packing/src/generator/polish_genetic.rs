//! Genetic search over polish expressions.

use super::genetic::waste_fitness;
use super::upper_bound::upper_bound;
use super::{finish, seeded_rng};
use crate::polish::{PolishGenome, PolishPacker};
use rand::Rng;
use rectpack_core::{
    Config, Error, GaConfig, GaProblem, GaRunner, Generator, Individual, Instance, PackResult,
    Packer, Result, SearchContext,
};
use std::sync::Mutex;

struct PolishProblem<'a> {
    instance: &'a Instance,
    ctx: &'a SearchContext,
    total: u64,
    best: Mutex<PackResult>,
}

impl<'a> PolishProblem<'a> {
    fn decode(&self, genome: &PolishGenome) -> Option<Instance> {
        let height = self.instance.fixed_height().unwrap_or(0);
        let mut trial = self.instance.clone().with_box(0, height);
        let mut placed = PolishPacker::with_genome(genome.clone()).pack(&mut trial, self.ctx)?;
        if let Some(height) = self.instance.fixed_height() {
            let width = placed.width();
            placed.set_box(width, height);
        }
        Some(placed)
    }
}

impl<'a> GaProblem for PolishProblem<'a> {
    type Individual = PolishGenome;

    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Self::Individual> {
        let n = self.instance.size();
        let rotatable = self.instance.allows_rotation();
        let mut population = Vec::with_capacity(size);
        if self.instance.fixed_height().is_none() {
            population.push(PolishGenome::row(n, rotatable));
        }
        while population.len() < size {
            population.push(PolishGenome::random(n, rotatable, rng));
        }
        population
    }

    fn evaluate(&self, individual: &mut Self::Individual) {
        let Some(placed) = self.decode(individual) else {
            individual.set_fitness(0.0);
            return;
        };
        individual.set_fitness(waste_fitness(placed.area(), self.total));
        if let Ok(mut best) = self.best.lock() {
            if self.ctx.offer(&mut best, placed) {
                log::debug!(
                    "{}: polish search improved to area {}",
                    self.ctx.label(),
                    best.area().unwrap_or(0)
                );
            }
        }
    }

    fn on_generation(&self, generation: u32, best: &Self::Individual, _: &[Self::Individual]) {
        log::debug!(
            "{}: polish generation {} best fitness {:.6}",
            self.ctx.label(),
            generation,
            best.fitness()
        );
    }
}

/// Genetic search whose individuals are polish expressions.
///
/// Expressions are unconstrained in width; with a fixed height, any
/// expression taller than the strip has fitness zero.
#[derive(Debug, Clone, Default)]
pub struct PolishGeneticGenerator {
    ga: GaConfig,
    seed: Option<u64>,
}

impl PolishGeneticGenerator {
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

impl Generator for PolishGeneticGenerator {
    fn name(&self) -> &'static str {
        "polish-genetic"
    }

    fn generate(&mut self, instance: &Instance, ctx: &SearchContext) -> Result<PackResult> {
        instance.validate()?;
        let mut result = PackResult::new(self.name());
        ctx.offer(&mut result, upper_bound(instance, ctx).ok_or(Error::Cancelled)?);

        let problem = PolishProblem {
            instance,
            ctx,
            total: instance.total_area(),
            best: Mutex::new(result),
        };
        let config = self.ga.clone().with_target_fitness(1.0);
        let runner = GaRunner::new(config, problem, ctx.token().clone());
        let outcome = runner.run_with_rng(&mut seeded_rng(self.seed));

        let mut result = runner
            .into_problem()
            .best
            .into_inner()
            .unwrap_or_else(|e| e.into_inner());
        result.generations = Some(outcome.generations);
        result.cancelled = outcome.cancelled;
        Ok(finish(result, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polish::PolishToken;

    #[test]
    fn test_polish_genetic_result() {
        let instance =
            Instance::from_dimensions(true, None, &[(2, 1), (1, 2), (2, 2), (1, 1), (3, 1)]);
        let ga = GaConfig::default()
            .with_population_size(10)
            .with_max_generations(20)
            .with_parallel(false);
        let result = PolishGeneticGenerator::new(ga)
            .with_seed(4)
            .generate(&instance, &SearchContext::unbounded())
            .unwrap();
        assert_eq!(result.strategy, "polish-genetic");
        let best = result.best.unwrap();
        assert!(best.verify_matches(&instance).is_ok());
        assert!(best.area() >= instance.total_area());
    }

    #[test]
    fn test_tall_expressions_score_zero() {
        let instance = Instance::from_dimensions(false, Some(2), &[(1, 2), (1, 2)]);
        let ctx = SearchContext::unbounded();
        let problem = PolishProblem {
            instance: &instance,
            ctx: &ctx,
            total: instance.total_area(),
            best: Mutex::new(PackResult::new("polish-genetic")),
        };
        let leaf = |index| PolishToken::Leaf {
            index,
            rotated: false,
        };
        let mut stacked =
            PolishGenome::from_tokens(vec![leaf(0), leaf(1), PolishToken::Up], false).unwrap();
        problem.evaluate(&mut stacked);
        assert_eq!(stacked.fitness(), 0.0);

        let mut row = PolishGenome::row(2, false);
        problem.evaluate(&mut row);
        assert_eq!(row.fitness(), 1.0);
    }
}
