//! Solver traits and configuration.

use crate::context::SearchContext;
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::result::PackResult;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Strategy {
    /// Pick a strategy from the instance size.
    #[default]
    Auto,
    /// Upper-bound heuristic only (fast fallback).
    Greedy,
    /// Exact search over bounding boxes in increasing area (small instances).
    BoundingBox,
    /// Width/height trade-off search with the sheet packer.
    Tradeoff,
    /// Randomized search for fixed-height strips.
    FixedHeight,
    /// Genetic search over permutations and rotations.
    Genetic,
    /// Genetic search over polish-notation genomes.
    PolishGenetic,
}

impl Strategy {
    /// Every concrete (non-`Auto`) strategy.
    pub const ALL: [Strategy; 6] = [
        Strategy::Greedy,
        Strategy::BoundingBox,
        Strategy::Tradeoff,
        Strategy::FixedHeight,
        Strategy::Genetic,
        Strategy::PolishGenetic,
    ];

    /// Name used on the command line and in summaries.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Greedy => "greedy",
            Self::BoundingBox => "bounding-box",
            Self::Tradeoff => "tradeoff",
            Self::FixedHeight => "fixed-height",
            Self::Genetic => "genetic",
            Self::PolishGenetic => "polish-genetic",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        std::iter::once(Strategy::Auto)
            .chain(Strategy::ALL)
            .find(|strategy| strategy.name() == normalized)
            .ok_or_else(|| Error::ConfigError(format!("unknown strategy '{s}'")))
    }
}

/// Common configuration for a packing run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Search strategy.
    pub strategy: Strategy,

    /// Wall-clock budget of the whole run in milliseconds.
    pub time_limit_ms: u64,

    /// Part of the budget kept back to stop the worker and flush the result.
    pub reserve_ms: u64,

    /// Seed for randomized strategies (None = from entropy).
    pub seed: Option<u64>,

    /// `Auto` uses the exact search up to this many entries.
    pub exact_max_entries: usize,

    /// `Auto` uses the genetic search up to this many entries.
    pub genetic_max_entries: usize,

    // GA-specific parameters
    /// Population size for GA.
    pub population_size: usize,

    /// Generation cap for GA (None = until cancelled).
    pub max_generations: Option<u32>,

    /// Per-gene mutation probability (0.0 - 1.0).
    pub mutation_rate: f64,

    /// Crossover rate (0.0 - 1.0).
    pub crossover_rate: f64,

    /// Individuals copied unchanged into the next generation.
    pub elite_count: usize,

    /// Evaluate GA populations on the rayon pool.
    pub parallel_evaluation: bool,

    /// Height added per step of the trade-off search.
    pub height_increment: u32,

    /// Iteration cap for randomized loops (None = until cancelled).
    pub max_iterations: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            time_limit_ms: 300_000,
            reserve_ms: 5_000,
            seed: None,
            exact_max_entries: 10,
            genetic_max_entries: 100,
            population_size: 50,
            max_generations: None,
            mutation_rate: 0.05,
            crossover_rate: 0.8,
            elite_count: 1,
            parallel_evaluation: true,
            height_increment: 1,
            max_iterations: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the time limit in milliseconds.
    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    /// Sets the reserved grace window in milliseconds.
    pub fn with_reserve(mut self, ms: u64) -> Self {
        self.reserve_ms = ms;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the dispatch thresholds of `Strategy::Auto`.
    pub fn with_thresholds(mut self, exact_max: usize, genetic_max: usize) -> Self {
        self.exact_max_entries = exact_max;
        self.genetic_max_entries = genetic_max;
        self
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(2);
        self
    }

    /// Sets the generation cap.
    pub fn with_max_generations(mut self, generations: u32) -> Self {
        self.max_generations = Some(generations);
        self
    }

    /// Sets the per-gene mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the crossover rate.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the elite count.
    pub fn with_elite_count(mut self, count: usize) -> Self {
        self.elite_count = count;
        self
    }

    /// Enables or disables parallel fitness evaluation.
    pub fn with_parallel_evaluation(mut self, enabled: bool) -> Self {
        self.parallel_evaluation = enabled;
        self
    }

    /// Sets the trade-off search height step.
    pub fn with_height_increment(mut self, increment: u32) -> Self {
        self.height_increment = increment.max(1);
        self
    }

    /// Sets the iteration cap of randomized loops.
    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    /// Budget handed to the search worker: the time limit minus the reserve.
    pub fn search_budget(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms.saturating_sub(self.reserve_ms))
    }

    /// Rejects inconsistent settings.
    pub fn validate(&self) -> Result<()> {
        if self.time_limit_ms == 0 {
            return Err(Error::ConfigError("time limit must be positive".into()));
        }
        if self.reserve_ms >= self.time_limit_ms {
            return Err(Error::ConfigError(format!(
                "reserve of {} ms leaves no time within the {} ms limit",
                self.reserve_ms, self.time_limit_ms
            )));
        }
        if self.population_size < 2 {
            return Err(Error::ConfigError("population needs at least two individuals".into()));
        }
        if self.elite_count >= self.population_size {
            return Err(Error::ConfigError(format!(
                "elite count {} must be below the population size {}",
                self.elite_count, self.population_size
            )));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) || !(0.0..=1.0).contains(&self.crossover_rate)
        {
            return Err(Error::ConfigError("rates must lie in [0, 1]".into()));
        }
        if self.height_increment == 0 {
            return Err(Error::ConfigError("height increment must be positive".into()));
        }
        Ok(())
    }
}

/// A placement algorithm.
///
/// A packer tries to place every entry of `instance` inside the instance's
/// working box (`width() × height()`). Failure to place everything is not
/// an error and yields `None`. Packers may leave observable side effects on
/// the input (the shelf packer toggles the rotation of the entry that did
/// not fit), which is why the input is borrowed mutably.
pub trait Packer {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    /// Packs the instance into its working box.
    fn pack(&mut self, instance: &mut Instance, ctx: &SearchContext) -> Option<Instance>;
}

/// A search strategy driving one or more packers.
///
/// Generators poll `ctx` and return their best-so-far result when
/// cancelled. An error is returned only for unusable input or when no
/// feasible packing was found at all before cancellation.
pub trait Generator {
    /// Short name for log lines and summaries.
    fn name(&self) -> &'static str;

    /// Searches for a packing of minimal area.
    fn generate(&mut self, instance: &Instance, ctx: &SearchContext) -> Result<PackResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_strategy(Strategy::Genetic)
            .with_time_limit(10_000)
            .with_reserve(1_000)
            .with_seed(42)
            .with_population_size(1)
            .with_mutation_rate(1.5);

        assert_eq!(config.strategy, Strategy::Genetic);
        assert_eq!(config.search_budget(), Duration::from_millis(9_000));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.population_size, 2);
        assert_eq!(config.mutation_rate, 1.0);
    }

    #[test]
    fn test_config_validate() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::default().with_reserve(400_000).validate().is_err());
        assert!(Config::default()
            .with_population_size(4)
            .with_elite_count(4)
            .validate()
            .is_err());
    }

    #[test]
    fn test_strategy_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!("Bounding_Box".parse::<Strategy>().unwrap(), Strategy::BoundingBox);
        assert!("simulated-annealing".parse::<Strategy>().is_err());
    }
}
