//! Search strategies.
//!
//! Every generator implements [`Generator`]: it receives an instance with
//! no box and returns the smallest packing it found. All of them start
//! from the heuristic [`upper_bound`](upper_bound::upper_bound), so a
//! cancelled run still has a packing unless it was cancelled before the
//! first shelf packing finished.
//!
//! | Strategy | Generator | Used by `Auto` for |
//! |----------|-----------|--------------------|
//! | greedy | [`GreedyGenerator`] | fallback only |
//! | bounding-box | [`BoundingBoxGenerator`] | up to `exact_max_entries` |
//! | genetic | [`GeneticGenerator`] | up to `genetic_max_entries` |
//! | fixed-height | [`FixedHeightGenerator`] | larger, fixed height |
//! | tradeoff | [`TradeoffGenerator`] | larger, free height |
//! | polish-genetic | [`PolishGeneticGenerator`] | never |

mod bounding_box;
mod fixed_height;
mod genetic;
mod greedy;
mod polish_genetic;
mod run;
mod tradeoff;
pub mod upper_bound;

pub use bounding_box::{BoundingBoxGenerator, BoxQueue, Candidate};
pub use fixed_height::FixedHeightGenerator;
pub use genetic::GeneticGenerator;
pub use greedy::GreedyGenerator;
pub use polish_genetic::PolishGeneticGenerator;
pub use run::{RunState, SearchRun};
pub use tradeoff::TradeoffGenerator;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rectpack_core::{
    Config, Generator, Instance, PackResult, SearchContext, SolutionStatus, Strategy,
};

/// Fills in the bookkeeping fields of a finished result.
pub(crate) fn finish(mut result: PackResult, ctx: &SearchContext) -> PackResult {
    result.computation_time_ms = ctx.elapsed().as_millis() as u64;
    result.packs = ctx.packs();
    result.nodes = ctx.nodes();
    if let Some(best) = &result.best {
        // nothing beats a packing without waste
        if result.status == SolutionStatus::Feasible && best.area() == best.total_area() {
            result.status = SolutionStatus::Optimal;
        }
    }
    if let (Some(best), Some(history)) = (&result.best, result.history.last()) {
        log::debug!(
            "{}: {} finished with {}x{} (area {}) after {} improvements",
            ctx.label(),
            result.strategy,
            best.width(),
            best.height(),
            history,
            result.history.len()
        );
    }
    result
}

/// Random source of randomized generators: seeded when a seed is given.
pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Builds the generator of a concrete strategy.
///
/// `Strategy::Auto` needs an instance to decide; it yields the greedy
/// generator here, use [`select_generator`] instead.
pub fn create_generator(strategy: Strategy, config: &Config) -> Box<dyn Generator + Send> {
    match strategy {
        Strategy::BoundingBox => Box::new(BoundingBoxGenerator::from_config(config)),
        Strategy::Tradeoff => Box::new(TradeoffGenerator::from_config(config)),
        Strategy::FixedHeight => Box::new(FixedHeightGenerator::from_config(config)),
        Strategy::Genetic => Box::new(GeneticGenerator::from_config(config)),
        Strategy::PolishGenetic => Box::new(PolishGeneticGenerator::from_config(config)),
        Strategy::Greedy => Box::new(GreedyGenerator::new()),
        Strategy::Auto => {
            log::warn!("auto strategy without an instance, using greedy");
            Box::new(GreedyGenerator::new())
        }
    }
}

/// Strategy `Auto` picks for `instance`.
pub fn auto_strategy(config: &Config, instance: &Instance) -> Strategy {
    let n = instance.size();
    if n <= config.exact_max_entries {
        Strategy::BoundingBox
    } else if n <= config.genetic_max_entries {
        Strategy::Genetic
    } else if instance.fixed_height().is_some() {
        Strategy::FixedHeight
    } else {
        Strategy::Tradeoff
    }
}

/// Builds the generator for `instance`, resolving `Strategy::Auto` from
/// the instance size and shape.
pub fn select_generator(config: &Config, instance: &Instance) -> Box<dyn Generator + Send> {
    let strategy = match config.strategy {
        Strategy::Auto => auto_strategy(config, instance),
        strategy => strategy,
    };
    log::info!(
        "{} entries, rotation {}, {}: using {}",
        instance.size(),
        if instance.allows_rotation() { "allowed" } else { "forbidden" },
        match instance.fixed_height() {
            Some(height) => format!("fixed height {height}"),
            None => "free height".to_string(),
        },
        strategy
    );
    create_generator(strategy, config)
}
