//! # rectpack packing
//!
//! Packers and search generators for two-dimensional rectangle packing.
//!
//! ## Packers
//!
//! A [`Packer`](rectpack_core::Packer) makes one attempt at placing every
//! entry of an instance into its box:
//!
//! - [`ShelfPacker`]: guillotine grid, first free space in `(x, y)` order
//! - [`SheetPacker`]: space-partition tree with an undo log, optional
//!   orientation look-ahead
//! - [`ExactPacker`]: two-stage backtracking search, complete for the box
//!   it is given
//! - [`PolishPacker`]: evaluates a polish-notation merge tree
//!
//! ## Generators
//!
//! A [`Generator`](rectpack_core::Generator) searches for the smallest box;
//! see the [`generator`] module for the strategies and their selection.
//! [`SearchRun`] runs one generator on a worker thread under the time
//! budget of a [`Config`].
//!
//! ## Quick Start
//!
//! ```rust
//! use rectpack_core::{Config, Instance, Strategy};
//!
//! let instance = Instance::from_dimensions(true, None, &[(3, 1), (1, 3), (2, 2), (1, 1)]);
//! let config = Config::new()
//!     .with_strategy(Strategy::BoundingBox)
//!     .with_time_limit(10_000)
//!     .with_reserve(1_000);
//!
//! let result = rectpack_packing::solve(&instance, &config).unwrap();
//! let best = result.best.unwrap();
//! assert!(best.verify_matches(&instance).is_ok());
//! println!("{}x{} ({})", best.width(), best.height(), result.status);
//! ```

pub mod arena;
pub mod exact;
pub mod generator;
pub mod polish;
pub mod sheet;
pub mod shelf;

pub use exact::{
    CoordinatePacker, ExactPacker, PerfectPackingTransformer, RotatedPackingTransformer,
    SubsetSums,
};
pub use generator::{
    auto_strategy, create_generator, select_generator, BoundingBoxGenerator, BoxQueue,
    FixedHeightGenerator, GeneticGenerator, GreedyGenerator, PolishGeneticGenerator, RunState,
    SearchRun, TradeoffGenerator,
};
pub use polish::{PolishGenome, PolishPacker, PolishToken};
pub use sheet::SheetPacker;
pub use shelf::ShelfPacker;

use rectpack_core::{Config, Instance, PackResult, Result};

/// Packs `instance` with the strategy and budget of `config`, blocking
/// until the result is available.
pub fn solve(instance: &Instance, config: &Config) -> Result<PackResult> {
    SearchRun::new(config.clone()).run(instance)
}
