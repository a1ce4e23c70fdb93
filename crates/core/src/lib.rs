//! # rectpack core
//!
//! Core types and abstractions for the rectpack rectangle packing engine.
//!
//! This crate provides the model and framework shared by the packers and
//! generators in `rectpack-packing`.
//!
//! ## Core Components
//!
//! - **Instance model**: [`Instance`], [`Entry`], [`EntryKind`], [`Rect`]
//! - **Policies**: [`EntryOrder`], [`RotationPolicy`]
//! - **Solver traits**: [`Packer`] (one placement attempt in a fixed box),
//!   [`Generator`] (a search strategy driving packers)
//! - **Cancellation**: [`CancelToken`], [`SearchContext`]
//! - **GA framework**: [`GaRunner`], [`GaProblem`], [`PermutationChromosome`]
//! - **Results**: [`PackResult`], [`SolveSummary`], [`SolutionStatus`]
//!
//! ## Search Strategies
//!
//! The [`Strategy`] enum names the available generators:
//!
//! | Strategy | Speed | Quality | Description |
//! |----------|-------|---------|-------------|
//! | `Greedy` | Fast | Basic | Best of several shelf packings |
//! | `BoundingBox` | Slow | Optimal | Exact search over boxes of increasing area |
//! | `Tradeoff` | Medium | Good | Shrink width, grow height, repack |
//! | `FixedHeight` | Medium | Good | Randomized orders for fixed-height strips |
//! | `Genetic` | Medium | High | GA over orders and rotations |
//! | `PolishGenetic` | Medium | Good | GA over polish-notation merge trees |
//!
//! ## Configuration
//!
//! Use [`Config`] to configure a run:
//!
//! ```rust
//! use rectpack_core::{Config, Strategy};
//!
//! let config = Config::new()
//!     .with_strategy(Strategy::Genetic)
//!     .with_time_limit(30_000)
//!     .with_seed(7);
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod cancel;
pub mod context;
pub mod entry;
pub mod error;
pub mod exact;
pub mod ga;
pub mod instance;
pub mod policy;
pub mod rect;
pub mod result;
pub mod solver;

// Re-exports
pub use cancel::CancelToken;
pub use context::{BestSlot, SearchContext};
pub use entry::{Entry, EntryId, EntryKind, MergeDirection, MergedEntry, SearchableEntry};
pub use error::{Error, PackingViolation, Result};
pub use exact::{ExactConfig, SolutionStatus};
pub use ga::{
    GaConfig, GaProblem, GaResult, GaRunner, Individual, PermutationChromosome, StopReason,
};
pub use instance::Instance;
pub use policy::{EntryOrder, RotationPolicy};
pub use rect::Rect;
pub use result::{PackResult, SolveSummary};
pub use solver::{Config, Generator, Packer, Strategy};

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        CancelToken, Config, Entry, EntryOrder, Generator, Instance, PackResult, Packer, Rect,
        RotationPolicy, SearchContext, SearchableEntry, Strategy,
    };
}
