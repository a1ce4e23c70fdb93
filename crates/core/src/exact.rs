//! Exact solver configuration and result status.
//!
//! The exact packer is a branch-and-bound search over integer coordinates.
//! It guarantees to find a packing whenever one exists in the given box, at
//! a cost that grows exponentially with the number of entries, so the
//! bounding-box search only uses it for small instances.
//!
//! # Example
//!
//! ```rust
//! use rectpack_core::exact::ExactConfig;
//!
//! let config = ExactConfig::default()
//!     .with_symmetry_breaking(true)
//!     .with_perfect_packing(false);
//! assert!(config.is_within_limit(8));
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How good a returned packing is known to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolutionStatus {
    /// Proven minimal area.
    Optimal,
    /// Feasible packing, optimality not proven.
    Feasible,
    /// No packing exists within the searched boxes.
    Infeasible,
    /// Cancelled before any feasible packing was found.
    Timeout,
    /// Nothing was searched yet.
    #[default]
    Unknown,
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimal => write!(f, "Optimal"),
            Self::Feasible => write!(f, "Feasible"),
            Self::Infeasible => write!(f, "Infeasible"),
            Self::Timeout => write!(f, "Timeout"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Switches of the exact coordinate packer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExactConfig {
    /// Maximum number of entries the bounding-box search accepts.
    pub max_entries: usize,

    /// Skip x positions that only mirror or permute identical entries.
    pub use_symmetry_breaking: bool,

    /// Prune when unplaced area cannot fit the remaining column space.
    pub use_wasted_space_pruning: bool,

    /// Pad the instance with 1×1 fillers up to the box area.
    pub use_perfect_packing: bool,

    /// Transpose boxes that are wider than tall before searching.
    pub transpose_wide_boxes: bool,
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self {
            max_entries: 10,
            use_symmetry_breaking: true,
            use_wasted_space_pruning: true,
            use_perfect_packing: true,
            transpose_wide_boxes: true,
        }
    }
}

impl ExactConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum number of entries for exact solving.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max.max(1);
        self
    }

    /// Enable or disable symmetry breaking.
    pub fn with_symmetry_breaking(mut self, enable: bool) -> Self {
        self.use_symmetry_breaking = enable;
        self
    }

    /// Enable or disable wasted-space pruning.
    pub fn with_wasted_space_pruning(mut self, enable: bool) -> Self {
        self.use_wasted_space_pruning = enable;
        self
    }

    /// Enable or disable perfect-packing padding.
    pub fn with_perfect_packing(mut self, enable: bool) -> Self {
        self.use_perfect_packing = enable;
        self
    }

    /// Enable or disable transposition of wide boxes.
    pub fn with_transpose(mut self, enable: bool) -> Self {
        self.transpose_wide_boxes = enable;
        self
    }

    /// Check if the number of entries is within the exact solving limit.
    pub fn is_within_limit(&self, entries: usize) -> bool {
        entries <= self.max_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_config_default() {
        let config = ExactConfig::default();
        assert_eq!(config.max_entries, 10);
        assert!(config.use_symmetry_breaking);
        assert!(config.use_wasted_space_pruning);
        assert!(config.use_perfect_packing);
        assert!(config.transpose_wide_boxes);
    }

    #[test]
    fn test_exact_config_builder() {
        let config = ExactConfig::new()
            .with_max_entries(0)
            .with_symmetry_breaking(false)
            .with_transpose(false);

        assert_eq!(config.max_entries, 1);
        assert!(!config.use_symmetry_breaking);
        assert!(!config.transpose_wide_boxes);
        assert!(config.is_within_limit(1));
        assert!(!config.is_within_limit(2));
    }

    #[test]
    fn test_solution_status_display() {
        assert_eq!(format!("{}", SolutionStatus::Optimal), "Optimal");
        assert_eq!(format!("{}", SolutionStatus::Feasible), "Feasible");
        assert_eq!(format!("{}", SolutionStatus::Infeasible), "Infeasible");
        assert_eq!(format!("{}", SolutionStatus::Timeout), "Timeout");
        assert_eq!(SolutionStatus::default(), SolutionStatus::Unknown);
    }
}
