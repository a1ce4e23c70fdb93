//! Search result representation.

use crate::exact::SolutionStatus;
use crate::instance::Instance;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of a generator run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackResult {
    /// Best packing found, entries in id order with the box cropped to
    /// their extent.
    pub best: Option<Instance>,

    /// How good `best` is known to be.
    pub status: SolutionStatus,

    /// Generator that produced the result.
    pub strategy: String,

    /// Computation time in milliseconds.
    pub computation_time_ms: u64,

    /// Number of packer invocations.
    pub packs: u64,

    /// Number of search nodes visited by backtracking packers.
    pub nodes: u64,

    /// Number of generations (for GA-based generators).
    pub generations: Option<u32>,

    /// Area of every improvement, in the order they were found.
    pub history: Vec<u64>,

    /// Whether the run was cut short by cancellation.
    pub cancelled: bool,
}

impl PackResult {
    /// Creates an empty result for the named generator.
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            best: None,
            status: SolutionStatus::Unknown,
            strategy: strategy.into(),
            computation_time_ms: 0,
            packs: 0,
            nodes: 0,
            generations: None,
            history: Vec::new(),
            cancelled: false,
        }
    }

    /// Offers a placed candidate; keeps it if its cropped area is strictly
    /// smaller than the current best. Returns true if it was kept.
    ///
    /// Candidates are cropped to their extent; for fixed-height instances
    /// the box keeps the fixed height.
    pub fn offer(&mut self, mut candidate: Instance) -> bool {
        candidate.shrink_to_fit();
        if let Some(height) = candidate.fixed_height() {
            let width = candidate.width();
            candidate.set_box(width, height.max(candidate.height()));
        }
        let improves = match &self.best {
            None => true,
            Some(best) => candidate.area() < best.area(),
        };
        if improves {
            candidate.sort_by_id();
            self.history.push(candidate.area());
            self.best = Some(candidate);
            if self.status == SolutionStatus::Unknown {
                self.status = SolutionStatus::Feasible;
            }
        }
        improves
    }

    /// Area of the best packing.
    pub fn area(&self) -> Option<u64> {
        self.best.as_ref().map(Instance::area)
    }

    /// Width of the best packing.
    pub fn width(&self) -> Option<u32> {
        self.best.as_ref().map(Instance::width)
    }

    /// Height of the best packing.
    pub fn height(&self) -> Option<u32> {
        self.best.as_ref().map(Instance::height)
    }

    /// Covered share of the best box (0.0 - 1.0).
    pub fn utilization(&self) -> f64 {
        match &self.best {
            Some(best) if best.area() > 0 => best.total_area() as f64 / best.area() as f64,
            _ => 0.0,
        }
    }

    /// Returns utilization as a percentage string.
    pub fn utilization_percent(&self) -> String {
        format!("{:.1}%", self.utilization() * 100.0)
    }

    /// Returns true if a packing was found.
    pub fn is_feasible(&self) -> bool {
        self.best.is_some()
    }

    /// Returns true if the run finished without being cancelled.
    pub fn completed_normally(&self) -> bool {
        !self.cancelled
    }

    /// Sets the status.
    pub fn with_status(mut self, status: SolutionStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the generations count.
    pub fn with_generations(mut self, generations: u32) -> Self {
        self.generations = Some(generations);
        self
    }

    /// Takes over the best packing and history of another result if its
    /// packing is better.
    pub fn absorb(&mut self, other: PackResult) {
        self.packs += other.packs;
        self.nodes += other.nodes;
        if let Some(best) = other.best {
            if self.offer(best) && other.status == SolutionStatus::Optimal {
                self.status = SolutionStatus::Optimal;
            }
        }
    }
}

/// Summary statistics for a result, as exported by the CLI.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolveSummary {
    /// Strategy used.
    pub strategy: String,
    /// Number of rectangles placed.
    pub entries: usize,
    /// Box width.
    pub width: u32,
    /// Box height.
    pub height: u32,
    /// Box area.
    pub area: u64,
    /// Utilization percentage.
    pub utilization_percent: f64,
    /// Solution status.
    pub status: String,
    /// Computation time in milliseconds.
    pub time_ms: u64,
    /// Whether the run was cancelled.
    pub cancelled: bool,
}

impl From<&PackResult> for SolveSummary {
    fn from(result: &PackResult) -> Self {
        Self {
            strategy: result.strategy.clone(),
            entries: result.best.as_ref().map_or(0, Instance::size),
            width: result.width().unwrap_or(0),
            height: result.height().unwrap_or(0),
            area: result.area().unwrap_or(0),
            utilization_percent: result.utilization() * 100.0,
            status: result.status.to_string(),
            time_ms: result.computation_time_ms,
            cancelled: result.cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn placed(width: u32) -> Instance {
        // two 2x2 squares side by side or stacked
        let mut instance = Instance::from_dimensions(false, None, &[(2, 2), (2, 2)]);
        instance.set_box(width, 4);
        instance.set_position(0, 0, 0);
        if width >= 4 {
            instance.set_position(1, 2, 0);
        } else {
            instance.set_position(1, 0, 2);
        }
        instance
    }

    #[test]
    fn test_result_new() {
        let result = PackResult::new("greedy");
        assert!(result.best.is_none());
        assert_eq!(result.utilization(), 0.0);
        assert!(!result.is_feasible());
        assert_eq!(result.status, SolutionStatus::Unknown);
    }

    #[test]
    fn test_offer_keeps_smaller_area() {
        let mut result = PackResult::new("test");
        assert!(result.offer(placed(10)));
        // cropped to 4x2
        assert_eq!(result.area(), Some(8));
        assert_eq!(result.status, SolutionStatus::Feasible);
        assert!(!result.offer(placed(10)));
        assert!(!result.offer(placed(2)));
        assert_eq!(result.history, vec![8]);
        assert_relative_eq!(result.utilization(), 1.0);
        assert_eq!(result.utilization_percent(), "100.0%");
    }

    #[test]
    fn test_offer_keeps_fixed_height() {
        let mut instance = Instance::from_dimensions(false, Some(5), &[(2, 2), (2, 2)]);
        instance.set_position(0, 0, 0);
        instance.set_position(1, 2, 0);
        let mut result = PackResult::new("fixed-height");
        assert!(result.offer(instance));
        assert_eq!((result.width(), result.height()), (Some(4), Some(5)));
    }

    #[test]
    fn test_solve_summary() {
        let mut result = PackResult::new("bounding-box").with_status(SolutionStatus::Optimal);
        result.offer(placed(4));
        result.computation_time_ms = 100;

        let summary = SolveSummary::from(&result);
        assert_eq!(summary.entries, 2);
        assert_eq!((summary.width, summary.height), (4, 2));
        assert_relative_eq!(summary.utilization_percent, 100.0);
        assert_eq!(summary.strategy, "bounding-box");
        assert_eq!(summary.status, "Optimal");
    }
}
