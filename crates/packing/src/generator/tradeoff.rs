//! Width/height trade-off search.
//!
//! Walks a staircase of boxes starting from the greedy packing's width:
//! boxes too small to hold the total area grow taller, boxes no better
//! than the best packing lose a column, and every other box is tried with
//! the sheet packer under each heuristic ordering. After an attempt the
//! box loses a column and gains `height_increment` rows.

use super::finish;
use super::upper_bound::{policies, prepare, upper_bound};
use crate::sheet::SheetPacker;
use rectpack_core::{
    Config, EntryOrder, Error, Generator, Instance, PackResult, Packer, Result, SearchContext,
};

/// Trade-off search over box widths and heights.
#[derive(Debug, Clone)]
pub struct TradeoffGenerator {
    height_increment: u32,
    max_iterations: Option<u64>,
}

impl Default for TradeoffGenerator {
    fn default() -> Self {
        Self {
            height_increment: 1,
            max_iterations: None,
        }
    }
}

impl TradeoffGenerator {
    /// Creates a generator with a unit height step and no iteration cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator from a run configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            height_increment: config.height_increment.max(1),
            max_iterations: config.max_iterations,
        }
    }

    /// Sets the height step.
    pub fn with_height_increment(mut self, increment: u32) -> Self {
        self.height_increment = increment.max(1);
        self
    }

    /// Caps the number of visited boxes.
    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    /// Packs `instance` into a `width x height` box under every heuristic
    /// ordering and returns the smallest packing.
    fn attempt(
        &self,
        instance: &Instance,
        width: u32,
        height: u32,
        ctx: &SearchContext,
    ) -> Option<Instance> {
        let mut packer = SheetPacker::new().with_lookahead(true);
        let mut best: Option<Instance> = None;
        for &policy in policies(instance) {
            for order in EntryOrder::HEURISTICS {
                if ctx.is_cancelled() {
                    return best;
                }
                let mut trial = prepare(instance, order, policy).with_box(width, height);
                if let Some(mut placed) = packer.pack(&mut trial, ctx) {
                    placed.shrink_to_fit();
                    if best.as_ref().map_or(true, |b| placed.area() < b.area()) {
                        best = Some(placed);
                    }
                }
            }
        }
        best
    }
}

impl Generator for TradeoffGenerator {
    fn name(&self) -> &'static str {
        "tradeoff"
    }

    fn generate(&mut self, instance: &Instance, ctx: &SearchContext) -> Result<PackResult> {
        instance.validate()?;
        let mut result = PackResult::new(self.name());
        let greedy = upper_bound(instance, ctx).ok_or(Error::Cancelled)?;
        let mut width = greedy.width();
        ctx.offer(&mut result, greedy);

        let total = instance.total_area();
        let min_width = instance.min_feasible_width();
        let mut height = instance
            .fixed_height()
            .unwrap_or_else(|| instance.min_feasible_height());
        let mut iterations = 0u64;

        while width >= min_width && width > 0 {
            if ctx.is_cancelled() {
                result.cancelled = true;
                log::info!("{}: trade-off search cancelled at {}x{}", ctx.label(), width, height);
                break;
            }
            if matches!(self.max_iterations, Some(max) if iterations >= max) {
                break;
            }
            iterations += 1;

            let area = width as u64 * height as u64;
            let best = result.area().unwrap_or(u64::MAX);
            if area < total {
                if instance.fixed_height().is_some() {
                    break;
                }
                height += self.height_increment;
                continue;
            }
            if area >= best {
                width -= 1;
                continue;
            }

            if let Some(placed) = self.attempt(instance, width, height, ctx) {
                if ctx.offer(&mut result, placed) {
                    log::debug!(
                        "{}: trade-off improved to {}x{} in box {}x{}",
                        ctx.label(),
                        result.width().unwrap_or(0),
                        result.height().unwrap_or(0),
                        width,
                        height
                    );
                }
            }
            width -= 1;
            if instance.fixed_height().is_none() {
                height += self.height_increment;
            }
        }

        Ok(finish(result, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rectpack_core::SolutionStatus;

    fn mixed() -> Instance {
        Instance::from_dimensions(
            false,
            None,
            &[(4, 4), (4, 2), (2, 4), (2, 2), (2, 2), (6, 1), (1, 6), (3, 3)],
        )
    }

    #[test]
    fn test_tradeoff_improves_on_greedy() {
        let instance = mixed();
        let ctx = SearchContext::unbounded();
        let greedy = upper_bound(&instance, &ctx).unwrap();
        let result = TradeoffGenerator::new().generate(&instance, &ctx).unwrap();
        let best = result.best.as_ref().unwrap();
        assert!(best.verify_matches(&instance).is_ok());
        assert!(best.area() <= greedy.area());
        assert!(best.area() >= instance.total_area());
        assert_eq!(result.history.first(), Some(&greedy.area()));
    }

    #[test]
    fn test_tradeoff_fixed_height() {
        let instance = Instance::from_dimensions(
            true,
            Some(4),
            &[(4, 2), (2, 4), (4, 2), (2, 2), (2, 2), (1, 4)],
        );
        let result = TradeoffGenerator::new()
            .generate(&instance, &SearchContext::unbounded())
            .unwrap();
        let best = result.best.unwrap();
        assert_eq!(best.height(), 4);
        assert!(best.verify_matches(&instance).is_ok());
    }

    #[test]
    fn test_tradeoff_iteration_cap() {
        let result = TradeoffGenerator::new()
            .with_max_iterations(0)
            .generate(&mixed(), &SearchContext::unbounded())
            .unwrap();
        assert_eq!(result.history.len(), 1);
        assert!(matches!(
            result.status,
            SolutionStatus::Feasible | SolutionStatus::Optimal
        ));
    }
}
