//! Greedy generator: the heuristic upper bound on its own.

use super::upper_bound::upper_bound;
use super::finish;
use rectpack_core::{Error, Generator, Instance, PackResult, Result, SearchContext};

/// Runs the shelf packer under the heuristic orders and rotation policies
/// once and returns the best packing. Fast; used as the fallback of every
/// other strategy.
#[derive(Debug, Clone, Default)]
pub struct GreedyGenerator;

impl GreedyGenerator {
    /// Creates a greedy generator.
    pub fn new() -> Self {
        Self
    }
}

impl Generator for GreedyGenerator {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn generate(&mut self, instance: &Instance, ctx: &SearchContext) -> Result<PackResult> {
        instance.validate()?;
        let mut result = PackResult::new(self.name());
        let placed = upper_bound(instance, ctx).ok_or(Error::Cancelled)?;
        ctx.offer(&mut result, placed);
        Ok(finish(result, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rectpack_core::SolutionStatus;

    #[test]
    fn test_greedy_result() {
        let instance = Instance::from_dimensions(true, None, &[(3, 1), (1, 3), (2, 2)]);
        let result = GreedyGenerator::new()
            .generate(&instance, &SearchContext::unbounded())
            .unwrap();
        assert_eq!(result.status, SolutionStatus::Feasible);
        assert_eq!(result.strategy, "greedy");
        let best = result.best.unwrap();
        assert!(best.verify_matches(&instance).is_ok());
        assert!(result.packs >= 8);
    }

    #[test]
    fn test_greedy_rejects_empty_instance() {
        let instance = Instance::new(false, None);
        assert!(GreedyGenerator::new()
            .generate(&instance, &SearchContext::unbounded())
            .is_err());
    }

    #[test]
    fn test_greedy_cancelled_before_start() {
        let ctx = SearchContext::unbounded();
        ctx.token().cancel();
        let instance = Instance::from_dimensions(false, None, &[(1, 1)]);
        assert!(matches!(
            GreedyGenerator::new().generate(&instance, &ctx),
            Err(Error::Cancelled)
        ));
    }
}
