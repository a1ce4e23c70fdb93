//! Randomized search for strips of fixed height.

use super::upper_bound::upper_bound;
use super::{finish, seeded_rng};
use crate::sheet::SheetPacker;
use rand::seq::SliceRandom;
use rand::Rng;
use rectpack_core::{
    Config, EntryOrder, Error, Generator, Instance, PackResult, Packer, Result, RotationPolicy,
    SearchContext, SolutionStatus,
};

/// Chance that two neighbours in the placement order trade places.
const SWAP_PROBABILITY: f64 = 0.1;

/// Narrows a strip one column at a time.
///
/// The strip height is the instance's fixed height, or the height of the
/// greedy packing otherwise. Each iteration shuffles a heuristic order a
/// little, draws random orientations and asks the sheet packer for a
/// packing one column narrower than the best so far. The search ends when
/// the best width reaches the area bound, the iteration cap is hit, or the
/// run is cancelled.
#[derive(Debug, Clone, Default)]
pub struct FixedHeightGenerator {
    seed: Option<u64>,
    max_iterations: Option<u64>,
}

impl FixedHeightGenerator {
    /// Creates a generator seeded from entropy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator from a run configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            seed: config.seed,
            max_iterations: config.max_iterations,
        }
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Caps the number of packing attempts.
    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    fn shuffled<R: Rng>(instance: &Instance, height: u32, rng: &mut R) -> Instance {
        let mut trial = instance.clone();
        trial.clear_positions();
        trial.apply_rotation_policy(RotationPolicy::Random, rng, Some(height));
        let order = EntryOrder::HEURISTICS
            .choose(rng)
            .copied()
            .unwrap_or_default();
        trial.sort_by_order(order);
        for i in 1..trial.size() {
            if rng.gen_bool(SWAP_PROBABILITY) {
                trial.swap(i - 1, i);
            }
        }
        trial
    }
}

impl Generator for FixedHeightGenerator {
    fn name(&self) -> &'static str {
        "fixed-height"
    }

    fn generate(&mut self, instance: &Instance, ctx: &SearchContext) -> Result<PackResult> {
        instance.validate()?;
        let mut rng = seeded_rng(self.seed);
        let mut result = PackResult::new(self.name());
        let greedy = upper_bound(instance, ctx).ok_or(Error::Cancelled)?;
        let height = instance.fixed_height().unwrap_or_else(|| greedy.height());
        ctx.offer(&mut result, greedy);

        let total = instance.total_area();
        let target = instance
            .min_feasible_width()
            .max(((total + height as u64 - 1) / height as u64) as u32);
        let mut packer = SheetPacker::new().with_lookahead(true);
        let mut iterations = 0u64;

        loop {
            let best_width = result.width().unwrap_or(u32::MAX);
            if best_width <= target {
                result.status = SolutionStatus::Optimal;
                break;
            }
            if ctx.is_cancelled() {
                result.cancelled = true;
                log::info!("{}: fixed-height search cancelled at width {}", ctx.label(), best_width);
                break;
            }
            if matches!(self.max_iterations, Some(max) if iterations >= max) {
                break;
            }
            iterations += 1;

            let mut trial = Self::shuffled(instance, height, &mut rng);
            trial.set_box(best_width - 1, height);
            if let Some(placed) = packer.pack(&mut trial, ctx) {
                if ctx.offer(&mut result, placed) {
                    log::debug!(
                        "{}: width {} after {} attempts",
                        ctx.label(),
                        result.width().unwrap_or(0),
                        iterations
                    );
                }
            }
        }

        Ok(finish(result, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaches_area_bound() {
        // eight 1x2 dominoes fill a 4x4 strip
        let instance = Instance::from_dimensions(true, Some(4), &[(1, 2); 8]);
        let result = FixedHeightGenerator::new()
            .with_seed(3)
            .with_max_iterations(500)
            .generate(&instance, &SearchContext::unbounded())
            .unwrap();
        assert_eq!(result.status, SolutionStatus::Optimal);
        assert_eq!(result.width(), Some(4));
        assert_eq!(result.height(), Some(4));
        assert!(result.best.unwrap().verify_matches(&instance).is_ok());
    }

    #[test]
    fn test_respects_iteration_cap() {
        let instance = Instance::from_dimensions(
            false,
            Some(5),
            &[(3, 5), (2, 3), (2, 2), (4, 1), (1, 4), (3, 2)],
        );
        let ctx = SearchContext::unbounded();
        let result = FixedHeightGenerator::new()
            .with_seed(1)
            .with_max_iterations(20)
            .generate(&instance, &ctx)
            .unwrap();
        let best = result.best.unwrap();
        assert_eq!(best.height(), 5);
        assert!(best.verify_matches(&instance).is_ok());
        // eight shelf packings plus at most twenty sheet packings
        assert!(result.packs <= 28);
    }

    #[test]
    fn test_free_height_uses_greedy_height() {
        let instance = Instance::from_dimensions(false, None, &[(2, 3), (2, 3), (1, 1)]);
        let result = FixedHeightGenerator::new()
            .with_seed(5)
            .with_max_iterations(10)
            .generate(&instance, &SearchContext::unbounded())
            .unwrap();
        assert!(result.best.unwrap().verify_matches(&instance).is_ok());
    }
}
