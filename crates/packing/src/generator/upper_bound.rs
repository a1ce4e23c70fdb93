//! Heuristic upper bound shared by the generators.

use crate::shelf::ShelfPacker;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rectpack_core::{EntryOrder, Instance, Packer, RotationPolicy, SearchContext};

/// Copy of `instance` sorted by `order`, re-oriented by `policy` (entries
/// never exceed the fixed height, if any), with positions cleared.
pub fn prepare(instance: &Instance, order: EntryOrder, policy: RotationPolicy) -> Instance {
    // the heuristic policies are deterministic; the rng only serves `Random`
    let mut rng = StdRng::seed_from_u64(0);
    prepare_with_rng(instance, order, policy, &mut rng)
}

/// [`prepare`] with a caller-supplied random source.
pub fn prepare_with_rng<R: rand::Rng>(
    instance: &Instance,
    order: EntryOrder,
    policy: RotationPolicy,
    rng: &mut R,
) -> Instance {
    let mut trial = instance.clone();
    trial.clear_positions();
    trial.apply_rotation_policy(policy, rng, instance.fixed_height());
    trial.sort_by_order(order);
    trial
}

/// Rotation policies worth trying on `instance`.
pub fn policies(instance: &Instance) -> &'static [RotationPolicy] {
    if instance.allows_rotation() {
        &RotationPolicy::HEURISTICS
    } else {
        &[RotationPolicy::Never]
    }
}

/// Height of the strip the upper-bound packing uses: the fixed height, or
/// roughly the side of a square holding all entries.
pub fn strip_height(instance: &Instance) -> u32 {
    match instance.fixed_height() {
        Some(height) => height,
        None => {
            let side = (instance.total_area() as f64).sqrt().ceil() as u32;
            side.max(instance.tallest())
        }
    }
}

/// Packs `instance` with the shelf packer under every heuristic order and
/// rotation policy, and returns the smallest packing, cropped to its
/// extent (fixed-height instances keep their height).
///
/// Each attempt gets a strip as wide as all entries side by side, so it
/// can only fail on cancellation.
pub fn upper_bound(instance: &Instance, ctx: &SearchContext) -> Option<Instance> {
    let mut best: Option<Instance> = None;
    for &policy in policies(instance) {
        for order in EntryOrder::HEURISTICS {
            if ctx.is_cancelled() {
                return best;
            }
            let mut trial = prepare(instance, order, policy);
            let width = trial.entries().iter().map(|e| e.effective_width()).sum();
            let height = strip_height(&trial);
            trial.set_box(width, height);

            let Some(mut placed) = ShelfPacker::new().pack(&mut trial, ctx) else {
                continue;
            };
            placed.shrink_to_fit();
            if let Some(fixed) = placed.fixed_height() {
                let width = placed.width();
                placed.set_box(width, fixed);
            }
            log::trace!(
                "{}: upper bound {:?}/{:?}: {}x{}",
                ctx.label(),
                order,
                policy,
                placed.width(),
                placed.height()
            );
            if best.as_ref().map_or(true, |b| placed.area() < b.area()) {
                best = Some(placed);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_bound_is_valid() {
        let instance =
            Instance::from_dimensions(false, None, &[(2, 6), (2, 6), (4, 3), (3, 4), (1, 1)]);
        let placed = upper_bound(&instance, &SearchContext::unbounded()).unwrap();
        assert!(placed.verify_matches(&instance).is_ok());
        assert!(placed.area() >= instance.total_area());
    }

    #[test]
    fn test_fixed_height_forces_orientation() {
        let instance = Instance::from_dimensions(true, Some(3), &[(1, 5), (2, 2)]);
        let placed = upper_bound(&instance, &SearchContext::unbounded()).unwrap();
        assert_eq!(placed.height(), 3);
        assert!(placed.verify_matches(&instance).is_ok());
    }

    #[test]
    fn test_strip_height() {
        let instance = Instance::from_dimensions(false, None, &[(1, 7), (3, 3)]);
        assert_eq!(strip_height(&instance), 7);
        let square = Instance::from_dimensions(false, None, &[(2, 2), (2, 2), (2, 2), (2, 2)]);
        assert_eq!(strip_height(&square), 4);
    }
}
