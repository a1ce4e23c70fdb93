//! Packers wrapping other packers.

use rectpack_core::{Entry, Instance, Packer, SearchContext};

/// Pads the instance with 1×1 filler entries until the entries cover the
/// box exactly, runs the inner packer, and strips the fillers again.
///
/// Filler ids start at the instance's [`Instance::next_id`], so they never
/// collide with input ids.
#[derive(Debug, Clone)]
pub struct PerfectPackingTransformer<P> {
    inner: P,
}

impl<P: Packer> PerfectPackingTransformer<P> {
    /// Wraps a packer.
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    /// The wrapped packer.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: Packer> Packer for PerfectPackingTransformer<P> {
    fn name(&self) -> &'static str {
        "perfect"
    }

    fn pack(&mut self, instance: &mut Instance, ctx: &SearchContext) -> Option<Instance> {
        let total = instance.total_area();
        let waste = instance.area().checked_sub(total)?;

        let first_filler = instance.next_id();
        let mut padded = instance.clone();
        for offset in 0..waste as usize {
            padded.add_entry(Entry::filler(first_filler + offset));
        }
        log::trace!(
            "{}: padding {}x{} with {} filler cells",
            ctx.label(),
            instance.width(),
            instance.height(),
            waste
        );

        let mut placed = self.inner.pack(&mut padded, ctx)?;
        placed.retain(|entry| !entry.is_filler());
        Some(placed)
    }
}

/// Transposes wide boxes so the inner packer always sees a box at least
/// as tall as it is wide, and transposes the result back.
#[derive(Debug, Clone)]
pub struct RotatedPackingTransformer<P> {
    inner: P,
}

impl<P: Packer> RotatedPackingTransformer<P> {
    /// Wraps a packer.
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    /// The wrapped packer.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: Packer> Packer for RotatedPackingTransformer<P> {
    fn name(&self) -> &'static str {
        "rotated"
    }

    fn pack(&mut self, instance: &mut Instance, ctx: &SearchContext) -> Option<Instance> {
        if instance.width() <= instance.height() {
            return self.inner.pack(instance, ctx);
        }
        let mut transposed = instance.transposed();
        let placed = self.inner.pack(&mut transposed, ctx)?;
        Some(placed.transposed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rectpack_core::SearchableEntry;

    /// Places entries in a single row, in order.
    struct RowPacker {
        seen: Option<Instance>,
    }

    impl Packer for RowPacker {
        fn name(&self) -> &'static str {
            "row"
        }

        fn pack(&mut self, instance: &mut Instance, _ctx: &SearchContext) -> Option<Instance> {
            self.seen = Some(instance.clone());
            let mut placed = instance.clone();
            let mut x = 0;
            for i in 0..placed.size() {
                let w = placed.entry(i).effective_width();
                placed.set_position(i, x, 0);
                x += w;
            }
            (x <= placed.width()).then_some(placed)
        }
    }

    #[test]
    fn test_perfect_pads_and_strips() {
        let mut instance = Instance::from_dimensions(false, None, &[(2, 1), (1, 1)]).with_box(5, 1);
        let mut packer = PerfectPackingTransformer::new(RowPacker { seen: None });
        let placed = packer.pack(&mut instance, &SearchContext::unbounded()).unwrap();

        let seen = packer.inner().seen.clone().unwrap();
        assert_eq!(seen.size(), 4);
        assert_eq!(seen.total_area(), 5);
        assert!(seen.entries()[2..].iter().all(|e| e.is_filler() && e.id() >= 2));

        assert_eq!(placed.size(), 2);
        assert!(placed.verify_matches(&instance).is_ok());
    }

    #[test]
    fn test_perfect_rejects_overfull_box() {
        let mut instance = Instance::from_dimensions(false, None, &[(3, 3)]).with_box(2, 2);
        let mut packer = PerfectPackingTransformer::new(RowPacker { seen: None });
        assert!(packer.pack(&mut instance, &SearchContext::unbounded()).is_none());
        assert!(packer.inner().seen.is_none());
    }

    #[test]
    fn test_rotated_transposes_wide_boxes() {
        let mut instance = Instance::from_dimensions(false, None, &[(1, 2), (1, 3)]).with_box(5, 3);
        let mut packer = RotatedPackingTransformer::new(RowPacker { seen: None });
        // in the transposed 3x5 box the row is 2 + 3 wide, which does not fit
        assert!(packer.pack(&mut instance, &SearchContext::unbounded()).is_none());
        let seen = packer.inner().seen.clone().unwrap();
        assert_eq!((seen.width(), seen.height()), (3, 5));
        assert_eq!(seen.entry(0).size(), (2, 1));
    }

    #[test]
    fn test_rotated_result_is_transposed_back() {
        let mut instance = Instance::from_dimensions(false, None, &[(2, 1), (3, 1)]).with_box(5, 2);
        let mut packer = RotatedPackingTransformer::new(RowPacker { seen: None });
        // transposed: 1x2 and 1x3 in a 2x5 box, side by side along x
        let placed = packer.pack(&mut instance, &SearchContext::unbounded()).unwrap();
        assert_eq!((placed.width(), placed.height()), (5, 2));
        assert_eq!(placed.entry(0).placed_rect().map(|r| (r.x, r.y, r.width, r.height)), Some((0, 0, 2, 1)));
        assert_eq!(placed.entry(1).placed_rect().map(|r| (r.x, r.y, r.width, r.height)), Some((0, 1, 3, 1)));
        assert!(placed.verify_packing().is_ok());
    }
}
