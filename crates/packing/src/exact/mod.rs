//! Exact coordinate-assignment packer.
//!
//! The search runs in two stages. The x-stage gives every rectangle a left
//! edge (and an orientation, when rotation is allowed) such that no unit
//! column is overfull; the y-stage then stacks the rectangles inside their
//! columns. Left edges are restricted to subset sums of rectangle widths:
//! pushing every rectangle of a packing as far left as it goes yields a
//! packing whose left edges are all such sums, so nothing is lost.
//!
//! [`CoordinatePacker`] is the bare two-stage search. [`ExactPacker`] puts
//! it behind the transformers selected by an [`ExactConfig`]:
//!
//! ```text
//! RotatedPackingTransformer      transposes boxes wider than tall
//!   PerfectPackingTransformer    pads to a gap-free packing
//!     CoordinatePacker           x-stage, then y-stage
//! ```
//!
//! # Example
//!
//! ```rust
//! use rectpack_core::{ExactConfig, Instance, Packer, SearchContext};
//! use rectpack_packing::ExactPacker;
//!
//! let mut instance =
//!     Instance::from_dimensions(false, None, &[(2, 6), (2, 6), (4, 3), (4, 3)]).with_box(8, 6);
//! let mut packer = ExactPacker::new(ExactConfig::default());
//! let placed = packer.pack(&mut instance, &SearchContext::unbounded()).unwrap();
//! assert!(placed.verify_packing().is_ok());
//! ```

mod columns;
pub mod subset_sum;
mod transform;
mod x_stage;
mod y_stage;

pub use subset_sum::SubsetSums;
pub use transform::{PerfectPackingTransformer, RotatedPackingTransformer};

use rectpack_core::{ExactConfig, Instance, Packer, SearchContext, SearchableEntry};
use x_stage::XStage;

/// A rectangle as the two search stages see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Item {
    /// Position of the entry in the instance.
    pub index: usize,
    /// Width in the entry's starting orientation.
    pub width: u32,
    /// Height in the entry's starting orientation.
    pub height: u32,
    /// Whether the other orientation may be tried.
    pub rotatable: bool,
    /// Whether the item is turned relative to its starting orientation.
    pub rotated: bool,
    pub x: u32,
    pub y: u32,
}

impl Item {
    pub fn new(index: usize, width: u32, height: u32, rotatable: bool) -> Self {
        Self {
            index,
            width,
            height,
            rotatable: rotatable && width != height,
            rotated: false,
            x: 0,
            y: 0,
        }
    }

    /// Size in the current orientation.
    pub fn size(&self) -> (u32, u32) {
        if self.rotated {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// Column height the item needs in any orientation still open to it.
    pub fn key(&self) -> u32 {
        if self.rotatable {
            self.width.min(self.height)
        } else {
            self.height
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Two-stage backtracking packer. Finds a packing into the instance's box
/// whenever one exists; gaps between rectangles are allowed.
///
/// Filler entries present in the instance are not searched individually:
/// they are dealt out to the free cells of the columns once all other
/// rectangles have their left edge.
#[derive(Debug, Clone, Default)]
pub struct CoordinatePacker {
    config: ExactConfig,
}

impl CoordinatePacker {
    /// Creates a packer with the given feature toggles.
    pub fn new(config: ExactConfig) -> Self {
        Self { config }
    }
}

impl Packer for CoordinatePacker {
    fn name(&self) -> &'static str {
        "coordinate"
    }

    fn pack(&mut self, instance: &mut Instance, ctx: &SearchContext) -> Option<Instance> {
        ctx.record_pack();
        let mut placed = instance.clone();
        placed.clear_positions();
        if placed.is_empty() {
            return Some(placed);
        }
        let (width, height) = (placed.width(), placed.height());
        if width == 0 || height == 0 {
            return None;
        }

        let rotatable = placed.allows_rotation();
        let mut items = Vec::with_capacity(placed.size());
        let mut fillers = Vec::new();
        for (index, entry) in placed.entries().iter().enumerate() {
            if entry.is_filler() {
                fillers.push(index);
            } else {
                let (w, h) = entry.size();
                items.push(Item::new(index, w, h, rotatable));
            }
        }

        let solution =
            XStage::new(&self.config, ctx, items, fillers.len() as u64, width, height).solve()?;

        for item in &solution.items {
            if item.rotated {
                placed.toggle_rotation(item.index);
            }
            placed.set_position(item.index, item.x, item.y);
        }
        for (&index, &(x, y)) in fillers.iter().zip(&solution.fillers) {
            placed.set_position(index, x, y);
        }
        log::trace!(
            "{}: exact packing into {}x{} after {} nodes",
            ctx.label(),
            width,
            height,
            ctx.nodes()
        );
        Some(placed)
    }
}

/// The exact packer with the transformers its [`ExactConfig`] asks for.
pub struct ExactPacker {
    inner: Box<dyn Packer + Send>,
}

impl ExactPacker {
    /// Builds the pipeline.
    pub fn new(config: ExactConfig) -> Self {
        let base = CoordinatePacker::new(config.clone());
        let inner: Box<dyn Packer + Send> =
            match (config.transpose_wide_boxes, config.use_perfect_packing) {
                (true, true) => Box::new(RotatedPackingTransformer::new(
                    PerfectPackingTransformer::new(base),
                )),
                (true, false) => Box::new(RotatedPackingTransformer::new(base)),
                (false, true) => Box::new(PerfectPackingTransformer::new(base)),
                (false, false) => Box::new(base),
            };
        Self { inner }
    }
}

impl Default for ExactPacker {
    fn default() -> Self {
        Self::new(ExactConfig::default())
    }
}

impl std::fmt::Debug for ExactPacker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactPacker")
            .field("outer", &self.inner.name())
            .finish()
    }
}

impl Packer for ExactPacker {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn pack(&mut self, instance: &mut Instance, ctx: &SearchContext) -> Option<Instance> {
        self.inner.pack(instance, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(config: ExactConfig, instance: &mut Instance) -> Option<Instance> {
        ExactPacker::new(config).pack(instance, &SearchContext::unbounded())
    }

    #[test]
    fn test_single_entry_at_origin() {
        let mut instance = Instance::from_dimensions(false, None, &[(5, 10)]).with_box(10, 10);
        let placed = pack(ExactConfig::default(), &mut instance).unwrap();
        assert_eq!(placed.entry(0).position(), Some((0, 0)));
        assert_eq!(placed.size(), 1);
    }

    #[test]
    fn test_too_small_box() {
        let mut instance = Instance::from_dimensions(true, None, &[(5, 10)]).with_box(2, 2);
        assert!(pack(ExactConfig::default(), &mut instance).is_none());
    }

    #[test]
    fn test_every_pipeline_agrees() {
        let dims = [(3, 2), (1, 2), (1, 1), (3, 1)];
        for transpose in [false, true] {
            for perfect in [false, true] {
                let config = ExactConfig::default()
                    .with_transpose(transpose)
                    .with_perfect_packing(perfect);
                let mut instance = Instance::from_dimensions(false, None, &dims).with_box(4, 3);
                let placed = pack(config, &mut instance).unwrap();
                assert!(placed.verify_matches(&instance).is_ok());
            }
        }
    }

    #[test]
    fn test_finds_rotated_packing() {
        // two 1x3 bars and a 3x1 bar fill a 3x3 box only if one turns
        let mut instance =
            Instance::from_dimensions(true, None, &[(1, 3), (1, 3), (3, 1)]).with_box(3, 3);
        let placed = pack(ExactConfig::default(), &mut instance).unwrap();
        assert!(placed.verify_matches(&instance).is_ok());

        let mut rigid =
            Instance::from_dimensions(false, None, &[(1, 3), (1, 3), (3, 1)]).with_box(3, 3);
        assert!(pack(ExactConfig::default(), &mut rigid).is_none());
    }

    #[test]
    fn test_wide_box_with_gaps() {
        let mut instance =
            Instance::from_dimensions(false, None, &[(4, 1), (2, 1), (1, 1)]).with_box(5, 2);
        let placed = pack(ExactConfig::default(), &mut instance).unwrap();
        assert_eq!((placed.width(), placed.height()), (5, 2));
        assert!(placed.verify_matches(&instance).is_ok());
        assert!(placed.entries().iter().all(|e| !e.rotated()));
    }
}
