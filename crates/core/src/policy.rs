//! Ordering and rotation policies applied to an instance before packing.

use crate::entry::{Entry, SearchableEntry};
use rand::Rng;
use std::cmp::Ordering;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Named entry orderings. All but [`EntryOrder::Id`] put the largest
/// entries first; ties fall back to the secondary side and then to the id,
/// so every ordering is total and deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntryOrder {
    /// Decreasing effective height.
    #[default]
    Height,
    /// Decreasing area.
    Area,
    /// Decreasing effective width.
    Width,
    /// Decreasing longest side.
    LongestSide,
    /// Increasing id (input order).
    Id,
}

impl EntryOrder {
    /// The four size-based heuristics tried by the upper-bound helper.
    pub const HEURISTICS: [EntryOrder; 4] = [
        EntryOrder::Height,
        EntryOrder::Area,
        EntryOrder::Width,
        EntryOrder::LongestSide,
    ];

    /// Compares two entries; `Less` means `a` is packed first.
    pub fn compare<E: SearchableEntry>(&self, a: &E, b: &E) -> Ordering {
        let (aw, ah) = a.size();
        let (bw, bh) = b.size();
        let primary = match self {
            Self::Height => bh.cmp(&ah).then(bw.cmp(&aw)),
            Self::Area => b.area().cmp(&a.area()).then(bh.cmp(&ah)),
            Self::Width => bw.cmp(&aw).then(bh.cmp(&ah)),
            Self::LongestSide => b
                .longest_side()
                .cmp(&a.longest_side())
                .then(b.shortest_side().cmp(&a.shortest_side())),
            Self::Id => Ordering::Equal,
        };
        primary.then(a.id().cmp(&b.id()))
    }
}

/// Named rotation predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RotationPolicy {
    /// Keep every entry in its input orientation.
    #[default]
    Never,
    /// Flip a fair coin per entry.
    Random,
    /// Stand every entry on its shorter side.
    LongestSideVertical,
}

impl RotationPolicy {
    /// Rotation policies tried by the upper-bound helper.
    pub const HEURISTICS: [RotationPolicy; 2] =
        [RotationPolicy::Never, RotationPolicy::LongestSideVertical];

    /// Whether the policy wants `entry` rotated, judged on its raw size.
    pub fn wants_rotation<R: Rng + ?Sized>(&self, entry: &Entry, rng: &mut R) -> bool {
        match self {
            Self::Never => false,
            Self::Random => rng.gen_bool(0.5),
            Self::LongestSideVertical => entry.raw_width() > entry.raw_height(),
        }
    }
}
