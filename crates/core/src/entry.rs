//! Entries: the rectangles being packed.
//!
//! An [`Entry`] keeps its raw (input) width and height forever; rotation is
//! a flag, and every packer works on the *effective* size, which swaps the
//! two sides while the flag is set. Entries come in three kinds (see
//! [`EntryKind`]): plain input rectangles, 1×1 fillers added by the
//! perfect-packing transformer, and merged composites built by the polish
//! packer.

use crate::rect::Rect;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of an entry. Input rectangles are numbered from 0 in the order
/// they were read.
pub type EntryId = usize;

/// Read access shared by everything that can be sorted and placed.
///
/// Ordering policies and the exact packer's internal items work through
/// this trait rather than through [`Entry`] directly.
pub trait SearchableEntry {
    /// Stable identifier.
    fn id(&self) -> EntryId;

    /// Effective `(width, height)` in the current orientation.
    fn size(&self) -> (u32, u32);

    /// Whether the current orientation is the rotated one.
    fn rotated(&self) -> bool;

    /// Covered area.
    fn area(&self) -> u64 {
        let (w, h) = self.size();
        w as u64 * h as u64
    }

    /// Length of the longer side.
    fn longest_side(&self) -> u32 {
        let (w, h) = self.size();
        w.max(h)
    }

    /// Length of the shorter side.
    fn shortest_side(&self) -> u32 {
        let (w, h) = self.size();
        w.min(h)
    }

    /// Returns true for squares, whose rotation is a no-op.
    fn is_square(&self) -> bool {
        let (w, h) = self.size();
        w == h
    }
}

/// The kind of an entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Default)]
pub enum EntryKind {
    /// An input rectangle.
    #[default]
    Single,
    /// A 1×1 padding cell added to reach a perfect packing.
    Filler,
    /// A composite of several entries placed relative to each other.
    Merged(MergedEntry),
}

/// Direction in which a merge stacks its second operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MergeDirection {
    /// Second operand on top of the first.
    Up,
    /// Second operand right of the first.
    Right,
}

/// Constituents of a merged entry.
///
/// Constituents are always leaves: merging a merged entry absorbs its
/// constituents instead of nesting it.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MergedEntry {
    parts: Vec<MergedPart>,
}

/// One constituent with its offset and orientation in the merge's own
/// un-rotated frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct MergedPart {
    entry: Entry,
    offset_x: u32,
    offset_y: u32,
    rotated: bool,
}

impl MergedEntry {
    /// Number of constituents.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if the merge has no constituents.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Constituents in their current absolute state.
    pub fn constituents(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.parts.iter().map(|part| &part.entry)
    }
}

/// A rectangle to pack.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Entry {
    id: EntryId,
    width: u32,
    height: u32,
    rotated: bool,
    position: Option<(u32, u32)>,
    kind: EntryKind,
}

impl Entry {
    /// Creates an unplaced, un-rotated input rectangle.
    pub fn new(id: EntryId, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            rotated: false,
            position: None,
            kind: EntryKind::Single,
        }
    }

    /// Creates a 1×1 filler cell.
    pub fn filler(id: EntryId) -> Self {
        Self {
            kind: EntryKind::Filler,
            ..Self::new(id, 1, 1)
        }
    }

    /// Merges two entries into a composite.
    ///
    /// `first` sits at the composite's origin, `second` is stacked on top of
    /// it ([`MergeDirection::Up`]) or next to it ([`MergeDirection::Right`]).
    /// Both keep their current orientation. The composite is un-rotated and
    /// unplaced; its raw size is the extent of the two operands.
    pub fn merge(id: EntryId, first: Entry, second: Entry, direction: MergeDirection) -> Self {
        let (fw, fh) = first.size();
        let (sw, sh) = second.size();
        let (second_x, second_y, width, height) = match direction {
            MergeDirection::Up => (0, fh, fw.max(sw), fh + sh),
            MergeDirection::Right => (fw, 0, fw + sw, fh.max(sh)),
        };

        let mut parts = Vec::with_capacity(first.leaf_count() + second.leaf_count());
        absorb(&mut parts, first, 0, 0);
        absorb(&mut parts, second, second_x, second_y);

        Self {
            id,
            width,
            height,
            rotated: false,
            position: None,
            kind: EntryKind::Merged(MergedEntry { parts }),
        }
    }

    /// Raw width as read from the input.
    pub fn raw_width(&self) -> u32 {
        self.width
    }

    /// Raw height as read from the input.
    pub fn raw_height(&self) -> u32 {
        self.height
    }

    /// Width in the current orientation.
    pub fn effective_width(&self) -> u32 {
        if self.rotated {
            self.height
        } else {
            self.width
        }
    }

    /// Height in the current orientation.
    pub fn effective_height(&self) -> u32 {
        if self.rotated {
            self.width
        } else {
            self.height
        }
    }

    /// Lower-left corner, once placed.
    pub fn position(&self) -> Option<(u32, u32)> {
        self.position
    }

    /// Returns true once the entry has a position.
    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }

    /// The effective rectangle at the current position.
    pub fn placed_rect(&self) -> Option<Rect> {
        self.position.map(|(x, y)| {
            Rect::new(x, y, self.effective_width(), self.effective_height())
        })
    }

    /// Moves the entry; merged entries move all constituents along.
    pub fn set_position(&mut self, x: u32, y: u32) {
        self.position = Some((x, y));
        self.cascade();
    }

    /// Forgets the position.
    pub fn clear_position(&mut self) {
        self.position = None;
        self.cascade();
    }

    /// Sets the orientation.
    ///
    /// This does not know whether the owning instance allows rotation; go
    /// through [`Instance::set_rotation`](crate::Instance::set_rotation)
    /// for entries that belong to an instance.
    pub fn set_rotated(&mut self, rotated: bool) {
        self.rotated = rotated;
        self.cascade();
    }

    /// The entry's kind.
    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    /// Returns true for perfect-packing filler cells.
    pub fn is_filler(&self) -> bool {
        matches!(self.kind, EntryKind::Filler)
    }

    /// Returns true for merged composites.
    pub fn is_merged(&self) -> bool {
        matches!(self.kind, EntryKind::Merged(_))
    }

    /// Number of leaves this entry stands for.
    pub fn leaf_count(&self) -> usize {
        match &self.kind {
            EntryKind::Merged(merged) => merged.len(),
            _ => 1,
        }
    }

    /// Splits a merged entry into its constituents, in their current
    /// absolute state. A leaf yields itself.
    pub fn into_leaves(self) -> Vec<Entry> {
        match self.kind {
            EntryKind::Merged(merged) => merged.parts.into_iter().map(|p| p.entry).collect(),
            _ => vec![self],
        }
    }

    /// Mirror image across the main diagonal: raw sides and coordinates
    /// swap, the rotation flag is kept.
    pub fn transposed(&self) -> Entry {
        let kind = match &self.kind {
            EntryKind::Merged(merged) => EntryKind::Merged(MergedEntry {
                parts: merged
                    .parts
                    .iter()
                    .map(|part| MergedPart {
                        entry: part.entry.transposed(),
                        offset_x: part.offset_y,
                        offset_y: part.offset_x,
                        rotated: part.rotated,
                    })
                    .collect(),
            }),
            other => other.clone(),
        };
        Entry {
            id: self.id,
            width: self.height,
            height: self.width,
            rotated: self.rotated,
            position: self.position.map(|(x, y)| (y, x)),
            kind,
        }
    }

    fn cascade(&mut self) {
        let rotated = self.rotated;
        let origin = self.position;
        if let EntryKind::Merged(merged) = &mut self.kind {
            for part in &mut merged.parts {
                part.entry.rotated = part.rotated != rotated;
                part.entry.position = origin.map(|(x, y)| {
                    if rotated {
                        (x + part.offset_y, y + part.offset_x)
                    } else {
                        (x + part.offset_x, y + part.offset_y)
                    }
                });
            }
        }
    }
}

impl SearchableEntry for Entry {
    fn id(&self) -> EntryId {
        self.id
    }

    fn size(&self) -> (u32, u32) {
        (self.effective_width(), self.effective_height())
    }

    fn rotated(&self) -> bool {
        self.rotated
    }
}

fn absorb(parts: &mut Vec<MergedPart>, mut entry: Entry, offset_x: u32, offset_y: u32) {
    entry.set_position(offset_x, offset_y);
    for leaf in entry.into_leaves() {
        // position was just set by the cascade above
        let (x, y) = leaf.position.unwrap_or((offset_x, offset_y));
        parts.push(MergedPart {
            offset_x: x,
            offset_y: y,
            rotated: leaf.rotated,
            entry: leaf,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_size() {
        let mut entry = Entry::new(0, 3, 7);
        assert_eq!(entry.size(), (3, 7));
        entry.set_rotated(true);
        assert_eq!(entry.size(), (7, 3));
        assert_eq!(entry.raw_width(), 3);
        assert_eq!(entry.longest_side(), 7);
        assert_eq!(entry.shortest_side(), 3);
        assert!(!entry.is_square());
    }

    #[test]
    fn test_placed_rect() {
        let mut entry = Entry::new(4, 2, 5);
        assert!(entry.placed_rect().is_none());
        entry.set_position(3, 1);
        assert_eq!(entry.placed_rect(), Some(Rect::new(3, 1, 2, 5)));
        entry.set_rotated(true);
        assert_eq!(entry.placed_rect(), Some(Rect::new(3, 1, 5, 2)));
        entry.clear_position();
        assert!(!entry.is_placed());
    }

    #[test]
    fn test_merge_right_cascades_location() {
        let a = Entry::new(0, 2, 3);
        let b = Entry::new(1, 4, 1);
        let mut merged = Entry::merge(10, a, b, MergeDirection::Right);
        assert_eq!(merged.size(), (6, 3));
        assert_eq!(merged.leaf_count(), 2);

        merged.set_position(5, 5);
        let leaves = merged.into_leaves();
        assert_eq!(leaves[0].placed_rect(), Some(Rect::new(5, 5, 2, 3)));
        assert_eq!(leaves[1].placed_rect(), Some(Rect::new(7, 5, 4, 1)));
    }

    #[test]
    fn test_merge_flattens_nested_merges() {
        let ab = Entry::merge(10, Entry::new(0, 1, 1), Entry::new(1, 1, 2), MergeDirection::Up);
        let abc = Entry::merge(11, ab, Entry::new(2, 3, 3), MergeDirection::Right);
        assert_eq!(abc.leaf_count(), 3);
        match abc.kind() {
            EntryKind::Merged(merged) => {
                assert!(merged.constituents().all(|e| !e.is_merged()));
            }
            _ => panic!("expected a merged entry"),
        }
        assert_eq!(abc.size(), (4, 3));
    }

    #[test]
    fn test_rotating_merge_toggles_constituents() {
        let a = Entry::new(0, 2, 3);
        let mut b = Entry::new(1, 1, 4);
        b.set_rotated(true); // effective 4x1
        let mut merged = Entry::merge(10, a, b, MergeDirection::Up);
        assert_eq!(merged.size(), (4, 4));

        merged.set_rotated(true);
        merged.set_position(0, 0);
        let leaves = merged.into_leaves();
        // a: (0,0,2,3) -> transposed (0,0,3,2), now rotated
        assert!(leaves[0].rotated());
        assert_eq!(leaves[0].placed_rect(), Some(Rect::new(0, 0, 3, 2)));
        // b: (0,3,4,1) -> transposed (3,0,1,4), rotation toggled off
        assert!(!leaves[1].rotated());
        assert_eq!(leaves[1].placed_rect(), Some(Rect::new(3, 0, 1, 4)));
    }

    #[test]
    fn test_transposed_merge_matches_rotated_geometry() {
        let merged = Entry::merge(9, Entry::new(0, 2, 1), Entry::new(1, 1, 1), MergeDirection::Right);
        let mut placed = merged.clone();
        placed.set_position(1, 2);
        let transposed = placed.transposed();
        let rects: Vec<_> = transposed
            .into_leaves()
            .iter()
            .filter_map(Entry::placed_rect)
            .collect();
        assert_eq!(rects, vec![Rect::new(2, 1, 1, 2), Rect::new(2, 3, 1, 1)]);
    }

    #[test]
    fn test_filler() {
        let filler = Entry::filler(42);
        assert!(filler.is_filler());
        assert_eq!(filler.size(), (1, 1));
        assert_eq!(filler.id(), 42);
    }
}
