//! Packing instances.
//!
//! An [`Instance`] is the unit every packer consumes and produces: the
//! problem parameters (rotation permission, optional fixed height), the
//! working box, and the ordered entries. The entry order matters: packers
//! place entries in that order, so sorting is how callers steer them.

use crate::entry::{Entry, EntryId, SearchableEntry};
use crate::error::{Error, PackingViolation, Result};
use crate::policy::{EntryOrder, RotationPolicy};
use crate::rect::Rect;
use rand::Rng;
use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rectangle packing problem together with its current working state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Instance {
    allow_rotation: bool,
    fixed_height: Option<u32>,
    declared_count: usize,
    width: u32,
    height: u32,
    entries: Vec<Entry>,
}

impl Instance {
    /// Creates an empty instance.
    pub fn new(allow_rotation: bool, fixed_height: Option<u32>) -> Self {
        Self {
            allow_rotation,
            fixed_height,
            declared_count: 0,
            width: 0,
            height: fixed_height.unwrap_or(0),
            entries: Vec::new(),
        }
    }

    /// Creates an instance from raw `(width, height)` pairs, numbered in order.
    pub fn from_dimensions(
        allow_rotation: bool,
        fixed_height: Option<u32>,
        dimensions: &[(u32, u32)],
    ) -> Self {
        let mut instance = Self::new(allow_rotation, fixed_height);
        for &(w, h) in dimensions {
            instance.add(w, h);
        }
        instance.declared_count = dimensions.len();
        instance
    }

    /// An empty instance with the same parameters and box.
    pub fn empty_like(&self) -> Self {
        Self {
            entries: Vec::new(),
            ..self.clone_header()
        }
    }

    fn clone_header(&self) -> Self {
        Self {
            allow_rotation: self.allow_rotation,
            fixed_height: self.fixed_height,
            declared_count: self.declared_count,
            width: self.width,
            height: self.height,
            entries: Vec::new(),
        }
    }

    /// Records how many rectangles the source announced.
    pub fn with_declared_count(mut self, count: usize) -> Self {
        self.declared_count = count;
        self
    }

    /// Adds a new input rectangle and returns its id.
    pub fn add(&mut self, width: u32, height: u32) -> EntryId {
        let id = self.next_id();
        self.entries.push(Entry::new(id, width, height));
        id
    }

    /// Adds a copy of an existing entry, keeping its id.
    ///
    /// # Panics
    /// Panics if an entry with the same id is already present, or if the
    /// entry is rotated and the instance forbids rotation.
    pub fn add_entry(&mut self, entry: Entry) {
        assert!(
            self.index_of(entry.id()).is_none(),
            "entry id {} is already present",
            entry.id()
        );
        assert!(
            self.allow_rotation || !entry.rotated(),
            "entry {} is rotated but the instance does not allow rotation",
            entry.id()
        );
        self.entries.push(entry);
    }

    /// Removes the entry with the given id.
    pub fn remove(&mut self, id: EntryId) -> Option<Entry> {
        self.index_of(id).map(|index| self.entries.remove(index))
    }

    /// Keeps only the entries matching the predicate.
    pub fn retain<F: FnMut(&Entry) -> bool>(&mut self, keep: F) {
        self.entries.retain(keep);
    }

    /// Smallest id not used by any entry.
    pub fn next_id(&self) -> EntryId {
        self.entries
            .iter()
            .map(|e| e.id() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Position of the entry with the given id in the current order.
    pub fn index_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    /// Whether entries may be rotated.
    pub fn allows_rotation(&self) -> bool {
        self.allow_rotation
    }

    /// The fixed strip height, if any.
    pub fn fixed_height(&self) -> Option<u32> {
        self.fixed_height
    }

    /// Number of rectangles the source announced.
    pub fn declared_count(&self) -> usize {
        self.declared_count
    }

    /// Number of live entries.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in their current order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The entry at the given position in the current order.
    pub fn entry(&self, index: usize) -> &Entry {
        &self.entries[index]
    }

    /// Consumes the instance and returns its entries.
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Working box width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Working box height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Working box area.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Sets the working box.
    pub fn set_box(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Builder form of [`Instance::set_box`].
    pub fn with_box(mut self, width: u32, height: u32) -> Self {
        self.set_box(width, height);
        self
    }

    /// Sets the orientation of the entry at `index`.
    ///
    /// # Panics
    /// Panics when asked to rotate an entry of an instance that does not
    /// allow rotation.
    pub fn set_rotation(&mut self, index: usize, rotated: bool) {
        assert!(
            self.allow_rotation || !rotated,
            "illegal rotation of entry {}: instance does not allow rotation",
            self.entries[index].id()
        );
        self.entries[index].set_rotated(rotated);
    }

    /// Flips the orientation of the entry at `index`.
    ///
    /// # Panics
    /// Panics if the instance does not allow rotation.
    pub fn toggle_rotation(&mut self, index: usize) {
        let rotated = !self.entries[index].rotated();
        self.set_rotation(index, rotated);
    }

    /// Places the entry at `index`.
    pub fn set_position(&mut self, index: usize, x: u32, y: u32) {
        self.entries[index].set_position(x, y);
    }

    /// Forgets every position.
    pub fn clear_positions(&mut self) {
        for entry in &mut self.entries {
            entry.clear_position();
        }
    }

    /// Swaps two entries in the placement order.
    pub fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
    }

    /// Reorders entries so that position `i` holds the entry previously at
    /// `order[i]`.
    ///
    /// # Panics
    /// Panics if `order` is not a permutation of `0..size()`.
    pub fn reorder(&mut self, order: &[usize]) {
        assert_eq!(order.len(), self.entries.len(), "order must cover every entry");
        let mut taken: Vec<Option<Entry>> = self.entries.drain(..).map(Some).collect();
        for &index in order {
            let entry = taken[index]
                .take()
                .unwrap_or_else(|| panic!("index {index} appears twice in the order"));
            self.entries.push(entry);
        }
    }

    /// Sorts entries by the given ordering.
    pub fn sort_by_order(&mut self, order: EntryOrder) {
        self.entries.sort_by(|a, b| order.compare(a, b));
    }

    /// Sorts entries by id, the output order.
    pub fn sort_by_id(&mut self) {
        self.sort_by_order(EntryOrder::Id);
    }

    /// Re-orients every entry according to the policy.
    ///
    /// Entries that would exceed `max_height` in the requested orientation
    /// keep (or take) the orientation that fits. Instances that forbid
    /// rotation are left untouched.
    pub fn apply_rotation_policy<R: Rng + ?Sized>(
        &mut self,
        policy: RotationPolicy,
        rng: &mut R,
        max_height: Option<u32>,
    ) {
        if !self.allow_rotation {
            return;
        }
        for entry in &mut self.entries {
            let mut rotate = policy.wants_rotation(entry, rng);
            if let Some(limit) = max_height {
                let height = if rotate {
                    entry.raw_width()
                } else {
                    entry.raw_height()
                };
                if height > limit {
                    rotate = !rotate;
                }
            }
            entry.set_rotated(rotate);
        }
    }

    /// Total area of all entries.
    pub fn total_area(&self) -> u64 {
        self.entries.iter().map(|e| e.area()).sum()
    }

    /// Largest effective width.
    pub fn widest(&self) -> u32 {
        self.entries.iter().map(|e| e.effective_width()).max().unwrap_or(0)
    }

    /// Largest effective height.
    pub fn tallest(&self) -> u32 {
        self.entries.iter().map(|e| e.effective_height()).max().unwrap_or(0)
    }

    /// Smallest box width any packing can have, whatever the orientations.
    pub fn min_feasible_width(&self) -> u32 {
        self.entries
            .iter()
            .map(|e| {
                if self.allow_rotation {
                    self.narrowest_fit(e)
                } else {
                    e.raw_width()
                }
            })
            .max()
            .unwrap_or(0)
    }

    /// Smallest box height any packing can have, whatever the orientations.
    pub fn min_feasible_height(&self) -> u32 {
        self.entries
            .iter()
            .map(|e| {
                if self.allow_rotation {
                    e.raw_width().min(e.raw_height())
                } else {
                    e.raw_height()
                }
            })
            .max()
            .unwrap_or(0)
    }

    // With a fixed height, a long entry may be forced to lie down, which
    // makes its longer side the narrowest width it can take.
    fn narrowest_fit(&self, entry: &Entry) -> u32 {
        let short = entry.raw_width().min(entry.raw_height());
        let long = entry.raw_width().max(entry.raw_height());
        match self.fixed_height {
            Some(limit) if long > limit => long,
            _ => short,
        }
    }

    /// Extent of all placed entries, measured from the origin.
    pub fn placed_extent(&self) -> (u32, u32) {
        self.entries
            .iter()
            .filter_map(Entry::placed_rect)
            .fold((0, 0), |(w, h), r| (w.max(r.right()), h.max(r.top())))
    }

    /// Shrinks the working box to the extent of the placed entries.
    pub fn shrink_to_fit(&mut self) {
        let (w, h) = self.placed_extent();
        self.width = w;
        self.height = h;
    }

    /// Returns true if every entry has a position.
    pub fn is_fully_placed(&self) -> bool {
        self.entries.iter().all(Entry::is_placed)
    }

    /// Mirror image across the main diagonal: box sides, entry sides and
    /// coordinates swap. The fixed height, if any, is kept as a problem
    /// parameter and no longer describes the box.
    pub fn transposed(&self) -> Instance {
        Instance {
            width: self.height,
            height: self.width,
            entries: self.entries.iter().map(Entry::transposed).collect(),
            ..self.clone_header()
        }
    }

    /// Checks that the instance can be packed at all.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::InvalidInstance("instance has no rectangles".into()));
        }
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.raw_width() == 0 || e.raw_height() == 0)
        {
            return Err(Error::InvalidInstance(format!(
                "rectangle {} has a zero side",
                entry.id()
            )));
        }
        if let Some(limit) = self.fixed_height {
            if limit == 0 {
                return Err(Error::InvalidInstance("fixed height is zero".into()));
            }
            let too_tall = self.entries.iter().find(|e| {
                let shortest = if self.allow_rotation {
                    e.raw_width().min(e.raw_height())
                } else {
                    e.raw_height()
                };
                shortest > limit
            });
            if let Some(entry) = too_tall {
                return Err(Error::InvalidInstance(format!(
                    "rectangle {} does not fit the fixed height {}",
                    entry.id(),
                    limit
                )));
            }
        }
        let mut seen = HashSet::with_capacity(self.entries.len());
        if let Some(entry) = self.entries.iter().find(|e| !seen.insert(e.id())) {
            return Err(Error::InvalidInstance(format!(
                "rectangle id {} occurs twice",
                entry.id()
            )));
        }
        Ok(())
    }

    /// Checks the packing properties of a placed instance: every entry is
    /// placed inside the box, no two entries overlap, ids are unique and no
    /// entry is rotated unless rotation is allowed.
    pub fn verify_packing(&self) -> std::result::Result<(), PackingViolation> {
        let bounds = Rect::sized(self.width, self.height);
        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut rects: Vec<(Rect, EntryId)> = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            if !seen.insert(entry.id()) {
                return Err(PackingViolation::DuplicateId(entry.id()));
            }
            if entry.rotated() && !self.allow_rotation {
                return Err(PackingViolation::IllegalRotation(entry.id()));
            }
            let rect = entry
                .placed_rect()
                .ok_or(PackingViolation::Unplaced(entry.id()))?;
            if !bounds.contains(&rect) {
                return Err(PackingViolation::OutOfBounds(
                    entry.id(),
                    self.width,
                    self.height,
                ));
            }
            rects.push((rect, entry.id()));
        }

        // Sweep along x: only rectangles whose x-ranges overlap can collide.
        rects.sort_by_key(|(r, _)| (r.x, r.y));
        for i in 0..rects.len() {
            let (a, a_id) = rects[i];
            for &(b, b_id) in &rects[i + 1..] {
                if b.x >= a.right() {
                    break;
                }
                if a.intersects(&b) {
                    return Err(PackingViolation::Overlap(a_id.min(b_id), a_id.max(b_id)));
                }
            }
        }
        Ok(())
    }

    /// Checks that this instance holds exactly the entries of `original`
    /// (same ids, same raw sizes), in addition to [`Instance::verify_packing`].
    pub fn verify_matches(&self, original: &Instance) -> std::result::Result<(), PackingViolation> {
        if self.size() != original.size() {
            return Err(PackingViolation::CountMismatch {
                expected: original.size(),
                found: self.size(),
            });
        }
        for entry in original.entries() {
            let placed = self
                .index_of(entry.id())
                .map(|i| &self.entries[i])
                .ok_or(PackingViolation::Unplaced(entry.id()))?;
            if placed.raw_width() != entry.raw_width() || placed.raw_height() != entry.raw_height()
            {
                return Err(PackingViolation::CountMismatch {
                    expected: original.size(),
                    found: self.size(),
                });
            }
        }
        self.verify_packing()
    }
}
