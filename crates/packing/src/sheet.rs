//! Space-partition ("sheet") packer.
//!
//! The box is a tree of regions. A region's area is the union of its
//! children and its `filled` rectangles; leaves are completely free. When
//! an entry is committed, every leaf it touches is split into up to three
//! columns (left of the entry, the entry's column, right of it), the
//! entry's column keeps the entry in its `filled` list and gets a child
//! below and above it. A region that ends up with no free child is full:
//! its parent drops it and folds its bounds into its own `filled` list,
//! recursively.
//!
//! Two half-line cuts follow each commit: one leftwards along the entry's
//! top edge and one downwards along its right edge. They split the free
//! leaves they cross, so the corners next to the entry become leaf
//! corners and thus placement candidates.
//!
//! Candidates are the lower-left corners of free leaves, tried in `(x, y)`
//! order. Every structural edit can be recorded in an undo log, which the
//! packer uses to look ahead at both orientations of an entry.

use crate::arena::{Arena, Handle};
use rectpack_core::{Instance, Packer, Rect, SearchContext, SearchableEntry};

const LEFT: usize = 0;
const DOWN: usize = 1;
const UP: usize = 2;
const RIGHT: usize = 3;

#[derive(Debug, Clone)]
struct Region {
    bounds: Rect,
    filled: Vec<Rect>,
    children: Vec<Handle>,
    parent: Option<Handle>,
    // left, down, up, right; may point to a coarser region
    neighbors: [Option<Handle>; 4],
    full: bool,
}

impl Region {
    fn new(bounds: Rect, parent: Option<Handle>) -> Self {
        Self {
            bounds,
            filled: Vec::new(),
            children: Vec::new(),
            parent,
            neighbors: [None; 4],
            full: false,
        }
    }

    fn is_free_leaf(&self) -> bool {
        !self.full && self.children.is_empty() && self.filled.is_empty()
    }
}

#[derive(Debug)]
enum Action {
    Alloc(Handle),
    Restore(Handle, Box<Region>),
}

/// Region tree of one packing attempt.
#[derive(Debug)]
struct SheetTree {
    regions: Arena<Region>,
    root: Handle,
    log: Vec<Action>,
    recording: bool,
}

impl SheetTree {
    fn new(width: u32, height: u32) -> Self {
        let mut regions = Arena::new();
        let root = regions.alloc(Region::new(Rect::sized(width, height), None));
        Self {
            regions,
            root,
            log: Vec::new(),
            recording: false,
        }
    }

    fn bounds(&self) -> Rect {
        self.regions[self.root].bounds
    }

    /// Starts recording edits; returns the mark to roll back to.
    fn checkpoint(&mut self) -> usize {
        self.recording = true;
        self.log.len()
    }

    /// Reverts every edit recorded after `mark`, newest first.
    fn rollback(&mut self, mark: usize) {
        while self.log.len() > mark {
            match self.log.pop() {
                Some(Action::Alloc(handle)) => {
                    self.regions.remove(handle);
                }
                Some(Action::Restore(handle, region)) => {
                    self.regions[handle] = *region;
                }
                None => break,
            }
        }
    }

    /// Stops recording and forgets the log.
    fn commit(&mut self) {
        self.recording = false;
        self.log.clear();
    }

    fn save(&mut self, handle: Handle) {
        if self.recording {
            let snapshot = Box::new(self.regions[handle].clone());
            self.log.push(Action::Restore(handle, snapshot));
        }
    }

    fn alloc(&mut self, region: Region) -> Handle {
        let handle = self.regions.alloc(region);
        if self.recording {
            self.log.push(Action::Alloc(handle));
        }
        handle
    }

    /// Lower-left corners of all free leaves in `(x, y)` order.
    fn candidates(&self) -> Vec<(u32, u32)> {
        let mut corners = Vec::new();
        let mut stack = vec![self.root];
        while let Some(handle) = stack.pop() {
            let region = &self.regions[handle];
            if region.is_free_leaf() {
                corners.push((region.bounds.x, region.bounds.y));
            }
            stack.extend(region.children.iter().copied());
        }
        corners.sort_unstable();
        corners.dedup();
        corners
    }

    /// Free leaves covering `rect`, or `None` if `rect` leaves the box or
    /// touches a filled area.
    fn check(&self, rect: &Rect) -> Option<Vec<Handle>> {
        if rect.is_empty() || !self.bounds().contains(rect) {
            return None;
        }
        let mut leaves = Vec::new();
        if self.collect(self.root, rect, &mut leaves) {
            Some(leaves)
        } else {
            None
        }
    }

    fn collect(&self, handle: Handle, rect: &Rect, leaves: &mut Vec<Handle>) -> bool {
        let region = &self.regions[handle];
        if !region.bounds.intersects(rect) {
            return true;
        }
        if region.filled.iter().any(|f| f.intersects(rect)) {
            return false;
        }
        if region.children.is_empty() {
            leaves.push(handle);
            return true;
        }
        region
            .children
            .iter()
            .all(|&child| self.collect(child, rect, leaves))
    }

    /// Places `width × height` at the first admissible candidate.
    fn put(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        for (x, y) in self.candidates() {
            let rect = Rect::new(x, y, width, height);
            if let Some(leaves) = self.check(&rect) {
                self.fill(&rect, &leaves);
                return Some((x, y));
            }
        }
        None
    }

    fn fill(&mut self, rect: &Rect, leaves: &[Handle]) {
        for &leaf in leaves {
            let bounds = self.regions[leaf].bounds;
            if let Some(part) = bounds.intersection(rect) {
                self.occupy(leaf, part);
            }
        }
        self.cut_left(rect);
        self.cut_down(rect);
    }

    /// Splits a free leaf around `part` and marks `part` filled.
    fn occupy(&mut self, leaf: Handle, part: Rect) {
        let bounds = self.regions[leaf].bounds;
        let column = Rect::new(part.x, bounds.y, part.width, bounds.height);

        let target = if part.x == bounds.x && part.right() == bounds.right() {
            leaf
        } else {
            let mut columns = Vec::with_capacity(3);
            if part.x > bounds.x {
                columns.push(Rect::new(bounds.x, bounds.y, part.x - bounds.x, bounds.height));
            }
            columns.push(column);
            if part.right() < bounds.right() {
                columns.push(Rect::new(
                    part.right(),
                    bounds.y,
                    bounds.right() - part.right(),
                    bounds.height,
                ));
            }
            let children = self.attach(leaf, &columns);
            let position = usize::from(part.x > bounds.x);
            children[position]
        };

        let mut rows = Vec::with_capacity(2);
        if part.y > column.y {
            rows.push(Rect::new(part.x, column.y, part.width, part.y - column.y));
        }
        if part.top() < column.top() {
            rows.push(Rect::new(part.x, part.top(), part.width, column.top() - part.top()));
        }
        self.save(target);
        self.regions[target].filled.push(part);
        if !rows.is_empty() {
            self.attach(target, &rows);
        }
        self.propagate_full(target);
    }

    /// Gives `parent` children with the given bounds, linking siblings to
    /// each other and outer sides to the parent's neighbors.
    fn attach(&mut self, parent: Handle, parts: &[Rect]) -> Vec<Handle> {
        self.save(parent);
        let outer = self.regions[parent].neighbors;
        let handles: Vec<Handle> = parts
            .iter()
            .map(|&bounds| self.alloc(Region::new(bounds, Some(parent))))
            .collect();
        for (i, &handle) in handles.iter().enumerate() {
            let me = parts[i];
            let mut neighbors = outer;
            for (j, other) in parts.iter().enumerate() {
                if i == j {
                    continue;
                }
                if other.right() == me.x {
                    neighbors[LEFT] = Some(handles[j]);
                } else if me.right() == other.x {
                    neighbors[RIGHT] = Some(handles[j]);
                } else if other.top() == me.y {
                    neighbors[DOWN] = Some(handles[j]);
                } else if me.top() == other.y {
                    neighbors[UP] = Some(handles[j]);
                }
            }
            self.regions[handle].neighbors = neighbors;
        }
        self.regions[parent].children.extend(handles.iter().copied());
        handles
    }

    /// Folds full regions into their parents, bottom up.
    fn propagate_full(&mut self, start: Handle) {
        let mut current = start;
        loop {
            let region = &self.regions[current];
            if !region.children.is_empty() || region.filled.is_empty() || region.full {
                return;
            }
            let bounds = region.bounds;
            let parent = region.parent;
            self.save(current);
            self.regions[current].full = true;
            let Some(parent) = parent else {
                return;
            };
            self.save(parent);
            let node = &mut self.regions[parent];
            node.children.retain(|&child| child != current);
            node.filled.push(bounds);
            current = parent;
        }
    }

    /// Free leaf containing cell `(x, y)`, searched from `hint` upwards and
    /// then down again.
    fn resolve(&self, hint: Option<Handle>, x: u32, y: u32) -> Option<Handle> {
        if !self.bounds().contains_point(x, y) {
            return None;
        }
        let mut current = hint
            .filter(|&h| self.regions.contains(h))
            .unwrap_or(self.root);
        while current != self.root {
            let region = &self.regions[current];
            if region.bounds.contains_point(x, y) && !region.full {
                break;
            }
            current = region.parent.unwrap_or(self.root);
        }
        loop {
            let region = &self.regions[current];
            if region.full || region.filled.iter().any(|f| f.contains_point(x, y)) {
                return None;
            }
            match region
                .children
                .iter()
                .copied()
                .find(|&child| self.regions[child].bounds.contains_point(x, y))
            {
                Some(child) => current = child,
                None if region.children.is_empty() => return Some(current),
                None => return None,
            }
        }
    }

    /// Half-line cut from the entry's top-left corner towards x = 0.
    fn cut_left(&mut self, rect: &Rect) {
        let line = rect.top();
        if line >= self.bounds().height {
            return;
        }
        let mut x = rect.x;
        let mut hint = None;
        while x > 0 {
            let Some(leaf) = self.resolve(hint, x - 1, line) else {
                break;
            };
            let bounds = self.regions[leaf].bounds;
            if bounds.y < line {
                self.attach(
                    leaf,
                    &[
                        Rect::new(bounds.x, bounds.y, bounds.width, line - bounds.y),
                        Rect::new(bounds.x, line, bounds.width, bounds.top() - line),
                    ],
                );
            }
            x = bounds.x;
            hint = self.regions[leaf].neighbors[LEFT];
        }
    }

    /// Half-line cut from the entry's bottom-right corner towards y = 0.
    fn cut_down(&mut self, rect: &Rect) {
        let line = rect.right();
        if line >= self.bounds().width {
            return;
        }
        let mut y = rect.y;
        let mut hint = None;
        while y > 0 {
            let Some(leaf) = self.resolve(hint, line, y - 1) else {
                break;
            };
            let bounds = self.regions[leaf].bounds;
            if bounds.x < line {
                self.attach(
                    leaf,
                    &[
                        Rect::new(bounds.x, bounds.y, line - bounds.x, bounds.height),
                        Rect::new(line, bounds.y, bounds.right() - line, bounds.height),
                    ],
                );
            }
            y = bounds.y;
            hint = self.regions[leaf].neighbors[DOWN];
        }
    }

    /// Total free area, summed over free leaves.
    #[cfg(test)]
    fn free_area(&self) -> u64 {
        self.regions
            .iter()
            .filter(|(handle, region)| region.is_free_leaf() && self.is_attached(*handle))
            .map(|(_, region)| region.bounds.area())
            .sum()
    }

    #[cfg(test)]
    fn is_attached(&self, handle: Handle) -> bool {
        let mut current = handle;
        while let Some(parent) = self.regions[current].parent {
            if !self.regions[parent].children.contains(&current) {
                return false;
            }
            current = parent;
        }
        current == self.root
    }
}

/// Packer over a space-partition tree.
///
/// With look-ahead enabled (and rotation allowed), each non-square entry is
/// tentatively placed in both orientations and the one giving the smaller
/// placed extent is kept. Without it, entries keep the orientation they
/// come with.
#[derive(Debug, Clone, Default)]
pub struct SheetPacker {
    lookahead: bool,
}

impl SheetPacker {
    /// Creates a sheet packer that keeps the given orientations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the orientation look-ahead.
    pub fn with_lookahead(mut self, enabled: bool) -> Self {
        self.lookahead = enabled;
        self
    }

    fn score(extent: (u32, u32), x: u32, y: u32, w: u32, h: u32) -> (u64, u32) {
        let width = extent.0.max(x + w);
        let height = extent.1.max(y + h);
        (width as u64 * height as u64, width)
    }
}

impl Packer for SheetPacker {
    fn name(&self) -> &'static str {
        "sheet"
    }

    fn pack(&mut self, instance: &mut Instance, ctx: &SearchContext) -> Option<Instance> {
        ctx.record_pack();
        let mut placed = instance.clone();
        placed.clear_positions();
        if placed.is_empty() {
            return Some(placed);
        }
        if placed.width() == 0 || placed.height() == 0 {
            return None;
        }

        let mut tree = SheetTree::new(placed.width(), placed.height());
        let mut extent = (0u32, 0u32);
        for index in 0..placed.size() {
            if ctx.tick() {
                return None;
            }
            let (w, h) = placed.entry(index).size();

            if self.lookahead && placed.allows_rotation() && w != h {
                let mark = tree.checkpoint();
                let upright = tree.put(w, h).map(|(x, y)| Self::score(extent, x, y, w, h));
                tree.rollback(mark);
                let turned = tree.put(h, w).map(|(x, y)| Self::score(extent, x, y, h, w));
                tree.rollback(mark);
                tree.commit();
                match (upright, turned) {
                    (Some(a), Some(b)) if b < a => placed.toggle_rotation(index),
                    (None, Some(_)) => placed.toggle_rotation(index),
                    _ => {}
                }
            }

            let (w, h) = placed.entry(index).size();
            let (x, y) = tree.put(w, h)?;
            placed.set_position(index, x, y);
            extent = (extent.0.max(x + w), extent.1.max(y + h));
        }
        Some(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(instance: &mut Instance, lookahead: bool) -> Option<Instance> {
        SheetPacker::new()
            .with_lookahead(lookahead)
            .pack(instance, &SearchContext::unbounded())
    }

    #[test]
    fn test_single_entry_at_origin() {
        let mut instance = Instance::from_dimensions(false, None, &[(5, 10)]).with_box(10, 10);
        let placed = pack(&mut instance, false).unwrap();
        assert_eq!(placed.entry(0).position(), Some((0, 0)));
    }

    #[test]
    fn test_too_large_fails() {
        let mut instance = Instance::from_dimensions(false, None, &[(5, 10)]).with_box(2, 2);
        assert!(pack(&mut instance, false).is_none());
    }

    #[test]
    fn test_perfect_fill() {
        let mut instance =
            Instance::from_dimensions(false, None, &[(2, 6), (2, 6), (4, 3), (4, 3)])
                .with_box(8, 6);
        let placed = pack(&mut instance, false).unwrap();
        assert!(placed.verify_packing().is_ok());
        assert_eq!(placed.total_area(), placed.area());
    }

    #[test]
    fn test_no_overlap_on_mixed_sizes() {
        let dims = [(3, 5), (4, 2), (1, 7), (6, 3), (2, 2), (5, 1), (3, 3), (2, 4)];
        let mut instance = Instance::from_dimensions(false, None, &dims).with_box(12, 12);
        let placed = pack(&mut instance, false).unwrap();
        assert!(placed.verify_packing().is_ok());
    }

    #[test]
    fn test_lookahead_turns_entry() {
        // a 1x4 bar only fits lying down in a 4x2 box
        let mut instance = Instance::from_dimensions(true, None, &[(1, 4)]).with_box(4, 2);
        let placed = pack(&mut instance, true).unwrap();
        assert!(placed.entry(0).rotated());
        assert!(placed.verify_packing().is_ok());
        assert!(!instance.entry(0).rotated());
    }

    #[test]
    fn test_rollback_restores_tree() {
        let mut tree = SheetTree::new(6, 6);
        tree.put(2, 3).unwrap();
        let before = tree.candidates();
        let free_before = tree.free_area();

        let mark = tree.checkpoint();
        tree.put(3, 3).unwrap();
        tree.put(1, 6).unwrap();
        assert_ne!(tree.candidates(), before);
        tree.rollback(mark);
        tree.commit();

        assert_eq!(tree.candidates(), before);
        assert_eq!(tree.free_area(), free_before);
        assert_eq!(free_before, 36 - 6);
    }

    #[test]
    fn test_full_tree_rejects_everything() {
        let mut tree = SheetTree::new(2, 2);
        assert_eq!(tree.put(2, 2), Some((0, 0)));
        assert!(tree.candidates().is_empty());
        assert_eq!(tree.put(1, 1), None);
        assert_eq!(tree.resolve(None, 0, 0), None);
    }
}
