//! Guillotine shelf packer.
//!
//! The box is kept as a grid of spaces. Placing an entry cuts the grid
//! along the entry's right edge (through the whole column) and along its
//! top edge (through the whole row), so every space has exactly one
//! neighbor per side and the entry covers a block of whole spaces, which
//! are then marked filled. Free spaces are scanned in `(x, y)` order and
//! the first one that admits the entry wins.
//!
//! The packer is greedy and never backtracks. When an entry fits nowhere
//! and the instance allows rotation, the entry's rotation is toggled on the
//! caller's instance before returning `None`, so a retry sees the other
//! orientation.

use crate::arena::{Arena, Handle};
use rectpack_core::{Instance, Packer, Rect, SearchContext, SearchableEntry};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
struct Space {
    rect: Rect,
    filled: bool,
    left: Option<Handle>,
    right: Option<Handle>,
    up: Option<Handle>,
    down: Option<Handle>,
}

impl Space {
    fn new(rect: Rect) -> Self {
        Self {
            rect,
            filled: false,
            left: None,
            right: None,
            up: None,
            down: None,
        }
    }
}

/// Free-space grid of one packing attempt.
#[derive(Debug)]
struct Grid {
    spaces: Arena<Space>,
    free: BTreeSet<(u32, u32, Handle)>,
    origin: Handle,
}

impl Grid {
    fn new(width: u32, height: u32) -> Self {
        let mut spaces = Arena::new();
        let origin = spaces.alloc(Space::new(Rect::sized(width, height)));
        let mut free = BTreeSet::new();
        free.insert((0, 0, origin));
        Self {
            spaces,
            free,
            origin,
        }
    }

    /// First free space (in `(x, y)` order) where a `width × height` block
    /// of free spaces starts.
    fn find(&self, width: u32, height: u32) -> Option<Handle> {
        self.free
            .iter()
            .map(|&(_, _, handle)| handle)
            .find(|&handle| self.admits(handle, width, height))
    }

    /// Walks right through the row, and up through each column of it,
    /// until the requested extent is covered by free spaces.
    fn admits(&self, start: Handle, width: u32, height: u32) -> bool {
        let origin = self.spaces[start].rect;
        let mut column = Some(start);
        while let Some(handle) = column {
            let space = &self.spaces[handle];
            if space.rect.x >= origin.x + width {
                return true;
            }
            let mut cell = Some(handle);
            while let Some(up) = cell {
                let space = &self.spaces[up];
                if space.rect.y >= origin.y + height {
                    break;
                }
                if space.filled {
                    return false;
                }
                cell = space.up;
                if cell.is_none() && space.rect.top() < origin.y + height {
                    return false;
                }
            }
            column = space.right;
            if column.is_none() && space.rect.right() < origin.x + width {
                return false;
            }
        }
        true
    }

    /// Bottom space of the column containing `x`, if `x` is not already a
    /// column boundary.
    fn column_at(&self, x: u32) -> Option<Handle> {
        let mut cursor = Some(self.origin);
        while let Some(handle) = cursor {
            let rect = self.spaces[handle].rect;
            if rect.x == x {
                return None;
            }
            if rect.x < x && x < rect.right() {
                return Some(handle);
            }
            cursor = self.spaces[handle].right;
        }
        None
    }

    /// Leftmost space of the row containing `y`, if `y` is not already a
    /// row boundary.
    fn row_at(&self, y: u32) -> Option<Handle> {
        let mut cursor = Some(self.origin);
        while let Some(handle) = cursor {
            let rect = self.spaces[handle].rect;
            if rect.y == y {
                return None;
            }
            if rect.y < y && y < rect.top() {
                return Some(handle);
            }
            cursor = self.spaces[handle].up;
        }
        None
    }

    /// Cuts the whole column containing `x` in two.
    fn split_column(&mut self, x: u32) {
        let Some(bottom) = self.column_at(x) else {
            return;
        };
        let mut cursor = Some(bottom);
        let mut below: Option<Handle> = None;
        while let Some(handle) = cursor {
            let old = self.spaces[handle].clone();
            let part = Rect::new(x, old.rect.y, old.rect.right() - x, old.rect.height);
            let mut space = Space::new(part);
            space.filled = old.filled;
            space.left = Some(handle);
            space.right = old.right;
            space.down = below;
            let created = self.spaces.alloc(space);

            if let Some(right) = old.right {
                self.spaces[right].left = Some(created);
            }
            if let Some(below) = below {
                self.spaces[below].up = Some(created);
            }
            let node = &mut self.spaces[handle];
            node.rect.width = x - old.rect.x;
            node.right = Some(created);
            if !old.filled {
                self.free.insert((part.x, part.y, created));
            }

            below = Some(created);
            cursor = old.up;
        }
    }

    /// Cuts the whole row containing `y` in two.
    fn split_row(&mut self, y: u32) {
        let Some(leftmost) = self.row_at(y) else {
            return;
        };
        let mut cursor = Some(leftmost);
        let mut previous: Option<Handle> = None;
        while let Some(handle) = cursor {
            let old = self.spaces[handle].clone();
            let part = Rect::new(old.rect.x, y, old.rect.width, old.rect.top() - y);
            let mut space = Space::new(part);
            space.filled = old.filled;
            space.down = Some(handle);
            space.up = old.up;
            space.left = previous;
            let created = self.spaces.alloc(space);

            if let Some(up) = old.up {
                self.spaces[up].down = Some(created);
            }
            if let Some(previous) = previous {
                self.spaces[previous].right = Some(created);
            }
            let node = &mut self.spaces[handle];
            node.rect.height = y - old.rect.y;
            node.up = Some(created);
            if !old.filled {
                self.free.insert((part.x, part.y, created));
            }

            previous = Some(created);
            cursor = old.right;
        }
    }

    /// Fills the block of spaces starting at `start`; the block must have
    /// been admitted by [`Grid::admits`].
    fn fill(&mut self, start: Handle, width: u32, height: u32) -> (u32, u32) {
        let origin = self.spaces[start].rect;
        let right = origin.x + width;
        let top = origin.y + height;
        self.split_column(right);
        self.split_row(top);

        let mut column = Some(start);
        while let Some(handle) = column {
            if self.spaces[handle].rect.x >= right {
                break;
            }
            let mut cell = Some(handle);
            while let Some(current) = cell {
                let space = &mut self.spaces[current];
                if space.rect.y >= top {
                    break;
                }
                space.filled = true;
                let key = (space.rect.x, space.rect.y, current);
                cell = space.up;
                self.free.remove(&key);
            }
            column = self.spaces[handle].right;
        }
        debug_assert!(self.links_consistent());
        (origin.x, origin.y)
    }

    /// Every link has a matching back link.
    fn links_consistent(&self) -> bool {
        self.spaces.iter().all(|(handle, space)| {
            space.right.map_or(true, |r| self.spaces[r].left == Some(handle))
                && space.up.map_or(true, |u| self.spaces[u].down == Some(handle))
        })
    }
}

/// Greedy bottom-left packer over a guillotine grid.
#[derive(Debug, Clone, Default)]
pub struct ShelfPacker;

impl ShelfPacker {
    /// Creates a shelf packer.
    pub fn new() -> Self {
        Self
    }
}

impl Packer for ShelfPacker {
    fn name(&self) -> &'static str {
        "shelf"
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

        let mut grid = Grid::new(placed.width(), placed.height());
        for index in 0..placed.size() {
            if ctx.tick() {
                return None;
            }
            let (w, h) = {
                let entry = placed.entry(index);
                (entry.effective_width(), entry.effective_height())
            };
            match grid.find(w, h) {
                Some(space) => {
                    let (x, y) = grid.fill(space, w, h);
                    placed.set_position(index, x, y);
                }
                None => {
                    if instance.allows_rotation() {
                        instance.toggle_rotation(index);
                    }
                    log::trace!(
                        "{}: entry {} ({}x{}) does not fit {}x{}",
                        ctx.label(),
                        placed.entry(index).id(),
                        w,
                        h,
                        placed.width(),
                        placed.height()
                    );
                    return None;
                }
            }
        }
        Some(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(instance: &mut Instance) -> Option<Instance> {
        ShelfPacker::new().pack(instance, &SearchContext::unbounded())
    }

    #[test]
    fn test_single_entry_at_origin() {
        let mut instance = Instance::from_dimensions(false, None, &[(5, 10)]).with_box(10, 10);
        let placed = pack(&mut instance).unwrap();
        assert_eq!(placed.entry(0).position(), Some((0, 0)));
        assert!(placed.verify_packing().is_ok());
    }

    #[test]
    fn test_fills_columns_bottom_up() {
        let mut instance =
            Instance::from_dimensions(false, None, &[(2, 2), (2, 2), (2, 2)]).with_box(4, 4);
        let placed = pack(&mut instance).unwrap();
        let positions: Vec<_> = placed.entries().iter().map(|e| e.position()).collect();
        assert_eq!(positions, vec![Some((0, 0)), Some((0, 2)), Some((2, 0))]);
        assert!(placed.verify_packing().is_ok());
    }

    #[test]
    fn test_perfect_fit() {
        let mut instance =
            Instance::from_dimensions(false, None, &[(3, 2), (1, 2), (1, 1), (3, 1)])
                .with_box(4, 3);
        let placed = pack(&mut instance).unwrap();
        assert!(placed.verify_packing().is_ok());
        assert_eq!(placed.total_area(), placed.area());
    }

    #[test]
    fn test_failure_toggles_rotation() {
        let mut instance = Instance::from_dimensions(true, None, &[(4, 1)]).with_box(2, 4);
        assert!(pack(&mut instance).is_none());
        assert!(instance.entry(0).rotated());
        let placed = pack(&mut instance).unwrap();
        assert_eq!(placed.entry(0).size(), (1, 4));
    }

    #[test]
    fn test_failure_without_rotation_leaves_entry() {
        let mut instance = Instance::from_dimensions(false, None, &[(5, 10)]).with_box(2, 2);
        assert!(pack(&mut instance).is_none());
        assert!(!instance.entry(0).rotated());
    }
}
