//! Generation-stamped arena for packer-internal node graphs.
//!
//! Free-space structures link their nodes in every direction. Nodes live in
//! an [`Arena`] and refer to each other through [`Handle`]s; a handle
//! carries the generation of the slot it was issued for, so a link to a
//! node that has since been removed (or to a node of a previous run, after
//! [`Arena::clear`]) resolves to `None` instead of aliasing a newer node.

use std::ops::{Index, IndexMut};

/// Reference to a node in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Slot index, stable while the node is live.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage with generation-checked handles.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    generation: u32,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty arena with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            generation: 0,
            len: 0,
        }
    }

    /// Stores a value and returns its handle.
    pub fn alloc(&mut self, value: T) -> Handle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = self.generation;
            slot.value = Some(value);
            return Handle {
                index,
                generation: self.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: self.generation,
            value: Some(value),
        });
        Handle {
            index,
            generation: self.generation,
        }
    }

    /// Removes the value behind `handle`; stale handles yield `None`.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        // a reused slot must not match handles issued before the removal
        self.generation = self.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(value)
    }

    /// Returns the value behind `handle` if it is still live.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Mutable variant of [`Arena::get`].
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Returns true if `handle` refers to a live node.
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Drops every node; all handles issued so far become stale.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no node is live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over live nodes with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Handle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }
}

impl<T> Index<Handle> for Arena<T> {
    type Output = T;

    fn index(&self, handle: Handle) -> &T {
        self.get(handle)
            .unwrap_or_else(|| panic!("stale arena handle {:?}", handle))
    }
}

impl<T> IndexMut<Handle> for Arena<T> {
    fn index_mut(&mut self, handle: Handle) -> &mut T {
        self.get_mut(handle)
            .unwrap_or_else(|| panic!("stale arena handle {:?}", handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_get() {
        let mut arena = Arena::new();
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        assert_eq!(arena[a], "a");
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_removed_handle_is_stale_after_reuse() {
        let mut arena = Arena::new();
        let a = arena.alloc(1);
        assert_eq!(arena.remove(a), Some(1));
        let b = arena.alloc(2);
        assert_eq!(a.index(), b.index());
        assert!(arena.get(a).is_none());
        assert_eq!(arena[b], 2);
        assert_eq!(arena.remove(a), None);
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut arena = Arena::new();
        let a = arena.alloc(1);
        arena.clear();
        assert!(arena.is_empty());
        let b = arena.alloc(2);
        assert!(!arena.contains(a));
        assert!(arena.contains(b));
        assert_eq!(arena.iter().count(), 1);
    }
}
