//! One group of tracked allocations.
//!
//! An [`Arena`] pairs a [`PointerTable`] with an optional label. Callers
//! reach its allocation operations through the owning
//! [`Registry`](crate::Registry), which supplies the raw allocator and
//! checks block ownership before anything here runs.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use crate::raw::{self, RawAllocator};
use crate::table::PointerTable;

/// A group of allocations released together.
#[derive(Debug)]
pub struct Arena {
    table: PointerTable,
    label: Option<String>,
}

impl Arena {
    pub(crate) fn new(label: Option<String>) -> Self {
        Self {
            table: PointerTable::new(),
            label,
        }
    }

    /// The name given at creation, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Number of outstanding blocks.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no blocks are outstanding.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Capacity of the underlying pointer table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Whether the block starting at `ptr` is tracked here.
    pub fn contains(&self, ptr: *const u8) -> bool {
        NonNull::new(ptr.cast_mut()).is_some_and(|p| self.table.contains(p))
    }

    /// The pointer table.
    pub fn table(&self) -> &PointerTable {
        &self.table
    }

    /// Bytes used for bookkeeping (not counting the blocks themselves).
    pub fn memory_bytes(&self) -> usize {
        self.table.memory_bytes()
    }

    pub(crate) fn find(&self, ptr: NonNull<u8>) -> Option<usize> {
        self.table.find(ptr)
    }

    /// Obtain `size` bytes and start tracking them.
    pub(crate) fn allocate<A: RawAllocator>(&mut self, raw: &mut A, size: usize) -> NonNull<u8> {
        self.table.reserve_for_one_more();
        let ptr = raw
            .allocate(size)
            .unwrap_or_else(|| raw::exhausted("allocate", size));
        self.table.insert(ptr);
        ptr
    }

    /// Obtain `count * size` zeroed bytes and start tracking them.
    pub(crate) fn zero_allocate<A: RawAllocator>(
        &mut self,
        raw: &mut A,
        count: usize,
        size: usize,
    ) -> NonNull<u8> {
        self.table.reserve_for_one_more();
        let ptr = raw
            .zero_allocate(count, size)
            .unwrap_or_else(|| raw::exhausted("zero_allocate", count.saturating_mul(size)));
        self.table.insert(ptr);
        ptr
    }

    /// Resize the tracked block at `index` to a non-zero `size`.
    pub(crate) fn resize<A: RawAllocator>(
        &mut self,
        raw: &mut A,
        index: usize,
        size: usize,
    ) -> NonNull<u8> {
        debug_assert!(size != 0, "resize to zero is a release");
        let old = self.table.get(index);
        // SAFETY: `old` comes from this arena's table, so it is a live block
        // from `raw`. On failure we abort before the table could go stale.
        let ptr = unsafe { raw.reallocate(old, size) }
            .unwrap_or_else(|| raw::exhausted("reallocate", size));
        self.table.replace(index, ptr);
        ptr
    }

    /// Resize an untracked block (or allocate, for `None`) and track the result.
    ///
    /// The registry only calls this with blocks that carry no owner, i.e.
    /// ones the caller vouched for through `Block::from_raw`.
    pub(crate) fn adopt<A: RawAllocator>(
        &mut self,
        raw: &mut A,
        ptr: Option<NonNull<u8>>,
        size: usize,
    ) -> NonNull<u8> {
        self.table.reserve_for_one_more();
        // SAFETY: `ptr` is either None or was wrapped by `Block::from_raw`,
        // whose contract makes it a live, untracked block from `raw`.
        let ptr = unsafe { raw.reallocate(ptr, size) }
            .unwrap_or_else(|| raw::exhausted("reallocate", size));
        self.table.insert(ptr);
        ptr
    }

    /// Release the tracked block at `index` and stop tracking it.
    pub(crate) fn release<A: RawAllocator>(&mut self, raw: &mut A, index: usize) {
        let ptr = self.table.remove(index);
        // SAFETY: `ptr` was tracked by this arena, so it is live and owned
        // here; it has just left the table and cannot be released twice.
        unsafe { raw.release(ptr) };
    }

    /// Release every outstanding block and the table's storage.
    ///
    /// Returns the number of blocks released.
    pub(crate) fn release_all<A: RawAllocator>(&mut self, raw: &mut A) -> usize {
        let entries = self.table.take_all();
        let count = entries.len();
        for ptr in entries {
            // SAFETY: every entry is a distinct live block owned by this
            // arena, and the table no longer refers to it.
            unsafe { raw.release(ptr) };
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::SystemAllocator;

    #[test]
    fn allocate_tracks_block() {
        let mut raw = SystemAllocator;
        let mut arena = Arena::new(None);
        let ptr = arena.allocate(&mut raw, 24);
        assert_eq!(arena.len(), 1);
        assert!(arena.contains(ptr.as_ptr()));
        assert_eq!(arena.release_all(&mut raw), 1);
    }

    #[test]
    fn zero_allocate_returns_zeroed_memory() {
        let mut raw = SystemAllocator;
        let mut arena = Arena::new(None);
        let ptr = arena.zero_allocate(&mut raw, 8, 8);
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 64) };
        assert!(bytes.iter().all(|&b| b == 0));
        arena.release_all(&mut raw);
    }

    #[test]
    fn resize_updates_tracked_address() {
        let mut raw = SystemAllocator;
        let mut arena = Arena::new(None);
        let old = arena.allocate(&mut raw, 8);
        unsafe { old.as_ptr().write_bytes(7, 8) };
        let index = arena.find(old).unwrap();
        let new = arena.resize(&mut raw, index, 1 << 16);
        assert_eq!(arena.len(), 1);
        assert!(arena.contains(new.as_ptr()));
        assert_eq!(unsafe { *new.as_ptr().add(7) }, 7);
        arena.release_all(&mut raw);
    }

    #[test]
    fn release_applies_table_policy() {
        let mut raw = SystemAllocator;
        let mut arena = Arena::new(None);
        let ptrs: Vec<_> = (0..4).map(|_| arena.allocate(&mut raw, 16)).collect();
        for ptr in ptrs {
            let index = arena.find(ptr).unwrap();
            arena.release(&mut raw, index);
        }
        assert!(arena.is_empty());
        assert_eq!(arena.capacity(), 0);
    }

    #[test]
    fn adopt_tracks_external_block() {
        let mut raw = SystemAllocator;
        let mut arena = Arena::new(Some("adopter".into()));
        let external = raw.allocate(8).unwrap();
        let ptr = arena.adopt(&mut raw, Some(external), 32);
        assert!(arena.contains(ptr.as_ptr()));
        assert_eq!(arena.label(), Some("adopter"));
        arena.release_all(&mut raw);
    }

    #[test]
    fn null_pointer_is_never_contained() {
        let arena = Arena::new(None);
        assert!(!arena.contains(std::ptr::null()));
    }
}
