//! The per-arena table of outstanding allocations.
//!
//! [`PointerTable`] is a growable array of block addresses with an explicit,
//! logical capacity. Growth doubles (starting at one slot); removal is a
//! swap-remove that halves the capacity once occupancy drops below a
//! quarter, and releases the storage entirely when the table empties. The
//! quarter threshold keeps a table that hovers around a power of two from
//! reallocating on every insert/remove pair.

use std::ptr::NonNull;

use crate::raw;

/// Addresses of the blocks one arena currently tracks.
///
/// Entry order carries no meaning. Membership tests are a linear scan:
/// arenas are expected to track modest numbers of live blocks at a time.
///
/// Invariants: `len() <= capacity()`, no address appears twice, and an
/// empty table that has seen a removal holds no storage.
#[derive(Debug, Default)]
pub struct PointerTable {
    entries: Vec<NonNull<u8>>,
    /// Logical capacity; the backing `Vec` reserves at least this much.
    capacity: usize,
}

// SAFETY: the table only stores addresses; it never dereferences them. The
// blocks are exclusively owned by the arena holding this table and may be
// released from any thread.
#[allow(unsafe_code)]
unsafe impl Send for PointerTable {}

impl PointerTable {
    /// Create an empty table with no storage.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            capacity: 0,
        }
    }

    /// Number of tracked addresses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table tracks nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of slots currently reserved.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes reserved for bookkeeping.
    pub fn memory_bytes(&self) -> usize {
        self.capacity * std::mem::size_of::<NonNull<u8>>()
    }

    /// Position of `ptr` in the table, if tracked.
    pub fn find(&self, ptr: NonNull<u8>) -> Option<usize> {
        self.entries.iter().position(|&p| p == ptr)
    }

    /// The address at `index`.
    pub fn get(&self, index: usize) -> Option<NonNull<u8>> {
        self.entries.get(index).copied()
    }

    /// Whether `ptr` is tracked.
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.find(ptr).is_some()
    }

    /// Tracked addresses, in table order.
    pub fn iter(&self) -> impl Iterator<Item = NonNull<u8>> + '_ {
        self.entries.iter().copied()
    }

    /// Make room for one more entry, doubling the capacity when full.
    ///
    /// Aborts the process if the storage cannot grow.
    pub(crate) fn reserve_for_one_more(&mut self) {
        if self.entries.len() < self.capacity {
            return;
        }
        let slot_bytes = std::mem::size_of::<NonNull<u8>>();
        let new_capacity = match self.capacity {
            0 => 1,
            cap => cap
                .checked_mul(2)
                .unwrap_or_else(|| raw::exhausted("pointer table growth", usize::MAX)),
        };
        let additional = new_capacity - self.entries.len();
        if self.entries.try_reserve_exact(additional).is_err() {
            raw::exhausted(
                "pointer table growth",
                new_capacity.saturating_mul(slot_bytes),
            );
        }
        self.capacity = new_capacity;
    }

    /// Append `ptr`. Callers reserve first.
    pub(crate) fn insert(&mut self, ptr: NonNull<u8>) {
        debug_assert!(self.entries.len() < self.capacity, "insert without reserve");
        debug_assert!(!self.contains(ptr), "address tracked twice");
        self.entries.push(ptr);
    }

    /// Overwrite the entry at `index`, e.g. after a block moved.
    pub(crate) fn replace(&mut self, index: usize, ptr: NonNull<u8>) {
        self.entries[index] = ptr;
    }

    /// Swap-remove the entry at `index` and apply the shrink policy.
    pub(crate) fn remove(&mut self, index: usize) -> NonNull<u8> {
        let removed = self.entries.swap_remove(index);
        let count = self.entries.len();
        if count == 0 {
            self.entries = Vec::new();
            self.capacity = 0;
        } else if count < self.capacity / 4 {
            self.capacity = (self.capacity / 2).max(count);
            self.entries.shrink_to(self.capacity);
        }
        removed
    }

    /// Empty the table, releasing its storage, and hand back every entry.
    pub(crate) fn take_all(&mut self) -> Vec<NonNull<u8>> {
        self.capacity = 0;
        std::mem::take(&mut self.entries)
    }
}
