//! Arena identifiers and block handles.
//!
//! An [`ArenaId`] names one arena in a registry. It is generation-scoped:
//! once the arena is destroyed the slot's generation moves on, and the old
//! id stops resolving instead of aliasing whatever arena reuses the slot.
//!
//! A [`Block`] is the caller's handle to one raw allocation. It is move-only
//! so that freeing or resizing a block consumes the handle that named it.

use std::fmt;
use std::ptr::NonNull;

/// Identifies an arena within a [`Registry`](crate::Registry).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId {
    slot: u32,
    generation: u32,
}

impl ArenaId {
    pub(crate) const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Index of the registry slot holding the arena.
    pub fn slot(self) -> u32 {
        self.slot
    }

    /// Generation of the slot when the arena was created.
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Pack into a `u64`: upper 32 bits slot, lower 32 bits generation.
    pub fn to_bits(self) -> u64 {
        ((self.slot as u64) << 32) | (self.generation as u64)
    }

    /// Inverse of [`to_bits`](Self::to_bits).
    pub fn from_bits(bits: u64) -> Self {
        Self {
            slot: (bits >> 32) as u32,
            generation: bits as u32,
        }
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot, self.generation)
    }
}

/// Handle to one raw allocation.
///
/// Blocks handed out by a registry remember the arena that tracks them.
/// Blocks wrapped with [`Block::from_raw`] have no owner; handing one to
/// [`Registry::reallocate`](crate::Registry::reallocate) with a non-zero
/// size puts it under an arena's tracking.
///
/// Dropping a `Block` does not release anything: the memory stays tracked
/// until it is freed or its arena goes away.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct Block {
    ptr: NonNull<u8>,
    owner: Option<ArenaId>,
}

impl Block {
    pub(crate) fn tracked(ptr: NonNull<u8>, owner: ArenaId) -> Self {
        Self {
            ptr,
            owner: Some(owner),
        }
    }

    /// Wrap a pointer obtained directly from the registry's raw allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live allocation returned by the same
    /// [`RawAllocator`](crate::RawAllocator) the registry uses, and must not
    /// be tracked by any arena.
    #[allow(unsafe_code)]
    pub unsafe fn from_raw(ptr: NonNull<u8>) -> Self {
        Self { ptr, owner: None }
    }

    /// Raw pointer to the start of the block.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Non-null pointer to the start of the block.
    pub fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    /// The arena tracking this block, if any.
    pub fn owner(&self) -> Option<ArenaId> {
        self.owner
    }

    /// The block's address, for diagnostics.
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr().addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_trip() {
        let id = ArenaId::new(12, 7);
        let back = ArenaId::from_bits(id.to_bits());
        assert_eq!(back, id);
        assert_eq!(back.slot(), 12);
        assert_eq!(back.generation(), 7);
    }

    #[test]
    fn bits_layout_is_slot_high_generation_low() {
        assert_eq!(ArenaId::new(1, 2).to_bits(), (1u64 << 32) | 2);
    }

    #[test]
    fn display_is_slot_v_generation() {
        assert_eq!(ArenaId::new(4, 0).to_string(), "4v0");
    }

    #[test]
    fn tracked_block_remembers_owner() {
        let mut byte = 0u8;
        let ptr = NonNull::from(&mut byte);
        let block = Block::tracked(ptr, ArenaId::new(0, 3));
        assert_eq!(block.owner(), Some(ArenaId::new(0, 3)));
        assert_eq!(block.as_non_null(), ptr);
        assert_eq!(block.addr(), ptr.as_ptr().addr());
    }
}
