//! Test utilities and mock allocators for corral development.
//!
//! [`CountingAllocator`] forwards to the C heap while recording every call,
//! so tests can assert exactly how many blocks a registry operation handed
//! back. Its [`AllocProbe`] stays valid after the registry (and the
//! allocator inside it) has been dropped.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

use corral::{RawAllocator, Registry, RegistryConfig, SystemAllocator};
use indexmap::IndexSet;

/// Per-call counters plus the set of blocks currently outstanding.
#[derive(Clone, Debug, Default)]
pub struct AllocStats {
    pub allocations: usize,
    pub zero_allocations: usize,
    pub reallocations: usize,
    pub releases: usize,
    /// Outstanding blocks, in the order they were handed out.
    pub live: IndexSet<NonNull<u8>>,
}

/// A [`RawAllocator`] that counts calls and catches double releases.
///
/// Panics if asked to release or resize a block it does not consider live.
pub struct CountingAllocator {
    inner: SystemAllocator,
    stats: Rc<RefCell<AllocStats>>,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self {
            inner: SystemAllocator,
            stats: Rc::new(RefCell::new(AllocStats::default())),
        }
    }

    /// A handle for inspecting this allocator's counters.
    pub fn probe(&self) -> AllocProbe {
        AllocProbe {
            stats: Rc::clone(&self.stats),
        }
    }

    fn track(&self, ptr: Option<NonNull<u8>>) -> Option<NonNull<u8>> {
        if let Some(p) = ptr {
            let fresh = self.stats.borrow_mut().live.insert(p);
            assert!(fresh, "allocator returned live block {p:p} twice");
        }
        ptr
    }

    fn untrack(&self, ptr: NonNull<u8>, op: &str) {
        let was_live = self.stats.borrow_mut().live.shift_remove(&ptr);
        assert!(was_live, "{op} of block {ptr:p} that is not live");
    }
}

impl Default for CountingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(unsafe_code)]
impl RawAllocator for CountingAllocator {
    fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        self.stats.borrow_mut().allocations += 1;
        let ptr = self.inner.allocate(size);
        self.track(ptr)
    }

    fn zero_allocate(&mut self, count: usize, size: usize) -> Option<NonNull<u8>> {
        self.stats.borrow_mut().zero_allocations += 1;
        let ptr = self.inner.zero_allocate(count, size);
        self.track(ptr)
    }

    unsafe fn reallocate(&mut self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        self.stats.borrow_mut().reallocations += 1;
        if let Some(old) = ptr {
            self.untrack(old, "reallocate");
        }
        // SAFETY: forwarded contract; `old` was live in `inner`.
        let new = unsafe { self.inner.reallocate(ptr, size) };
        self.track(new)
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>) {
        self.stats.borrow_mut().releases += 1;
        self.untrack(ptr, "release");
        // SAFETY: forwarded contract; `ptr` was live in `inner`.
        unsafe { self.inner.release(ptr) }
    }
}

/// Shared view of a [`CountingAllocator`]'s counters.
#[derive(Clone)]
pub struct AllocProbe {
    stats: Rc<RefCell<AllocStats>>,
}

impl AllocProbe {
    pub fn snapshot(&self) -> AllocStats {
        self.stats.borrow().clone()
    }

    pub fn allocations(&self) -> usize {
        self.stats.borrow().allocations
    }

    pub fn zero_allocations(&self) -> usize {
        self.stats.borrow().zero_allocations
    }

    pub fn reallocations(&self) -> usize {
        self.stats.borrow().reallocations
    }

    pub fn releases(&self) -> usize {
        self.stats.borrow().releases
    }

    /// Number of blocks handed out and not yet released.
    pub fn live_count(&self) -> usize {
        self.stats.borrow().live.len()
    }

    pub fn is_live(&self, ptr: *const u8) -> bool {
        NonNull::new(ptr.cast_mut()).is_some_and(|p| self.stats.borrow().live.contains(&p))
    }
}

/// A registry over a fresh [`CountingAllocator`] whose usage errors are
/// returned rather than fatal.
pub fn counting_registry() -> (Registry<CountingAllocator>, AllocProbe) {
    let raw = CountingAllocator::new();
    let probe = raw.probe();
    (
        Registry::with_config(raw, RegistryConfig::recoverable()),
        probe,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_kind_of_call() {
        let (mut reg, probe) = counting_registry();
        let id = reg.create();
        let a = reg.allocate(id, 8).unwrap();
        let _b = reg.zero_allocate(id, 2, 4).unwrap();
        let a = reg.reallocate(id, Some(a), 64).unwrap().unwrap();
        reg.free(id, a).unwrap();
        assert_eq!(probe.allocations(), 1);
        assert_eq!(probe.zero_allocations(), 1);
        assert_eq!(probe.reallocations(), 1);
        assert_eq!(probe.releases(), 1);
        assert_eq!(probe.live_count(), 1);
    }

    #[test]
    fn probe_outlives_registry() {
        let (mut reg, probe) = counting_registry();
        let id = reg.create();
        let _ = reg.allocate(id, 8).unwrap();
        drop(reg);
        assert_eq!(probe.releases(), 1);
        assert_eq!(probe.live_count(), 0);
    }

    #[test]
    #[should_panic(expected = "not live")]
    #[allow(unsafe_code)]
    fn double_release_panics() {
        let mut raw = CountingAllocator::new();
        let ptr = raw.allocate(8).unwrap();
        unsafe {
            raw.release(ptr);
            raw.release(ptr);
        }
    }
}
