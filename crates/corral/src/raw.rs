//! The raw allocation primitives arenas delegate to.
//!
//! [`RawAllocator`] is the boundary between tracking and actual memory
//! management. [`SystemAllocator`] binds it to the C heap. Every `unsafe`
//! call into an allocator happens either here or in `arena.rs`.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::ptr::{self, NonNull};

/// A general-purpose allocator with malloc-family semantics.
///
/// `allocate`, `zero_allocate` and `reallocate` may fail by returning
/// `None`; the tracking layer treats that as fatal. `release` never fails.
pub trait RawAllocator {
    /// Obtain a block of at least `size` bytes.
    fn allocate(&mut self, size: usize) -> Option<NonNull<u8>>;

    /// Obtain a zero-filled block of at least `count * size` bytes.
    fn zero_allocate(&mut self, count: usize, size: usize) -> Option<NonNull<u8>>;

    /// Resize `ptr` to `size` bytes, possibly moving it. `None` allocates.
    ///
    /// On success the old block must no longer be used; on failure it is
    /// left untouched.
    ///
    /// # Safety
    ///
    /// `ptr` must be `None` or a live block returned by this allocator.
    unsafe fn reallocate(&mut self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>>;

    /// Return a block to the allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block returned by this allocator and must not be
    /// used afterwards.
    unsafe fn release(&mut self, ptr: NonNull<u8>);
}

/// [`RawAllocator`] over the C heap (`malloc`, `calloc`, `realloc`, `free`).
///
/// Zero-byte requests are rounded up to one byte, so every successful call
/// yields a distinct, trackable address.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemAllocator;

impl RawAllocator for SystemAllocator {
    fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        // SAFETY: malloc has no preconditions; null is mapped to None.
        NonNull::new(unsafe { libc::malloc(size.max(1)) }.cast())
    }

    fn zero_allocate(&mut self, count: usize, size: usize) -> Option<NonNull<u8>> {
        let (count, size) = if count == 0 || size == 0 {
            (1, 1)
        } else {
            (count, size)
        };
        // SAFETY: calloc checks count * size for overflow and returns null.
        NonNull::new(unsafe { libc::calloc(count, size) }.cast())
    }

    unsafe fn reallocate(&mut self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        let old = ptr.map_or(ptr::null_mut(), |p| p.as_ptr().cast());
        // SAFETY: the caller guarantees `old` is null or a live malloc block.
        NonNull::new(unsafe { libc::realloc(old, size.max(1)) }.cast())
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>) {
        // SAFETY: the caller guarantees `ptr` is a live malloc block.
        unsafe { libc::free(ptr.as_ptr().cast()) }
    }
}

/// Report a failed allocation and abort the process.
///
/// Tracking cannot continue once its own bookkeeping or the memory it hands
/// out may be missing, so there is no recovery path.
pub(crate) fn exhausted(what: &str, size: usize) -> ! {
    log::error!("corral: {what} failed for {size} bytes");
    match Layout::from_size_align(size.max(1), 1) {
        Ok(layout) => std::alloc::handle_alloc_error(layout),
        Err(_) => std::process::abort(),
    }
}
