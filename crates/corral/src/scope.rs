//! Block-scoped arenas.
//!
//! [`ScopedArena`] creates an arena on construction and destroys it on
//! drop, so the arena goes away on every exit from the enclosing block:
//! falling off the end, `return`, `?`, `break`, or a panic unwinding
//! through it.
//!
//! ```
//! use corral::{ArenaError, Registry};
//!
//! fn build(registry: &mut Registry) -> Result<usize, ArenaError> {
//!     let mut scratch = registry.scope_named("scratch");
//!     let _header = scratch.allocate(64)?;
//!     let _body = scratch.zero_allocate(16, 8)?;
//!     Ok(scratch.len())
//!     // both blocks are released here
//! }
//!
//! let mut registry = Registry::new();
//! assert_eq!(build(&mut registry).unwrap(), 2);
//! assert!(registry.is_empty());
//! ```

use crate::arena::Arena;
use crate::error::ArenaError;
use crate::handle::{ArenaId, Block};
use crate::raw::{RawAllocator, SystemAllocator};
use crate::registry::Registry;

/// An arena that is destroyed when this guard drops.
///
/// Created by [`Registry::scope`], [`Registry::scope_named`] or
/// [`Registry::with_scope`]. Holds the registry mutably for its whole
/// lifetime; nested scopes are opened through [`ScopedArena::scope`].
#[must_use]
pub struct ScopedArena<'r, A: RawAllocator = SystemAllocator> {
    registry: &'r mut Registry<A>,
    id: ArenaId,
}

impl<'r, A: RawAllocator> ScopedArena<'r, A> {
    pub(crate) fn new(registry: &'r mut Registry<A>, id: ArenaId) -> Self {
        Self { registry, id }
    }

    /// The guarded arena's id.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// The guarded arena.
    pub fn arena(&self) -> Option<&Arena> {
        self.registry.get(self.id)
    }

    /// Number of blocks the guarded arena tracks.
    pub fn len(&self) -> usize {
        self.arena().map_or(0, Arena::len)
    }

    /// Whether the guarded arena tracks nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The registry the arena lives in.
    pub fn registry(&self) -> &Registry<A> {
        &*self.registry
    }

    /// See [`Registry::allocate`].
    pub fn allocate(&mut self, size: usize) -> Result<Block, ArenaError> {
        self.registry.allocate(self.id, size)
    }

    /// See [`Registry::zero_allocate`].
    pub fn zero_allocate(&mut self, count: usize, size: usize) -> Result<Block, ArenaError> {
        self.registry.zero_allocate(self.id, count, size)
    }

    /// See [`Registry::reallocate`].
    pub fn reallocate(
        &mut self,
        block: Option<Block>,
        new_size: usize,
    ) -> Result<Option<Block>, ArenaError> {
        self.registry.reallocate(self.id, block, new_size)
    }

    /// See [`Registry::free`].
    pub fn free(&mut self, block: Block) -> Result<(), ArenaError> {
        self.registry.free(self.id, block)
    }

    /// Open a nested scope in the same registry.
    pub fn scope(&mut self) -> ScopedArena<'_, A> {
        self.registry.scope()
    }
}

impl<A: RawAllocator> Drop for ScopedArena<'_, A> {
    fn drop(&mut self) {
        // Only fails if the id was destroyed behind the guard's back, which
        // the exclusive borrow rules out; the error has already been logged.
        let _ = self.registry.destroy(self.id);
    }
}
