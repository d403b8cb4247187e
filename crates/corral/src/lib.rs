//! Grouped allocation tracking with whole-arena release.
//!
//! An [`Arena`] records every raw allocation made through it, so the whole
//! group can be released with one call while individual blocks can still be
//! freed or resized. Arenas live in a [`Registry`], which sweeps everything
//! that is still outstanding when it is cleaned up or dropped. A single
//! process-wide registry is available through [`global`]; it registers a
//! process-exit hook the first time it is touched.
//!
//! # Architecture
//!
//! ```text
//! Registry<A: RawAllocator>
//! ├── A (SystemAllocator by default: malloc/calloc/realloc/free)
//! ├── slots: generational slot map, doubly linked head → tail
//! │   └── Arena
//! │       └── PointerTable (doubling growth, quarter-occupancy shrink)
//! └── ScopedArena (RAII guard: create on entry, destroy on every exit path)
//! ```
//!
//! # Usage errors
//!
//! Freeing a block an arena does not track, or destroying an arena the
//! registry does not know, is a usage error. What happens next is decided
//! by [`UsageErrorPolicy`]: the default terminates the process with a
//! failure status, [`UsageErrorPolicy::Return`] hands the error back.
//! Resource exhaustion always aborts.
//!
//! # Threading
//!
//! A [`Registry`] does no locking of its own; callers that share one across
//! threads must synchronise around it. The only locked instance is the
//! process-wide one in [`global`], which sits behind a mutex.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod config;
pub mod error;
pub mod global;
pub mod handle;
pub mod raw;
pub mod registry;
pub mod scope;
pub mod table;

// Public re-exports for the primary API surface.
pub use arena::Arena;
pub use config::{RegistryConfig, UsageErrorPolicy};
pub use error::ArenaError;
pub use handle::{ArenaId, Block};
pub use raw::{RawAllocator, SystemAllocator};
pub use registry::{Registry, SweepStats};
pub use scope::ScopedArena;
pub use table::PointerTable;
