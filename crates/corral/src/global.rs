//! The process-wide registry.
//!
//! The registry is created the first time any function here runs. That
//! same moment registers a process-exit hook (`atexit`) which sweeps every
//! arena still alive when the process ends normally.
//!
//! The registry itself returns usage errors. The free functions that can
//! fail ([`destroy`], [`allocate`], [`zero_allocate`], [`reallocate`],
//! [`free`]) apply the default [`UsageErrorPolicy`](crate::UsageErrorPolicy)
//! only after the lock is released, so a fatal usage error still exits
//! through a full sweep. Inside [`with_registry`] and [`scope`] bodies,
//! usage errors come back as `Err`.
//!
//! Access is serialised by a mutex so the registry can live in a `static`.
//! The lock is not re-entrant: inside [`with_registry`] or [`scope`], work
//! through the value you were handed rather than calling back into this
//! module.

#![allow(unsafe_code)]

use std::sync::{Mutex, OnceLock, PoisonError, TryLockError};

use crate::config::RegistryConfig;
use crate::error::ArenaError;
use crate::handle::{ArenaId, Block};
use crate::raw::SystemAllocator;
use crate::registry::{Registry, SweepStats};
use crate::scope::ScopedArena;

static GLOBAL: OnceLock<Mutex<Registry>> = OnceLock::new();

fn registry() -> &'static Mutex<Registry> {
    GLOBAL.get_or_init(|| {
        register_exit_hook();
        log::debug!("corral: process-wide registry initialised");
        Mutex::new(Registry::with_config(
            SystemAllocator,
            RegistryConfig::recoverable(),
        ))
    })
}

fn register_exit_hook() {
    // SAFETY: `sweep_at_exit` is a plain `extern "C" fn()` with no captured
    // state, which is all `atexit` requires.
    let status = unsafe { libc::atexit(sweep_at_exit) };
    if status != 0 {
        log::warn!("corral: could not register exit hook; arenas alive at exit will leak");
    }
}

extern "C" fn sweep_at_exit() {
    let Some(mutex) = GLOBAL.get() else {
        return;
    };
    let mut registry = match mutex.try_lock() {
        Ok(registry) => registry,
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        Err(TryLockError::WouldBlock) => {
            // `exit` called while the lock is held, e.g. from a body passed
            // to `with_registry`.
            log::warn!("corral: process-wide registry busy at exit; skipping sweep");
            return;
        }
    };
    registry.cleanup();
}

/// Apply the default usage-error policy to a result from the registry.
///
/// Must run after the lock is released so the exit hook can sweep.
fn settle<T>(result: Result<T, ArenaError>) -> Result<T, ArenaError> {
    result.map_err(|err| RegistryConfig::default().enforce(err))
}

/// Run `f` with exclusive access to the process-wide registry.
///
/// Usage errors inside `f` are returned, whatever the default policy.
///
/// # Panics
///
/// The lock is not re-entrant. Calling any function of this module from
/// inside `f` deadlocks or panics; use the `&mut Registry` passed in.
pub fn with_registry<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    let mut registry = registry().lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut registry)
}

/// Create an unnamed arena in the process-wide registry.
pub fn create() -> ArenaId {
    with_registry(Registry::create)
}

/// Create a labelled arena in the process-wide registry.
pub fn create_named(label: impl Into<String>) -> ArenaId {
    let label = label.into();
    with_registry(|registry| registry.create_named(label))
}

/// See [`Registry::destroy`].
pub fn destroy(id: ArenaId) -> Result<SweepStats, ArenaError> {
    settle(with_registry(|registry| registry.destroy(id)))
}

/// See [`Registry::allocate`].
pub fn allocate(id: ArenaId, size: usize) -> Result<Block, ArenaError> {
    settle(with_registry(|registry| registry.allocate(id, size)))
}

/// See [`Registry::zero_allocate`].
pub fn zero_allocate(id: ArenaId, count: usize, size: usize) -> Result<Block, ArenaError> {
    settle(with_registry(|registry| registry.zero_allocate(id, count, size)))
}

/// See [`Registry::reallocate`].
pub fn reallocate(
    id: ArenaId,
    block: Option<Block>,
    new_size: usize,
) -> Result<Option<Block>, ArenaError> {
    settle(with_registry(|registry| registry.reallocate(id, block, new_size)))
}

/// See [`Registry::free`].
pub fn free(id: ArenaId, block: Block) -> Result<(), ArenaError> {
    settle(with_registry(|registry| registry.free(id, block)))
}

/// Run `body` with a fresh process-wide arena, destroyed however `body`
/// exits. The registry stays locked while `body` runs, and usage errors
/// inside it are returned.
///
/// # Panics
///
/// The lock is not re-entrant. Calling any function of this module from
/// inside `body` deadlocks or panics; work through the [`ScopedArena`]
/// (or [`ScopedArena::registry`]) instead.
pub fn scope<R>(body: impl FnOnce(&mut ScopedArena<'_>) -> R) -> R {
    with_registry(|registry| registry.with_scope(body))
}

/// Sweep the process-wide registry now instead of waiting for exit.
pub fn cleanup() -> SweepStats {
    with_registry(Registry::cleanup)
}
