//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use crate::handle::ArenaId;

/// Usage errors reported by registry and arena operations.
///
/// Resource exhaustion is never represented here: when the raw allocator
/// or a pointer table cannot grow, the process aborts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The arena was destroyed, swept, or never belonged to this registry.
    UnknownArena {
        /// The identifier that failed to resolve.
        arena: ArenaId,
    },
    /// The block is not tracked by the arena it was handed to.
    UntrackedBlock {
        /// The arena the operation targeted.
        arena: ArenaId,
        /// Address of the block (0 for a null block).
        address: usize,
    },
    /// The block is tracked by a different arena, or by one that is gone.
    ForeignBlock {
        /// The arena the operation targeted.
        arena: ArenaId,
        /// The arena that handed out the block.
        owner: ArenaId,
        /// Address of the block.
        address: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownArena { arena } => {
                write!(f, "arena {arena} is not in the registry")
            }
            Self::UntrackedBlock { arena, address } => {
                write!(f, "block {address:#x} is not tracked by arena {arena}")
            }
            Self::ForeignBlock {
                arena,
                owner,
                address,
            } => {
                write!(
                    f,
                    "block {address:#x} was allocated by arena {owner}, not arena {arena}"
                )
            }
        }
    }
}

impl Error for ArenaError {}
