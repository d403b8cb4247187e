//! Workload builders shared by the corral benchmarks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use corral::{ArenaError, ArenaId, Block, RawAllocator, Registry};

/// Block sizes cycled through by the workloads (bytes).
pub const SIZES: [usize; 6] = [16, 24, 64, 128, 512, 4096];

/// Allocate `n` blocks in arena `id`, cycling through [`SIZES`].
pub fn fill<A: RawAllocator>(
    registry: &mut Registry<A>,
    id: ArenaId,
    n: usize,
) -> Result<Vec<Block>, ArenaError> {
    (0..n)
        .map(|i| registry.allocate(id, SIZES[i % SIZES.len()]))
        .collect()
}

/// Free every other block, then resize the survivors, then free the rest.
///
/// Exercises swap-remove, the shrink policy and in-table address updates.
pub fn churn<A: RawAllocator>(
    registry: &mut Registry<A>,
    id: ArenaId,
    blocks: Vec<Block>,
) -> Result<(), ArenaError> {
    let mut survivors = Vec::with_capacity(blocks.len() / 2 + 1);
    for (i, block) in blocks.into_iter().enumerate() {
        if i % 2 == 0 {
            registry.free(id, block)?;
        } else {
            survivors.push(block);
        }
    }
    let mut resized = Vec::with_capacity(survivors.len());
    for block in survivors {
        if let Some(block) = registry.reallocate(id, Some(block), 256)? {
            resized.push(block);
        }
    }
    for block in resized {
        registry.free(id, block)?;
    }
    Ok(())
}
