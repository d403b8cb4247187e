//! The list of live arenas and the entry point for every arena operation.
//!
//! Arenas are stored in a slot map whose slots carry generation counters,
//! so a destroyed [`ArenaId`] fails to resolve instead of reaching whatever
//! arena reuses its slot. Live slots are chained into a doubly linked list
//! (newest at the head) through their `previous`/`next` indices, giving
//! O(1) unlink by identity and a stable head → tail sweep order.
//!
//! Usage errors go through `RegistryConfig::usage_error`, which either
//! terminates the process or lets the error be returned, depending on the
//! configured [`UsageErrorPolicy`](crate::UsageErrorPolicy).

use crate::arena::Arena;
use crate::config::RegistryConfig;
use crate::error::ArenaError;
use crate::handle::{ArenaId, Block};
use crate::raw::{self, RawAllocator, SystemAllocator};
use crate::scope::ScopedArena;

/// What a destroy or cleanup released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Arenas removed from the registry.
    pub arenas: usize,
    /// Blocks returned to the raw allocator.
    pub blocks: usize,
}

struct Node {
    arena: Arena,
    previous: Option<u32>,
    next: Option<u32>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Split borrow of one arena plus the registry state its operations need.
struct Parts<'a, A> {
    arena: &'a mut Arena,
    raw: &'a mut A,
    config: &'a RegistryConfig,
}

/// How a block relates to the arena an operation targets.
enum Ownership {
    Tracked(usize),
    /// Wrapped by `Block::from_raw` and not in the table.
    Unowned,
    Foreign(ArenaId),
    /// Claims this arena as owner but is not in its table.
    Stray,
}

fn ownership(arena: &Arena, id: ArenaId, block: &Block) -> Ownership {
    match block.owner() {
        Some(owner) if owner != id => Ownership::Foreign(owner),
        Some(_) => arena
            .find(block.as_non_null())
            .map_or(Ownership::Stray, Ownership::Tracked),
        None => arena
            .find(block.as_non_null())
            .map_or(Ownership::Unowned, Ownership::Tracked),
    }
}

/// Every live arena, plus the raw allocator they share.
///
/// Dropping a registry releases every arena still in it, together with all
/// of their blocks.
///
/// A registry is not synchronised. Use one per thread, or wrap it in a lock
/// the way [`global`](crate::global) does.
pub struct Registry<A: RawAllocator = SystemAllocator> {
    raw: A,
    config: RegistryConfig,
    slots: Vec<Slot>,
    /// Vacant slot indices, reused LIFO.
    free_list: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    live: usize,
}

impl Registry<SystemAllocator> {
    /// Create an empty registry over the C heap with the default config.
    pub fn new() -> Self {
        Self::with_allocator(SystemAllocator)
    }
}

impl Default for Registry<SystemAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: RawAllocator> Registry<A> {
    /// Create an empty registry over `raw` with the default config.
    pub fn with_allocator(raw: A) -> Self {
        Self::with_config(raw, RegistryConfig::default())
    }

    /// Create an empty registry over `raw` with the given config.
    pub fn with_config(raw: A, config: RegistryConfig) -> Self {
        Self {
            raw,
            config,
            slots: Vec::new(),
            free_list: Vec::new(),
            head: None,
            tail: None,
            live: 0,
        }
    }

    /// The registry's configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The raw allocator all arenas delegate to.
    pub fn allocator(&self) -> &A {
        &self.raw
    }

    /// Number of live arenas.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no arena is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// The most recently created live arena.
    pub fn head(&self) -> Option<ArenaId> {
        self.head.map(|slot| self.id_at(slot))
    }

    /// The oldest live arena.
    pub fn tail(&self) -> Option<ArenaId> {
        self.tail.map(|slot| self.id_at(slot))
    }

    /// Look up a live arena.
    pub fn get(&self, id: ArenaId) -> Option<&Arena> {
        let slot = self.slots.get(id.slot() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref().map(|node| &node.arena)
    }

    /// Whether `id` names a live arena.
    pub fn contains(&self, id: ArenaId) -> bool {
        self.get(id).is_some()
    }

    /// The newest live arena carrying `label`.
    pub fn find_by_label(&self, label: &str) -> Option<ArenaId> {
        self.iter()
            .find(|(_, arena)| arena.label() == Some(label))
            .map(|(id, _)| id)
    }

    /// Live arenas from head (newest) to tail (oldest).
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: &self.slots,
            cursor: self.head,
        }
    }

    /// Create an unnamed arena at the head of the list.
    pub fn create(&mut self) -> ArenaId {
        self.insert_front(Arena::new(None))
    }

    /// Create a labelled arena at the head of the list.
    pub fn create_named(&mut self, label: impl Into<String>) -> ArenaId {
        self.insert_front(Arena::new(Some(label.into())))
    }

    /// Unlink an arena and release every block it still tracks.
    ///
    /// An id that does not resolve (already destroyed, swept, or from
    /// another registry) is a usage error.
    pub fn destroy(&mut self, id: ArenaId) -> Result<SweepStats, ArenaError> {
        let Some(mut node) = self.take_node(id) else {
            return Err(self.config.usage_error(ArenaError::UnknownArena { arena: id }));
        };
        self.unlink(node.previous, node.next);
        let blocks = node.arena.release_all(&mut self.raw);
        log::debug!("corral: destroyed arena {id}, released {blocks} blocks");
        Ok(SweepStats { arenas: 1, blocks })
    }

    /// Release every arena and every block, head to tail.
    ///
    /// The registry stays usable afterwards. This is what the process-exit
    /// hook and `Drop` run.
    pub fn cleanup(&mut self) -> SweepStats {
        let mut stats = SweepStats::default();
        let mut cursor = self.head.take();
        self.tail = None;
        while let Some(slot) = cursor {
            let Some(mut node) = self
                .slots
                .get_mut(slot as usize)
                .and_then(|s| s.node.take())
            else {
                break;
            };
            self.retire(slot);
            cursor = node.next;
            stats.blocks += node.arena.release_all(&mut self.raw);
            stats.arenas += 1;
        }
        if stats.arenas > 0 {
            log::debug!(
                "corral: swept {} arenas, released {} blocks",
                stats.arenas,
                stats.blocks
            );
        }
        stats
    }

    /// Allocate `size` bytes tracked by arena `id`.
    pub fn allocate(&mut self, id: ArenaId, size: usize) -> Result<Block, ArenaError> {
        let Parts { arena, raw, .. } = self.parts(id)?;
        let ptr = arena.allocate(raw, size);
        log::trace!("corral: arena {id} allocate {size} -> {ptr:p}");
        Ok(Block::tracked(ptr, id))
    }

    /// Allocate `count * size` zeroed bytes tracked by arena `id`.
    pub fn zero_allocate(
        &mut self,
        id: ArenaId,
        count: usize,
        size: usize,
    ) -> Result<Block, ArenaError> {
        let Parts { arena, raw, .. } = self.parts(id)?;
        let ptr = arena.zero_allocate(raw, count, size);
        log::trace!("corral: arena {id} zero_allocate {count}x{size} -> {ptr:p}");
        Ok(Block::tracked(ptr, id))
    }

    /// Resize, release, or adopt a block.
    ///
    /// | block                          | `new_size` | result                       |
    /// |--------------------------------|------------|------------------------------|
    /// | tracked by `id`                | non-zero   | resized block (may move)     |
    /// | tracked by `id`                | zero       | released, `Ok(None)`         |
    /// | `None` or from `Block::from_raw` | non-zero | resized/allocated, now tracked |
    /// | `None` or from `Block::from_raw` | zero     | `UntrackedBlock`             |
    /// | tracked by another arena       | any        | `ForeignBlock`               |
    pub fn reallocate(
        &mut self,
        id: ArenaId,
        block: Option<Block>,
        new_size: usize,
    ) -> Result<Option<Block>, ArenaError> {
        let Parts { arena, raw, config } = self.parts(id)?;
        let Some(block) = block else {
            if new_size == 0 {
                return Err(config.usage_error(ArenaError::UntrackedBlock {
                    arena: id,
                    address: 0,
                }));
            }
            let ptr = arena.adopt(raw, None, new_size);
            log::trace!("corral: arena {id} reallocate null -> {ptr:p} ({new_size})");
            return Ok(Some(Block::tracked(ptr, id)));
        };

        match ownership(arena, id, &block) {
            Ownership::Tracked(index) if new_size == 0 => {
                arena.release(raw, index);
                log::trace!("corral: arena {id} reallocate {:p} to zero", block.as_ptr());
                Ok(None)
            }
            Ownership::Tracked(index) => {
                let ptr = arena.resize(raw, index, new_size);
                log::trace!(
                    "corral: arena {id} reallocate {:p} -> {ptr:p} ({new_size})",
                    block.as_ptr()
                );
                Ok(Some(Block::tracked(ptr, id)))
            }
            Ownership::Unowned if new_size != 0 => {
                let ptr = arena.adopt(raw, Some(block.as_non_null()), new_size);
                log::trace!(
                    "corral: arena {id} adopted {:p} -> {ptr:p} ({new_size})",
                    block.as_ptr()
                );
                Ok(Some(Block::tracked(ptr, id)))
            }
            Ownership::Unowned | Ownership::Stray => {
                Err(config.usage_error(ArenaError::UntrackedBlock {
                    arena: id,
                    address: block.addr(),
                }))
            }
            Ownership::Foreign(owner) => Err(config.usage_error(ArenaError::ForeignBlock {
                arena: id,
                owner,
                address: block.addr(),
            })),
        }
    }

    /// Release a block tracked by arena `id`.
    pub fn free(&mut self, id: ArenaId, block: Block) -> Result<(), ArenaError> {
        let Parts { arena, raw, config } = self.parts(id)?;
        match ownership(arena, id, &block) {
            Ownership::Tracked(index) => {
                arena.release(raw, index);
                log::trace!("corral: arena {id} free {:p}", block.as_ptr());
                Ok(())
            }
            Ownership::Foreign(owner) => Err(config.usage_error(ArenaError::ForeignBlock {
                arena: id,
                owner,
                address: block.addr(),
            })),
            Ownership::Unowned | Ownership::Stray => {
                Err(config.usage_error(ArenaError::UntrackedBlock {
                    arena: id,
                    address: block.addr(),
                }))
            }
        }
    }

    /// Create an arena that is destroyed when the returned guard drops.
    pub fn scope(&mut self) -> ScopedArena<'_, A> {
        let id = self.create();
        ScopedArena::new(self, id)
    }

    /// Like [`scope`](Self::scope), with a label.
    pub fn scope_named(&mut self, label: impl Into<String>) -> ScopedArena<'_, A> {
        let id = self.create_named(label);
        ScopedArena::new(self, id)
    }

    /// Run `body` with a fresh arena, destroying it however `body` exits.
    pub fn with_scope<R>(&mut self, body: impl FnOnce(&mut ScopedArena<'_, A>) -> R) -> R {
        let mut scope = self.scope();
        body(&mut scope)
    }

    fn id_at(&self, slot: u32) -> ArenaId {
        let generation = self.slots.get(slot as usize).map_or(0, |s| s.generation);
        ArenaId::new(slot, generation)
    }

    fn node_mut(&mut self, slot: u32) -> Option<&mut Node> {
        self.slots.get_mut(slot as usize)?.node.as_mut()
    }

    fn parts(&mut self, id: ArenaId) -> Result<Parts<'_, A>, ArenaError> {
        let Self {
            raw, config, slots, ..
        } = self;
        match slots.get_mut(id.slot() as usize) {
            Some(Slot {
                generation,
                node: Some(node),
            }) if *generation == id.generation() => Ok(Parts {
                arena: &mut node.arena,
                raw,
                config,
            }),
            _ => Err(config.usage_error(ArenaError::UnknownArena { arena: id })),
        }
    }

    fn insert_front(&mut self, arena: Arena) -> ArenaId {
        let slot = match self.free_list.pop() {
            Some(slot) => slot,
            None => {
                let slot = u32::try_from(self.slots.len())
                    .unwrap_or_else(|_| raw::exhausted("registry slot", usize::MAX));
                self.slots.push(Slot {
                    generation: 0,
                    node: None,
                });
                slot
            }
        };
        let next = self.head;
        let entry = &mut self.slots[slot as usize];
        entry.node = Some(Node {
            arena,
            previous: None,
            next,
        });
        let id = ArenaId::new(slot, entry.generation);

        match next {
            Some(old_head) => {
                if let Some(node) = self.node_mut(old_head) {
                    node.previous = Some(slot);
                }
            }
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
        self.live += 1;
        log::debug!("corral: created arena {id}");
        id
    }

    /// Take the node behind a live id out of its slot.
    fn take_node(&mut self, id: ArenaId) -> Option<Node> {
        let slot = self.slots.get_mut(id.slot() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let node = slot.node.take()?;
        self.retire(id.slot());
        Some(node)
    }

    /// Bump a vacated slot's generation and recycle it.
    ///
    /// A slot whose generation wraps back to 0 is never reused, so ids from
    /// its first epoch cannot resolve again.
    fn retire(&mut self, slot: u32) {
        let entry = &mut self.slots[slot as usize];
        entry.generation = entry.generation.wrapping_add(1);
        if entry.generation != 0 {
            self.free_list.push(slot);
        }
        self.live -= 1;
    }

    fn unlink(&mut self, previous: Option<u32>, next: Option<u32>) {
        match previous {
            Some(prev) => {
                if let Some(node) = self.node_mut(prev) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next_slot) => {
                if let Some(node) = self.node_mut(next_slot) {
                    node.previous = previous;
                }
            }
            None => self.tail = previous,
        }
    }
}

impl<A: RawAllocator> Drop for Registry<A> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl<'a, A: RawAllocator> IntoIterator for &'a Registry<A> {
    type Item = (ArenaId, &'a Arena);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over live arenas, head to tail.
pub struct Iter<'a> {
    slots: &'a [Slot],
    cursor: Option<u32>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (ArenaId, &'a Arena);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let slot = self.slots.get(index as usize)?;
        let node = slot.node.as_ref()?;
        self.cursor = node.next;
        Some((ArenaId::new(index, slot.generation), &node.arena))
    }
}
