//! Arena acquisition and release shared by both regions.
//!
//! [`ArenaPool`] owns the raw allocator, the arena table, and the cache.
//! Regions ask it for a new arena with [`ArenaPool::acquire`] and hand
//! vacated arenas back with [`ArenaPool::release`]. Standard blocks cycle
//! through the cache; oversized blocks go straight back to the raw
//! allocator.

use swiff_core::RawAllocator;

use crate::arena::{Arena, ArenaTable, SENTINEL};
use crate::cache::ArenaCache;
use crate::error::ScopeError;
use crate::metrics::ScopeMetrics;

pub(crate) struct ArenaPool<A: RawAllocator> {
    pub(crate) raw: A,
    pub(crate) table: ArenaTable,
    pub(crate) cache: ArenaCache,
    pub(crate) metrics: ScopeMetrics,
    arena_size: usize,
}

impl<A: RawAllocator> ArenaPool<A> {
    pub(crate) fn new(raw: A, arena_size: usize) -> Self {
        Self {
            raw,
            table: ArenaTable::new(),
            cache: ArenaCache::new(),
            metrics: ScopeMetrics::default(),
            arena_size,
        }
    }

    /// Whether the arena at `index` was created for a single oversized
    /// request.
    pub(crate) fn is_oversized(&self, index: u32) -> bool {
        self.table.get(index).capacity() > self.arena_size
    }

    /// Link a new empty arena able to hold `hint` bytes above `prev`.
    ///
    /// Requests that fit a standard arena reuse a cached block when one is
    /// available. Larger requests get a block of exactly `hint` bytes.
    pub(crate) fn acquire(&mut self, hint: usize, prev: u32) -> Result<u32, ScopeError> {
        let block = if hint <= self.arena_size {
            match self.cache.pop() {
                Some(block) => {
                    self.metrics.cache_hits += 1;
                    block
                }
                None => {
                    self.metrics.cache_misses += 1;
                    self.raw_alloc(self.arena_size)?
                }
            }
        } else {
            self.metrics.oversized_arenas += 1;
            self.raw_alloc(hint)?
        };
        let id = self.table.insert(Arena::new(block, prev));
        tracing::trace!(
            arena = %id,
            hint,
            capacity = self.table.get(id.index).capacity(),
            "acquired arena"
        );
        Ok(id.index)
    }

    /// Unlink the arena at `index` and recycle its block.
    pub(crate) fn release(&mut self, index: u32) {
        let arena = self.table.remove(index);
        self.recycle(arena);
    }

    /// Cache a standard arena's block, or free an oversized one.
    pub(crate) fn recycle(&mut self, arena: Arena) {
        let block = arena.into_block();
        if block.len() > self.arena_size {
            tracing::trace!(capacity = block.len(), "freeing oversized arena");
            self.raw_dealloc(block);
        } else {
            debug_assert_eq!(block.len(), self.arena_size);
            self.cache.push(block);
        }
    }

    /// Return every cached block to the raw allocator.
    pub(crate) fn collect(&mut self) -> usize {
        let blocks: Vec<Box<[u8]>> = self.cache.drain().collect();
        let count = blocks.len();
        for block in blocks {
            self.raw_dealloc(block);
        }
        count
    }

    /// Return a whole chain, top first, to the raw allocator.
    pub(crate) fn free_chain(&mut self, top: u32) -> usize {
        let mut index = top;
        let mut count = 0;
        while index != SENTINEL {
            let arena = self.table.remove(index);
            index = arena.prev();
            self.raw_dealloc(arena.into_block());
            count += 1;
        }
        count
    }

    fn raw_alloc(&mut self, size: usize) -> Result<Box<[u8]>, ScopeError> {
        let block = self.raw.alloc(size).map_err(|source| ScopeError::Exhausted {
            requested: size,
            source,
        })?;
        self.metrics.raw_allocs += 1;
        if block.len() != size {
            let returned = block.len();
            tracing::warn!(requested = size, returned, "raw allocator returned a bad block");
            self.raw_dealloc(block);
            return Err(ScopeError::BadBlock {
                requested: size,
                returned,
            });
        }
        Ok(block)
    }

    fn raw_dealloc(&mut self, block: Box<[u8]>) {
        self.metrics.raw_deallocs += 1;
        self.raw.dealloc(block);
    }
}
