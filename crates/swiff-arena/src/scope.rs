//! The scope allocator: one raw allocator feeding two regions.
//!
//! [`ScopeAllocator`] is the top-level type. It owns
//!
//! ```text
//! ScopeAllocator
//! ├── ArenaPool (raw allocator, arena table, block cache, metrics)
//! ├── GlobalRegion  ←─── bump chain + slack lists, freed only by fini
//! └── LocalRegion   ←─── bump chain cut back by leave_local
//! ```
//!
//! A typical frame looks like:
//! 1. `enter_local()`: capture a [`Mark`]
//! 2. `alloc_local()` / `store_local()` for scratch data
//! 3. `leave_local(mark, escapes)`: drop the scratch, keep the escapes

use swiff_core::{RawAllocator, SystemAllocator};

use crate::config::ScopeConfig;
use crate::error::ScopeError;
use crate::global::GlobalRegion;
use crate::handle::{GlobalPtr, LocalPtr, Mark};
use crate::local::{payload_len, LocalRegion};
use crate::metrics::{RegionUsage, ScopeMetrics, ScopeUsage};
use crate::pool::ArenaPool;

/// Region-based allocator with a global and a scoped local region.
///
/// All arena memory comes from the raw allocator `A`, which is owned by
/// the scope allocator for its whole lifetime. Memory goes back to `A`
/// only through [`fini`](Self::fini), [`collect`](Self::collect), the
/// release of an oversized local arena, or drop.
///
/// Allocations are addressed by handle. Reading or writing one goes
/// through [`global`](Self::global) / [`local`](Self::local) and friends,
/// which reject handles whose arena has been released.
pub struct ScopeAllocator<A: RawAllocator = SystemAllocator> {
    pool: ArenaPool<A>,
    global: GlobalRegion,
    local: LocalRegion,
    config: ScopeConfig,
}

impl<A: RawAllocator> ScopeAllocator<A> {
    /// Create an allocator over `raw` with the default configuration.
    ///
    /// No arena is acquired until the first allocation.
    pub fn new(raw: A) -> Self {
        Self::build(raw, ScopeConfig::default())
    }

    /// Create an allocator over `raw` with a custom configuration.
    ///
    /// Returns [`ScopeError::InvalidConfig`] if `config` fails
    /// [`ScopeConfig::validate`].
    pub fn with_config(raw: A, config: ScopeConfig) -> Result<Self, ScopeError> {
        config.validate()?;
        Ok(Self::build(raw, config))
    }

    fn build(raw: A, config: ScopeConfig) -> Self {
        tracing::debug!(
            arena_size = config.arena_size,
            size_classes = ?config.size_classes,
            "scope allocator initialised"
        );
        Self {
            pool: ArenaPool::new(raw, config.arena_size),
            global: GlobalRegion::new(&config.size_classes),
            local: LocalRegion::new(),
            config,
        }
    }

    /// Release every arena and cached block to the raw allocator.
    ///
    /// All outstanding handles become stale. The allocator is left in its
    /// freshly constructed state and may be used again; metrics keep
    /// accumulating.
    pub fn fini(&mut self) {
        let released = self.release_all();
        tracing::debug!(released, "scope allocator finalised");
    }

    fn release_all(&mut self) -> usize {
        self.global.free(&mut self.pool) + self.local.free(&mut self.pool) + self.pool.collect()
    }

    /// Return cached standard blocks to the raw allocator.
    ///
    /// Live arenas are not touched. Returns the number of blocks freed.
    pub fn collect(&mut self) -> usize {
        let freed = self.pool.collect();
        tracing::debug!(freed, "collected arena cache");
        freed
    }

    // ── Global region ───────────────────────────────────────────

    /// Allocate `size` bytes that stay valid until [`fini`](Self::fini).
    ///
    /// The contents are unspecified: the bytes may be left over from an
    /// earlier use of the same arena memory.
    pub fn alloc_global(&mut self, size: usize) -> Result<GlobalPtr, ScopeError> {
        self.global.alloc(&mut self.pool, size)
    }

    /// Allocate a global copy of `bytes`.
    pub fn store_global(&mut self, bytes: &[u8]) -> Result<GlobalPtr, ScopeError> {
        let ptr = self.alloc_global(bytes.len())?;
        self.global_mut(ptr)?.copy_from_slice(bytes);
        Ok(ptr)
    }

    /// The bytes of a global allocation.
    pub fn global(&self, ptr: GlobalPtr) -> Result<&[u8], ScopeError> {
        let arena = self
            .pool
            .table
            .resolve(ptr.arena)
            .ok_or(ScopeError::StaleHandle { arena: ptr.arena })?;
        match ptr.offset.checked_add(ptr.len) {
            Some(end) if end <= arena.used() => Ok(arena.slice(ptr.offset, ptr.len)),
            _ => Err(ScopeError::OutOfBounds {
                arena: ptr.arena,
                offset: ptr.offset,
                used: arena.used(),
            }),
        }
    }

    /// Mutable bytes of a global allocation.
    pub fn global_mut(&mut self, ptr: GlobalPtr) -> Result<&mut [u8], ScopeError> {
        let arena = self
            .pool
            .table
            .resolve_mut(ptr.arena)
            .ok_or(ScopeError::StaleHandle { arena: ptr.arena })?;
        match ptr.offset.checked_add(ptr.len) {
            Some(end) if end <= arena.used() => Ok(arena.slice_mut(ptr.offset, ptr.len)),
            _ => Err(ScopeError::OutOfBounds {
                arena: ptr.arena,
                offset: ptr.offset,
                used: arena.used(),
            }),
        }
    }

    // ── Local region ────────────────────────────────────────────

    /// Open a scope and return its mark.
    ///
    /// Cheap: no memory is touched. Scopes nest and must be left in LIFO
    /// order.
    pub fn enter_local(&self) -> Mark {
        self.local.enter(&self.pool)
    }

    /// Allocate `size` bytes in the innermost open scope.
    ///
    /// The allocation is discarded by the `leave_local` call that closes
    /// the scope, unless it is named as an escape there. The contents are
    /// unspecified.
    pub fn alloc_local(&mut self, size: usize) -> Result<LocalPtr, ScopeError> {
        self.local.alloc(&mut self.pool, size)
    }

    /// Allocate a local copy of `bytes`.
    pub fn store_local(&mut self, bytes: &[u8]) -> Result<LocalPtr, ScopeError> {
        let ptr = self.alloc_local(bytes.len())?;
        self.local_mut(ptr)?.copy_from_slice(bytes);
        Ok(ptr)
    }

    /// Close the scope opened by `mark` and every scope nested inside it.
    ///
    /// Each handle in `escapes` that points into discarded storage is
    /// rescued: its bytes are copied into the surviving region (or, for an
    /// oversized arena, the arena itself is kept) and the handle is
    /// rewritten to the new location. Handles that do not point into the
    /// closed scope are left as they are.
    ///
    /// Standard arenas vacated by the scope go to the cache; oversized ones
    /// go back to the raw allocator.
    ///
    /// A kept oversized arena is linked in as the new local top, so the
    /// enclosing scope releases it when it closes. It is already full,
    /// which means the next `alloc_local` acquires a fresh arena even if
    /// the arena below still has room: one extra arena per splice.
    ///
    /// # Errors
    ///
    /// - [`ScopeError::InvalidMark`] if `mark` is not an open scope.
    /// - [`ScopeError::OutOfBounds`] if an escape does not name a valid
    ///   allocation. Nothing has been released when either is returned.
    /// - [`ScopeError::Exhausted`] or [`ScopeError::BadBlock`] if rescuing
    ///   needs a new arena and the raw allocator fails. The scope is closed anyway; escapes rescued
    ///   before the failure are rewritten, the rest are stale.
    pub fn leave_local(
        &mut self,
        mark: Mark,
        escapes: &mut [&mut LocalPtr],
    ) -> Result<(), ScopeError> {
        self.local.leave(&mut self.pool, mark, escapes)
    }

    /// The bytes of a local allocation.
    pub fn local(&self, ptr: LocalPtr) -> Result<&[u8], ScopeError> {
        let arena = self
            .pool
            .table
            .resolve(ptr.arena)
            .ok_or(ScopeError::StaleHandle { arena: ptr.arena })?;
        let len = payload_len(arena, ptr.arena, ptr.offset)?;
        Ok(arena.slice(ptr.offset, len))
    }

    /// Mutable bytes of a local allocation.
    pub fn local_mut(&mut self, ptr: LocalPtr) -> Result<&mut [u8], ScopeError> {
        let arena = self
            .pool
            .table
            .resolve_mut(ptr.arena)
            .ok_or(ScopeError::StaleHandle { arena: ptr.arena })?;
        let len = payload_len(arena, ptr.arena, ptr.offset)?;
        Ok(arena.slice_mut(ptr.offset, len))
    }

    /// Length in bytes of a local allocation, as requested.
    pub fn local_len(&self, ptr: LocalPtr) -> Result<usize, ScopeError> {
        Ok(self.local(ptr)?.len())
    }

    // ── Inspection ──────────────────────────────────────────────

    /// Current memory footprint of both regions and the cache.
    pub fn usage(&self) -> ScopeUsage {
        ScopeUsage {
            global: self.region_usage(self.global.top()),
            local: self.region_usage(self.local.top()),
            cached_arenas: self.pool.cache.len(),
            cached_bytes: self.pool.cache.memory_bytes(),
            slack_blocks: self.global.slack.len(),
            slack_bytes: self.global.slack.bytes(),
        }
    }

    fn region_usage(&self, top: u32) -> RegionUsage {
        self.pool
            .table
            .chain(top)
            .fold(RegionUsage::default(), |mut usage, (_, arena)| {
                usage.arenas += 1;
                usage.used_bytes += arena.used();
                usage.capacity_bytes += arena.capacity();
                usage
            })
    }

    /// Counters accumulated since construction.
    pub fn metrics(&self) -> &ScopeMetrics {
        &self.pool.metrics
    }

    /// The configuration this allocator was built with.
    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    /// The underlying raw allocator.
    pub fn raw(&self) -> &A {
        &self.pool.raw
    }

    /// Mutable access to the underlying raw allocator.
    pub fn raw_mut(&mut self) -> &mut A {
        &mut self.pool.raw
    }
}

impl Default for ScopeAllocator<SystemAllocator> {
    fn default() -> Self {
        Self::new(SystemAllocator::new())
    }
}

impl<A: RawAllocator> Drop for ScopeAllocator<A> {
    fn drop(&mut self) {
        self.release_all();
    }
}
