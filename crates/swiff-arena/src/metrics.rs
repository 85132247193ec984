//! Cumulative counters for the scope allocator.
//!
//! [`ScopeMetrics`] is updated by every operation that touches the raw
//! allocator, the cache, the slack lists, or the rescue path. Consumers
//! (frame telemetry, tests, benchmarks) read it through
//! [`ScopeAllocator::metrics`](crate::ScopeAllocator::metrics).
//!
//! [`ScopeUsage`] is the point-in-time counterpart: how much memory each
//! region holds right now.

/// Cumulative allocator counters since construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeMetrics {
    /// Number of blocks requested from the raw allocator.
    pub raw_allocs: u64,
    /// Number of blocks returned to the raw allocator.
    pub raw_deallocs: u64,
    /// Standard acquisitions served from the arena cache.
    pub cache_hits: u64,
    /// Standard acquisitions that had to call the raw allocator.
    pub cache_misses: u64,
    /// Oversized arenas created for a single large request.
    pub oversized_arenas: u64,
    /// Slack blocks pushed onto the global size-class lists.
    pub slack_donated: u64,
    /// Global allocations served from a slack block.
    pub slack_reused: u64,
    /// Bytes copied while rescuing escaping local allocations.
    pub bytes_rescued: u64,
    /// Escaping allocations moved to a new location.
    pub escapes_moved: u64,
    /// Oversized arenas spliced into the surviving chain instead of copied.
    pub arenas_spliced: u64,
    /// Local arenas released by `leave_local`.
    pub arenas_released: u64,
    /// Completed `leave_local` calls.
    pub scopes_left: u64,
}

/// Memory held by one region's arena chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionUsage {
    /// Arenas linked into the chain.
    pub arenas: usize,
    /// Bytes below the arenas' bump cursors.
    pub used_bytes: usize,
    /// Total capacity of the arenas.
    pub capacity_bytes: usize,
}

/// Snapshot of the allocator's memory footprint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScopeUsage {
    /// The global region's chain.
    pub global: RegionUsage,
    /// The local region's chain.
    pub local: RegionUsage,
    /// Standard blocks parked in the arena cache.
    pub cached_arenas: usize,
    /// Bytes held by the arena cache.
    pub cached_bytes: usize,
    /// Blocks on the global slack lists.
    pub slack_blocks: usize,
    /// Bytes on the global slack lists.
    pub slack_bytes: usize,
}

impl ScopeUsage {
    /// Bytes currently obtained from the raw allocator.
    pub fn raw_bytes(&self) -> usize {
        self.global.capacity_bytes + self.local.capacity_bytes + self.cached_bytes
    }
}
