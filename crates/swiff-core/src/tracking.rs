//! Leak-tracking wrapper around a raw allocator.
//!
//! [`TrackingAllocator`] records every block it hands out, keyed by the
//! block's address. It answers "how much is live", "who owns this address"
//! and, when dropped, logs every block that was never returned.

use indexmap::IndexMap;

use crate::error::RawAllocError;
use crate::raw::RawAllocator;

/// Bookkeeping for one live block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Start address of the block.
    pub addr: usize,
    /// Size of the block in bytes.
    pub size: usize,
    /// Sequence number of the `alloc` call that produced the block.
    pub serial: u64,
}

/// Summary returned by [`TrackingAllocator::status`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackingStatus {
    /// Number of blocks currently live.
    pub live_blocks: usize,
    /// Total bytes in live blocks.
    pub live_bytes: usize,
    /// Highest value `live_bytes` has reached.
    pub peak_bytes: usize,
    /// Number of successful `alloc` calls so far.
    pub total_allocs: u64,
}

/// A [`RawAllocator`] that tracks live blocks of an inner allocator.
///
/// Returning a block this allocator never handed out is a programmer error
/// and panics. Zero-sized blocks share a dangling address, so they are
/// counted but not tracked individually.
pub struct TrackingAllocator<A: RawAllocator> {
    inner: A,
    label: &'static str,
    blocks: IndexMap<usize, BlockInfo>,
    empty_blocks: usize,
    live_bytes: usize,
    peak_bytes: usize,
    serial: u64,
}

impl<A: RawAllocator> TrackingAllocator<A> {
    /// Wrap `inner`. `label` identifies this allocator in log output.
    pub fn new(inner: A, label: &'static str) -> Self {
        Self {
            inner,
            label,
            blocks: IndexMap::new(),
            empty_blocks: 0,
            live_bytes: 0,
            peak_bytes: 0,
            serial: 0,
        }
    }

    /// Total bytes currently live.
    pub fn amount(&self) -> usize {
        self.live_bytes
    }

    /// Number of blocks currently live.
    pub fn live_blocks(&self) -> usize {
        self.blocks.len() + self.empty_blocks
    }

    /// Snapshot of the allocator's counters.
    pub fn status(&self) -> TrackingStatus {
        TrackingStatus {
            live_blocks: self.live_blocks(),
            live_bytes: self.live_bytes,
            peak_bytes: self.peak_bytes,
            total_allocs: self.serial,
        }
    }

    /// Look up the live block starting at `addr`.
    pub fn report(&self, addr: usize) -> Option<BlockInfo> {
        let info = self.blocks.get(&addr).copied();
        match info {
            Some(info) => tracing::debug!(
                allocator = self.label,
                addr = info.addr,
                size = info.size,
                serial = info.serial,
                "live block"
            ),
            None => tracing::debug!(allocator = self.label, addr, "unknown block address"),
        }
        info
    }

    /// Shared access to the wrapped allocator.
    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: RawAllocator> RawAllocator for TrackingAllocator<A> {
    fn alloc(&mut self, size: usize) -> Result<Box<[u8]>, RawAllocError> {
        let block = self.inner.alloc(size)?;
        self.serial += 1;
        if block.is_empty() {
            self.empty_blocks += 1;
        } else {
            let addr = block.as_ptr() as usize;
            let previous = self.blocks.insert(
                addr,
                BlockInfo {
                    addr,
                    size: block.len(),
                    serial: self.serial,
                },
            );
            debug_assert!(previous.is_none(), "inner allocator returned a live address");
        }
        self.live_bytes += block.len();
        self.peak_bytes = self.peak_bytes.max(self.live_bytes);
        Ok(block)
    }

    fn dealloc(&mut self, block: Box<[u8]>) {
        if block.is_empty() {
            assert!(
                self.empty_blocks > 0,
                "[{}] deallocating a zero-sized block that was never allocated",
                self.label,
            );
            self.empty_blocks -= 1;
        } else {
            let addr = block.as_ptr() as usize;
            let info = self.blocks.swap_remove(&addr).unwrap_or_else(|| {
                panic!(
                    "[{}] invalid block address {addr:#x} ({} bytes) passed to dealloc",
                    self.label,
                    block.len(),
                )
            });
            assert_eq!(info.size, block.len(), "block size changed while live");
            self.live_bytes -= info.size;
        }
        self.inner.dealloc(block);
    }
}

impl<A: RawAllocator> Drop for TrackingAllocator<A> {
    fn drop(&mut self) {
        for info in self.blocks.values() {
            tracing::warn!(
                allocator = self.label,
                addr = info.addr,
                size = info.size,
                serial = info.serial,
                "block was never deallocated"
            );
        }
        if self.empty_blocks > 0 {
            tracing::warn!(
                allocator = self.label,
                count = self.empty_blocks,
                "zero-sized blocks were never deallocated"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::SystemAllocator;

    #[test]
    fn tracks_live_bytes_and_peak() {
        let mut raw = TrackingAllocator::new(SystemAllocator::new(), "test");
        let a = raw.alloc(100).unwrap();
        let b = raw.alloc(50).unwrap();
        assert_eq!(raw.amount(), 150);
        assert_eq!(raw.live_blocks(), 2);

        raw.dealloc(a);
        assert_eq!(raw.amount(), 50);
        let status = raw.status();
        assert_eq!(status.peak_bytes, 150);
        assert_eq!(status.total_allocs, 2);

        raw.dealloc(b);
        assert_eq!(raw.status().live_blocks, 0);
    }

    #[test]
    fn report_finds_block_by_address() {
        let mut raw = TrackingAllocator::new(SystemAllocator::new(), "test");
        let block = raw.alloc(64).unwrap();
        let addr = block.as_ptr() as usize;
        let info = raw.report(addr).unwrap();
        assert_eq!(info.size, 64);
        assert_eq!(info.serial, 1);
        raw.dealloc(block);
        assert!(raw.report(addr).is_none());
    }

    #[test]
    fn zero_sized_blocks_are_counted() {
        let mut raw = TrackingAllocator::new(SystemAllocator::new(), "test");
        let a = raw.alloc(0).unwrap();
        let b = raw.alloc(0).unwrap();
        assert_eq!(raw.live_blocks(), 2);
        raw.dealloc(a);
        raw.dealloc(b);
        assert_eq!(raw.live_blocks(), 0);
    }

    #[test]
    #[should_panic(expected = "invalid block address")]
    fn foreign_block_panics() {
        let mut raw = TrackingAllocator::new(SystemAllocator::new(), "test");
        raw.dealloc(vec![0u8; 8].into_boxed_slice());
    }
}
