//! Test utilities and fake raw allocators for Swiff development.
//!
//! Provides [`RawAllocator`] implementations that make allocator behaviour
//! observable from tests, plus the raw fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use swiff_core::{RawAllocError, RawAllocator, SystemAllocator};

pub use fixtures::{
    FailingAllocator, PoisoningAllocator, TruncatingAllocator, FRESH_BYTE, POISON_BYTE,
};

/// Raw allocator that counts calls and live bytes of an inner allocator.
///
/// Wraps [`SystemAllocator`] by default. Inspect the counters after
/// driving the code under test, typically through the owning allocator's
/// `raw()` accessor.
#[derive(Debug, Default)]
pub struct CountingAllocator<A: RawAllocator = SystemAllocator> {
    inner: A,
    allocs: usize,
    deallocs: usize,
    live_bytes: usize,
    peak_bytes: usize,
}

impl CountingAllocator<SystemAllocator> {
    pub fn new() -> Self {
        Self::wrap(SystemAllocator::new())
    }
}

impl<A: RawAllocator> CountingAllocator<A> {
    /// Count the traffic of `inner`.
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            allocs: 0,
            deallocs: 0,
            live_bytes: 0,
            peak_bytes: 0,
        }
    }

    /// Successful `alloc` calls so far.
    pub fn allocs(&self) -> usize {
        self.allocs
    }

    /// `dealloc` calls so far.
    pub fn deallocs(&self) -> usize {
        self.deallocs
    }

    /// Blocks handed out and not yet returned.
    pub fn live(&self) -> usize {
        self.allocs - self.deallocs
    }

    /// Bytes handed out and not yet returned.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    /// Highest value `live_bytes` has reached.
    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: RawAllocator> RawAllocator for CountingAllocator<A> {
    fn alloc(&mut self, size: usize) -> Result<Box<[u8]>, RawAllocError> {
        let block = self.inner.alloc(size)?;
        self.allocs += 1;
        self.live_bytes += block.len();
        self.peak_bytes = self.peak_bytes.max(self.live_bytes);
        Ok(block)
    }

    fn dealloc(&mut self, block: Box<[u8]>) {
        self.deallocs += 1;
        self.live_bytes -= block.len();
        self.inner.dealloc(block);
    }
}
