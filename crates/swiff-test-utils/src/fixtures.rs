//! Raw allocator fixtures for exercising failure and reuse paths.
//!
//! - [`PoisoningAllocator`]: fills fresh and freed blocks with marker
//!   bytes and hands freed blocks straight back out, so reads of released
//!   memory show up as poison.
//! - [`FailingAllocator`]: fails deterministically after N allocations.
//! - [`TruncatingAllocator`]: returns blocks one byte short.

use swiff_core::{RawAllocError, RawAllocator, SystemAllocator};

/// Byte written over every newly created block.
pub const FRESH_BYTE: u8 = 0xCD;

/// Byte written over every block returned to a [`PoisoningAllocator`].
pub const POISON_BYTE: u8 = 0xDD;

/// Scribbles over memory on both sides of its lifetime.
///
/// Returned blocks are poisoned and kept on a free list. A later request
/// of the same size gets the most recently freed block back, still full
/// of [`POISON_BYTE`], the way a real heap would recycle it.
#[derive(Debug, Default)]
pub struct PoisoningAllocator {
    freed: Vec<Box<[u8]>>,
    live: usize,
    reused: usize,
}

impl PoisoningAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks handed out and not yet returned.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Allocations served from a previously freed block.
    pub fn reused(&self) -> usize {
        self.reused
    }

    /// Freed blocks waiting to be handed out again.
    pub fn freed(&self) -> usize {
        self.freed.len()
    }
}

impl RawAllocator for PoisoningAllocator {
    fn alloc(&mut self, size: usize) -> Result<Box<[u8]>, RawAllocError> {
        self.live += 1;
        if let Some(pos) = self.freed.iter().rposition(|block| block.len() == size) {
            self.reused += 1;
            return Ok(self.freed.swap_remove(pos));
        }
        Ok(vec![FRESH_BYTE; size].into_boxed_slice())
    }

    fn dealloc(&mut self, mut block: Box<[u8]>) {
        block.fill(POISON_BYTE);
        self.live -= 1;
        self.freed.push(block);
    }
}

/// Succeeds for the first `limit` allocations, then reports exhaustion.
///
/// Deallocations are always accepted. The limit can be raised mid-test
/// with [`set_limit`](FailingAllocator::set_limit).
#[derive(Debug)]
pub struct FailingAllocator<A: RawAllocator = SystemAllocator> {
    inner: A,
    limit: usize,
    allocs: usize,
    failures: usize,
}

impl FailingAllocator<SystemAllocator> {
    pub fn new(limit: usize) -> Self {
        Self::wrap(SystemAllocator::new(), limit)
    }
}

impl<A: RawAllocator> FailingAllocator<A> {
    pub fn wrap(inner: A, limit: usize) -> Self {
        Self {
            inner,
            limit,
            allocs: 0,
            failures: 0,
        }
    }

    /// Allow `limit` successful allocations in total.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    /// Successful allocations so far.
    pub fn allocs(&self) -> usize {
        self.allocs
    }

    /// Requests refused so far.
    pub fn failures(&self) -> usize {
        self.failures
    }
}

impl<A: RawAllocator> RawAllocator for FailingAllocator<A> {
    fn alloc(&mut self, size: usize) -> Result<Box<[u8]>, RawAllocError> {
        if self.allocs >= self.limit {
            self.failures += 1;
            return Err(RawAllocError::Exhausted { requested: size });
        }
        let block = self.inner.alloc(size)?;
        self.allocs += 1;
        Ok(block)
    }

    fn dealloc(&mut self, block: Box<[u8]>) {
        self.inner.dealloc(block);
    }
}

/// Hands out blocks one byte shorter than requested.
#[derive(Debug, Default)]
pub struct TruncatingAllocator {
    live: usize,
}

impl TruncatingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks handed out and not yet returned.
    pub fn live(&self) -> usize {
        self.live
    }
}

impl RawAllocator for TruncatingAllocator {
    fn alloc(&mut self, size: usize) -> Result<Box<[u8]>, RawAllocError> {
        self.live += 1;
        Ok(vec![0u8; size.saturating_sub(1)].into_boxed_slice())
    }

    fn dealloc(&mut self, _block: Box<[u8]>) {
        self.live -= 1;
    }
}
