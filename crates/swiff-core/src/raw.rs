//! The injectable raw memory face.
//!
//! Every arena in the workspace is obtained from a [`RawAllocator`] supplied
//! by the embedding application. Allocators built on top of it never touch
//! the global heap directly, which lets the embedder pool, instrument, or
//! cap memory without changing the allocator code.

use crate::error::RawAllocError;

/// A source of raw memory blocks.
///
/// The implementing value is the allocator's context: whatever state an
/// embedder needs (counters, pools, budgets) lives in `self`. Blocks are
/// returned to [`dealloc`](RawAllocator::dealloc) by value, so a block can
/// only ever be released once.
pub trait RawAllocator {
    /// Obtain a block of exactly `size` bytes.
    ///
    /// The contents of the block are unspecified. Returns
    /// [`RawAllocError::Exhausted`] if the request cannot be satisfied.
    fn alloc(&mut self, size: usize) -> Result<Box<[u8]>, RawAllocError>;

    /// Return a block previously obtained from [`alloc`](RawAllocator::alloc).
    fn dealloc(&mut self, block: Box<[u8]>);
}

impl<A: RawAllocator + ?Sized> RawAllocator for &mut A {
    fn alloc(&mut self, size: usize) -> Result<Box<[u8]>, RawAllocError> {
        (**self).alloc(size)
    }

    fn dealloc(&mut self, block: Box<[u8]>) {
        (**self).dealloc(block)
    }
}

impl<A: RawAllocator + ?Sized> RawAllocator for Box<A> {
    fn alloc(&mut self, size: usize) -> Result<Box<[u8]>, RawAllocError> {
        (**self).alloc(size)
    }

    fn dealloc(&mut self, block: Box<[u8]>) {
        (**self).dealloc(block)
    }
}

/// Raw allocator backed by the global heap.
///
/// Blocks are zero-filled. Allocation uses `try_reserve_exact`, so heap
/// exhaustion is reported as [`RawAllocError::Exhausted`] rather than
/// aborting the process.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Create a new system allocator.
    pub fn new() -> Self {
        Self
    }
}

impl RawAllocator for SystemAllocator {
    fn alloc(&mut self, size: usize) -> Result<Box<[u8]>, RawAllocError> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| RawAllocError::Exhausted { requested: size })?;
        data.resize(size, 0);
        Ok(data.into_boxed_slice())
    }

    fn dealloc(&mut self, block: Box<[u8]>) {
        drop(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_alloc_returns_exact_zeroed_block() {
        let mut raw = SystemAllocator::new();
        let block = raw.alloc(4040).unwrap();
        assert_eq!(block.len(), 4040);
        assert!(block.iter().all(|&b| b == 0));
        raw.dealloc(block);
    }

    #[test]
    fn system_alloc_zero_size_is_valid() {
        let mut raw = SystemAllocator::new();
        let block = raw.alloc(0).unwrap();
        assert!(block.is_empty());
        raw.dealloc(block);
    }

    #[test]
    fn impossible_request_reports_exhaustion() {
        let mut raw = SystemAllocator::new();
        let result = raw.alloc(usize::MAX);
        assert_eq!(
            result.unwrap_err(),
            RawAllocError::Exhausted {
                requested: usize::MAX
            }
        );
    }

    fn round_trip<A: RawAllocator>(mut raw: A, size: usize) {
        let block = raw.alloc(size).unwrap();
        assert_eq!(block.len(), size);
        raw.dealloc(block);
    }

    #[test]
    fn mut_ref_forwards_to_inner() {
        let mut raw = SystemAllocator::new();
        round_trip(&mut raw, 32);
        round_trip(&mut raw, 0);
    }

    #[test]
    fn boxed_trait_object_forwards_to_inner() {
        let mut raw: Box<dyn RawAllocator> = Box::new(SystemAllocator::new());
        let block = raw.alloc(64).unwrap();
        assert_eq!(block.len(), 64);
        raw.dealloc(block);
    }
}
