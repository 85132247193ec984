//! Free list of standard-sized arena blocks.
//!
//! [`ArenaCache`] holds blocks released by the local region so the next
//! standard acquisition can skip the raw allocator. Blocks only leave the
//! cache through [`ArenaCache::pop`] or [`ArenaCache::drain`]; there is no
//! implicit shrinking.

/// LIFO stack of recycled standard arena blocks.
#[derive(Default)]
pub struct ArenaCache {
    blocks: Vec<Box<[u8]>>,
}

impl ArenaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Push a block for later reuse.
    pub fn push(&mut self, block: Box<[u8]>) {
        self.blocks.push(block);
    }

    /// Pop the most recently cached block.
    pub fn pop(&mut self) -> Option<Box<[u8]>> {
        self.blocks.pop()
    }

    /// Remove every cached block.
    pub fn drain(&mut self) -> impl Iterator<Item = Box<[u8]>> + '_ {
        self.blocks.drain(..)
    }

    /// Number of cached blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the cache holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total bytes held by cached blocks.
    pub fn memory_bytes(&self) -> usize {
        self.blocks.iter().map(|b| b.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_returns_most_recent_block() {
        let mut cache = ArenaCache::new();
        cache.push(vec![1u8; 8].into_boxed_slice());
        cache.push(vec![2u8; 8].into_boxed_slice());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.pop().unwrap()[0], 2);
        assert_eq!(cache.pop().unwrap()[0], 1);
        assert!(cache.pop().is_none());
    }

    #[test]
    fn drain_empties_cache() {
        let mut cache = ArenaCache::new();
        cache.push(vec![0u8; 16].into_boxed_slice());
        cache.push(vec![0u8; 16].into_boxed_slice());
        assert_eq!(cache.memory_bytes(), 32);
        assert_eq!(cache.drain().count(), 2);
        assert!(cache.is_empty());
    }
}
