//! The global region: session-lifetime bump allocation with slack recycling.
//!
//! Global allocations are never freed individually. When the top global
//! arena cannot satisfy a request, its unused tail is cut into size-class
//! blocks and pushed onto [`SlackLists`] before a new arena is linked.
//! Later requests check those lists first, so the tail is not wasted.

use swiff_core::{align_down, align_up, RawAllocator};

use crate::arena::SENTINEL;
use crate::error::ScopeError;
use crate::handle::{ArenaId, GlobalPtr};
use crate::metrics::ScopeMetrics;
use crate::pool::ArenaPool;

/// A recycled block waiting on a size-class list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SlackBlock {
    arena: ArenaId,
    offset: usize,
}

/// Per-size-class free lists fed by arena slack.
pub(crate) struct SlackLists {
    classes: Vec<usize>,
    lists: Vec<Vec<SlackBlock>>,
}

impl SlackLists {
    pub(crate) fn new(classes: &[usize]) -> Self {
        Self {
            classes: classes.to_vec(),
            lists: vec![Vec::new(); classes.len()],
        }
    }

    /// Cut `[offset, offset + size)` of `arena` into size-class blocks.
    ///
    /// Blocks are carved from the end of the range, largest class first.
    /// Whatever is smaller than the smallest class is dropped.
    pub(crate) fn donate(
        &mut self,
        arena: ArenaId,
        offset: usize,
        size: usize,
        metrics: &mut ScopeMetrics,
    ) {
        let mut size = align_down(size);
        for (class, list) in self.classes.iter().zip(self.lists.iter_mut()).rev() {
            while size >= *class {
                size -= class;
                list.push(SlackBlock {
                    arena,
                    offset: offset + size,
                });
                metrics.slack_donated += 1;
            }
        }
    }

    /// Pop a block from the smallest non-empty class that holds `size`
    /// aligned bytes. The unused front of the block is donated back.
    pub(crate) fn take(
        &mut self,
        size: usize,
        metrics: &mut ScopeMetrics,
    ) -> Option<(ArenaId, usize)> {
        let class_index = self
            .classes
            .iter()
            .zip(&self.lists)
            .position(|(&class, list)| class >= size && !list.is_empty())?;
        let block = self.lists[class_index].pop()?;
        let left = self.classes[class_index] - size;
        self.donate(block.arena, block.offset, left, metrics);
        Some((block.arena, block.offset + left))
    }

    /// Drop every block.
    pub(crate) fn clear(&mut self) {
        for list in &mut self.lists {
            list.clear();
        }
    }

    /// Number of blocks on all lists.
    pub(crate) fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    /// Total bytes held on all lists.
    pub(crate) fn bytes(&self) -> usize {
        self.classes
            .iter()
            .zip(&self.lists)
            .map(|(class, list)| class * list.len())
            .sum()
    }

    /// Number of blocks per class, in class order.
    #[cfg(test)]
    pub(crate) fn counts(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }
}

/// Chain of global arenas plus their slack lists.
pub(crate) struct GlobalRegion {
    top: u32,
    pub(crate) slack: SlackLists,
}

impl GlobalRegion {
    pub(crate) fn new(classes: &[usize]) -> Self {
        Self {
            top: SENTINEL,
            slack: SlackLists::new(classes),
        }
    }

    pub(crate) fn top(&self) -> u32 {
        self.top
    }

    /// Allocate `size` bytes that live until the allocator is torn down.
    pub(crate) fn alloc<A: RawAllocator>(
        &mut self,
        pool: &mut ArenaPool<A>,
        size: usize,
    ) -> Result<GlobalPtr, ScopeError> {
        let aligned = align_up(size).ok_or(ScopeError::SizeOverflow { requested: size })?;

        if aligned > 0 {
            if let Some((arena, offset)) = self.slack.take(aligned, &mut pool.metrics) {
                pool.metrics.slack_reused += 1;
                return Ok(GlobalPtr {
                    arena,
                    offset,
                    len: size,
                });
            }
        }

        if pool.table.get(self.top).remaining() < aligned {
            let top_id = pool.table.id(self.top);
            let top = pool.table.get_mut(self.top);
            let (tail, rem) = (top.used(), top.remaining());
            top.exhaust();
            self.slack.donate(top_id, tail, rem, &mut pool.metrics);
            self.top = pool.acquire(aligned, self.top)?;
        }

        let offset = pool
            .table
            .get_mut(self.top)
            .bump(aligned)
            .expect("a freshly acquired arena always fits its hint");
        Ok(GlobalPtr {
            arena: pool.table.id(self.top),
            offset,
            len: size,
        })
    }

    /// Release every global arena to the raw allocator.
    pub(crate) fn free<A: RawAllocator>(&mut self, pool: &mut ArenaPool<A>) -> usize {
        let count = pool.free_chain(self.top);
        self.top = SENTINEL;
        self.slack.clear();
        count
    }
}
