//! Bump-allocated arenas and the slot table that links them into chains.
//!
//! An [`Arena`] is one raw block with a cursor that advances on each
//! allocation. Arenas live in an [`ArenaTable`] and refer to the next-older
//! arena of their chain by slot index, so a region is a singly linked list
//! threaded through the table. Slot 0 holds the zero-capacity sentinel that
//! terminates every chain.

use crate::handle::ArenaId;

/// Slot index of the sentinel arena.
pub(crate) const SENTINEL: u32 = 0;

/// A single contiguous block with bump allocation.
pub(crate) struct Arena {
    /// Backing storage obtained from the raw allocator.
    data: Box<[u8]>,
    /// Bump cursor: bytes `[0, avail)` are in use.
    avail: usize,
    /// Next-older arena in the same chain.
    prev: u32,
}

impl Arena {
    /// Wrap a raw block as an empty arena linked above `prev`.
    pub(crate) fn new(data: Box<[u8]>, prev: u32) -> Self {
        Self {
            data,
            avail: 0,
            prev,
        }
    }

    fn sentinel() -> Self {
        Self {
            data: Box::default(),
            avail: 0,
            prev: SENTINEL,
        }
    }

    /// Bump-allocate `len` bytes, returning the start offset, or `None` if
    /// the remaining capacity is too small.
    pub(crate) fn bump(&mut self, len: usize) -> Option<usize> {
        let new_avail = self.avail.checked_add(len)?;
        if new_avail > self.data.len() {
            return None;
        }
        let start = self.avail;
        self.avail = new_avail;
        Some(start)
    }

    /// Move the cursor back to `cursor`, discarding everything above it.
    pub(crate) fn reset(&mut self, cursor: usize) {
        debug_assert!(cursor <= self.avail, "reset cannot grow the used region");
        self.avail = cursor;
    }

    /// Mark the whole arena as used.
    pub(crate) fn exhaust(&mut self) {
        self.avail = self.data.len();
    }

    /// Shared slice of `len` bytes at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len` exceeds the arena's capacity.
    pub(crate) fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }

    /// Mutable slice of `len` bytes at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len` exceeds the arena's capacity.
    pub(crate) fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.data[offset..offset + len]
    }

    /// Copy `len` bytes from `src` to `dst` within this arena.
    pub(crate) fn copy_within(&mut self, src: usize, len: usize, dst: usize) {
        self.data.copy_within(src..src + len, dst);
    }

    /// Bytes currently in use.
    pub(crate) fn used(&self) -> usize {
        self.avail
    }

    /// Total capacity in bytes.
    pub(crate) fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Remaining free capacity in bytes.
    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.avail
    }

    pub(crate) fn prev(&self) -> u32 {
        self.prev
    }

    pub(crate) fn set_prev(&mut self, prev: u32) {
        self.prev = prev;
    }

    /// Give the backing block back, for caching or deallocation.
    pub(crate) fn into_block(self) -> Box<[u8]> {
        self.data
    }
}

struct Slot {
    generation: u32,
    arena: Option<Arena>,
}

/// Generation-tracked storage for every arena an allocator owns.
///
/// Vacated slots are reused; each vacancy bumps the slot's generation so
/// ids issued for the previous occupant stop resolving.
pub(crate) struct ArenaTable {
    slots: Vec<Slot>,
    vacant: Vec<u32>,
}

impl ArenaTable {
    /// Create a table holding only the sentinel.
    pub(crate) fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                arena: Some(Arena::sentinel()),
            }],
            vacant: Vec::new(),
        }
    }

    /// Store `arena` in a free slot and return its id.
    pub(crate) fn insert(&mut self, arena: Arena) -> ArenaId {
        if let Some(index) = self.vacant.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.arena.is_none());
            slot.arena = Some(arena);
            ArenaId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                arena: Some(arena),
            });
            ArenaId {
                index,
                generation: 0,
            }
        }
    }

    /// Take the arena out of `index`, vacating the slot.
    pub(crate) fn remove(&mut self, index: u32) -> Arena {
        debug_assert_ne!(index, SENTINEL, "the sentinel is never removed");
        let slot = &mut self.slots[index as usize];
        let arena = slot
            .arena
            .take()
            .expect("chain links always refer to occupied slots");
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(index);
        arena
    }

    /// The arena linked at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the slot is vacant; chain links never point at one.
    pub(crate) fn get(&self, index: u32) -> &Arena {
        self.slots[index as usize]
            .arena
            .as_ref()
            .expect("chain links always refer to occupied slots")
    }

    /// Mutable access to the arena linked at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the slot is vacant.
    pub(crate) fn get_mut(&mut self, index: u32) -> &mut Arena {
        self.slots[index as usize]
            .arena
            .as_mut()
            .expect("chain links always refer to occupied slots")
    }

    /// The current id of the occupied slot `index`.
    pub(crate) fn id(&self, index: u32) -> ArenaId {
        ArenaId {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    /// Resolve an id, returning `None` if its arena has been released.
    pub(crate) fn resolve(&self, id: ArenaId) -> Option<&Arena> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.arena.as_ref()
    }

    /// Mutable variant of [`resolve`](Self::resolve).
    pub(crate) fn resolve_mut(&mut self, id: ArenaId) -> Option<&mut Arena> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.arena.as_mut()
    }

    /// Whether `id` still names a live arena.
    #[cfg(test)]
    pub(crate) fn is_live(&self, id: ArenaId) -> bool {
        self.resolve(id).is_some()
    }

    /// Iterate a chain from `top` down to, but excluding, the sentinel.
    pub(crate) fn chain(&self, top: u32) -> impl Iterator<Item = (u32, &Arena)> + '_ {
        let mut index = top;
        std::iter::from_fn(move || {
            if index == SENTINEL {
                return None;
            }
            let current = index;
            let arena = self.get(current);
            index = arena.prev();
            Some((current, arena))
        })
    }

    /// Number of live arenas, excluding the sentinel.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - 1 - self.vacant.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(len: usize) -> Box<[u8]> {
        vec![0u8; len].into_boxed_slice()
    }

    #[test]
    fn bump_sequential_offsets() {
        let mut arena = Arena::new(block(1024), SENTINEL);
        assert_eq!(arena.bump(100), Some(0));
        assert_eq!(arena.bump(200), Some(100));
        assert_eq!(arena.used(), 300);
        assert_eq!(arena.remaining(), 724);
    }

    #[test]
    fn bump_fails_when_full() {
        let mut arena = Arena::new(block(100), SENTINEL);
        assert!(arena.bump(100).is_some());
        assert!(arena.bump(1).is_none());
        assert_eq!(arena.bump(0), Some(100));
    }

    #[test]
    fn bump_overflow_is_none() {
        let mut arena = Arena::new(block(16), SENTINEL);
        arena.bump(8).unwrap();
        assert!(arena.bump(usize::MAX).is_none());
    }

    #[test]
    fn reset_discards_above_cursor() {
        let mut arena = Arena::new(block(100), SENTINEL);
        arena.bump(80).unwrap();
        arena.reset(32);
        assert_eq!(arena.used(), 32);
        assert_eq!(arena.bump(16), Some(32));
    }

    #[test]
    fn sentinel_has_no_capacity() {
        let table = ArenaTable::new();
        let sentinel = table.get(SENTINEL);
        assert_eq!(sentinel.capacity(), 0);
        assert_eq!(sentinel.prev(), SENTINEL);
        assert_eq!(table.id(SENTINEL), ArenaId::SENTINEL);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn insert_links_and_resolves() {
        let mut table = ArenaTable::new();
        let a = table.insert(Arena::new(block(64), SENTINEL));
        let b = table.insert(Arena::new(block(64), a.index));
        assert_eq!(table.len(), 2);
        let chain: Vec<u32> = table.chain(b.index).map(|(i, _)| i).collect();
        assert_eq!(chain, vec![b.index, a.index]);
        assert!(table.is_live(a));
    }

    #[test]
    fn removed_slot_is_reused_with_new_generation() {
        let mut table = ArenaTable::new();
        let a = table.insert(Arena::new(block(64), SENTINEL));
        let arena = table.remove(a.index);
        assert_eq!(arena.capacity(), 64);
        assert!(!table.is_live(a));
        assert!(table.resolve(a).is_none());

        let b = table.insert(Arena::new(block(32), SENTINEL));
        assert_eq!(b.index, a.index);
        assert_ne!(b.generation, a.generation);
        assert_eq!(table.resolve(b).unwrap().capacity(), 32);
        assert!(table.resolve(a).is_none());
    }

    #[test]
    fn copy_within_moves_bytes_down() {
        let mut arena = Arena::new(block(64), SENTINEL);
        arena.bump(64).unwrap();
        arena.slice_mut(32, 4).copy_from_slice(&[1, 2, 3, 4]);
        arena.copy_within(32, 4, 0);
        assert_eq!(arena.slice(0, 4), &[1, 2, 3, 4]);
    }
}
