//! The local region: a stack of scopes released in bulk.
//!
//! A scope starts at a [`Mark`] (the top arena's cursor) and ends when
//! [`leave_local`](crate::ScopeAllocator::leave_local) cuts the chain back
//! to that mark. Everything allocated in between is discarded at once,
//! except the escapes the caller names: those are rescued into the
//! surviving region and the caller's handles are rewritten to point at the
//! rescued copies.
//!
//! Every local allocation is laid out as
//!
//! ```text
//! | size header (LOCAL_HEADER_SIZE) | payload (aligned) |
//!                                   ^ LocalPtr::offset
//! ```
//!
//! so the rescue path can find how many bytes to copy from the handle alone.

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use swiff_core::{align_up, RawAllocator, ALIGNMENT};

use crate::arena::{Arena, SENTINEL};
use crate::error::ScopeError;
use crate::handle::{ArenaId, LocalPtr, Mark};
use crate::pool::ArenaPool;

/// Bytes reserved in front of every local allocation for its size.
pub const LOCAL_HEADER_SIZE: usize = ALIGNMENT;

const LEN_BYTES: usize = std::mem::size_of::<u64>();

/// Bytes a local allocation of `len` payload bytes occupies in its arena.
pub(crate) fn footprint(len: usize) -> Option<usize> {
    align_up(len)?.checked_add(LOCAL_HEADER_SIZE)
}

fn write_header(arena: &mut Arena, start: usize, len: usize) {
    arena
        .slice_mut(start, LEN_BYTES)
        .copy_from_slice(&(len as u64).to_le_bytes());
}

fn read_header(arena: &Arena, offset: usize) -> usize {
    let mut bytes = [0u8; LEN_BYTES];
    bytes.copy_from_slice(arena.slice(offset - LOCAL_HEADER_SIZE, LEN_BYTES));
    usize::try_from(u64::from_le_bytes(bytes)).unwrap_or(usize::MAX)
}

/// Payload length of the allocation at `offset`, checked against the
/// arena's used region.
pub(crate) fn payload_len(arena: &Arena, id: ArenaId, offset: usize) -> Result<usize, ScopeError> {
    let out_of_bounds = || ScopeError::OutOfBounds {
        arena: id,
        offset,
        used: arena.used(),
    };
    if offset < LOCAL_HEADER_SIZE || offset > arena.used() {
        return Err(out_of_bounds());
    }
    let len = read_header(arena, offset);
    if len > arena.used() - offset {
        return Err(out_of_bounds());
    }
    Ok(len)
}

/// Escaping allocations found in one detached arena.
type Escapes = SmallVec<[(LocalPtr, usize); 4]>;

/// Chain of local arenas, top first.
pub(crate) struct LocalRegion {
    top: u32,
}

impl LocalRegion {
    pub(crate) fn new() -> Self {
        Self { top: SENTINEL }
    }

    pub(crate) fn top(&self) -> u32 {
        self.top
    }

    /// Capture the current top of the region.
    pub(crate) fn enter<A: RawAllocator>(&self, pool: &ArenaPool<A>) -> Mark {
        Mark {
            arena: pool.table.id(self.top),
            offset: pool.table.get(self.top).used(),
        }
    }

    /// Allocate `size` bytes in the innermost open scope.
    pub(crate) fn alloc<A: RawAllocator>(
        &mut self,
        pool: &mut ArenaPool<A>,
        size: usize,
    ) -> Result<LocalPtr, ScopeError> {
        let total = footprint(size).ok_or(ScopeError::SizeOverflow { requested: size })?;
        if pool.table.get(self.top).remaining() < total {
            self.top = pool.acquire(total, self.top)?;
        }
        let arena = pool.table.get_mut(self.top);
        let start = arena
            .bump(total)
            .expect("a freshly acquired arena always fits its hint");
        write_header(arena, start, size);
        Ok(LocalPtr {
            arena: pool.table.id(self.top),
            offset: start + LOCAL_HEADER_SIZE,
        })
    }

    /// Close every scope opened since `mark`, rescuing `escapes`.
    ///
    /// An escape is rescued when it points into storage the scope discards:
    /// an arena linked after the mark, or the mark's own arena at or past
    /// the mark. Any other handle is left untouched. Rescued handles are
    /// rewritten in place; repeated handles share one rescued copy.
    pub(crate) fn leave<A: RawAllocator>(
        &mut self,
        pool: &mut ArenaPool<A>,
        mark: Mark,
        escapes: &mut [&mut LocalPtr],
    ) -> Result<(), ScopeError> {
        // Arenas newer than the mark, newest first.
        let mut detached: SmallVec<[u32; 4]> = SmallVec::new();
        let mut index = self.top;
        while pool.table.id(index) != mark.arena {
            if index == SENTINEL {
                return Err(ScopeError::InvalidMark { mark });
            }
            detached.push(index);
            index = pool.table.get(index).prev();
        }
        let save = index;
        if mark.offset > pool.table.get(save).used() {
            return Err(ScopeError::InvalidMark { mark });
        }

        // Validate and sort the escapes before anything is mutated.
        let mut seen: IndexSet<LocalPtr> = IndexSet::with_capacity(escapes.len());
        let mut in_save: SmallVec<[(LocalPtr, usize); 8]> = SmallVec::new();
        let mut by_arena: IndexMap<u32, Escapes> = IndexMap::new();
        for escape in escapes.iter() {
            let ptr = **escape;
            if !seen.insert(ptr) {
                continue;
            }
            if ptr.arena == mark.arena {
                if ptr.offset < mark.offset + LOCAL_HEADER_SIZE {
                    continue;
                }
                let len = payload_len(pool.table.get(save), ptr.arena, ptr.offset)?;
                in_save.push((ptr, len));
            } else if let Some(&owner) = detached.iter().find(|&&i| pool.table.id(i) == ptr.arena) {
                let len = payload_len(pool.table.get(owner), ptr.arena, ptr.offset)?;
                by_arena.entry(owner).or_default().push((ptr, len));
            }
        }

        self.top = save;
        pool.table.get_mut(save).reset(mark.offset);

        let mut moved: IndexMap<LocalPtr, LocalPtr> = IndexMap::with_capacity(seen.len());
        self.compact(pool, save, &mut in_save, &mut moved);

        let mut spliced: SmallVec<[u32; 2]> = SmallVec::new();
        let result = self.rescue_detached(pool, &detached, &by_arena, &mut moved, &mut spliced);

        // Splice oldest first so the newest oversized arena ends on top.
        for &index in spliced.iter().rev() {
            pool.table.get_mut(index).set_prev(self.top);
            self.top = index;
        }
        pool.metrics.arenas_spliced += spliced.len() as u64;

        for escape in escapes.iter_mut() {
            if let Some(&rescued) = moved.get(&**escape) {
                **escape = rescued;
            }
        }
        result?;

        pool.metrics.scopes_left += 1;
        tracing::trace!(
            %mark,
            detached = detached.len(),
            rescued = moved.len(),
            spliced = spliced.len(),
            "left local scope"
        );
        Ok(())
    }

    /// Slide escapes that live in the mark's own arena down to the mark.
    ///
    /// Sources are visited in address order, so every destination lies at
    /// or below its source and never overwrites a source still to come.
    fn compact<A: RawAllocator>(
        &mut self,
        pool: &mut ArenaPool<A>,
        save: u32,
        in_save: &mut [(LocalPtr, usize)],
        moved: &mut IndexMap<LocalPtr, LocalPtr>,
    ) {
        in_save.sort_unstable_by_key(|(ptr, _)| ptr.offset);
        let id = pool.table.id(save);
        for &(ptr, len) in in_save.iter() {
            let total = footprint(len).expect("validated lengths have a finite footprint");
            let src = ptr.offset - LOCAL_HEADER_SIZE;
            let arena = pool.table.get_mut(save);
            let dst = arena
                .bump(total)
                .expect("escapes are distinct allocations of the closed scope");
            debug_assert!(dst <= src, "compaction never moves an escape upwards");
            if dst != src {
                arena.copy_within(src, LOCAL_HEADER_SIZE + len, dst);
                pool.metrics.bytes_rescued += len as u64;
                pool.metrics.escapes_moved += 1;
            }
            moved.insert(
                ptr,
                LocalPtr {
                    arena: id,
                    offset: dst + LOCAL_HEADER_SIZE,
                },
            );
        }
    }

    /// Release, copy out of, or mark for splicing each detached arena.
    ///
    /// On failure every arena not yet handled is still released, so the
    /// region stays consistent and nothing leaks.
    fn rescue_detached<A: RawAllocator>(
        &mut self,
        pool: &mut ArenaPool<A>,
        detached: &[u32],
        by_arena: &IndexMap<u32, Escapes>,
        moved: &mut IndexMap<LocalPtr, LocalPtr>,
        spliced: &mut SmallVec<[u32; 2]>,
    ) -> Result<(), ScopeError> {
        for (pos, &index) in detached.iter().enumerate() {
            let Some(escaping) = by_arena.get(&index) else {
                pool.release(index);
                pool.metrics.arenas_released += 1;
                continue;
            };
            if pool.is_oversized(index) {
                tracing::trace!(arena = %pool.table.id(index), "splicing oversized arena");
                spliced.push(index);
                continue;
            }

            let source = pool.table.remove(index);
            for &(ptr, len) in escaping {
                let rescued = match self.alloc(pool, len) {
                    Ok(rescued) => rescued,
                    Err(err) => {
                        pool.recycle(source);
                        for &rest in &detached[pos + 1..] {
                            pool.release(rest);
                        }
                        return Err(err);
                    }
                };
                pool.table
                    .get_mut(rescued.arena.index)
                    .slice_mut(rescued.offset, len)
                    .copy_from_slice(source.slice(ptr.offset, len));
                pool.metrics.bytes_rescued += len as u64;
                pool.metrics.escapes_moved += 1;
                moved.insert(ptr, rescued);
            }
            pool.recycle(source);
            pool.metrics.arenas_released += 1;
        }
        Ok(())
    }

    /// Release every local arena to the raw allocator.
    pub(crate) fn free<A: RawAllocator>(&mut self, pool: &mut ArenaPool<A>) -> usize {
        let count = pool.free_chain(self.top);
        self.top = SENTINEL;
        count
    }
}
