//! Handles to allocations and scope marks.
//!
//! Allocations are never exposed as raw addresses. Each handle names the
//! arena it lives in by [`ArenaId`] and an offset within that arena, and all
//! access goes back through the [`ScopeAllocator`](crate::ScopeAllocator).
//! The arena generation lets a stale handle be detected in O(1) after its
//! arena has been released and the slot reused.

use std::fmt;

/// Identifies one arena slot at one point in time.
///
/// The slot `index` is reused once an arena is released; `generation` is
/// bumped on every release so handles into the old arena no longer resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ArenaId {
    /// The zero-capacity sentinel that terminates every chain.
    pub const SENTINEL: ArenaId = ArenaId {
        index: 0,
        generation: 0,
    };

    /// Slot index within the arena table.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this id was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Whether this is the sentinel arena.
    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arena#{}@{}", self.index, self.generation)
    }
}

/// A long-lived allocation from the global region.
///
/// Valid until the allocator is torn down with
/// [`fini`](crate::ScopeAllocator::fini) or dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct GlobalPtr {
    pub(crate) arena: ArenaId,
    pub(crate) offset: usize,
    pub(crate) len: usize,
}

impl GlobalPtr {
    /// The arena holding this allocation.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// Byte offset of the allocation within its arena.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Requested length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this is a zero-length allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for GlobalPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalPtr({}, off={}, len={})", self.arena, self.offset, self.len)
    }
}

/// A scope-bounded allocation from the local region.
///
/// The allocation's length is stored in a size header just before
/// `offset` inside the arena, so the handle itself stays two words wide.
/// A `LocalPtr` is valid until the scope it was allocated in is left,
/// unless it is passed as an escape to that
/// [`leave_local`](crate::ScopeAllocator::leave_local) call, which rewrites
/// it to the rescued location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct LocalPtr {
    pub(crate) arena: ArenaId,
    pub(crate) offset: usize,
}

impl LocalPtr {
    /// The arena holding this allocation.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// Byte offset of the allocation's payload within its arena.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for LocalPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalPtr({}, off={})", self.arena, self.offset)
    }
}

/// The local region's cursor at the moment a scope was entered.
///
/// Returned by [`enter_local`](crate::ScopeAllocator::enter_local) and
/// consumed by the matching
/// [`leave_local`](crate::ScopeAllocator::leave_local). Marks must be left
/// in LIFO order; a mark whose scope was already left is rejected when it
/// can be detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct Mark {
    pub(crate) arena: ArenaId,
    pub(crate) offset: usize,
}

impl Mark {
    /// The arena that was on top of the local region.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// The top arena's cursor when the scope began.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mark({}, off={})", self.arena, self.offset)
    }
}
