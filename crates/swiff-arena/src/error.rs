//! Scope allocator error types.

use std::error::Error;
use std::fmt;

use swiff_core::RawAllocError;

use crate::handle::{ArenaId, Mark};

/// Errors that can occur during scope allocator operations.
///
/// [`ScopeError::Exhausted`] and [`ScopeError::BadBlock`] are runtime
/// faults of the raw allocator. Every other variant reports a caller bug
/// (a mark or handle used outside its scope) that the allocator was able
/// to detect cheaply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeError {
    /// The raw allocator could not supply a new arena.
    Exhausted {
        /// Arena size in bytes that was requested from the raw allocator.
        requested: usize,
        /// The raw allocator's report.
        source: RawAllocError,
    },
    /// The raw allocator returned a block of the wrong length. The block
    /// was handed straight back to it.
    BadBlock {
        /// Block size in bytes that was requested.
        requested: usize,
        /// Length of the block actually returned.
        returned: usize,
    },
    /// The requested size overflows once rounded and headed.
    SizeOverflow {
        /// Number of bytes requested by the caller.
        requested: usize,
    },
    /// A [`ScopeConfig`](crate::ScopeConfig) failed validation.
    InvalidConfig {
        /// What was wrong with it.
        reason: String,
    },
    /// The mark does not belong to any open scope of this allocator.
    InvalidMark {
        /// The rejected mark.
        mark: Mark,
    },
    /// The handle names an arena that has since been released.
    StaleHandle {
        /// The arena named by the handle.
        arena: ArenaId,
    },
    /// The handle's range is not inside its arena's used region.
    OutOfBounds {
        /// The arena named by the handle.
        arena: ArenaId,
        /// Offset of the handle's payload.
        offset: usize,
        /// Bytes in use in the arena.
        used: usize,
    },
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { requested, .. } => {
                write!(f, "cannot acquire a {requested}-byte arena")
            }
            Self::BadBlock {
                requested,
                returned,
            } => {
                write!(
                    f,
                    "raw allocator returned {returned} bytes for a {requested}-byte arena"
                )
            }
            Self::SizeOverflow { requested } => {
                write!(f, "allocation size {requested} overflows")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid scope config: {reason}")
            }
            Self::InvalidMark { mark } => {
                write!(f, "{mark} does not belong to an open scope")
            }
            Self::StaleHandle { arena } => {
                write!(f, "stale handle: {arena} has been released")
            }
            Self::OutOfBounds {
                arena,
                offset,
                used,
            } => {
                write!(
                    f,
                    "handle at offset {offset} is outside the {used} used bytes of {arena}"
                )
            }
        }
    }
}

impl Error for ScopeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Exhausted { source, .. } => Some(source),
            _ => None,
        }
    }
}
