//! Error type for the raw memory face.

use std::error::Error;
use std::fmt;

/// Failure reported by a [`RawAllocator`](crate::RawAllocator).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawAllocError {
    /// The underlying memory source cannot satisfy the request.
    Exhausted {
        /// Number of bytes requested.
        requested: usize,
    },
}

impl fmt::Display for RawAllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { requested } => {
                write!(f, "raw allocator exhausted: requested {requested} bytes")
            }
        }
    }
}

impl Error for RawAllocError {}
