//! Swiff: region-based scoped memory allocation for the Swiff player.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Swiff allocator sub-crates. For most users, adding `swiff` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use swiff::prelude::*;
//!
//! let mut scope = ScopeAllocator::new(SystemAllocator::new());
//!
//! // Session-lifetime data lives in the global region.
//! let symbol = scope.store_global(b"_root").unwrap();
//!
//! // Per-frame scratch lives in a local scope.
//! let mark = scope.enter_local();
//! let mut result = scope.store_local(b"frame result").unwrap();
//! for _ in 0..64 {
//!     let _scratch = scope.alloc_local(200).unwrap();
//! }
//! scope.leave_local(mark, &mut [&mut result]).unwrap();
//!
//! assert_eq!(scope.global(symbol).unwrap(), b"_root");
//! assert_eq!(scope.local(result).unwrap(), b"frame result");
//! scope.fini();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`raw`] | `swiff-core` | Raw allocator face, alignment, leak tracking |
//! | [`arena`] | `swiff-arena` | `ScopeAllocator`, handles, config, metrics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Raw memory face and shared primitives (`swiff-core`).
///
/// Implement [`raw::RawAllocator`] to feed the allocator from a custom
/// memory source, or wrap one in [`raw::TrackingAllocator`] to find leaks.
pub use swiff_core as raw;

/// The scope allocator (`swiff-arena`).
///
/// [`arena::ScopeAllocator`] owns both regions; [`arena::ScopeConfig`]
/// tunes arena and slack sizing.
pub use swiff_arena as arena;

/// Common imports for typical Swiff usage.
///
/// ```rust
/// use swiff::prelude::*;
/// ```
pub mod prelude {
    // Allocator
    pub use swiff_arena::{ScopeAllocator, ScopeConfig};

    // Handles
    pub use swiff_arena::{GlobalPtr, LocalPtr, Mark};

    // Inspection
    pub use swiff_arena::{ScopeMetrics, ScopeUsage};

    // Errors
    pub use swiff_arena::ScopeError;
    pub use swiff_core::RawAllocError;

    // Raw face
    pub use swiff_core::{RawAllocator, SystemAllocator, TrackingAllocator};
}
