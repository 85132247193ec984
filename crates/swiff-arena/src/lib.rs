//! Region-based scoped memory allocator for the Swiff player.
//!
//! Two bump-allocated regions share one injected raw allocator:
//!
//! - **Global:** session-lifetime allocations. Never freed one by one; the
//!   unused tail of each exhausted arena is recycled through size-class
//!   slack lists.
//! - **Local:** a stack of nested scopes. Leaving a scope discards
//!   everything allocated in it at once, after rescuing the allocations
//!   the caller says must outlive it.
//!
//! # Architecture
//!
//! ```text
//! ScopeAllocator<A: RawAllocator>
//! ├── ArenaPool
//! │   ├── A (raw alloc/dealloc face)
//! │   ├── ArenaTable → Arena[] (slot 0 = zero-capacity sentinel)
//! │   └── ArenaCache (recycled standard blocks)
//! ├── GlobalRegion → chain + SlackLists
//! └── LocalRegion  → chain, cut back to a Mark on leave
//! ```
//!
//! # Handles
//!
//! Allocations are addressed by [`GlobalPtr`] / [`LocalPtr`] handles, never
//! by reference, so leaving a scope can move or release memory without
//! invalidating borrows. Every arena carries a generation; a handle to a
//! released arena resolves to [`ScopeError::StaleHandle`].
//!
//! ```rust
//! use swiff_arena::ScopeAllocator;
//!
//! let mut scope: ScopeAllocator = ScopeAllocator::default();
//! let mark = scope.enter_local();
//! let _scratch = scope.alloc_local(512).unwrap();
//! let mut result = scope.store_local(b"keep me").unwrap();
//! scope.leave_local(mark, &mut [&mut result]).unwrap();
//! assert_eq!(scope.local(result).unwrap(), b"keep me");
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod arena;
pub mod cache;
pub mod config;
pub mod error;
mod global;
pub mod handle;
pub mod local;
pub mod metrics;
mod pool;
pub mod scope;

// Public re-exports for the primary API surface.
pub use config::ScopeConfig;
pub use error::ScopeError;
pub use handle::{ArenaId, GlobalPtr, LocalPtr, Mark};
pub use local::LOCAL_HEADER_SIZE;
pub use metrics::{RegionUsage, ScopeMetrics, ScopeUsage};
pub use scope::ScopeAllocator;
