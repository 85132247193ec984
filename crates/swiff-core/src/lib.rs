//! Core memory primitives for the Swiff player.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! raw memory face that every allocator in the workspace is built on:
//!
//! - [`RawAllocator`]: the injected `alloc`/`dealloc` pair. The implementing
//!   value doubles as the allocator's context.
//! - [`SystemAllocator`]: the default face, backed by the global heap.
//! - [`TrackingAllocator`]: a wrapper that records every live block and
//!   reports leaks when it is dropped.
//! - [`align_up`] / [`align_down`]: the platform alignment rules shared by
//!   the global and local regions.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod align;
pub mod error;
pub mod raw;
pub mod tracking;

pub use align::{align_down, align_up, ALIGNMENT};
pub use error::RawAllocError;
pub use raw::{RawAllocator, SystemAllocator};
pub use tracking::{BlockInfo, TrackingAllocator, TrackingStatus};
