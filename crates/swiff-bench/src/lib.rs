//! Benchmark workloads for the Swiff scope allocator.
//!
//! Provides seeded frame generators that mimic what the player asks of the
//! allocator while rendering:
//!
//! - [`display_list_profile`]: shallow scopes, many small allocations, few
//!   escapes
//! - [`script_profile`]: deep nesting, mixed sizes, frequent escapes and
//!   the occasional oversized buffer
//! - [`generate_frame`] / [`run_frame`]: turn a profile into a
//!   deterministic op list and replay it against an allocator

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use swiff_arena::{LocalPtr, Mark, ScopeAllocator, ScopeError};
use swiff_core::RawAllocator;

/// Shape of one frame's allocator traffic.
#[derive(Clone, Debug)]
pub struct FrameProfile {
    /// Scopes opened per frame, counting nested ones.
    pub scopes: usize,
    /// Deepest nesting allowed.
    pub max_depth: usize,
    /// Local allocations per scope.
    pub allocs_per_scope: usize,
    /// Largest ordinary local request in bytes.
    pub max_local: usize,
    /// Chance in percent that an allocation escapes its scope.
    pub escape_percent: u32,
    /// Chance in percent that an allocation is oversized.
    pub oversized_percent: u32,
    /// Global allocations per frame.
    pub globals: usize,
}

/// Shallow scopes full of small display-list records.
pub fn display_list_profile() -> FrameProfile {
    FrameProfile {
        scopes: 16,
        max_depth: 2,
        allocs_per_scope: 64,
        max_local: 256,
        escape_percent: 2,
        oversized_percent: 0,
        globals: 4,
    }
}

/// Deeply nested script evaluation with larger temporaries.
pub fn script_profile() -> FrameProfile {
    FrameProfile {
        scopes: 32,
        max_depth: 8,
        allocs_per_scope: 24,
        max_local: 2048,
        escape_percent: 15,
        oversized_percent: 1,
        globals: 16,
    }
}

/// One step of a generated frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeOp {
    /// Open a scope.
    Enter,
    /// Allocate in the innermost scope; `escapes` marks it for rescue.
    Local {
        /// Requested bytes.
        size: usize,
        /// Whether the allocation is passed as an escape on leave.
        escapes: bool,
    },
    /// Allocate in the global region.
    Global {
        /// Requested bytes.
        size: usize,
    },
    /// Close the innermost scope.
    Leave,
}

/// Generate a deterministic op list for one frame.
///
/// Every `Enter` is matched by a `Leave`, so replaying the list leaves the
/// local region where it started.
pub fn generate_frame(profile: &FrameProfile, seed: u64) -> Vec<ScopeOp> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut ops = Vec::new();
    let mut depth = 0usize;

    for _ in 0..profile.scopes {
        // Unwind a random number of levels before going deeper again.
        if depth >= profile.max_depth || (depth > 0 && rng.random_bool(0.5)) {
            let pops = rng.random_range(1..=depth);
            for _ in 0..pops {
                ops.push(ScopeOp::Leave);
            }
            depth -= pops;
        }
        ops.push(ScopeOp::Enter);
        depth += 1;

        for _ in 0..profile.allocs_per_scope {
            let size = if rng.random_range(0..100) < profile.oversized_percent {
                rng.random_range(8_192..32_768)
            } else {
                rng.random_range(0..=profile.max_local)
            };
            let escapes = rng.random_range(0..100) < profile.escape_percent;
            ops.push(ScopeOp::Local { size, escapes });
        }
    }
    for _ in 0..depth {
        ops.push(ScopeOp::Leave);
    }

    for _ in 0..profile.globals {
        ops.push(ScopeOp::Global {
            size: rng.random_range(1..=512),
        });
    }
    ops
}

/// Replay `ops` against `scope`, returning the number of bytes requested.
///
/// Escaping allocations are handed to the enclosing scope, so they are
/// rescued at every level until the outermost scope of the frame discards
/// them.
pub fn run_frame<A: RawAllocator>(
    scope: &mut ScopeAllocator<A>,
    ops: &[ScopeOp],
) -> Result<usize, ScopeError> {
    let mut stack: Vec<(Mark, Vec<LocalPtr>)> = Vec::new();
    let mut requested = 0;

    for op in ops {
        match *op {
            ScopeOp::Enter => stack.push((scope.enter_local(), Vec::new())),
            ScopeOp::Local { size, escapes } => {
                let ptr = scope.alloc_local(size)?;
                requested += size;
                if escapes {
                    if let Some((_, escaping)) = stack.last_mut() {
                        escaping.push(ptr);
                    }
                }
            }
            ScopeOp::Global { size } => {
                let _ = scope.alloc_global(size)?;
                requested += size;
            }
            ScopeOp::Leave => {
                let Some((mark, mut escaping)) = stack.pop() else {
                    continue;
                };
                match stack.last_mut() {
                    Some((_, parent)) => {
                        let mut refs: Vec<&mut LocalPtr> = escaping.iter_mut().collect();
                        scope.leave_local(mark, &mut refs)?;
                        parent.extend(escaping);
                    }
                    None => scope.leave_local(mark, &mut [])?,
                }
            }
        }
    }
    Ok(requested)
}
