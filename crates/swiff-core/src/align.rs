//! Alignment rules for allocations carved out of arenas.

/// Alignment, in bytes, of every allocation handed out by an arena.
///
/// Matches the strictest scalar alignment on the supported targets
/// (`long double` / SIMD lanes), so any plain-old-data record can be
/// stored at an aligned offset.
pub const ALIGNMENT: usize = 16;

/// Round `size` up to the next multiple of [`ALIGNMENT`].
///
/// Returns `None` if rounding would overflow `usize`.
pub fn align_up(size: usize) -> Option<usize> {
    size.checked_add(ALIGNMENT - 1).map(|n| n & !(ALIGNMENT - 1))
}

/// Round `size` down to a multiple of [`ALIGNMENT`].
pub fn align_down(size: usize) -> usize {
    size & !(ALIGNMENT - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_next_multiple() {
        assert_eq!(align_up(0), Some(0));
        assert_eq!(align_up(1), Some(16));
        assert_eq!(align_up(16), Some(16));
        assert_eq!(align_up(333), Some(336));
        assert_eq!(align_up(8172), Some(8176));
    }

    #[test]
    fn align_up_overflow_is_none() {
        assert_eq!(align_up(usize::MAX), None);
    }

    #[test]
    fn align_down_truncates() {
        assert_eq!(align_down(15), 0);
        assert_eq!(align_down(3688), 3680);
        assert_eq!(align_down(4040), 4032);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn align_up_is_smallest_aligned_bound(size in 0usize..1 << 40) {
                let up = align_up(size).unwrap();
                prop_assert_eq!(up % ALIGNMENT, 0);
                prop_assert!(up >= size);
                prop_assert!(up - size < ALIGNMENT);
            }
        }
    }
}
