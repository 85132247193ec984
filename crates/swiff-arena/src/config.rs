//! Scope allocator configuration parameters.

use swiff_core::ALIGNMENT;

use crate::error::ScopeError;
use crate::local::LOCAL_HEADER_SIZE;

/// Configuration for the scope allocator.
///
/// Controls standard arena sizing and the size classes used to recycle
/// slack in the global region. Validated by
/// [`ScopeAllocator::with_config`](crate::ScopeAllocator::with_config);
/// immutable after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeConfig {
    /// Capacity of a standard arena in bytes.
    ///
    /// Default: 4040. Requests larger than this get a one-off oversized
    /// arena that is never cached.
    pub arena_size: usize,

    /// Block sizes of the global region's slack free lists, ascending.
    ///
    /// Default: 16, 32, 64, ..., 2048. Every class must be a multiple of
    /// [`ALIGNMENT`] and no larger than `arena_size`.
    pub size_classes: Vec<usize>,
}

impl ScopeConfig {
    /// Default standard arena capacity in bytes.
    pub const DEFAULT_ARENA_SIZE: usize = 4040;

    /// Default slack size classes.
    pub const DEFAULT_SIZE_CLASSES: [usize; 8] = [16, 32, 64, 128, 256, 512, 1024, 2048];

    /// Create a config with the given standard arena size and default
    /// size classes.
    pub fn new(arena_size: usize) -> Self {
        Self {
            arena_size,
            size_classes: Self::DEFAULT_SIZE_CLASSES.to_vec(),
        }
    }

    /// Largest single local request (payload bytes) a standard arena holds.
    pub fn max_standard_local(&self) -> usize {
        self.arena_size.saturating_sub(LOCAL_HEADER_SIZE)
    }

    /// Check the invariants documented on each field.
    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.arena_size < ALIGNMENT + LOCAL_HEADER_SIZE {
            return Err(ScopeError::InvalidConfig {
                reason: format!(
                    "arena_size must be >= {} (got {})",
                    ALIGNMENT + LOCAL_HEADER_SIZE,
                    self.arena_size,
                ),
            });
        }
        let Some(&largest) = self.size_classes.last() else {
            return Err(ScopeError::InvalidConfig {
                reason: "size_classes must not be empty".into(),
            });
        };
        if let Some(&bad) = self
            .size_classes
            .iter()
            .find(|&&class| class == 0 || class % ALIGNMENT != 0)
        {
            return Err(ScopeError::InvalidConfig {
                reason: format!("size class {bad} is not a non-zero multiple of {ALIGNMENT}"),
            });
        }
        if self.size_classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ScopeError::InvalidConfig {
                reason: format!(
                    "size_classes must be strictly ascending (got {:?})",
                    self.size_classes,
                ),
            });
        }
        if largest > self.arena_size {
            return Err(ScopeError::InvalidConfig {
                reason: format!(
                    "largest size class {largest} exceeds arena_size {}",
                    self.arena_size,
                ),
            });
        }
        Ok(())
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ARENA_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ScopeConfig::default();
        assert_eq!(config.arena_size, 4040);
        assert_eq!(config.size_classes.len(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn max_standard_local_excludes_header() {
        let config = ScopeConfig::default();
        assert_eq!(config.max_standard_local(), 4040 - LOCAL_HEADER_SIZE);
    }

    #[test]
    fn tiny_arena_rejected() {
        let config = ScopeConfig {
            arena_size: 16,
            size_classes: vec![16],
        };
        assert!(matches!(
            config.validate(),
            Err(ScopeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn empty_classes_rejected() {
        let config = ScopeConfig {
            arena_size: 4096,
            size_classes: vec![],
        };
        assert!(matches!(
            config.validate(),
            Err(ScopeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn unaligned_class_rejected() {
        let config = ScopeConfig {
            arena_size: 4096,
            size_classes: vec![16, 24, 64],
        };
        assert!(matches!(
            config.validate(),
            Err(ScopeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn descending_classes_rejected() {
        let config = ScopeConfig {
            arena_size: 4096,
            size_classes: vec![64, 32],
        };
        assert!(matches!(
            config.validate(),
            Err(ScopeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn class_larger_than_arena_rejected() {
        let config = ScopeConfig {
            arena_size: 1024,
            size_classes: vec![16, 2048],
        };
        assert!(matches!(
            config.validate(),
            Err(ScopeError::InvalidConfig { .. })
        ));
    }
}
