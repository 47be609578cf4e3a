//! Sizing for in-process regions.

/// Configuration for a [`crate::HeapRegion`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionConfig {
  /// Hard ceiling on the total bytes the region may ever hold.
  ///
  /// Growth past this point fails with
  /// [`crate::RegionError::LimitExceeded`]; the heap stays usable.
  pub max_bytes: usize,

  /// Bytes reserved up front so early growth does not reallocate.
  pub initial_capacity: usize,
}

impl RegionConfig {
  /// 1 GiB.
  pub const DEFAULT_MAX_BYTES: usize = 1 << 30;

  pub const DEFAULT_INITIAL_CAPACITY: usize = 4096;

  pub fn new(max_bytes: usize) -> Self {
    Self {
      max_bytes,
      initial_capacity: Self::DEFAULT_INITIAL_CAPACITY.min(max_bytes),
    }
  }
}

impl Default for RegionConfig {
  fn default() -> Self {
    Self::new(Self::DEFAULT_MAX_BYTES)
  }
}
