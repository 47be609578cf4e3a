//! Point-in-time heap accounting.

use crate::block::{BlockInfo, HEADER_SIZE};

/// Snapshot of the chain, taken by [`crate::Allocator::stats`].
///
/// `used_bytes + free_bytes + header_bytes()` always equals `region_bytes`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub blocks: usize,
  pub free_blocks: usize,
  /// Payload capacity of used blocks.
  pub used_bytes: usize,
  /// Payload capacity of free blocks.
  pub free_bytes: usize,
  pub region_bytes: usize,
}

impl HeapStats {
  pub(crate) fn collect(
    blocks: impl IntoIterator<Item = BlockInfo>,
    region_bytes: usize,
  ) -> Self {
    blocks.into_iter().fold(
      Self {
        region_bytes,
        ..Self::default()
      },
      |mut stats, block| {
        stats.blocks += 1;
        if block.is_free {
          stats.free_blocks += 1;
          stats.free_bytes += block.size;
        } else {
          stats.used_bytes += block.size;
        }
        stats
      },
    )
  }

  pub fn header_bytes(&self) -> usize {
    self.blocks * HEADER_SIZE
  }
}
