//! First-fit placement.

use crate::{block::BlockId, chain::BlockChain};

impl BlockChain {
  /// The first free block, in address order, with at least `size` bytes of
  /// payload.
  pub fn find_free(
    &self,
    size: usize,
  ) -> Option<BlockId> {
    self
      .iter()
      .find(|(_, block)| block.is_free && block.size >= size)
      .map(|(id, _)| id)
  }
}
