//! Carving an exact-size block out of an oversized one.
//!
//! ```text
//!   before:  ┌────┬──────────────────────────────────────┐
//!            │ H  │               size                   │
//!            └────┴──────────────────────────────────────┘
//!   after:   ┌────┬───────────┬────┬────────────────────┐
//!            │ H  │ requested │ H' │ size - req - H     │  (free)
//!            └────┴───────────┴────┴────────────────────┘
//! ```

use crate::{
  block::{Block, BlockId, HEADER_SIZE},
  chain::BlockChain,
};

impl BlockChain {
  /// Shrinks `id` to exactly `size` bytes and links a free remainder block
  /// behind it, provided the remainder can hold a header and at least one
  /// payload byte. Otherwise the block keeps its capacity.
  ///
  /// The state of `id` itself is left to the caller. Returns the remainder.
  pub fn split(
    &mut self,
    id: BlockId,
    size: usize,
  ) -> Option<BlockId> {
    let block = &self[id];
    let leftover = block.size.checked_sub(size)?.checked_sub(HEADER_SIZE)?;
    if leftover == 0 {
      return None;
    }

    let offset = block.payload_offset() + size;
    self[id].size = size;

    let remainder = self.insert(Block::new(offset, leftover, true));
    self.link_after(id, remainder);

    Some(remainder)
  }
}
