//! Merging free neighbours.

use crate::{
  block::{BlockId, HEADER_SIZE},
  chain::BlockChain,
};

impl BlockChain {
  /// Merges the free block `id` with every free neighbour, in both
  /// directions, until neither neighbour is free. Returns the surviving
  /// block, which is `id` or one of its predecessors.
  pub fn coalesce(
    &mut self,
    mut id: BlockId,
  ) -> BlockId {
    loop {
      if let Some(previous) = self[id].previous
        && self[previous].is_free
      {
        self.absorb_next(previous);
        id = previous;
        continue;
      }

      if let Some(next) = self[id].next
        && self[next].is_free
      {
        self.absorb_next(id);
        continue;
      }

      return id;
    }
  }

  /// Folds the successor of `id` into it, header included. Returns the
  /// number of bytes gained.
  pub(crate) fn absorb_next(
    &mut self,
    id: BlockId,
  ) -> usize {
    let Some(next) = self[id].next else {
      return 0;
    };

    let absorbed = self.unlink(next);
    let gained = HEADER_SIZE + absorbed.size;
    self[id].size += gained;

    gained
  }
}
