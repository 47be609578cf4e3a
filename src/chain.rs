//! The address-ordered block chain.
//!
//! Every block in the region, free or used, sits in one doubly linked chain
//! ordered by offset. The records live in a slot arena so a [`BlockId`] stays
//! valid until its block is absorbed by a neighbour.
//!
//! ```text
//!   head                                                    tail
//!   ┌────┬───────┐   ┌────┬─────────────┐   ┌────┬────────┐
//!   │ H  │ used  │ ⇄ │ H  │    free     │ ⇄ │ H  │  used  │
//!   └────┴───────┘   └────┴─────────────┘   └────┴────────┘
//!   0                                                   region.len()
//! ```

use std::ops::{Index, IndexMut};

use crate::{
  block::{Block, BlockId},
  error::ChainError,
};

#[derive(Debug, Default)]
pub struct BlockChain {
  slots: Vec<Option<Block>>,
  vacant: Vec<BlockId>,
  head: Option<BlockId>,
  tail: Option<BlockId>,
  len: usize,
}

impl BlockChain {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.len
  }

  #[cfg(test)]
  pub(crate) fn tail(&self) -> Option<BlockId> {
    self.tail
  }

  /// Stores `block` in a free slot, unlinked.
  pub(crate) fn insert(
    &mut self,
    block: Block,
  ) -> BlockId {
    self.len += 1;

    match self.vacant.pop() {
      Some(id) => {
        self.slots[id.0] = Some(block);
        id
      }
      None => {
        self.slots.push(Some(block));
        BlockId(self.slots.len() - 1)
      }
    }
  }

  /// Drops the record for `id`. The caller must already have unlinked it.
  pub(crate) fn remove(
    &mut self,
    id: BlockId,
  ) -> Block {
    match self.slots[id.0].take() {
      Some(block) => {
        self.len -= 1;
        self.vacant.push(id);
        block
      }
      None => panic!("block slot {id:?} is vacant"),
    }
  }

  /// Appends a used block covering `size` payload bytes at `offset`.
  pub fn push_back(
    &mut self,
    offset: usize,
    size: usize,
  ) -> BlockId {
    let mut block = Block::new(offset, size, false);
    block.previous = self.tail;

    let id = self.insert(block);

    match self.tail {
      Some(tail) => self[tail].next = Some(id),
      None => self.head = Some(id),
    }
    self.tail = Some(id);

    id
  }

  /// Links `id` directly after `after`, repointing the old successor.
  pub(crate) fn link_after(
    &mut self,
    after: BlockId,
    id: BlockId,
  ) {
    let next = self[after].next;

    self[id].previous = Some(after);
    self[id].next = next;
    self[after].next = Some(id);

    match next {
      Some(next) => self[next].previous = Some(id),
      None => self.tail = Some(id),
    }
  }

  /// Unlinks `id` from its neighbours and discards its record.
  pub(crate) fn unlink(
    &mut self,
    id: BlockId,
  ) -> Block {
    let Block { previous, next, .. } = self[id];

    match previous {
      Some(previous) => self[previous].next = next,
      None => self.head = next,
    }
    match next {
      Some(next) => self[next].previous = previous,
      None => self.tail = previous,
    }

    self.remove(id)
  }

  pub fn iter(&self) -> Iter<'_> {
    Iter {
      chain: self,
      cursor: self.head,
    }
  }

  /// The block whose payload starts exactly at `payload_offset`.
  pub fn find_by_payload(
    &self,
    payload_offset: usize,
  ) -> Option<BlockId> {
    self
      .iter()
      .find(|(_, block)| block.payload_offset() == payload_offset)
      .map(|(id, _)| id)
  }

  /// Walks the chain and checks that it tiles `region_len` bytes exactly,
  /// with consistent links and no two free neighbours.
  pub fn verify(
    &self,
    region_len: usize,
  ) -> Result<(), ChainError> {
    let mut expected = 0;
    let mut previous: Option<(BlockId, bool)> = None;

    for (id, block) in self.iter() {
      if block.offset != expected {
        return Err(ChainError::Gap {
          block: id,
          expected,
          found: block.offset,
        });
      }

      if block.previous != previous.map(|(id, _)| id) {
        return Err(ChainError::BrokenLink { block: id });
      }

      if let Some((previous, true)) = previous
        && block.is_free
      {
        return Err(ChainError::AdjacentFree {
          first: previous,
          second: id,
        });
      }

      expected = block.end();
      previous = Some((id, block.is_free));
    }

    if self.tail != previous.map(|(id, _)| id) {
      return Err(ChainError::BrokenTail);
    }

    if expected != region_len {
      return Err(ChainError::Coverage {
        covered: expected,
        region: region_len,
      });
    }

    Ok(())
  }
}

impl Index<BlockId> for BlockChain {
  type Output = Block;

  fn index(
    &self,
    id: BlockId,
  ) -> &Block {
    match &self.slots[id.0] {
      Some(block) => block,
      None => panic!("block slot {id:?} is vacant"),
    }
  }
}

impl IndexMut<BlockId> for BlockChain {
  fn index_mut(
    &mut self,
    id: BlockId,
  ) -> &mut Block {
    match &mut self.slots[id.0] {
      Some(block) => block,
      None => panic!("block slot {id:?} is vacant"),
    }
  }
}

/// Address-ordered walk from head to tail.
pub struct Iter<'a> {
  chain: &'a BlockChain,
  cursor: Option<BlockId>,
}

impl<'a> Iterator for Iter<'a> {
  type Item = (BlockId, &'a Block);

  fn next(&mut self) -> Option<Self::Item> {
    let id = self.cursor?;
    let block = &self.chain[id];
    self.cursor = block.next;
    Some((id, block))
  }
}
