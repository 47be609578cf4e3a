use std::mem;

/// Bytes of region accounted to every block ahead of its payload.
///
/// Four machine words: the previous and next links, the payload size and the
/// free flag. Block records themselves live in the chain's slot arena, but the
/// region still reserves this many bytes per block so that offsets and
/// remainders come out exactly as an in-band header would make them.
pub const HEADER_SIZE: usize = 4 * mem::size_of::<usize>();

/// Stable handle to a slot in the block arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(pub(crate) usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
  /// Region offset of the (virtual) header.
  pub offset: usize,
  /// Payload capacity in bytes, header excluded.
  pub size: usize,
  pub is_free: bool,
  pub previous: Option<BlockId>,
  pub next: Option<BlockId>,
}

impl Block {
  pub fn new(
    offset: usize,
    size: usize,
    is_free: bool,
  ) -> Self {
    Self {
      offset,
      size,
      is_free,
      previous: None,
      next: None,
    }
  }

  pub fn payload_offset(&self) -> usize {
    self.offset + HEADER_SIZE
  }

  /// One past the last payload byte.
  pub fn end(&self) -> usize {
    self.payload_offset() + self.size
  }
}

/// Read-only view of a block, as handed out by [`crate::Allocator::blocks`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  pub offset: usize,
  pub size: usize,
  pub is_free: bool,
}

impl From<&Block> for BlockInfo {
  fn from(block: &Block) -> Self {
    Self {
      offset: block.offset,
      size: block.size,
      is_free: block.is_free,
    }
  }
}
