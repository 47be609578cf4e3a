//! Error kinds for the allocator, its region and its chain checker.

use thiserror::Error;

use crate::{block::BlockId, pointer::Pointer};

/// Why an allocator operation failed. No variant leaves the heap modified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("zero-size request rejected")]
  ZeroSize,
  #[error("region could not grow by {requested} bytes")]
  Exhausted {
    requested: usize,
    #[source]
    source: RegionError,
  },
  #[error("pointer {0} does not address a live block")]
  InvalidPointer(Pointer),
}

/// Why the region refused to grow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RegionError {
  #[error("growth by {requested} bytes exceeds the {limit} byte limit")]
  LimitExceeded { requested: usize, limit: usize },
  #[error("environment is out of memory for {requested} more bytes")]
  OutOfMemory { requested: usize },
  #[error("growth by {requested} bytes overflows the address space")]
  Overflow { requested: usize },
  #[error("new bytes are not contiguous with the region")]
  Discontiguous,
}

/// A broken chain invariant, as reported by [`crate::Allocator::check`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ChainError {
  #[error("block {block:?} starts at {found}, expected {expected}")]
  Gap {
    block: BlockId,
    expected: usize,
    found: usize,
  },
  #[error("chain covers {covered} bytes but the region holds {region}")]
  Coverage { covered: usize, region: usize },
  #[error("blocks {first:?} and {second:?} are adjacent and both free")]
  AdjacentFree { first: BlockId, second: BlockId },
  #[error("block {block:?} has an inconsistent previous link")]
  BrokenLink { block: BlockId },
  #[error("tail does not match the last block in the chain")]
  BrokenTail,
}
