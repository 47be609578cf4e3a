use std::ops::Range;

use log::{debug, trace, warn};

use crate::{
  block::{BlockId, BlockInfo, HEADER_SIZE},
  chain::BlockChain,
  config::RegionConfig,
  error::{AllocError, ChainError, RegionError},
  pointer::Pointer,
  region::{HeapRegion, Region},
  stats::HeapStats,
};

/// First-fit allocator over a single growable [`Region`].
///
/// Blocks are reused first-fit in address order, split when the leftover
/// can stand on its own, and merged with free neighbours as soon as they
/// are released. The region itself never shrinks.
#[derive(Debug)]
pub struct Allocator<R: Region = HeapRegion> {
  region: R,
  chain: BlockChain,
}

impl Allocator<HeapRegion> {
  pub fn with_heap_config(config: &RegionConfig) -> Self {
    Self::new(HeapRegion::with_config(config))
  }
}

impl Default for Allocator<HeapRegion> {
  fn default() -> Self {
    Self::new(HeapRegion::new())
  }
}

impl<R: Region> Allocator<R> {
  /// Wraps `region`, which must not have been grown yet.
  pub fn new(region: R) -> Self {
    debug_assert!(region.is_empty(), "allocator needs an untouched region");

    Self {
      region,
      chain: BlockChain::new(),
    }
  }

  pub fn region(&self) -> &R {
    &self.region
  }

  /// Hands out `size` zeroed bytes.
  ///
  /// Reuses the first free block that fits, splitting off what is left over,
  /// and only grows the region when nothing fits.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Pointer, AllocError> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    let id = match self.chain.find_free(size) {
      Some(id) => {
        self.chain.split(id, size);
        self.chain[id].is_free = false;
        id
      }
      None => self.grow(size)?,
    };

    let range = self.payload_range(id);
    self.region.bytes_mut()[range].fill(0);

    let ptr = Pointer::from_offset(self.chain[id].payload_offset());
    trace!("allocate({size}) -> {ptr}");

    Ok(ptr)
  }

  /// Returns a block to the allocator.
  ///
  /// `None`, and any pointer that does not name a live block, is ignored.
  /// Use [`Allocator::try_release`] to find out about the latter.
  pub fn release(
    &mut self,
    ptr: impl Into<Option<Pointer>>,
  ) {
    let Some(ptr) = ptr.into() else {
      return;
    };

    if let Err(err) = self.try_release(ptr) {
      debug!("release ignored: {err}");
    }
  }

  /// Like [`Allocator::release`], but reports pointers that do not name a
  /// live block instead of ignoring them.
  pub fn try_release(
    &mut self,
    ptr: Pointer,
  ) -> Result<(), AllocError> {
    let id = self.lookup(ptr)?;
    self.free(id);
    trace!("release({ptr})");

    Ok(())
  }

  /// Changes the size of an allocation, moving it if it cannot change in
  /// place.
  ///
  /// * `(None, 0)` is rejected with [`AllocError::ZeroSize`].
  /// * `(None, n)` behaves as `allocate(n)`.
  /// * `(Some(p), 0)` behaves as `release(p)` and returns `None`.
  /// * `(Some(p), n)` keeps the first `min(old, n)` bytes. If the block has
  ///   to move and the new allocation fails, `p` is left untouched.
  ///
  /// A pointer that does not name a live block is ignored like in
  /// [`Allocator::release`]: nothing changes and `Ok(None)` comes back. Use
  /// [`Allocator::try_resize`] to find out about it.
  pub fn resize(
    &mut self,
    ptr: impl Into<Option<Pointer>>,
    size: usize,
  ) -> Result<Option<Pointer>, AllocError> {
    match self.try_resize(ptr, size) {
      Err(AllocError::InvalidPointer(ptr)) => {
        debug!("resize({ptr}, {size}) ignored: not a live block");
        Ok(None)
      }
      result => result,
    }
  }

  /// Like [`Allocator::resize`], but reports pointers that do not name a
  /// live block with [`AllocError::InvalidPointer`].
  pub fn try_resize(
    &mut self,
    ptr: impl Into<Option<Pointer>>,
    size: usize,
  ) -> Result<Option<Pointer>, AllocError> {
    match (ptr.into(), size) {
      (None, 0) => Err(AllocError::ZeroSize),
      (None, _) => self.allocate(size).map(Some),
      (Some(ptr), 0) => {
        self.try_release(ptr)?;
        Ok(None)
      }
      (Some(ptr), _) => self.reallocate(ptr, size).map(Some),
    }
  }

  /// The whole payload of a live block.
  ///
  /// The slice spans the block's capacity, which may exceed the size that
  /// was asked for when a split was not worthwhile.
  pub fn payload(
    &self,
    ptr: Pointer,
  ) -> Option<&[u8]> {
    let id = self.lookup(ptr).ok()?;
    Some(&self.region.bytes()[self.payload_range(id)])
  }

  pub fn payload_mut(
    &mut self,
    ptr: Pointer,
  ) -> Option<&mut [u8]> {
    let id = self.lookup(ptr).ok()?;
    let range = self.payload_range(id);
    Some(&mut self.region.bytes_mut()[range])
  }

  /// All blocks in address order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.chain.iter().map(|(_, block)| BlockInfo::from(block))
  }

  pub fn stats(&self) -> HeapStats {
    let stats = HeapStats::collect(self.blocks(), self.region.len());
    debug_assert_eq!(stats.blocks, self.chain.len());
    stats
  }

  /// Verifies that the chain tiles the region exactly, that its links agree
  /// in both directions and that no two neighbours are both free.
  pub fn check(&self) -> Result<(), ChainError> {
    self.chain.verify(self.region.len())
  }

  fn grow(
    &mut self,
    size: usize,
  ) -> Result<BlockId, AllocError> {
    let requested = HEADER_SIZE
      .checked_add(size)
      .ok_or(AllocError::Exhausted {
        requested: size,
        source: RegionError::Overflow { requested: size },
      })?;

    let offset = self.region.grow(requested).map_err(|source| {
      warn!("region growth by {requested} bytes failed: {source}");
      AllocError::Exhausted { requested, source }
    })?;
    debug!("region grew by {requested} bytes at offset {offset:#x}");

    Ok(self.chain.push_back(offset, size))
  }

  /// Resolves `ptr` to the used block whose payload starts there.
  fn lookup(
    &self,
    ptr: Pointer,
  ) -> Result<BlockId, AllocError> {
    match self.chain.find_by_payload(ptr.offset()) {
      Some(id) if !self.chain[id].is_free => Ok(id),
      _ => Err(AllocError::InvalidPointer(ptr)),
    }
  }

  fn free(
    &mut self,
    id: BlockId,
  ) {
    let range = self.payload_range(id);
    self.region.bytes_mut()[range].fill(0);

    self.chain[id].is_free = true;
    self.chain.coalesce(id);
  }

  fn reallocate(
    &mut self,
    ptr: Pointer,
    size: usize,
  ) -> Result<Pointer, AllocError> {
    let id = self.lookup(ptr)?;
    let capacity = self.chain[id].size;

    if size <= capacity {
      self.shrink_in_place(id, size);
      trace!("resize({ptr}, {size}) shrank in place");
      return Ok(ptr);
    }

    if let Some(next) = self.chain[id].next
      && self.chain[next].is_free
      && capacity + HEADER_SIZE + self.chain[next].size >= size
    {
      self.chain.absorb_next(id);

      let start = self.chain[id].payload_offset() + capacity;
      let end = self.chain[id].end();
      self.region.bytes_mut()[start..end].fill(0);

      self.shrink_in_place(id, size);
      trace!("resize({ptr}, {size}) grew into its free successor");
      return Ok(ptr);
    }

    let moved = self.allocate(size)?;

    let kept = capacity.min(size);
    let source = self.chain[id].payload_offset();
    self
      .region
      .bytes_mut()
      .copy_within(source..source + kept, moved.offset());

    self.free(id);
    debug!("resize({ptr}, {size}) moved to {moved}");

    Ok(moved)
  }

  /// Cuts a used block down to `size`, zeroing everything past it and
  /// handing the tail back as a free block when it is big enough.
  fn shrink_in_place(
    &mut self,
    id: BlockId,
    size: usize,
  ) {
    let start = self.chain[id].payload_offset() + size;
    let end = self.chain[id].end();
    self.region.bytes_mut()[start..end].fill(0);

    if let Some(remainder) = self.chain.split(id, size) {
      self.chain.coalesce(remainder);
    }
  }

  fn payload_range(
    &self,
    id: BlockId,
  ) -> Range<usize> {
    let block = &self.chain[id];
    block.payload_offset()..block.end()
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  fn sizes(allocator: &Allocator) -> Vec<(usize, bool)> {
    allocator.blocks().map(|b| (b.size, b.is_free)).collect()
  }

  fn fill(
    allocator: &mut Allocator,
    ptr: Pointer,
    len: usize,
    byte: u8,
  ) {
    allocator.payload_mut(ptr).unwrap()[..len].fill(byte);
  }

  #[test]
  fn reuses_released_block_address() {
    let mut allocator = Allocator::default();

    let first = allocator.allocate(8).unwrap();
    fill(&mut allocator, first, 8, 3);

    let second = allocator.allocate(12).unwrap();
    for (i, byte) in allocator.payload_mut(second).unwrap().iter_mut().enumerate() {
      *byte = i as u8 + 1;
    }

    assert_eq!(allocator.payload(first).unwrap(), &[3; 8]);

    allocator.release(first);
    let third = allocator.allocate(4).unwrap();
    assert_eq!(third, first);
    assert_eq!(allocator.payload(third).unwrap(), &[0; 8]);

    let fourth = allocator.allocate(16).unwrap();
    assert!(fourth > second);
    assert_eq!(allocator.payload(second).unwrap()[11], 12);
    assert_eq!(allocator.check(), Ok(()));
  }

  #[test]
  fn zero_size_is_rejected_without_growth() {
    let mut allocator = Allocator::default();

    assert_eq!(allocator.allocate(0), Err(AllocError::ZeroSize));
    assert_eq!(allocator.region().len(), 0);
    assert_eq!(allocator.blocks().count(), 0);
  }

  #[test]
  fn growth_appends_header_plus_payload() {
    let mut allocator = Allocator::default();

    let first = allocator.allocate(10).unwrap();
    let second = allocator.allocate(20).unwrap();

    assert_eq!(first.offset(), HEADER_SIZE);
    assert_eq!(second.offset(), 2 * HEADER_SIZE + 10);
    assert_eq!(allocator.region().len(), 2 * HEADER_SIZE + 30);
    assert_eq!(sizes(&allocator), [(10, false), (20, false)]);
  }

  #[test]
  fn adjacent_releases_collapse_into_one_block() {
    let mut allocator = Allocator::default();

    let first = allocator.allocate(10).unwrap();
    let second = allocator.allocate(20).unwrap();

    allocator.release(first);
    assert_eq!(sizes(&allocator), [(10, true), (20, false)]);

    allocator.release(second);
    assert_eq!(sizes(&allocator), [(10 + 20 + HEADER_SIZE, true)]);
    assert_eq!(allocator.check(), Ok(()));
  }

  #[test]
  fn first_fit_reuse_splits_freed_block() {
    let mut allocator = Allocator::default();

    let big = allocator.allocate(100).unwrap();
    allocator.release(big);

    let small = allocator.allocate(10).unwrap();

    assert_eq!(small, big);
    assert_eq!(sizes(&allocator), [(10, false), (100 - 10 - HEADER_SIZE, true)]);
    assert_eq!(allocator.region().len(), HEADER_SIZE + 100);
  }

  #[test]
  fn release_between_free_neighbours_merges_all_three() {
    let mut allocator = Allocator::default();

    let a = allocator.allocate(8).unwrap();
    let b = allocator.allocate(16).unwrap();
    let c = allocator.allocate(24).unwrap();
    let _guard = allocator.allocate(4).unwrap();

    allocator.release(a);
    allocator.release(c);
    assert_eq!(allocator.blocks().count(), 4);

    allocator.release(b);
    assert_eq!(
      sizes(&allocator),
      [(8 + 16 + 24 + 2 * HEADER_SIZE, true), (4, false)]
    );
    assert_eq!(allocator.check(), Ok(()));
  }

  #[test]
  fn release_wipes_payload() {
    let mut allocator = Allocator::default();

    let ptr = allocator.allocate(32).unwrap();
    let _guard = allocator.allocate(1).unwrap();
    fill(&mut allocator, ptr, 32, 0xEE);

    allocator.release(ptr);

    let start = ptr.offset();
    assert!(allocator.region().bytes()[start..start + 32].iter().all(|&b| b == 0));
  }

  #[test]
  fn invalid_and_double_releases_change_nothing() {
    let mut allocator = Allocator::default();

    let ptr = allocator.allocate(16).unwrap();
    let _guard = allocator.allocate(16).unwrap();
    fill(&mut allocator, ptr, 16, 7);

    let before_blocks: Vec<BlockInfo> = allocator.blocks().collect();
    let before_bytes = allocator.region().bytes().to_vec();

    allocator.release(None);
    allocator.release(Pointer::from_offset(ptr.offset() + 1));
    allocator.release(Pointer::from_offset(0));
    allocator.release(Pointer::from_offset(1 << 20));

    assert_eq!(allocator.blocks().collect::<Vec<_>>(), before_blocks);
    assert_eq!(allocator.region().bytes(), &before_bytes[..]);

    allocator.release(ptr);
    assert_eq!(
      allocator.try_release(ptr),
      Err(AllocError::InvalidPointer(ptr))
    );
  }

  #[test]
  fn exhaustion_leaves_heap_intact() {
    let mut allocator = Allocator::with_heap_config(&RegionConfig::new(256));

    let ptr = allocator.allocate(64).unwrap();
    fill(&mut allocator, ptr, 64, 9);
    let before = allocator.stats();

    let err = allocator.allocate(512).unwrap_err();
    assert!(matches!(
      err,
      AllocError::Exhausted {
        source: RegionError::LimitExceeded { limit: 256, .. },
        ..
      }
    ));
    assert_eq!(allocator.stats(), before);

    assert!(allocator.resize(ptr, 512).is_err());
    assert_eq!(allocator.payload(ptr).unwrap(), &[9; 64]);
    assert_eq!(allocator.check(), Ok(()));
  }

  #[test]
  fn resize_null_and_zero_cases() {
    let mut allocator = Allocator::default();

    assert_eq!(allocator.resize(None, 0), Err(AllocError::ZeroSize));

    let ptr = allocator.resize(None, 5).unwrap().unwrap();
    assert_eq!(sizes(&allocator), [(5, false)]);

    assert_eq!(allocator.resize(ptr, 0), Ok(None));
    assert_eq!(sizes(&allocator), [(5, true)]);
  }

  #[test]
  fn resize_ignores_invalid_pointer() {
    let mut allocator = Allocator::default();
    let ptr = allocator.allocate(8).unwrap();
    fill(&mut allocator, ptr, 8, 4);
    let before_bytes = allocator.region().bytes().to_vec();

    let forged = Pointer::from_offset(3);
    assert_eq!(allocator.resize(forged, 16), Ok(None));
    assert_eq!(allocator.resize(forged, 0), Ok(None));

    allocator.release(ptr);
    assert_eq!(allocator.resize(ptr, 4), Ok(None));

    assert_eq!(sizes(&allocator), [(8, true)]);
    assert_eq!(allocator.region().len(), before_bytes.len());
  }

  #[test]
  fn try_resize_reports_invalid_pointer() {
    let mut allocator = Allocator::default();
    let ptr = allocator.allocate(8).unwrap();

    let forged = Pointer::from_offset(3);
    assert_eq!(
      allocator.try_resize(forged, 16),
      Err(AllocError::InvalidPointer(forged))
    );
    assert_eq!(
      allocator.try_resize(forged, 0),
      Err(AllocError::InvalidPointer(forged))
    );
    assert_eq!(sizes(&allocator), [(8, false)]);

    assert_eq!(allocator.try_resize(ptr, 0), Ok(None));
    assert_eq!(
      allocator.try_resize(ptr, 8),
      Err(AllocError::InvalidPointer(ptr))
    );
    assert_eq!(allocator.try_resize(None, 0), Err(AllocError::ZeroSize));
  }

  #[test]
  fn shrinking_splits_and_zeroes_tail() {
    let mut allocator = Allocator::default();

    let ptr = allocator.allocate(100).unwrap();
    let _guard = allocator.allocate(4).unwrap();
    fill(&mut allocator, ptr, 100, 0x55);

    assert_eq!(allocator.resize(ptr, 20), Ok(Some(ptr)));
    assert_eq!(
      sizes(&allocator),
      [(20, false), (100 - 20 - HEADER_SIZE, true), (4, false)]
    );
    assert_eq!(allocator.payload(ptr).unwrap(), &[0x55; 20]);
    assert_eq!(allocator.check(), Ok(()));
  }

  #[test]
  fn small_shrink_keeps_capacity_but_zeroes_tail() {
    let mut allocator = Allocator::default();

    let ptr = allocator.allocate(40).unwrap();
    fill(&mut allocator, ptr, 40, 1);

    assert_eq!(allocator.resize(ptr, 38), Ok(Some(ptr)));
    let payload = allocator.payload(ptr).unwrap();
    assert_eq!(payload.len(), 40);
    assert_eq!(&payload[..38], &[1; 38]);
    assert_eq!(&payload[38..], &[0; 2]);
  }

  #[test]
  fn shrink_remainder_merges_with_free_successor() {
    let mut allocator = Allocator::default();

    let ptr = allocator.allocate(100).unwrap();
    let next = allocator.allocate(50).unwrap();
    let _guard = allocator.allocate(4).unwrap();
    allocator.release(next);

    allocator.resize(ptr, 10).unwrap();

    assert_eq!(
      sizes(&allocator),
      [(10, false), (100 - 10 + 50, true), (4, false)]
    );
    assert_eq!(allocator.check(), Ok(()));
  }

  #[test]
  fn growing_absorbs_free_successor_in_place() {
    let mut allocator = Allocator::default();

    let ptr = allocator.allocate(16).unwrap();
    let next = allocator.allocate(200).unwrap();
    let _guard = allocator.allocate(4).unwrap();
    fill(&mut allocator, ptr, 16, 0xAA);
    fill(&mut allocator, next, 200, 0xBB);
    allocator.release(next);

    assert_eq!(allocator.resize(ptr, 64), Ok(Some(ptr)));

    let payload = allocator.payload(ptr).unwrap();
    assert_eq!(payload.len(), 64);
    assert_eq!(&payload[..16], &[0xAA; 16]);
    assert!(payload[16..].iter().all(|&b| b == 0));
    assert_eq!(
      sizes(&allocator),
      [(64, false), (16 + HEADER_SIZE + 200 - 64 - HEADER_SIZE, true), (4, false)]
    );
    assert_eq!(allocator.check(), Ok(()));
  }

  #[test]
  fn growing_moves_when_neighbour_is_used() {
    let mut allocator = Allocator::default();

    let ptr = allocator.allocate(8).unwrap();
    let _guard = allocator.allocate(8).unwrap();
    for (i, byte) in allocator.payload_mut(ptr).unwrap().iter_mut().enumerate() {
      *byte = i as u8;
    }

    let moved = allocator.resize(ptr, 32).unwrap().unwrap();

    assert_ne!(moved, ptr);
    let payload = allocator.payload(moved).unwrap();
    assert_eq!(&payload[..8], &[0, 1, 2, 3, 4, 5, 6, 7]);
    assert!(payload[8..].iter().all(|&b| b == 0));
    assert!(allocator.payload(ptr).is_none());
    assert_eq!(sizes(&allocator), [(8, true), (8, false), (32, false)]);
    assert_eq!(allocator.check(), Ok(()));
  }

  #[test]
  fn stats_account_for_whole_region() {
    let mut allocator = Allocator::default();

    let a = allocator.allocate(10).unwrap();
    allocator.allocate(30).unwrap();
    allocator.release(a);

    let stats = allocator.stats();
    assert_eq!(stats.blocks, 2);
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.free_bytes, 10);
    assert_eq!(stats.used_bytes, 30);
    assert_eq!(
      stats.used_bytes + stats.free_bytes + stats.header_bytes(),
      stats.region_bytes
    );
  }

  #[derive(Clone, Debug)]
  enum Op {
    Allocate(usize),
    Release(usize),
    Resize(usize, usize),
    Forged(usize),
  }

  fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
      4 => (1usize..300).prop_map(Op::Allocate),
      3 => any::<usize>().prop_map(Op::Release),
      3 => (any::<usize>(), 0usize..300).prop_map(|(i, n)| Op::Resize(i, n)),
      1 => (0usize..4096).prop_map(Op::Forged),
    ]
  }

  proptest! {
    #[test]
    fn random_workloads_keep_invariants_and_contents(
      ops in proptest::collection::vec(arb_op(), 1..120),
    ) {
      let mut allocator = Allocator::with_heap_config(&RegionConfig::new(16 * 1024));
      let mut live: Vec<(Pointer, Vec<u8>)> = Vec::new();
      let mut tag = 0u8;

      for op in ops {
        tag = tag.wrapping_add(1).max(1);

        match op {
          Op::Allocate(size) => {
            if let Ok(ptr) = allocator.allocate(size) {
              allocator.payload_mut(ptr).unwrap()[..size].fill(tag);
              live.push((ptr, vec![tag; size]));
            }
          }
          Op::Release(i) if !live.is_empty() => {
            let (ptr, _) = live.swap_remove(i % live.len());
            prop_assert_eq!(allocator.try_release(ptr), Ok(()));
          }
          Op::Resize(i, size) if !live.is_empty() => {
            let index = i % live.len();
            let (ptr, ref contents) = live[index];
            let mut expected = contents[..contents.len().min(size)].to_vec();
            expected.resize(size, 0);

            match allocator.resize(ptr, size) {
              Ok(Some(moved)) => live[index] = (moved, expected),
              Ok(None) => {
                prop_assert_eq!(size, 0);
                live.swap_remove(index);
              }
              Err(err) => {
                let exhausted = matches!(err, AllocError::Exhausted { .. });
                prop_assert!(exhausted, "unexpected resize error: {}", err);
              }
            }
          }
          Op::Forged(offset) => {
            let forged = Pointer::from_offset(offset);
            if live.iter().all(|(ptr, _)| *ptr != forged) {
              let before: Vec<BlockInfo> = allocator.blocks().collect();
              allocator.release(forged);
              prop_assert_eq!(allocator.blocks().collect::<Vec<_>>(), before);
            }
          }
          _ => {}
        }

        prop_assert_eq!(allocator.check(), Ok(()));
        for (ptr, contents) in &live {
          let payload = allocator.payload(*ptr).unwrap();
          prop_assert_eq!(&payload[..contents.len()], &contents[..]);
        }
      }
    }
  }
}
