//! The region growth primitive.
//!
//! A [`Region`] is a single contiguous span of bytes that only ever grows at
//! its end. Offsets handed out by [`Region::grow`] stay valid for the life of
//! the region.
//!
//! ```text
//!   offset 0                                  len()      len() + n
//!   ┌──────────────────────────────────────────┬──────────────┐
//!   │         bytes already granted            │   grow(n)    │
//!   └──────────────────────────────────────────┴──────────────┘
//!                                              ▲
//!                                              └── returned offset
//! ```

use crate::{config::RegionConfig, error::RegionError};

pub trait Region {
  /// Appends `bytes` bytes and returns the offset of the first new byte.
  ///
  /// On error the region is left exactly as it was.
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Result<usize, RegionError>;

  /// Total bytes granted so far.
  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn bytes(&self) -> &[u8];

  fn bytes_mut(&mut self) -> &mut [u8];
}

/// A region backed by a `Vec<u8>` with a configurable growth ceiling.
#[derive(Debug)]
pub struct HeapRegion {
  bytes: Vec<u8>,
  max_bytes: usize,
}

impl HeapRegion {
  pub fn new() -> Self {
    Self::with_config(&RegionConfig::default())
  }

  pub fn with_config(config: &RegionConfig) -> Self {
    Self {
      bytes: Vec::with_capacity(config.initial_capacity),
      max_bytes: config.max_bytes,
    }
  }

  pub fn max_bytes(&self) -> usize {
    self.max_bytes
  }
}

impl Default for HeapRegion {
  fn default() -> Self {
    Self::new()
  }
}

impl Region for HeapRegion {
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Result<usize, RegionError> {
    let offset = self.bytes.len();
    let new_len = offset
      .checked_add(bytes)
      .ok_or(RegionError::Overflow { requested: bytes })?;

    if new_len > self.max_bytes {
      return Err(RegionError::LimitExceeded {
        requested: bytes,
        limit: self.max_bytes,
      });
    }

    self
      .bytes
      .try_reserve(bytes)
      .map_err(|_| RegionError::OutOfMemory { requested: bytes })?;
    self.bytes.resize(new_len, 0);

    Ok(offset)
  }

  fn len(&self) -> usize {
    self.bytes.len()
  }

  fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    &mut self.bytes
  }
}

#[cfg(target_os = "linux")]
pub use sbrk::SbrkRegion;

#[cfg(target_os = "linux")]
mod sbrk {
  use std::{ptr, slice};

  use libc::{c_void, intptr_t, sbrk};

  use super::Region;
  use crate::{align, error::RegionError};

  /// A region carved out of the process data segment by moving the program
  /// break with `sbrk(2)`.
  ///
  /// The break is process-wide: if anything else moves it between two
  /// growths the new bytes no longer follow the region, and growth fails
  /// with [`RegionError::Discontiguous`]. Those bytes are abandoned and the
  /// region is sealed: every later growth fails the same way without moving
  /// the break again, while the bytes already granted stay usable. Memory is
  /// never handed back.
  #[derive(Debug)]
  pub struct SbrkRegion {
    base: *mut u8,
    len: usize,
    sealed: bool,
  }

  impl SbrkRegion {
    pub fn new() -> Self {
      Self {
        base: ptr::null_mut(),
        len: 0,
        sealed: false,
      }
    }

    /// Whether a foreign break move has stopped this region from growing.
    pub fn is_sealed(&self) -> bool {
      self.sealed
    }

    /// Current program break, `sbrk(0)`.
    pub fn program_break() -> *mut c_void {
      unsafe { sbrk(0) }
    }

    /// Pads the break up to a word boundary and pins the region start there.
    unsafe fn anchor(&mut self) -> Result<(), RegionError> {
      unsafe {
        let current = sbrk(0);
        if current == usize::MAX as *mut c_void {
          return Err(RegionError::OutOfMemory { requested: 0 });
        }

        let padding = align!(current as usize) - current as usize;
        if padding > 0 && sbrk(padding as intptr_t) == usize::MAX as *mut c_void {
          return Err(RegionError::OutOfMemory { requested: padding });
        }

        self.base = sbrk(0) as *mut u8;
        Ok(())
      }
    }
  }

  impl Default for SbrkRegion {
    fn default() -> Self {
      Self::new()
    }
  }

  impl Region for SbrkRegion {
    fn grow(
      &mut self,
      bytes: usize,
    ) -> Result<usize, RegionError> {
      if self.sealed {
        return Err(RegionError::Discontiguous);
      }

      let increment =
        intptr_t::try_from(bytes).map_err(|_| RegionError::Overflow { requested: bytes })?;
      let new_len = self
        .len
        .checked_add(bytes)
        .ok_or(RegionError::Overflow { requested: bytes })?;

      unsafe {
        if self.base.is_null() {
          self.anchor()?;
        }

        let address = sbrk(increment);
        if address == usize::MAX as *mut c_void {
          return Err(RegionError::OutOfMemory { requested: bytes });
        }

        if address as *mut u8 != self.base.add(self.len) {
          log::warn!("program break moved under the region; {bytes} bytes at {address:?} abandoned");
          self.sealed = true;
          return Err(RegionError::Discontiguous);
        }
      }

      let offset = self.len;
      self.len = new_len;
      Ok(offset)
    }

    fn len(&self) -> usize {
      self.len
    }

    fn bytes(&self) -> &[u8] {
      if self.len == 0 {
        return &[];
      }
      unsafe { slice::from_raw_parts(self.base, self.len) }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
      if self.len == 0 {
        return &mut [];
      }
      unsafe { slice::from_raw_parts_mut(self.base, self.len) }
    }
  }
}
