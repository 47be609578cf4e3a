//! Opaque payload pointers.
//!
//! A [`Pointer`] names the first payload byte of a block by its region
//! offset. It carries no borrow and can be forged, so every operation that
//! takes one validates it against the block chain first.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pointer(usize);

impl Pointer {
  /// Builds a pointer from a raw region offset.
  ///
  /// Nothing checks the offset here; a pointer that does not name a live
  /// payload is simply ignored by [`crate::Allocator::release`].
  pub const fn from_offset(offset: usize) -> Self {
    Self(offset)
  }

  pub const fn offset(self) -> usize {
    self.0
  }
}

impl fmt::Display for Pointer {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{:#x}", self.0)
  }
}
