//! A ready-made heap for callers that do not want to own an [`Allocator`].
//!
//! Each thread gets its own heap, backed by a default [`HeapRegion`], created
//! on first use. Pointers from one thread mean nothing on another.

use std::cell::RefCell;

use crate::{
  allocator::Allocator,
  error::AllocError,
  pointer::Pointer,
  region::HeapRegion,
};

thread_local! {
  static HEAP: RefCell<Allocator<HeapRegion>> = RefCell::new(Allocator::default());
}

pub fn allocate(size: usize) -> Result<Pointer, AllocError> {
  with_heap(|heap| heap.allocate(size))
}

pub fn release(ptr: impl Into<Option<Pointer>>) {
  let ptr = ptr.into();
  with_heap(|heap| heap.release(ptr));
}

pub fn resize(
  ptr: impl Into<Option<Pointer>>,
  size: usize,
) -> Result<Option<Pointer>, AllocError> {
  let ptr = ptr.into();
  with_heap(|heap| heap.resize(ptr, size))
}

/// Runs `f` against this thread's heap.
///
/// # Panics
///
/// Panics if called from inside another `with_heap` closure.
pub fn with_heap<T>(f: impl FnOnce(&mut Allocator<HeapRegion>) -> T) -> T {
  HEAP.with_borrow_mut(f)
}
