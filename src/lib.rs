//! # mmalloc - A First-Fit Block Allocator
//!
//! This crate manages a single contiguous region of memory that grows on
//! demand, handing out pieces of it through three operations:
//! [`Allocator::allocate`], [`Allocator::release`] and [`Allocator::resize`].
//!
//! ## Overview
//!
//! Every block in the region, free or used, carries a header and sits in one
//! address-ordered, doubly linked chain that covers the region with no gaps:
//!
//! ```text
//!   Region:
//!
//!   ┌────┬──────────┬────┬──────────────────┬────┬────────┬──────────────┐
//!   │ H  │  used A  │ H  │      free        │ H  │ used B │  grow(n) ──▶ │
//!   └────┴──────────┴────┴──────────────────┴────┴────────┴──────────────┘
//!        ▲                                       ▲
//!        └── Pointer to A                        └── Pointer to B
//! ```
//!
//! - **Allocate** walks the chain first-fit. A free block that is large
//!   enough is reused, and split if the leftover can hold a header plus at
//!   least one byte. Otherwise the region grows by `HEADER_SIZE + size`.
//! - **Release** wipes the payload, marks the block free and merges it with
//!   any free neighbour, so two free blocks are never adjacent.
//! - **Resize** shrinks in place, grows into a free successor when it can,
//!   and otherwise moves the data to a fresh block.
//!
//! Payloads are always zero-filled when handed out.
//!
//! ## Crate Structure
//!
//! ```text
//!   mmalloc
//!   ├── align      - Word alignment macro (align!)
//!   ├── allocator  - Allocator facade
//!   ├── block      - Block records and HEADER_SIZE
//!   ├── chain      - Address-ordered block chain (internal)
//!   ├── fit        - First-fit search (internal)
//!   ├── split      - Block splitting (internal)
//!   ├── coalesce   - Free neighbour merging (internal)
//!   ├── region     - Region trait, HeapRegion, SbrkRegion
//!   ├── config     - RegionConfig
//!   ├── error      - AllocError, RegionError, ChainError
//!   ├── stats      - HeapStats
//!   └── global     - Per-thread convenience heap
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use mmalloc::Allocator;
//!
//! let mut allocator = Allocator::default();
//!
//! let ptr = allocator.allocate(16).unwrap();
//! allocator.payload_mut(ptr).unwrap()[..5].copy_from_slice(b"hello");
//!
//! let ptr = allocator.resize(ptr, 64).unwrap().unwrap();
//! assert_eq!(&allocator.payload(ptr).unwrap()[..5], b"hello");
//!
//! allocator.release(ptr);
//! assert_eq!(allocator.check(), Ok(()));
//! ```
//!
//! ## Pointers
//!
//! A [`Pointer`] is an opaque token naming a payload by its region offset.
//! Bytes are reached through [`Allocator::payload`] and
//! [`Allocator::payload_mut`], which check the pointer against the chain.
//! Releasing or resizing a pointer that does not name a live block is
//! silently ignored; [`Allocator::try_release`] and [`Allocator::try_resize`]
//! report it instead.
//!
//! ## Regions
//!
//! - [`HeapRegion`] grows a `Vec<u8>` up to a [`RegionConfig::max_bytes`] ceiling.
//! - `SbrkRegion` (Linux) moves the program break with `sbrk(2)`.
//!
//! ## Limitations
//!
//! - **Single-threaded**: an `Allocator` has no internal locking.
//! - **Grow-only**: memory is never returned to the environment.
//! - **Linear**: every operation walks the chain.

pub mod align;
mod allocator;
mod block;
mod chain;
mod coalesce;
mod config;
mod error;
mod fit;
pub mod global;
mod pointer;
mod region;
mod split;
mod stats;

pub use allocator::Allocator;
pub use block::{BlockId, BlockInfo, HEADER_SIZE};
pub use config::RegionConfig;
pub use error::{AllocError, ChainError, RegionError};
pub use pointer::Pointer;
#[cfg(target_os = "linux")]
pub use region::SbrkRegion;
pub use region::{HeapRegion, Region};
pub use stats::HeapStats;
