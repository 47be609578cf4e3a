//! Walks an sbrk-backed heap through allocation, reuse, resizing and growth,
//! printing the program break at each step.
//!
//! Run with `cargo run --example program_break`, optionally with `--pause`
//! to stop between steps (handy alongside `pmap` or `gdb`).

#[cfg(target_os = "linux")]
fn main() {
  use std::io::Read;

  use mmalloc::{Allocator, Pointer, Region, SbrkRegion};

  let pause = std::env::args().any(|arg| arg == "--pause");

  let step = |label: &str| {
    println!(
      "[{}] PID = {}, program break (sbrk(0)) = {:?}",
      label,
      std::process::id(),
      SbrkRegion::program_break(),
    );
    if pause {
      println!("\n>>> Press ENTER to continue...");
      let _ = std::io::stdin().bytes().next();
    }
  };

  let report = |allocator: &Allocator<SbrkRegion>, ptr: Pointer, size: usize| {
    println!(
      "Allocated {} bytes, pointer = {}, region = {} bytes in {} blocks",
      size,
      ptr,
      allocator.region().len(),
      allocator.stats().blocks,
    );
  };

  let mut allocator = Allocator::new(SbrkRegion::new());
  step("start");

  // 1) A u32 worth of bytes.
  let first = match allocator.allocate(4) {
    Ok(ptr) => ptr,
    Err(err) => {
      eprintln!("allocation failed: {err}");
      return;
    }
  };
  report(&allocator, first, 4);
  if let Some(bytes) = allocator.payload_mut(first) {
    bytes[..4].copy_from_slice(&0xDEAD_BEEFu32.to_ne_bytes());
  }
  step("after u32");

  // 2) An odd-sized array.
  let Ok(second) = allocator.allocate(12) else {
    return;
  };
  report(&allocator, second, 12);
  if let Some(bytes) = allocator.payload_mut(second) {
    bytes.fill(0xAB);
  }
  step("after [u8; 12]");

  // 3) Release the first block and ask for something smaller: first-fit
  //    hands the same block back.
  allocator.release(first);
  let Ok(third) = allocator.allocate(2) else {
    return;
  };
  println!(
    "third == first? {}",
    if third == first {
      "Yes, it reused the freed block"
    } else {
      "No, it allocated somewhere else"
    }
  );

  // 4) Grow the second block past its neighbours so it has to move.
  match allocator.resize(second, 256) {
    Ok(Some(moved)) => {
      report(&allocator, moved, 256);
      println!("second moved {} -> {}", second, moved);
    }
    Ok(None) => {}
    Err(err) => eprintln!("resize failed: {err}"),
  }

  // 5) A large block moves the break visibly.
  step("before large alloc");
  if let Ok(big) = allocator.allocate(64 * 1024) {
    report(&allocator, big, 64 * 1024);
  }
  step("after large alloc");

  println!("{:#?}", allocator.stats());
  match allocator.check() {
    Ok(()) => println!("chain is consistent"),
    Err(err) => println!("chain is broken: {err}"),
  }
}

#[cfg(not(target_os = "linux"))]
fn main() {
  println!("the sbrk-backed heap is only available on Linux");
}
