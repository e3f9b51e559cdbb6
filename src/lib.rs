//! Fixed-block memory resource for embedded systems and arenas
//!
//! This crate provides [`ChunkResource`]: a pool of equally sized, equally
//! aligned memory blocks, that are handed out and taken back in constant time.
//! The blocks are stored inside of the resource itself, which is created by a
//! `const fn`. No request ever touches the global allocator, so latency and
//! failure behavior are fully predictable: a request either fits into a block
//! and a block is free, or it fails right away with an [`AllocError`] telling
//! why.
//!
//! # Usage
//! Describe the blocks with [`ChunkOptions`]. They also determine the two
//! parameters of the resource: the number of bytes of its storage and the
//! number of blocks. Then allocate through the [`MemoryResource`]-trait:
//! ```
//! use chunk_resource::{AllocError, ChunkOptions, ChunkResource, MemoryResource};
//!
//! // 4 blocks of 64 bytes, each aligned to 16
//! const OPTIONS: ChunkOptions = ChunkOptions::new(64, 16, 4);
//! type Resource = ChunkResource<{ OPTIONS.storage_size() }, { OPTIONS.block_count }>;
//!
//! let mut resource = Resource::new(OPTIONS);
//!
//! let bytes = resource.allocate_bytes(32).unwrap();
//! let numbers = resource.allocate_object::<u64>(8).unwrap();
//! assert_eq!(resource.available_blocks(), 2);
//!
//! // requests, that don't fit into a block, are rejected
//! assert!(matches!(
//!     resource.allocate_bytes(65),
//!     Err(AllocError::UnsupportedSize { .. })
//! ));
//!
//! resource.deallocate_object(numbers.as_ptr(), 8);
//! resource.deallocate_bytes(bytes.as_ptr(), 32);
//! ```
//! The resource itself does no locking. To share it between threads (or to use
//! it through [`GlobalAlloc`](core::alloc::GlobalAlloc)), wrap it in a
//! [`LockedResource`] or keep one resource per thread. A locked resource in a
//! `static` can serve as the global allocator:
//! ```no_run
//! use chunk_resource::{ChunkOptions, ChunkResource, LockedResource};
//!
//! const OPTIONS: ChunkOptions = ChunkOptions::new(128, 16, 256);
//!
//! #[global_allocator]
//! static ALLOCATOR: LockedResource<ChunkResource<{ OPTIONS.storage_size() }, 256>> =
//!     LockedResource::new(ChunkResource::new(OPTIONS));
//!
//! extern crate alloc;
//! # fn main() {}
//! ```
//! Note, that every allocation takes a whole block, no matter how small it is.
//!
//! For tests there is [`TrackingResource`]: it enforces the same limits, but
//! records every allocation and checks each deallocation against it.
//!
//! # Implementation
//! The blocks are stored back to back in a buffer inside of the resource. Which of them are
//! free is tracked by the "index stack": an array holding every block index
//! exactly once, split into the free indices (left) and the allocated indices
//! (right) by a boundary. The following walks through a resource with four
//! blocks:
//! 1.  Initially all blocks are free. The indices are stored in reverse, so
//!     that the first allocation gets block 0.
//!     ```text
//!     [ 3 2 1 0 | ]        available = 4
//!     ```
//! 2.  Three blocks are allocated. Each allocation moves the boundary one to
//!     the left and hands out the block, whose index crossed it.
//!     ```text
//!     [ 3 | 2 1 0 ]        available = 1, allocated blocks 0, 1, 2
//!     ```
//!     The allocated side is a stack: the block allocated last is right next to
//!     the boundary.
//! 3.  Block 2 is freed. Its pointer is converted to the block index by simple
//!     arithmetic. Then the allocated side is searched for that index, starting
//!     at the boundary. As block 2 was allocated last, it is found immediately.
//!     The boundary moves one to the right.
//!     ```text
//!     [ 3 2 | 1 0 ]        available = 2
//!     ```
//! 4.  Block 0 is freed. This time the search has to look at two entries. The
//!     found entry is swapped with the first allocated entry (next to the
//!     boundary) and the boundary moves to the right. No other entry moves.
//!     ```text
//!     [ 3 2 | 0 1 ]   ->   [ 3 2 0 | 1 ]        available = 3
//!     ```
//!     If the index is not found on the allocated side, the block is already
//!     free: this is a double free and reported as such.
//! 5.  The next allocation gets block 0 again. Freed blocks are reused in LIFO
//!     order, which is good for caches as long as the usage is stack-like.
//!
//! Freeing in a different order than allocating scatters the free indices
//! (step 4 left `3 2 0`, so the next allocations get blocks 0, 2 and 3 in that
//! order). [`ChunkResource::defragment()`] sorts the free side again, so that
//! subsequent allocations walk the memory in ascending order. For cyclic
//! allocation patterns call it at the start of each cycle;
//! [`ChunkResource::defragment_assume_sorted()`] is the cheaper variant, if
//! the free side is mostly sorted already.
//!
//! Requests for zero bytes never consume a block. They get a fixed sentinel
//! address: the byte right behind the last block. It is unique to the
//! resource, never dereferenced and can be "freed" any number of times.
#![no_std]

extern crate alloc;

mod error;
mod options;
mod pool;
mod resource;
mod sync;
mod tracking;

pub use error::{AllocError, FreeError, OptionsError};
pub use options::ChunkOptions;
pub use resource::{ChunkResource, MemoryResource};
pub use sync::LockedResource;
pub use tracking::{Allocation, TrackingResource};
