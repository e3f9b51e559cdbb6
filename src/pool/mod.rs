//! This module provides the block pool and its support types.
//!
//! A "block pool" hands out and takes back whole blocks. It does not look at
//! sizes or alignments of requests at all: that is the job of the memory
//! resources built on top of it. Most operations have preconditions, which are
//! only checked by (debug) assertions.
mod sort;
mod storage;

pub use self::storage::STORAGE_ALIGN;

use self::sort::optimistic_sort_by;
use self::storage::BlockStorage;
use crate::{ChunkOptions, OptionsError};

use core::ptr::{self, NonNull};

/// A position in the index stack of a [`BlockPool`] naming an allocated block.
///
/// A token is obtained from [`BlockPool::is_allocated()`] and consumed by
/// [`BlockPool::deallocate()`]. It is invalidated by every other mutating call
/// on the pool in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token(usize);

/// A fixed number of equally sized and aligned blocks.
///
/// The free list is an index stack: a permutation of all block indices, that
/// is split at `available`. The indices below that boundary name the free
/// blocks, the ones above name the allocated blocks, the most recently
/// allocated one being next to the boundary:
/// ```text
/// index_stack: [ 3 | 4 | 1 || 0 | 2 ]
///                 free      ^ allocated
///                           available = 3
/// ```
/// Allocating pops the entry right below the boundary. Deallocating swaps the
/// entry of the freed block with the first allocated entry and moves the
/// boundary up by one. Both are O(1); no other entry is shifted.
///
/// The pool holds exactly `BLOCKS` blocks in a storage of `BYTES` bytes.
pub struct BlockPool<const BYTES: usize, const BLOCKS: usize> {
    options: ChunkOptions,
    storage: BlockStorage<BYTES>,
    index_stack: [usize; BLOCKS],
    available: usize,
}
impl<const BYTES: usize, const BLOCKS: usize> BlockPool<BYTES, BLOCKS> {
    /// Create a pool, in which every block is free.
    ///
    /// The index stack is filled in reverse, so the first allocation yields
    /// the block at index 0.
    ///
    /// The options have to be normalized and valid.
    ///
    /// # Errors
    /// [`OptionsError::BlockCountMismatch`] if the options don't describe
    /// exactly `BLOCKS` blocks, [`OptionsError::StorageTooSmall`] if the blocks
    /// don't fit into `BYTES` bytes.
    pub const fn new(options: ChunkOptions) -> Result<Self, OptionsError> {
        debug_assert!(options.is_valid(), "pool options must be valid");
        debug_assert!(
            options.block_size % options.block_align == 0,
            "options not normalized"
        );

        if options.block_count != BLOCKS {
            return Err(OptionsError::BlockCountMismatch {
                block_count: options.block_count,
                capacity: BLOCKS,
            });
        }
        let storage = match BlockStorage::new(options) {
            Ok(storage) => storage,
            Err(error) => return Err(error),
        };

        let mut index_stack = [0; BLOCKS];
        let mut position = 0;
        while position < BLOCKS {
            index_stack[position] = BLOCKS - 1 - position;
            position += 1;
        }
        Ok(Self {
            options,
            storage,
            index_stack,
            available: options.block_count,
        })
    }

    /// The (normalized) options of this pool.
    pub const fn options(&self) -> ChunkOptions {
        self.options
    }

    /// The number of free blocks.
    pub const fn available(&self) -> usize {
        self.available
    }

    /// The indices of the free blocks, the next one to be allocated last.
    #[cfg(test)]
    pub fn free_indices(&self) -> &[usize] {
        &self.index_stack[..self.available]
    }

    /// The address handed out for zero-sized requests.
    pub fn zero_sentinel(&self) -> NonNull<u8> {
        self.storage.zero_sentinel()
    }

    /// Check whether a pointer points somewhere into the blocks.
    ///
    /// This is a pure range check: it doesn't care, whether the pointer points
    /// to the start of a block. It is `false` for the null pointer and the
    /// zero-size sentinel.
    pub fn is_maybe_owned(&self, ptr: *const u8) -> bool {
        self.storage.offset_of(ptr).is_some()
    }

    /// Check whether a pointer points to the start of a block.
    pub fn is_owned(&self, ptr: *const u8) -> bool {
        self.storage
            .offset_of(ptr)
            .is_some_and(|offset| offset % self.storage.block_size() == 0)
    }

    /// Compute the index of the block a pointer points to.
    ///
    /// # Panics
    /// This function panics, if the pointer is outside of the blocks. In debug
    /// builds it also panics if the pointer is not at the start of a block.
    pub fn block_index(&self, ptr: *const u8) -> usize {
        let Some(offset) = self.storage.offset_of(ptr) else {
            panic!("pointer is not owned by the pool");
        };
        debug_assert!(
            offset % self.storage.block_size() == 0,
            "pointer is not at the start of a block"
        );

        let index = offset / self.storage.block_size();
        debug_assert!(index < self.options.block_count);
        index
    }

    /// Check whether the block at `ptr` is currently allocated.
    ///
    /// If so, the position of its index in the index stack is returned as a
    /// [`Token`], that can be passed to [`deallocate()`](Self::deallocate).
    /// `None` means the block is free.
    ///
    /// The allocated part of the stack is scanned starting at the boundary. For
    /// the usual stack-like pattern (the last allocated block is freed first)
    /// the block is found right away; otherwise this is a linear scan.
    ///
    /// The pointer must be [owned](Self::is_owned).
    pub fn is_allocated(&self, ptr: *const u8) -> Option<Token> {
        let index = self.block_index(ptr);
        self.index_stack[self.available..]
            .iter()
            .position(|&allocated| allocated == index)
            .map(|position| Token(self.available + position))
    }

    /// Hand out the free block on top of the stack.
    ///
    /// # Panics
    /// This function panics if there is no free block. Callers are expected to
    /// check [`available()`](Self::available) beforehand.
    pub fn allocate(&mut self) -> NonNull<u8> {
        assert!(self.available > 0, "no blocks available");

        self.available -= 1;
        self.storage.block(self.index_stack[self.available])
    }

    /// Take back the allocated block named by `token`.
    ///
    /// The token must have been returned by [`is_allocated()`](Self::is_allocated)
    /// without any mutating call in between. This is only checked in debug
    /// builds: a stale token frees the wrong block.
    pub fn deallocate(&mut self, token: Token) {
        debug_assert!(
            token.0 < self.options.block_count,
            "token not obtained from is_allocated()"
        );
        debug_assert!(
            token.0 >= self.available,
            "token invalidated by a mutating call after is_allocated()"
        );

        self.index_stack.swap(token.0, self.available);
        self.available += 1;
    }

    /// Sort the free indices in descending order.
    ///
    /// Afterwards the free blocks are handed out in ascending address order,
    /// which improves locality of subsequent stack-like allocation cycles.
    pub fn defragment(&mut self) {
        self.index_stack[..self.available].sort_unstable_by(|a, b| b.cmp(a));
    }

    /// Same result as [`defragment()`](Self::defragment), but optimized for
    /// a free region that is already (almost) sorted.
    pub fn defragment_assume_sorted(&mut self) {
        optimistic_sort_by(&mut self.index_stack[..self.available], |a, b| a > b);
    }

    /// Check whether two pools share the same storage.
    pub fn same_storage(&self, other: &Self) -> bool {
        ptr::eq(&self.storage, &other.storage)
    }
}
