//! A bookkeeping memory resource for checking allocation patterns.
//!
//! [`TrackingResource`] applies exactly the limits of a [`ChunkResource`](crate::ChunkResource)
//! built from the same options, but serves every request from the global
//! allocator and records it. This makes it a drop-in replacement for testing
//! code written against [`MemoryResource`]: it additionally verifies, that
//! every deallocation passes the same size as the allocation and it reports
//! leaked allocations when dropped.
use crate::{AllocError, ChunkOptions, FreeError, MemoryResource, OptionsError};

use alloc::alloc::{alloc, dealloc, Layout};
use alloc::vec::Vec;
use core::ptr::{self, NonNull};

/// A live allocation of a [`TrackingResource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// The address handed out.
    pub ptr: NonNull<u8>,
    /// The number of bytes requested.
    pub size: usize,
}

/// A memory resource recording every allocation.
///
/// Allocations are kept in the order they were made. Lookups are linear, so
/// this is meant for tests, not for production use.
#[derive(Debug)]
pub struct TrackingResource {
    options: ChunkOptions,
    layout: Layout,
    allocations: Vec<Allocation>,
}
impl TrackingResource {
    /// Create a resource with the limits of a
    /// [`ChunkResource`](crate::ChunkResource) with these options.
    ///
    /// # Errors
    /// The same as [`ChunkResource::try_new()`](crate::ChunkResource::try_new),
    /// except for the checks against the storage of a resource.
    pub fn new(options: ChunkOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        let normalized = options.normalized();
        normalized.validate()?;

        let layout = Layout::from_size_align(normalized.block_size, normalized.block_align)
            .map_err(|_| OptionsError::SizeOverflow {
                block_size: normalized.block_size,
                block_count: normalized.block_count,
            })?;

        Ok(Self {
            options: normalized,
            layout,
            allocations: Vec::new(),
        })
    }

    /// The live allocations, oldest first.
    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    /// The address returned for zero-sized requests.
    ///
    /// This is a dangling address aligned to the block alignment. Unlike the
    /// sentinel of a [`ChunkResource`](crate::ChunkResource) it is shared by
    /// all tracking resources with the same alignment.
    pub fn zero_sentinel(&self) -> NonNull<u8> {
        NonNull::new(ptr::null_mut::<u8>().wrapping_add(self.options.block_align))
            .unwrap_or(NonNull::dangling())
    }
}
impl MemoryResource for TrackingResource {
    fn options(&self) -> ChunkOptions {
        self.options
    }

    fn available_blocks(&self) -> usize {
        self.options.block_count - self.allocations.len()
    }

    fn maybe_owns(&self, ptr: *const u8) -> bool {
        self.allocations
            .iter()
            .any(|allocation| allocation.ptr.as_ptr().cast_const() == ptr)
    }

    fn allocate_bytes(&mut self, n: usize) -> Result<NonNull<u8>, AllocError> {
        self.options.check_size(n)?;

        if n == 0 {
            return Ok(self.zero_sentinel());
        }
        if self.available_blocks() == 0 {
            return Err(AllocError::OutOfMemory);
        }

        // SAFETY: the layout has a non-zero size, as valid options do
        let ptr = NonNull::new(unsafe { alloc(self.layout) }).ok_or(AllocError::OutOfMemory)?;
        self.allocations.push(Allocation { ptr, size: n });
        log::trace!("tracking allocation of {n} bytes at {ptr:p}");
        Ok(ptr)
    }

    fn try_deallocate_bytes(&mut self, ptr: *mut u8, n: usize) -> Result<(), FreeError> {
        if ptr.is_null() || ptr == self.zero_sentinel().as_ptr() {
            return Ok(());
        }

        let position = self
            .allocations
            .iter()
            .position(|allocation| allocation.ptr.as_ptr() == ptr)
            .ok_or(FreeError::InvalidPointer)?;
        let allocation = self.allocations[position];
        if allocation.size != n {
            return Err(FreeError::SizeMismatch {
                expected: allocation.size,
                actual: n,
            });
        }

        self.allocations.remove(position);
        // SAFETY: the pointer was allocated in `allocate_bytes()` with this
        // layout and was live until now.
        unsafe { dealloc(allocation.ptr.as_ptr(), self.layout) };
        Ok(())
    }
}
impl Drop for TrackingResource {
    fn drop(&mut self) {
        if !self.allocations.is_empty() {
            log::warn!(
                "{} allocation(s) still live when dropping the tracking resource",
                self.allocations.len()
            );
        }
        for allocation in self.allocations.drain(..) {
            // SAFETY: every recorded allocation is live and used this layout
            unsafe { dealloc(allocation.ptr.as_ptr(), self.layout) };
        }
    }
}
// SAFETY: the resource exclusively owns every recorded allocation
unsafe impl Send for TrackingResource {}
