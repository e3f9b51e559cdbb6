//! Sharing a memory resource between threads.
use crate::MemoryResource;

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{self, NonNull};
use spin::{Mutex, MutexGuard};

/// A memory resource behind a spin lock.
///
/// The resources of this crate do no synchronization on their own. This
/// wrapper serializes all accesses with a [`spin::Mutex`], which works without
/// operating system support, and makes the resource usable through the
/// [`GlobalAlloc`]-trait:
/// ```
/// use chunk_resource::{ChunkOptions, ChunkResource, LockedResource};
/// use core::alloc::{GlobalAlloc, Layout};
///
/// const OPTIONS: ChunkOptions = ChunkOptions::new(64, 16, 8);
///
/// let resource = ChunkResource::<{ OPTIONS.storage_size() }, 8>::new(OPTIONS);
/// let allocator = LockedResource::new(resource);
///
/// let layout = Layout::new::<[u32; 4]>();
/// // SAFETY: the layout has a non-zero size
/// let ptr = unsafe { allocator.alloc(layout) };
/// assert!(!ptr.is_null());
/// // SAFETY: the pointer was allocated with the same layout
/// unsafe { allocator.dealloc(ptr, layout) };
/// ```
/// Since all constructors are `const fn`s, a locked [`ChunkResource`](crate::ChunkResource)
/// can be the global allocator:
/// ```no_run
/// use chunk_resource::{ChunkOptions, ChunkResource, LockedResource};
///
/// const OPTIONS: ChunkOptions = ChunkOptions::new(256, 16, 1024);
///
/// #[global_allocator]
/// static ALLOCATOR: LockedResource<ChunkResource<{ OPTIONS.storage_size() }, 1024>> =
///     LockedResource::new(ChunkResource::new(OPTIONS));
/// # fn main() {}
/// ```
/// Every allocation then takes a whole block, so choose the block size after
/// the largest allocation of the program.
pub struct LockedResource<R>(Mutex<R>);
impl<R> LockedResource<R> {
    /// Wrap a resource.
    #[must_use = "assign the allocator to a static variable and apply the `#[global_allocator]`-attribute to make it the global allocator"]
    pub const fn new(resource: R) -> Self {
        Self(Mutex::new(resource))
    }

    /// Lock the resource, spinning until it is available.
    ///
    /// The allocation functions of [`GlobalAlloc`] lock internally: do not call
    /// them while holding the returned guard on the same thread.
    pub fn lock(&self) -> MutexGuard<'_, R> {
        self.0.lock()
    }

    /// Unwrap the resource.
    pub fn into_inner(self) -> R {
        self.0.into_inner()
    }
}
unsafe impl<R: MemoryResource> GlobalAlloc for LockedResource<R> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.0
            .lock()
            .try_allocate_bytes_aligned(layout.size(), layout.align())
            .map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // allocators must not unwind, so invalid pointers are only logged
        if let Err(error) = self.0.lock().try_deallocate_bytes(ptr, layout.size()) {
            log::error!("cannot deallocate {ptr:p} ({} bytes): {error}", layout.size());
        }
    }
}
