//! The allocation interface and the fixed-block memory resource.
use crate::pool::BlockPool;
use crate::{AllocError, ChunkOptions, FreeError, OptionsError};

use core::fmt;
use core::mem;
use core::ptr::NonNull;

/// The allocation protocol shared by all memory resources of this crate.
///
/// Implementors provide the untyped primitives; the alignment checks, the
/// typed requests and the non-failing variants are derived from them, so that
/// every resource validates requests in exactly the same order.
///
/// Every allocation function has a matching deallocation function:
///
/// | allocated with                                    | deallocate with          |
/// |---------------------------------------------------|--------------------------|
/// | `allocate_bytes`, `allocate_bytes_aligned`, ...   | `deallocate_bytes`       |
/// | `allocate_object`, `allocate_object_aligned`, ... | `deallocate_object`      |
///
/// The size passed on deallocation has to be the size passed on allocation.
///
/// A request for zero bytes never consumes a block. It returns a sentinel
/// address, that must not be dereferenced and whose deallocation is a no-op.
pub trait MemoryResource {
    /// The options describing the blocks of this resource.
    fn options(&self) -> ChunkOptions;

    /// The number of blocks, that can still be allocated.
    ///
    /// If this is `0`, every non-zero request fails.
    fn available_blocks(&self) -> usize;

    /// Conservatively check, whether a pointer might belong to this resource.
    ///
    /// This is _not_ a check, whether the pointer can be deallocated. It is
    /// meant to tell apart memory of several resources: if it returns `false`,
    /// the pointer is definitely not owned by this resource.
    fn maybe_owns(&self, ptr: *const u8) -> bool;

    /// Allocate `n` bytes.
    ///
    /// The returned memory is aligned to the block alignment and uninitialized.
    /// Release it with [`deallocate_bytes()`](Self::deallocate_bytes).
    ///
    /// # Errors
    /// [`AllocError::UnsupportedSize`] if `n` exceeds the block size,
    /// [`AllocError::OutOfMemory`] if `n` is non-zero and no block is left.
    fn allocate_bytes(&mut self, n: usize) -> Result<NonNull<u8>, AllocError>;

    /// Deallocate memory obtained from [`allocate_bytes()`](Self::allocate_bytes),
    /// reporting contract violations instead of asserting.
    ///
    /// The null pointer and the zero-size sentinel are accepted and ignored.
    ///
    /// # Errors
    /// [`FreeError::InvalidPointer`] if the pointer was not handed out by this
    /// resource, [`FreeError::DoubleFree`] if it was already released. Some
    /// resources also report a [`FreeError::SizeMismatch`]. The resource is
    /// left untouched on error.
    fn try_deallocate_bytes(&mut self, ptr: *mut u8, n: usize) -> Result<(), FreeError>;

    /// Allocate `n` bytes aligned to at least `align`.
    ///
    /// # Errors
    /// [`AllocError::InvalidAlign`] if `align` is not a power of two,
    /// [`AllocError::UnsupportedAlign`] if it exceeds the block alignment and
    /// everything [`allocate_bytes()`](Self::allocate_bytes) reports.
    fn allocate_bytes_aligned(&mut self, n: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        self.options().check_align(align)?;
        self.allocate_bytes(n)
    }

    /// Like [`allocate_bytes()`](Self::allocate_bytes), but returns `None` on
    /// failure. `None` need not be deallocated.
    fn try_allocate_bytes(&mut self, n: usize) -> Option<NonNull<u8>> {
        self.allocate_bytes(n).ok()
    }

    /// Like [`allocate_bytes_aligned()`](Self::allocate_bytes_aligned), but
    /// returns `None` on failure.
    fn try_allocate_bytes_aligned(&mut self, n: usize, align: usize) -> Option<NonNull<u8>> {
        self.allocate_bytes_aligned(n, align).ok()
    }

    /// Allocate storage for `n` objects of type `T`.
    ///
    /// The objects are not initialized. Release the storage with
    /// [`deallocate_object()`](Self::deallocate_object).
    ///
    /// # Errors
    /// Checked in this order: [`AllocError::ArrayLengthOverflow`] if the array
    /// size overflows, [`AllocError::UnsupportedAlign`] if `T` is aligned more
    /// strictly than a block, [`AllocError::UnsupportedSize`] if the array does
    /// not fit into a block and [`AllocError::OutOfMemory`].
    fn allocate_object<T>(&mut self, n: usize) -> Result<NonNull<T>, AllocError>
    where
        Self: Sized,
    {
        let size = self.options().check_array::<T>(n)?;
        self.allocate_bytes(size).map(NonNull::cast)
    }

    /// Allocate storage for `n` objects of type `T`, aligned to at least
    /// `align`.
    ///
    /// An `align` below the alignment of `T` is valid but has no effect.
    ///
    /// # Errors
    /// [`AllocError::InvalidAlign`] and [`AllocError::UnsupportedAlign`] for
    /// `align`, then everything [`allocate_object()`](Self::allocate_object)
    /// reports.
    fn allocate_object_aligned<T>(&mut self, n: usize, align: usize) -> Result<NonNull<T>, AllocError>
    where
        Self: Sized,
    {
        self.options().check_align(align)?;
        self.allocate_object(n)
    }

    /// Like [`allocate_object()`](Self::allocate_object), but returns `None`
    /// on failure.
    fn try_allocate_object<T>(&mut self, n: usize) -> Option<NonNull<T>>
    where
        Self: Sized,
    {
        self.allocate_object(n).ok()
    }

    /// Like [`allocate_object_aligned()`](Self::allocate_object_aligned), but
    /// returns `None` on failure.
    fn try_allocate_object_aligned<T>(&mut self, n: usize, align: usize) -> Option<NonNull<T>>
    where
        Self: Sized,
    {
        self.allocate_object_aligned(n, align).ok()
    }

    /// Deallocate memory obtained from [`allocate_bytes()`](Self::allocate_bytes)
    /// or its variants.
    ///
    /// Passing a pointer not allocated by this resource or one that was
    /// already released is a bug in the caller: it is logged and panics in
    /// debug builds. Release builds log it and leave the resource untouched.
    fn deallocate_bytes(&mut self, ptr: *mut u8, n: usize) {
        if let Err(error) = self.try_deallocate_bytes(ptr, n) {
            log::error!("cannot deallocate {ptr:p} ({n} bytes): {error}");
            if cfg!(debug_assertions) {
                panic!("{error}");
            }
        }
    }

    /// Deallocate storage obtained from [`allocate_object()`](Self::allocate_object)
    /// or its variants, reporting contract violations.
    ///
    /// # Errors
    /// See [`try_deallocate_bytes()`](Self::try_deallocate_bytes).
    fn try_deallocate_object<T>(&mut self, ptr: *mut T, n: usize) -> Result<(), FreeError>
    where
        Self: Sized,
    {
        self.try_deallocate_bytes(ptr.cast(), n.saturating_mul(mem::size_of::<T>()))
    }

    /// Deallocate storage obtained from [`allocate_object()`](Self::allocate_object)
    /// or its variants.
    ///
    /// See [`deallocate_bytes()`](Self::deallocate_bytes) for the handling of
    /// invalid pointers.
    fn deallocate_object<T>(&mut self, ptr: *mut T, n: usize)
    where
        Self: Sized,
    {
        self.deallocate_bytes(ptr.cast(), n.saturating_mul(mem::size_of::<T>()));
    }
}

/// A memory resource handing out blocks of a single size and alignment.
///
/// The resource holds exactly `BLOCKS` blocks inside of a buffer of `BYTES`
/// bytes, which is part of the resource itself. It never touches the global
/// allocator, so it can be used to implement one. Allocation and deallocation
/// of a block are O(1) for stack-like usage (the block allocated last is
/// released first). See the [crate-level](crate)-documentation for the
/// algorithm.
///
/// Both parameters follow from the [`ChunkOptions`]: use
/// [`ChunkOptions::storage_size()`] and [`ChunkOptions::block_count`].
/// ```
/// use chunk_resource::{ChunkOptions, ChunkResource, MemoryResource};
///
/// const OPTIONS: ChunkOptions = ChunkOptions::new(64, 16, 4);
///
/// let mut resource =
///     ChunkResource::<{ OPTIONS.storage_size() }, { OPTIONS.block_count }>::new(OPTIONS);
/// let block = resource.allocate_bytes(32).unwrap();
/// assert_eq!(resource.available_blocks(), 3);
/// resource.deallocate_bytes(block.as_ptr(), 32);
/// assert_eq!(resource.available_blocks(), 4);
/// ```
/// The blocks move together with the resource. Do not move it while blocks
/// are allocated: placing it in a `static` or behind a reference takes care of
/// that. There is no value-based equality: two resources compare equal only if
/// they are the same resource.
pub struct ChunkResource<const BYTES: usize, const BLOCKS: usize> {
    pool: BlockPool<BYTES, BLOCKS>,
}
impl<const BYTES: usize, const BLOCKS: usize> ChunkResource<BYTES, BLOCKS> {
    /// Create a new [`ChunkResource`] with all blocks free.
    ///
    /// This function is a `const fn`, so it can initialize a `static`
    /// directly. Invalid options are then reported at compile time.
    ///
    /// The options are [normalized](ChunkOptions::normalized), so the actual
    /// blocks may be larger or stricter aligned than requested (without taking
    /// up more memory). Query them with [`options()`](Self::options).
    ///
    /// # Panics
    /// This function panics if the options are invalid or don't fit the
    /// parameters of the resource. See [`try_new()`](Self::try_new) for the
    /// conditions.
    #[must_use = "assign the resource to a variable (or a static) and allocate from it"]
    pub const fn new(options: ChunkOptions) -> Self {
        match Self::try_new(options) {
            Ok(resource) => resource,
            Err(error) => panic!("{}", error.summary()),
        }
    }

    /// Create a new [`ChunkResource`], reporting invalid options.
    ///
    /// # Errors
    /// Checked in this order:
    /// - the options or their normalized form are not
    ///   [valid](ChunkOptions::validate),
    /// - [`OptionsError::BlockCountMismatch`] if the block count is not
    ///   `BLOCKS`,
    /// - [`OptionsError::StorageTooSmall`] if the
    ///   [storage size](ChunkOptions::storage_size) exceeds `BYTES`.
    pub const fn try_new(options: ChunkOptions) -> Result<Self, OptionsError> {
        if let Err(error) = options.validate() {
            return Err(error);
        }
        let normalized = options.normalized();
        if let Err(error) = normalized.validate() {
            return Err(error);
        }

        match BlockPool::new(normalized) {
            Ok(pool) => Ok(Self { pool }),
            Err(error) => Err(error),
        }
    }

    /// The normalized options of this resource.
    pub const fn options(&self) -> ChunkOptions {
        self.pool.options()
    }

    /// The number of blocks, that can still be allocated.
    pub const fn available_blocks(&self) -> usize {
        self.pool.available()
    }

    /// Check whether a pointer points into the blocks of this resource.
    ///
    /// `false` for the null pointer and the zero-size sentinel. `true` does not
    /// mean the pointer can be deallocated: it might point into the middle of a
    /// block or to a free one.
    pub fn maybe_owns(&self, ptr: *const u8) -> bool {
        self.pool.is_maybe_owned(ptr)
    }

    /// The address returned for zero-sized requests.
    pub fn zero_sentinel(&self) -> NonNull<u8> {
        self.pool.zero_sentinel()
    }

    /// Reorder the free blocks to improve locality of later allocations.
    ///
    /// Afterwards free blocks are handed out in ascending address order. Call
    /// this at the start of every cycle of a cyclic, stack-like allocation
    /// pattern. Prefer [`defragment_assume_sorted()`](Self::defragment_assume_sorted)
    /// if the previous cycles followed that pattern already.
    ///
    /// This never affects which blocks are free, only their order.
    pub fn defragment(&mut self) {
        self.pool.defragment();
        log::debug!("defragmented {} free blocks", self.pool.available());
    }

    /// Same as [`defragment()`](Self::defragment), but faster if the free
    /// blocks are (almost) in order already and slower if they are not.
    pub fn defragment_assume_sorted(&mut self) {
        self.pool.defragment_assume_sorted();
        log::debug!("defragmented {} free blocks", self.pool.available());
    }
}
impl<const BYTES: usize, const BLOCKS: usize> MemoryResource for ChunkResource<BYTES, BLOCKS> {
    fn options(&self) -> ChunkOptions {
        self.pool.options()
    }

    fn available_blocks(&self) -> usize {
        self.pool.available()
    }

    fn maybe_owns(&self, ptr: *const u8) -> bool {
        self.pool.is_maybe_owned(ptr)
    }

    fn allocate_bytes(&mut self, n: usize) -> Result<NonNull<u8>, AllocError> {
        self.pool.options().check_size(n)?;

        if n == 0 {
            return Ok(self.pool.zero_sentinel());
        }
        if self.pool.available() == 0 {
            return Err(AllocError::OutOfMemory);
        }

        let block = self.pool.allocate();
        log::trace!("allocated {n} bytes at {block:p}");
        Ok(block)
    }

    fn try_deallocate_bytes(&mut self, ptr: *mut u8, n: usize) -> Result<(), FreeError> {
        if ptr.is_null() || ptr == self.pool.zero_sentinel().as_ptr() {
            return Ok(());
        }
        if !self.pool.is_owned(ptr) {
            return Err(FreeError::InvalidPointer);
        }

        let token = self.pool.is_allocated(ptr).ok_or(FreeError::DoubleFree)?;
        self.pool.deallocate(token);
        log::trace!("deallocated {n} bytes at {ptr:p}");
        Ok(())
    }
}
impl<const BYTES: usize, const BLOCKS: usize> PartialEq for ChunkResource<BYTES, BLOCKS> {
    fn eq(&self, other: &Self) -> bool {
        self.pool.same_storage(&other.pool)
    }
}
impl<const BYTES: usize, const BLOCKS: usize> Eq for ChunkResource<BYTES, BLOCKS> {}
impl<const BYTES: usize, const BLOCKS: usize> fmt::Debug for ChunkResource<BYTES, BLOCKS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkResource")
            .field("options", &self.options())
            .field("available_blocks", &self.available_blocks())
            .finish()
    }
}
impl<const BYTES: usize, const BLOCKS: usize> fmt::Display for ChunkResource<BYTES, BLOCKS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk_resource<{}>", self.options())
    }
}
