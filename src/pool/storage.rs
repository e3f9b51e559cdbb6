use crate::{ChunkOptions, OptionsError};

use core::cell::UnsafeCell;
use core::mem::{self, MaybeUninit};
use core::ptr::NonNull;

/// The guaranteed alignment of the start of every [`BlockStorage`].
///
/// Blocks aligned to at most this value start right at the beginning of the
/// buffer. Stricter alignments need up to `block_align - STORAGE_ALIGN` bytes
/// of padding in front of the first block.
pub const STORAGE_ALIGN: usize = 16;

/// The memory backing the blocks of a pool.
///
/// The buffer is a plain array inside of the storage, so a pool placed in a
/// `static` does not need any other memory. The blocks are placed back to
/// back, starting at the first address aligned to `block_align`. The byte right
/// behind the last block is never handed out as a block: its address serves as
/// the zero-size sentinel of the pool. It lies inside of this buffer, which
/// makes the sentinel unique to the storage and keeps it out of the range of
/// any other pool.
///
/// The block memory is only accessed through pointers derived from the
/// [`UnsafeCell`], never through references. The memory is left uninitialized.
///
/// Since the blocks are addressed relative to the buffer, the storage must not
/// be moved while blocks are handed out.
#[repr(C, align(16))]
pub struct BlockStorage<const BYTES: usize> {
    bytes: UnsafeCell<[MaybeUninit<u8>; BYTES]>,
    block_size: usize,
    block_align: usize,
    block_count: usize,
}
const _: () = assert!(mem::align_of::<BlockStorage<0>>() == STORAGE_ALIGN);

impl<const BYTES: usize> BlockStorage<BYTES> {
    /// Create the storage for the given (normalized) options.
    ///
    /// # Errors
    /// [`OptionsError::StorageTooSmall`] if the blocks and the sentinel do not
    /// fit into `BYTES` bytes, see [`ChunkOptions::storage_size()`].
    pub const fn new(options: ChunkOptions) -> Result<Self, OptionsError> {
        let required = options.storage_size();
        if required > BYTES {
            return Err(OptionsError::StorageTooSmall {
                required,
                capacity: BYTES,
            });
        }

        Ok(Self {
            bytes: UnsafeCell::new([MaybeUninit::uninit(); BYTES]),
            block_size: options.block_size,
            block_align: options.block_align,
            block_count: options.block_count,
        })
    }

    /// The number of bytes occupied by the blocks (without the sentinel).
    pub const fn blocks_len(&self) -> usize {
        self.block_size * self.block_count
    }

    /// The address of the first block.
    fn base(&self) -> NonNull<u8> {
        let start = NonNull::from(&self.bytes).cast::<u8>();
        let padding = (start.as_ptr() as usize).wrapping_neg() & (self.block_align - 1);

        // SAFETY: the buffer starts at a multiple of `STORAGE_ALIGN`, so the
        // padding is at most `block_align - STORAGE_ALIGN` for stricter
        // alignments and 0 otherwise. This is included in the storage size,
        // which was checked against `BYTES` on construction.
        unsafe { start.add(padding) }
    }

    /// Obtain the address of the block with the given index.
    ///
    /// # Panics
    /// This function panics if the index is out of bounds.
    pub fn block(&self, index: usize) -> NonNull<u8> {
        assert!(index < self.block_count, "block index out of bounds");

        // SAFETY: the index is in bounds (asserted above), so the block lies
        // inside of the buffer.
        unsafe { self.base().add(index * self.block_size) }
    }

    /// The address returned for zero-sized requests.
    ///
    /// It points to the byte after the last block and must never be read from
    /// or written to.
    pub fn zero_sentinel(&self) -> NonNull<u8> {
        // SAFETY: the storage size reserves one byte behind the last block.
        unsafe { self.base().add(self.blocks_len()) }
    }

    /// Compute the byte offset of a pointer into the blocks.
    ///
    /// `None` is returned for every pointer outside of
    /// `[base, base + block_size * block_count)`, which includes the null
    /// pointer and the sentinel.
    pub fn offset_of(&self, ptr: *const u8) -> Option<usize> {
        let offset = (ptr as usize).checked_sub(self.base().as_ptr() as usize)?;
        (offset < self.blocks_len()).then_some(offset)
    }

    /// The size of a single block.
    pub const fn block_size(&self) -> usize {
        self.block_size
    }
}
