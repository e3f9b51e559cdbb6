//! The error types reported by the memory resources.
//!
//! Failures are split by who is at fault: [`AllocError`] covers requests the
//! resource cannot serve (reported to the caller, never retried),
//! [`FreeError`] covers contract violations on deallocation and
//! [`OptionsError`] is returned when a resource is constructed from an invalid
//! [`ChunkOptions`](crate::ChunkOptions) triple.
use thiserror::Error;

/// An allocation request could not be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum AllocError {
    /// Every block is in use and the request was for a non-zero size.
    #[error("memory resource is out of blocks")]
    OutOfMemory,
    /// The requested size is larger than a single block.
    #[error("{size} exceeds {max_size}, the max size supported by the memory resource")]
    UnsupportedSize {
        /// The number of bytes requested.
        size: usize,
        /// The block size of the resource.
        max_size: usize,
    },
    /// The requested alignment is stricter than the block alignment.
    #[error("{align} exceeds {max_align}, the max alignment supported by the memory resource")]
    UnsupportedAlign {
        /// The alignment requested.
        align: usize,
        /// The block alignment of the resource.
        max_align: usize,
    },
    /// The requested alignment is not a power of two.
    #[error("{align} is not a valid alignment, must be a power of 2")]
    InvalidAlign {
        /// The alignment requested.
        align: usize,
    },
    /// `count * elem_size` does not fit into `isize`.
    #[error("array of {count} elements of size {elem_size} overflows the address space")]
    ArrayLengthOverflow {
        /// The number of elements requested.
        count: usize,
        /// The size of a single element.
        elem_size: usize,
    },
}

/// A deallocation request violated the contract of the resource.
///
/// These are bugs in the calling code. The panicking deallocation functions
/// only check for them with debug assertions, the `try_`-variants report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum FreeError {
    /// The pointer was not handed out by this resource.
    #[error("invalid pointer: not allocated by this memory resource")]
    InvalidPointer,
    /// The pointer belongs to a block, that is already free.
    #[error("double free")]
    DoubleFree,
    /// The pointer is live, but was allocated with a different size.
    #[error("invalid size: allocated with {expected} bytes, freed with {actual}")]
    SizeMismatch {
        /// The size passed on allocation.
        expected: usize,
        /// The size passed on deallocation.
        actual: usize,
    },
}

/// The options a resource was constructed with are unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum OptionsError {
    /// `block_size` is zero.
    #[error("block size must not be 0")]
    ZeroBlockSize,
    /// `block_count` is zero.
    #[error("block count must not be 0")]
    ZeroBlockCount,
    /// `block_align` is not a power of two.
    #[error("block align {align} is not a power of 2")]
    InvalidAlign {
        /// The offending alignment.
        align: usize,
    },
    /// The options describe a different number of blocks than the resource
    /// has room for.
    #[error("{block_count} blocks requested, but the resource holds exactly {capacity}")]
    BlockCountMismatch {
        /// The block count of the options.
        block_count: usize,
        /// The number of blocks of the resource.
        capacity: usize,
    },
    /// The blocks do not fit into the storage of the resource.
    #[error("{required} bytes of storage required, but the resource has only {capacity}")]
    StorageTooSmall {
        /// The storage size of the options.
        required: usize,
        /// The storage size of the resource.
        capacity: usize,
    },
    /// The total storage size does not fit into `isize`.
    #[error("{block_count} blocks of {block_size} bytes overflow the address space")]
    SizeOverflow {
        /// The block size (after padding, if the options were normalized).
        block_size: usize,
        /// The number of blocks.
        block_count: usize,
    },
}
impl OptionsError {
    /// A fixed description of the error, usable in `const` contexts.
    pub(crate) const fn summary(&self) -> &'static str {
        match self {
            Self::ZeroBlockSize => "block size must not be 0",
            Self::ZeroBlockCount => "block count must not be 0",
            Self::InvalidAlign { .. } => "block align is not a power of 2",
            Self::BlockCountMismatch { .. } => "block count differs from the resource capacity",
            Self::StorageTooSmall { .. } => "blocks do not fit into the resource storage",
            Self::SizeOverflow { .. } => "blocks overflow the address space",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AllocError, FreeError, OptionsError};
    use alloc::string::ToString;

    #[test]
    fn messages_carry_the_limits() {
        let error = AllocError::UnsupportedSize {
            size: 65,
            max_size: 64,
        };
        assert_eq!(
            error.to_string(),
            "65 exceeds 64, the max size supported by the memory resource"
        );

        let error = AllocError::InvalidAlign { align: 3 };
        assert_eq!(
            error.to_string(),
            "3 is not a valid alignment, must be a power of 2"
        );
    }

    #[test]
    fn implements_core_error() {
        fn assert<T: core::error::Error>() {}
        assert::<AllocError>();
        assert::<FreeError>();
        assert::<OptionsError>();
    }
}
