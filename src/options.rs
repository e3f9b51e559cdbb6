//! The description of the blocks managed by a memory resource.
use crate::error::{AllocError, OptionsError};
use crate::pool::STORAGE_ALIGN;

use core::fmt;
use core::mem;

/// Size, alignment and number of the blocks of a memory resource.
///
/// The field order matters for the derived ordering: options compare by size,
/// then alignment and finally count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkOptions {
    /// The number of bytes of a single block.
    pub block_size: usize,
    /// The alignment of every block. Must be a power of two.
    pub block_align: usize,
    /// The number of blocks in the resource.
    pub block_count: usize,
}
impl ChunkOptions {
    /// [`normalized()`](Self::normalized) does not raise the alignment past this
    /// value on its own. This is the alignment the usual `malloc`
    /// implementations guarantee, i.e. two machine words.
    pub const MAX_DEFAULT_ALIGN: usize = 2 * mem::size_of::<usize>();

    /// Create a new set of options.
    ///
    /// The options are not checked here; see [`is_valid()`](Self::is_valid).
    pub const fn new(block_size: usize, block_align: usize, block_count: usize) -> Self {
        Self {
            block_size,
            block_align,
            block_count,
        }
    }

    /// Check all fields, separately and together.
    ///
    /// The options are valid if the size and count are non-zero, the alignment
    /// is a power of two and the total size `block_size * block_count` can be
    /// represented both as `usize` and as `isize` (pointer differences over the
    /// whole storage have to be representable).
    pub const fn is_valid(&self) -> bool {
        valid_sizeof(self.block_size, self.block_count) && self.block_align.is_power_of_two()
    }

    /// Same as [`is_valid()`](Self::is_valid), but report the reason.
    ///
    /// # Errors
    /// The first violated requirement is returned, checked in the order size,
    /// count, alignment and total size.
    pub const fn validate(&self) -> Result<(), OptionsError> {
        if self.block_size == 0 {
            Err(OptionsError::ZeroBlockSize)
        } else if self.block_count == 0 {
            Err(OptionsError::ZeroBlockCount)
        } else if !self.block_align.is_power_of_two() {
            Err(OptionsError::InvalidAlign {
                align: self.block_align,
            })
        } else if !valid_sizeof(self.block_size, self.block_count) {
            Err(OptionsError::SizeOverflow {
                block_size: self.block_size,
                block_count: self.block_count,
            })
        } else {
            Ok(())
        }
    }

    /// Derive the canonical form of these options.
    ///
    /// The size is increased to include the padding required by the alignment,
    /// i.e. to the smallest multiple of `block_align` not less than
    /// `block_size`. Afterwards the alignment is increased to the largest power
    /// of two dividing the new size, which doesn't add any padding. The
    /// alignment is only raised up to [`MAX_DEFAULT_ALIGN`](Self::MAX_DEFAULT_ALIGN);
    /// going past that requires the caller to ask for it explicitly.
    ///
    /// Normalizing is idempotent and never decreases size or alignment.
    ///
    /// The options must be [valid](Self::is_valid). This is checked with a
    /// debug assertion only.
    pub const fn normalized(&self) -> Self {
        debug_assert!(self.is_valid(), "options must be valid to be normalized");

        let size = self.block_size.next_multiple_of(self.block_align);

        let mut align = self.block_align;
        if align < Self::MAX_DEFAULT_ALIGN {
            align = 1 << size.trailing_zeros();
            if align > Self::MAX_DEFAULT_ALIGN {
                align = Self::MAX_DEFAULT_ALIGN;
            }
        }

        Self::new(size, align, self.block_count)
    }

    /// The number of bytes a [`ChunkResource`](crate::ChunkResource) needs to
    /// store the blocks described by these options.
    ///
    /// This covers the normalized blocks, one byte for the zero-size sentinel
    /// behind them and, for block alignments above 16, the padding in front of
    /// the first block in the worst case. It is meant as the storage capacity
    /// of a resource:
    /// ```
    /// use chunk_resource::{ChunkOptions, ChunkResource};
    ///
    /// const OPTIONS: ChunkOptions = ChunkOptions::new(64, 16, 4);
    /// type Resource = ChunkResource<{ OPTIONS.storage_size() }, { OPTIONS.block_count }>;
    ///
    /// let resource = Resource::new(OPTIONS);
    /// assert_eq!(OPTIONS.storage_size(), 4 * 64 + 1);
    /// ```
    /// Invalid options need no storage, so `0` is returned for them.
    pub const fn storage_size(&self) -> usize {
        if !self.is_valid() {
            return 0;
        }
        let normalized = self.normalized();
        let padding = normalized.block_align.saturating_sub(STORAGE_ALIGN);
        normalized
            .block_size
            .saturating_mul(normalized.block_count)
            .saturating_add(padding)
            .saturating_add(1)
    }

    /// Check whether a block could hold `size` bytes aligned to `align`.
    pub const fn fits(&self, size: usize, align: usize) -> bool {
        size <= self.block_size && align <= self.block_align
    }

    /// Check whether a block could hold an array `[T; n]`.
    ///
    /// The alignment of `T` is taken into account even if `n` is zero.
    pub const fn compatible_with<T>(&self, n: usize) -> bool {
        match n.checked_mul(mem::size_of::<T>()) {
            Some(size) => self.fits(size, mem::align_of::<T>()),
            None => false,
        }
    }

    /// Check a requested number of bytes against the block size.
    ///
    /// # Errors
    /// [`AllocError::UnsupportedSize`] if `size` exceeds the block size.
    pub const fn check_size(&self, size: usize) -> Result<(), AllocError> {
        if size > self.block_size {
            Err(AllocError::UnsupportedSize {
                size,
                max_size: self.block_size,
            })
        } else {
            Ok(())
        }
    }

    /// Check an explicitly requested alignment against the block alignment.
    ///
    /// # Errors
    /// [`AllocError::InvalidAlign`] if `align` is not a power of two,
    /// [`AllocError::UnsupportedAlign`] if it exceeds the block alignment.
    pub const fn check_align(&self, align: usize) -> Result<(), AllocError> {
        if !align.is_power_of_two() {
            Err(AllocError::InvalidAlign { align })
        } else if align > self.block_align {
            Err(AllocError::UnsupportedAlign {
                align,
                max_align: self.block_align,
            })
        } else {
            Ok(())
        }
    }

    /// Check the layout of an array `[T; n]` and compute its size in bytes.
    ///
    /// The size itself is not checked against the block size, so that the
    /// caller can report size errors in the same way for typed and untyped
    /// requests.
    ///
    /// # Errors
    /// [`AllocError::ArrayLengthOverflow`] if `n * size_of::<T>()` does not fit
    /// into `isize`, [`AllocError::UnsupportedAlign`] if `T` is aligned more
    /// strictly than a block.
    pub const fn check_array<T>(&self, n: usize) -> Result<usize, AllocError> {
        let elem_size = mem::size_of::<T>();
        let size = match n.checked_mul(elem_size) {
            Some(size) if size <= isize::MAX as usize => size,
            _ => {
                return Err(AllocError::ArrayLengthOverflow {
                    count: n,
                    elem_size,
                })
            }
        };

        let align = mem::align_of::<T>();
        if align > self.block_align {
            return Err(AllocError::UnsupportedAlign {
                align,
                max_align: self.block_align,
            });
        }
        Ok(size)
    }
}
impl fmt::Display for ChunkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{block_size={}, block_align={}, block_count={}}}",
            self.block_size, self.block_align, self.block_count
        )
    }
}

/// Check that `count` objects of `size` bytes can be represented, i.e. that
/// neither factor is 0 and their product fits into `usize` and `isize`.
const fn valid_sizeof(size: usize, count: usize) -> bool {
    if size == 0 || count == 0 {
        return false;
    }
    match size.checked_mul(count) {
        Some(total) => total <= isize::MAX as usize,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{ChunkOptions, OptionsError};
    use crate::AllocError;
    use alloc::string::ToString;

    const MAX: usize = ChunkOptions::MAX_DEFAULT_ALIGN;

    #[test]
    fn validity() {
        assert!(ChunkOptions::new(64, 16, 4).is_valid());
        assert!(ChunkOptions::new(1, 1, 1).is_valid());
        assert!(!ChunkOptions::new(0, 16, 4).is_valid());
        assert!(!ChunkOptions::new(64, 16, 0).is_valid());
        assert!(!ChunkOptions::new(64, 0, 4).is_valid());
        assert!(!ChunkOptions::new(64, 24, 4).is_valid());
        assert!(!ChunkOptions::new(usize::MAX / 2, 1, 3).is_valid());
        // fits into usize, but not into isize
        assert!(!ChunkOptions::new(isize::MAX as usize + 1, 1, 1).is_valid());
        assert!(ChunkOptions::new(isize::MAX as usize, 1, 1).is_valid());
    }

    #[test]
    fn validate_reports_the_reason() {
        assert_eq!(ChunkOptions::new(64, 16, 4).validate(), Ok(()));
        assert_eq!(
            ChunkOptions::new(0, 0, 0).validate(),
            Err(OptionsError::ZeroBlockSize)
        );
        assert_eq!(
            ChunkOptions::new(8, 0, 0).validate(),
            Err(OptionsError::ZeroBlockCount)
        );
        assert_eq!(
            ChunkOptions::new(8, 12, 1).validate(),
            Err(OptionsError::InvalidAlign { align: 12 })
        );
        assert_eq!(
            ChunkOptions::new(usize::MAX, 1, 2).validate(),
            Err(OptionsError::SizeOverflow {
                block_size: usize::MAX,
                block_count: 2
            })
        );
    }

    #[test]
    fn normalization_adds_padding() {
        let options = ChunkOptions::new(10, 4, 3).normalized();
        assert_eq!(options, ChunkOptions::new(12, 4, 3));

        let options = ChunkOptions::new(3, 2, 1).normalized();
        assert_eq!(options, ChunkOptions::new(4, 4, 1));
    }

    #[test]
    fn normalization_raises_alignment_up_to_the_default() {
        let options = ChunkOptions::new(24, 8, 1).normalized();
        assert_eq!(options, ChunkOptions::new(24, 8, 1));

        let options = ChunkOptions::new(32, 1, 2).normalized();
        assert_eq!(options, ChunkOptions::new(32, MAX, 2));

        // explicitly large alignments are kept as they are
        let options = ChunkOptions::new(64, 64, 2).normalized();
        assert_eq!(options, ChunkOptions::new(64, 64, 2));
        let options = ChunkOptions::new(1, 256, 2).normalized();
        assert_eq!(options, ChunkOptions::new(256, 256, 2));
    }

    #[test]
    fn normalization_properties() {
        for size in 1..=130 {
            for shift in 0..=8 {
                let options = ChunkOptions::new(size, 1 << shift, 3);
                let normalized = options.normalized();

                assert_eq!(normalized.normalized(), normalized, "{options}");
                assert!(normalized.block_size >= options.block_size, "{options}");
                assert!(normalized.block_align >= options.block_align, "{options}");
                assert_eq!(normalized.block_size % normalized.block_align, 0);
                assert_eq!(normalized.block_count, options.block_count);
                assert!(normalized.is_valid(), "{options}");
            }
        }
    }

    #[test]
    fn compatibility() {
        let options = ChunkOptions::new(8, 4, 1);
        assert!(options.compatible_with::<u32>(2));
        assert!(options.compatible_with::<u32>(0));
        assert!(!options.compatible_with::<u32>(3));
        assert!(!options.compatible_with::<u32>(usize::MAX));
        assert!(options.fits(8, 4));
        assert!(!options.fits(8, 8));
        assert!(!options.fits(9, 1));
    }

    #[test]
    fn request_checks() {
        let options = ChunkOptions::new(64, 16, 4);
        assert_eq!(options.check_size(64), Ok(()));
        assert_eq!(
            options.check_size(65),
            Err(AllocError::UnsupportedSize {
                size: 65,
                max_size: 64
            })
        );
        assert_eq!(options.check_align(16), Ok(()));
        assert_eq!(
            options.check_align(32),
            Err(AllocError::UnsupportedAlign {
                align: 32,
                max_align: 16
            })
        );
        assert_eq!(
            options.check_align(0),
            Err(AllocError::InvalidAlign { align: 0 })
        );
        assert_eq!(options.check_array::<u64>(8), Ok(64));
        assert_eq!(
            options.check_array::<u64>(usize::MAX / 4),
            Err(AllocError::ArrayLengthOverflow {
                count: usize::MAX / 4,
                elem_size: 8
            })
        );
    }

    #[test]
    fn storage_size() {
        assert_eq!(ChunkOptions::new(64, 16, 4).storage_size(), 257);
        // padded to 12 bytes per block
        assert_eq!(ChunkOptions::new(10, 4, 3).storage_size(), 37);
        assert_eq!(ChunkOptions::new(4096, 4096, 4).storage_size(), 4 * 4096 + 4080 + 1);
        assert_eq!(ChunkOptions::new(0, 16, 4).storage_size(), 0);
        assert_eq!(ChunkOptions::new(16, 3, 4).storage_size(), 0);
    }

    #[test]
    fn ordering_and_formatting() {
        assert!(ChunkOptions::new(8, 16, 1) < ChunkOptions::new(16, 1, 1));
        assert!(ChunkOptions::new(8, 1, 9) < ChunkOptions::new(8, 2, 1));
        assert_eq!(
            ChunkOptions::new(64, 16, 4).to_string(),
            "{block_size=64, block_align=16, block_count=4}"
        );
    }
}
