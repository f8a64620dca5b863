//! BGEN record codec
//!
//! A BGEN file starts with a 4-byte offset to the first variant block, followed by
//! the header block, an optional sample identifier block, and then one record per
//! variant. Each record is an identifying-data block followed by a probability block.
//!
//! The submodules here read and write each block type against a [`Context`], which
//! carries the header fields that determine how the blocks are laid out.
//!
//! Three layouts exist. v1.0 and v1.1 store three 16-bit probabilities per
//! sample for biallelic variants. v1.2 stores any number of alleles, per-sample
//! ploidy and phased data, with a per-variant bit width.

mod bits;
mod header;
mod identifying;
mod probability;

pub use header::{
    read_header_block, read_offset, read_sample_identifier_block, write_header_block,
    write_offset, write_sample_identifier_block,
};
pub use identifying::{read_snp_identifying_data, write_snp_identifying_data};
pub use probability::{
    from_integer_representation, ignore_snp_probability_data, to_integer_representation,
    ProbabilityCodec, DEFAULT_BITS_PER_PROBABILITY,
};

use crate::{error::Result, HeaderError, WriteError};

/// Probability blocks are zlib-compressed
pub const COMPRESSED_SNP_BLOCKS: u32 = 0x1;

/// v1.2 layout only: probability blocks are zstd-compressed
pub const ZSTD_SNP_BLOCKS: u32 = 0x2;

/// Bits of the flags word that select the compression of a v1.2 file
pub const COMPRESSION_MASK: u32 = 0x3;

/// v1.0 layout only: alleles are length-prefixed rather than single characters
pub const MULTI_CHARACTER_ALLELES: u32 = 0x2;

/// Bits of the flags word that select the layout
pub const LAYOUT_MASK: u32 = 0x3C;

/// A sample identifier block follows the header block
pub const SAMPLE_IDENTIFIERS: u32 = 0x8000_0000;

/// Size of the fixed fields of the header block
///
/// header length, variant count, sample count, reserved word and flags (4 bytes each)
pub const FIXED_HEADER_SIZE: u32 = 20;

/// Width of one sample's entry in a probability block
///
/// Three 16-bit probabilities per sample
pub const PROBABILITY_ENTRY_SIZE: usize = 6;

/// Layout of variant records, selected by the flags word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Fixed-width identifier fields, one-byte chromosome code
    V10,
    /// Length-prefixed identifiers and chromosome strings
    #[default]
    V11,
    /// Multiple alleles, per-sample ploidy, phased data and bit-packed probabilities
    V12,
}
impl Layout {
    /// The layout bits corresponding to this layout
    #[must_use]
    pub fn flag_bits(self) -> u32 {
        match self {
            Self::V10 => 0x0,
            Self::V11 => 0x4,
            Self::V12 => 0x8,
        }
    }

    /// Extracts the layout from a flags word
    pub fn from_flags(flags: u32) -> Result<Self> {
        match flags & LAYOUT_MASK {
            0x0 => Ok(Self::V10),
            0x4 => Ok(Self::V11),
            0x8 => Ok(Self::V12),
            _ => Err(HeaderError::UnsupportedLayout(flags).into()),
        }
    }

    /// Scale between stored 16-bit integers and probabilities
    ///
    /// `None` for v1.2, where the scale follows from the bit width of each variant.
    #[must_use]
    pub fn probability_conversion_factor(self) -> Option<f64> {
        match self {
            Self::V10 => Some(10000.0),
            Self::V11 => Some(32768.0),
            Self::V12 => None,
        }
    }
}

/// Compression applied to probability blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockCompression {
    None,
    #[default]
    Zlib,
    /// Only available in the v1.2 layout
    Zstd,
}
impl BlockCompression {
    /// Reads the compression from a flags word
    ///
    /// Before v1.2 only the lowest bit is significant; bit 1 there means
    /// [`MULTI_CHARACTER_ALLELES`].
    pub fn from_flags(flags: u32) -> Result<Self> {
        if Layout::from_flags(flags)? != Layout::V12 {
            return Ok(if flags & COMPRESSED_SNP_BLOCKS == 0 {
                Self::None
            } else {
                Self::Zlib
            });
        }
        match flags & COMPRESSION_MASK {
            0 => Ok(Self::None),
            COMPRESSED_SNP_BLOCKS => Ok(Self::Zlib),
            ZSTD_SNP_BLOCKS => Ok(Self::Zstd),
            _ => Err(HeaderError::UnsupportedCompression(flags).into()),
        }
    }

    /// The compression bits for this compression in `layout`
    pub fn flag_bits(self, layout: Layout) -> Result<u32> {
        match (self, layout) {
            (Self::None, _) => Ok(0),
            (Self::Zlib, _) => Ok(COMPRESSED_SNP_BLOCKS),
            (Self::Zstd, Layout::V12) => Ok(ZSTD_SNP_BLOCKS),
            (Self::Zstd, layout) => Err(WriteError::CompressionUnavailable {
                compression: self,
                layout,
            }
            .into()),
        }
    }
}

/// Header fields of a BGEN file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Context {
    /// Number of variant records in the file
    ///
    /// 4 bytes
    pub number_of_variants: u32,

    /// Number of samples in each variant record
    ///
    /// 4 bytes
    pub number_of_samples: u32,

    /// Free-text data stored verbatim in the header
    ///
    /// header length - 20 bytes
    pub free_data: Vec<u8>,

    /// Flag bitmask (compression, layout, sample identifiers)
    ///
    /// 4 bytes
    pub flags: u32,
}
impl Context {
    #[must_use]
    pub fn new(
        number_of_variants: u32,
        number_of_samples: u32,
        free_data: Vec<u8>,
        flags: u32,
    ) -> Self {
        Self {
            number_of_variants,
            number_of_samples,
            free_data,
            flags,
        }
    }

    /// Size in bytes of the header block described by this context
    #[must_use]
    pub fn header_size(&self) -> u64 {
        u64::from(FIXED_HEADER_SIZE) + self.free_data.len() as u64
    }

    /// The record layout selected by the flags
    pub fn layout(&self) -> Result<Layout> {
        Layout::from_flags(self.flags)
    }

    /// The compression of probability blocks selected by the flags
    pub fn compression(&self) -> Result<BlockCompression> {
        BlockCompression::from_flags(self.flags)
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compression()
            .is_ok_and(|compression| compression != BlockCompression::None)
    }

    #[must_use]
    pub fn has_sample_identifiers(&self) -> bool {
        self.flags & SAMPLE_IDENTIFIERS != 0
    }

    /// Whether v1.0 alleles are length-prefixed; always `false` for other layouts
    #[must_use]
    pub fn has_multi_character_alleles(&self) -> bool {
        self.flags & LAYOUT_MASK == 0 && self.flags & MULTI_CHARACTER_ALLELES != 0
    }

    /// Size of a v1.0 or v1.1 probability block once decompressed
    #[must_use]
    pub fn uncompressed_probability_size(&self) -> usize {
        PROBABILITY_ENTRY_SIZE * self.number_of_samples as usize
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_layout_from_flags() {
        assert_eq!(Layout::from_flags(0).ok(), Some(Layout::V10));
        assert_eq!(Layout::from_flags(COMPRESSED_SNP_BLOCKS | 0x4).ok(), Some(Layout::V11));
        assert_eq!(
            Layout::from_flags(SAMPLE_IDENTIFIERS | COMPRESSED_SNP_BLOCKS | 0x4).ok(),
            Some(Layout::V11)
        );
        assert_eq!(Layout::from_flags(COMPRESSED_SNP_BLOCKS | 0x8).ok(), Some(Layout::V12));
        assert!(Layout::from_flags(0xC).is_err());
        assert!(Layout::from_flags(u32::MAX).is_err());
    }

    #[test]
    fn test_compression_from_flags() -> crate::Result<()> {
        assert_eq!(BlockCompression::from_flags(0x0)?, BlockCompression::None);
        assert_eq!(BlockCompression::from_flags(0x5)?, BlockCompression::Zlib);
        // in v1.0 bit 1 selects multi-character alleles, not zstd
        assert_eq!(BlockCompression::from_flags(0x3)?, BlockCompression::Zlib);
        assert_eq!(BlockCompression::from_flags(0x8)?, BlockCompression::None);
        assert_eq!(BlockCompression::from_flags(0x9)?, BlockCompression::Zlib);
        assert_eq!(BlockCompression::from_flags(0xA)?, BlockCompression::Zstd);
        assert!(BlockCompression::from_flags(0xB).is_err());

        assert_eq!(BlockCompression::Zstd.flag_bits(Layout::V12)?, ZSTD_SNP_BLOCKS);
        assert!(BlockCompression::Zstd.flag_bits(Layout::V11).is_err());
        Ok(())
    }

    #[test]
    fn test_context_flags() {
        let flags = COMPRESSED_SNP_BLOCKS | SAMPLE_IDENTIFIERS | 0x4;
        let context = Context::new(0, 10, b"free".to_vec(), flags);
        assert!(context.is_compressed());
        assert!(context.has_sample_identifiers());
        assert!(!context.has_multi_character_alleles());
        assert_eq!(context.header_size(), 24);
        assert_eq!(context.uncompressed_probability_size(), 60);

        let zstd = Context::new(0, 10, Vec::new(), ZSTD_SNP_BLOCKS | 0x8);
        assert!(zstd.is_compressed());
        assert!(!zstd.has_multi_character_alleles());
    }
}
