use crate::bgen::{BlockCompression, Layout};

/// Custom Result type for genfile operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the genfile library, encompassing all recoverable
/// failures that can occur while reading, writing or querying genotype files.
///
/// Contract violations (for example reading probability data before the
/// identifying data of a variant) are not represented here: they panic.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// Errors related to BGEN header processing
    Header(#[from] HeaderError),
    /// Errors that occur while decoding variant records
    Read(#[from] ReadError),
    /// Errors that occur while encoding variant records
    Write(#[from] WriteError),
    /// Rejected caller-supplied arguments
    Argument(#[from] ArgumentError),
    /// Errors raised while opening or querying a variant index
    Index(#[from] IndexError),
    /// I/O errors tied to a named file
    File(#[from] FileError),
    /// Standard I/O errors from the Rust standard library
    Io(#[from] std::io::Error),
    /// UTF-8 encoding/decoding errors
    Utf8(#[from] std::str::Utf8Error),
    /// Errors from the sqlite layer
    Sqlite(#[from] rusqlite::Error),
    /// Generic errors that can occur in any part of the system
    Anyhow(#[from] anyhow::Error),
}

/// Errors specific to processing and validating BGEN header blocks
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    /// The offset to the first variant block points inside the header
    ///
    /// # Fields
    /// * `offset` - The offset stored at the start of the file
    /// * `header_size` - The number of bytes occupied by the header (and sample block)
    #[error("Offset to first variant ({offset}) is smaller than the header ({header_size} bytes)")]
    OffsetTooSmall { offset: u32, header_size: u64 },

    /// The declared header length is smaller than the fixed header fields
    ///
    /// # Arguments
    /// * `u32` - The declared header length
    #[error("Invalid header length: {0}. Expected at least 20")]
    InvalidHeaderLength(u32),

    /// The layout bits of the flags word name an unsupported layout
    ///
    /// # Arguments
    /// * `u32` - The full flags word
    #[error("Unsupported layout in flags: {0:#x}")]
    UnsupportedLayout(u32),

    /// The compression bits of the flags word name an unknown compression
    ///
    /// # Arguments
    /// * `u32` - The full flags word
    #[error("Unsupported probability block compression in flags: {0:#x}")]
    UnsupportedCompression(u32),

    /// The sample identifier block disagrees with the header
    ///
    /// # Fields
    /// * `expected` - The number of samples stated in the header
    /// * `got` - The number of samples stated in the sample block
    #[error("Sample identifier block lists {got} samples, header has {expected}")]
    SampleBlockMismatch { expected: u32, got: u32 },

    /// The sample identifier block size does not match its contents
    ///
    /// # Fields
    /// * `declared` - The block size stored in the file
    /// * `actual` - The number of bytes consumed while reading the block
    #[error("Sample identifier block declares {declared} bytes but occupies {actual}")]
    SampleBlockSize { declared: u32, actual: u64 },
}

/// Errors that can occur while decoding variant data
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The stream ended part-way through a variant record
    ///
    /// # Arguments
    /// * `u64` - The number of variants fully read before the truncation
    #[error("Variant record truncated after {0} complete variants")]
    TruncatedRecord(u64),

    /// A variant record lists a different number of samples than the file
    ///
    /// # Fields
    /// * `expected` - The sample count of the file or chain
    /// * `got` - The sample count found in the record or source
    #[error("Found {got} samples where {expected} were expected")]
    SampleCountMismatch { expected: u32, got: u32 },

    /// A compressed probability block could not be inflated
    ///
    /// # Arguments
    /// * `String` - The message reported by the decompressor
    #[error("Failed to inflate probability block: {0}")]
    Inflate(String),

    /// A decoded probability block has the wrong size
    ///
    /// # Fields
    /// * `expected` - The number of bytes implied by the sample count
    /// * `got` - The number of bytes actually decoded
    #[error("Probability block holds {got} bytes, expected {expected}")]
    ProbabilityBlockSize { expected: usize, got: usize },

    /// A text line could not be parsed
    ///
    /// # Fields
    /// * `line` - The 1-based line number
    /// * `reason` - A description of the problem
    #[error("Malformed line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    /// An identifier is longer than the field reserved for it
    ///
    /// # Fields
    /// * `len` - The stored identifier length
    /// * `max` - The declared field width
    #[error("Identifier of length {len} exceeds its field width of {max}")]
    IdentifierOverflow { len: usize, max: usize },

    /// The file does not contain a single record to infer its shape from
    #[error("File contains no variants to infer its layout from")]
    EmptyFile,

    /// A variant record lists fewer than two alleles
    ///
    /// # Arguments
    /// * `usize` - The stored allele count
    #[error("Variant has {0} alleles, at least two are required")]
    TooFewAlleles(usize),

    /// A probability block lists a different number of alleles than its variant
    ///
    /// # Fields
    /// * `expected` - The allele count of the identifying data
    /// * `got` - The allele count stored in the probability block
    #[error("Probability block has {got} alleles, the variant has {expected}")]
    AlleleCountMismatch { expected: usize, got: usize },

    /// The contents of a decoded probability block are inconsistent
    ///
    /// # Arguments
    /// * `String` - A description of the problem
    #[error("Malformed probability block: {0}")]
    MalformedProbabilityBlock(String),

    /// Per-sample data cannot be expressed as `[AA, AB, BB]` triplets
    ///
    /// # Fields
    /// * `sample` - The index of the offending sample
    /// * `ploidy` - The ploidy of the sample
    /// * `alleles` - The number of alleles of the variant
    #[error("Sample {sample} (ploidy {ploidy}, {alleles} alleles) has no genotype triplet")]
    UnsupportedGenotypeShape {
        sample: usize,
        ploidy: u8,
        alleles: usize,
    },
}

/// Errors that can occur while encoding variant data
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// The number of probabilities does not match the number of samples
    ///
    /// # Fields
    /// * `expected` - The sample count of the sink
    /// * `got` - The sample count of the supplied probabilities
    #[error("Probabilities cover {got} samples, the sink has {expected}")]
    SampleCountMismatch { expected: u32, got: u32 },

    /// The sample identifiers do not match the number of samples
    ///
    /// # Fields
    /// * `expected` - The sample count of the sink
    /// * `got` - The number of identifiers supplied
    #[error("Supplied {got} sample identifiers for {expected} samples")]
    SampleIdCount { expected: u32, got: usize },

    /// A field is too long to be represented in the selected layout
    ///
    /// # Fields
    /// * `field` - The name of the field
    /// * `len` - The length of the offending value
    #[error("Field {field} of length {len} does not fit the selected layout")]
    FieldTooLong { field: &'static str, len: usize },

    /// The selected layout only stores biallelic variants
    ///
    /// # Arguments
    /// * `usize` - The number of alleles of the variant
    #[error("Layout supports two alleles per variant, got {0}")]
    TooManyAlleles(usize),

    /// The header cannot represent this many variants
    #[error("Too many variants for a 32-bit variant count")]
    TooManyVariants,

    /// The probability data has a different number of alleles than the variant
    ///
    /// # Fields
    /// * `expected` - The allele count of the variant
    /// * `got` - The allele count of the probability data
    #[error("Probability data has {got} alleles, the variant has {expected}")]
    AlleleCountMismatch { expected: usize, got: usize },

    /// The selected layout cannot store blocks with this compression
    ///
    /// # Fields
    /// * `compression` - The requested compression
    /// * `layout` - The selected layout
    #[error("{compression:?} compression is not available in layout {layout:?}")]
    CompressionUnavailable {
        compression: BlockCompression,
        layout: Layout,
    },
}

/// Caller-supplied values that were rejected
#[derive(thiserror::Error, Debug)]
pub enum ArgumentError {
    /// The variant data reader was asked for a spec it does not provide
    ///
    /// # Arguments
    /// * `String` - The requested spec
    #[error("Unsupported variant data spec: {0:?}")]
    UnsupportedSpec(String),

    /// A genomic range could not be parsed or is empty
    ///
    /// # Arguments
    /// * `String` - The offending range
    #[error("Invalid genomic range: {0:?}")]
    InvalidRange(String),

    /// A chromosome name was not recognised
    ///
    /// # Arguments
    /// * `String` - The offending chromosome name
    #[error("Unrecognised chromosome: {0:?}")]
    InvalidChromosome(String),

    /// The output format cannot be written with the requested compression
    ///
    /// # Arguments
    /// * `String` - The offending filename
    #[error("BGEN output cannot be gzip-compressed: {0:?}")]
    UnsupportedCompression(String),
}

/// Errors raised by the index query subsystem
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// The index file does not contain the expected variant table
    ///
    /// # Arguments
    /// * `String` - The name of the missing table
    #[error("Index has no table named {0:?}")]
    MissingTable(String),

    /// The index stores a negative offset or size
    ///
    /// # Fields
    /// * `start` - The stored start position
    /// * `size` - The stored size in bytes
    #[error("Index holds an invalid file range (start {start}, size {size})")]
    InvalidRange { start: i64, size: i64 },

    /// A located byte range does not lie within the mapped file
    ///
    /// # Fields
    /// * `end` - The end of the requested range
    /// * `len` - The length of the file
    #[error("Byte range ending at {end} lies outside the file ({len} bytes)")]
    OutOfBounds { end: u64, len: usize },

    /// A located byte range holds no variant record
    ///
    /// # Arguments
    /// * `u64` - The start of the range
    #[error("No variant record found at byte {0}")]
    EmptyRange(u64),
}

/// I/O errors carrying the name of the file involved
#[derive(thiserror::Error, Debug)]
pub enum FileError {
    /// A file could not be opened for reading
    #[error("Unable to open {filename:?}: {source}")]
    Open {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be created for writing
    #[error("Unable to create {filename:?}: {source}")]
    Create {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}
impl FileError {
    pub(crate) fn open(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Open {
            filename: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn create(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Create {
            filename: path.display().to_string(),
            source,
        }
    }
}
