use std::{
    borrow::Cow,
    fs::File,
    io::{BufWriter, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use log::warn;

use super::SnpDataSink;
use crate::{
    bgen::{
        self, BlockCompression, Context, Layout, ProbabilityCodec, DEFAULT_BITS_PER_PROBABILITY,
        MULTI_CHARACTER_ALLELES, SAMPLE_IDENTIFIERS,
    },
    error::Result,
    FileError, GenotypeProbabilities, SampleProbabilities, VariantDataReader,
    VariantIdentifyingData, WriteError,
};

/// Longest identifier the v1.0 layout can store
const MAX_V10_IDENTIFIER: usize = u8::MAX as usize;

/// Builder for creating configured [`BgenSink`] instances
///
/// Defaults to the v1.1 layout with zlib-compressed probability blocks, no free
/// data and no sample identifiers. v1.2 output stores 16 bits per probability
/// unless told otherwise.
///
/// # Examples
///
/// ```
/// # use genfile::{BgenSinkBuilder, SnpDataSink, Result};
/// # use genfile::bgen::Layout;
/// # use std::io::Cursor;
/// # fn main() -> Result<()> {
/// let mut sink = BgenSinkBuilder::default()
///     .layout(Layout::V11)
///     .free_data(b"produced by a test".to_vec())
///     .sample_ids(vec!["a".into(), "b".into()])
///     .build(Cursor::new(Vec::new()), 2)?;
/// sink.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BgenSinkBuilder {
    layout: Option<Layout>,
    compression: Option<BlockCompression>,
    bits_per_probability: Option<u8>,
    free_data: Option<Vec<u8>>,
    sample_ids: Option<Vec<String>>,
    multi_character_alleles: Option<bool>,
}
impl BgenSinkBuilder {
    #[must_use]
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Whether probability blocks are zlib-compressed (default `true`)
    #[must_use]
    pub fn compressed(self, compressed: bool) -> Self {
        self.compression(if compressed {
            BlockCompression::Zlib
        } else {
            BlockCompression::None
        })
    }

    /// Compression of probability blocks; zstd needs the v1.2 layout
    #[must_use]
    pub fn compression(mut self, compression: BlockCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Bits stored per v1.2 probability, between 1 and 32
    ///
    /// Ignored by the v1.0 and v1.1 layouts, which always store 16 bits.
    #[must_use]
    pub fn bits_per_probability(mut self, bits: u8) -> Self {
        self.bits_per_probability = Some(bits);
        self
    }

    #[must_use]
    pub fn free_data(mut self, free_data: Vec<u8>) -> Self {
        self.free_data = Some(free_data);
        self
    }

    /// Stores a sample identifier block; one identifier per sample is required
    #[must_use]
    pub fn sample_ids(mut self, sample_ids: Vec<String>) -> Self {
        self.sample_ids = Some(sample_ids);
        self
    }

    /// Whether v1.0 alleles are length-prefixed (default `true`)
    ///
    /// Without this flag the v1.0 layout stores single-character alleles only.
    /// Ignored by the v1.1 layout, which always length-prefixes alleles.
    #[must_use]
    pub fn multi_character_alleles(mut self, multi_character_alleles: bool) -> Self {
        self.multi_character_alleles = Some(multi_character_alleles);
        self
    }

    fn context(&self, number_of_samples: u32) -> Result<Context> {
        let layout = self.layout.unwrap_or_default();
        let mut flags = layout.flag_bits();
        flags |= self.compression.unwrap_or_default().flag_bits(layout)?;
        if self.sample_ids.is_some() {
            flags |= SAMPLE_IDENTIFIERS;
        }
        if layout == Layout::V10 && self.multi_character_alleles.unwrap_or(true) {
            flags |= MULTI_CHARACTER_ALLELES;
        }
        Ok(Context::new(
            0,
            number_of_samples,
            self.free_data.clone().unwrap_or_default(),
            flags,
        ))
    }

    /// # Panics
    ///
    /// If the bits per probability are outside 1 to 32.
    fn codec(&self) -> ProbabilityCodec {
        ProbabilityCodec::with_bits_per_probability(
            self.bits_per_probability
                .unwrap_or(DEFAULT_BITS_PER_PROBABILITY),
        )
    }

    /// Writes the file preamble to `inner` and returns the sink
    ///
    /// # Errors
    ///
    /// `WriteError::CompressionUnavailable` for zstd outside the v1.2 layout,
    /// or a header error if the sample identifiers do not match the samples.
    pub fn build<W: Write + Seek>(self, inner: W, number_of_samples: u32) -> Result<BgenSink<W>> {
        let context = self.context(number_of_samples)?;
        BgenSink::new(
            inner,
            context,
            self.codec(),
            self.sample_ids.as_deref(),
            "(stream)".to_string(),
        )
    }

    /// Creates the file at `path` and returns a sink writing to it
    pub fn create<P: AsRef<Path>>(
        self,
        path: P,
        number_of_samples: u32,
    ) -> Result<BgenSink<BufWriter<File>>> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let context = self.context(number_of_samples)?;
        let file = File::create(&path).map_err(|e| FileError::create(&path, e))?;
        BgenSink::new(
            BufWriter::new(file),
            context,
            self.codec(),
            self.sample_ids.as_deref(),
            path.display().to_string(),
        )
    }
}

/// A sink writing BGEN data
///
/// The header is written when the sink is built and rewritten by
/// [`close`](SnpDataSink::close) with the number of variants written. A sink
/// dropped without being closed leaves a header announcing zero variants.
pub struct BgenSink<W: Write + Seek> {
    inner: W,
    context: Context,
    codec: ProbabilityCodec,
    /// Encoded record, written to `inner` once complete
    record: Vec<u8>,
    /// Stream position of the offset field
    start: u64,
    number_of_snps_written: u64,
    closed: bool,
    spec: String,
}
impl<W: Write + Seek> BgenSink<W> {
    fn new(
        mut inner: W,
        context: Context,
        codec: ProbabilityCodec,
        sample_ids: Option<&[String]>,
        spec: String,
    ) -> Result<Self> {
        context.layout()?;
        let start = inner.stream_position()?;

        let mut preamble = Vec::new();
        bgen::write_header_block(&mut preamble, &context)?;
        if let Some(sample_ids) = sample_ids {
            bgen::write_sample_identifier_block(&mut preamble, &context, sample_ids)?;
        }
        let Ok(offset) = u32::try_from(preamble.len()) else {
            return Err(WriteError::FieldTooLong {
                field: "header",
                len: preamble.len(),
            }
            .into());
        };
        bgen::write_offset(&mut inner, offset)?;
        inner.write_all(&preamble)?;

        Ok(Self {
            inner,
            context,
            codec,
            record: Vec::new(),
            start,
            number_of_snps_written: 0,
            closed: false,
            spec,
        })
    }

    /// The header as it will be written on close
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Closes the sink and returns the underlying writer
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?;
        Ok(self.inner)
    }

    /// Encodes one variant, writing nothing if any part of it does not fit
    fn write_record(
        &mut self,
        variant: &VariantIdentifyingData,
        data: &SampleProbabilities,
    ) -> Result<()> {
        assert!(!self.closed, "write to a closed BGEN sink");
        if data.number_of_samples() != self.context.number_of_samples as usize {
            return Err(WriteError::SampleCountMismatch {
                expected: self.context.number_of_samples,
                got: data.number_of_samples() as u32,
            }
            .into());
        }
        if data.number_of_alleles() != variant.number_of_alleles() {
            return Err(WriteError::AlleleCountMismatch {
                expected: variant.number_of_alleles(),
                got: data.number_of_alleles(),
            }
            .into());
        }
        let variant = self.fit_to_layout(variant);
        let max_id_size = variant.snpid().len().max(variant.rsid().len()) as u8;

        self.record.clear();
        bgen::write_snp_identifying_data(&mut self.record, &self.context, max_id_size, &variant)?;
        self.codec
            .write_snp_probability_data(&mut self.record, &self.context, data)?;
        self.inner.write_all(&self.record)?;
        self.number_of_snps_written += 1;
        Ok(())
    }

    /// Cuts identifiers down to what the v1.0 layout can store
    fn fit_to_layout<'a>(
        &self,
        variant: &'a VariantIdentifyingData,
    ) -> Cow<'a, VariantIdentifyingData> {
        let fits = variant.snpid().len() <= MAX_V10_IDENTIFIER
            && variant.rsid().len() <= MAX_V10_IDENTIFIER;
        if fits || self.context.layout().ok() != Some(Layout::V10) {
            return Cow::Borrowed(variant);
        }
        warn!(
            "Truncating identifiers of variant {} at {} to {MAX_V10_IDENTIFIER} bytes",
            variant.snpid(),
            variant.position()
        );
        Cow::Owned(VariantIdentifyingData::new(
            truncate_identifier(variant.snpid()),
            truncate_identifier(variant.rsid()),
            variant.position(),
            variant.alleles().to_vec(),
        ))
    }
}

fn truncate_identifier(identifier: &str) -> &str {
    if identifier.len() <= MAX_V10_IDENTIFIER {
        return identifier;
    }
    let end = (0..=MAX_V10_IDENTIFIER)
        .rev()
        .find(|&i| identifier.is_char_boundary(i))
        .unwrap_or(0);
    &identifier[..end]
}

impl<W: Write + Seek> SnpDataSink for BgenSink<W> {
    fn number_of_samples(&self) -> u32 {
        self.context.number_of_samples
    }

    fn number_of_snps_written(&self) -> u64 {
        self.number_of_snps_written
    }

    fn sink_spec(&self) -> String {
        self.spec.clone()
    }

    /// # Panics
    ///
    /// If the sink has been closed.
    fn write_snp(
        &mut self,
        variant: &VariantIdentifyingData,
        probabilities: &GenotypeProbabilities,
    ) -> Result<()> {
        self.write_record(variant, &SampleProbabilities::from(probabilities))
    }

    /// Writes the data as decoded, keeping ploidy, phasing and every allele
    ///
    /// # Panics
    ///
    /// If the sink has been closed.
    fn write_variant_data(
        &mut self,
        variant: &VariantIdentifyingData,
        data: &VariantDataReader,
    ) -> Result<()> {
        self.write_record(variant, data.data())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.context.number_of_variants =
            u32::try_from(self.number_of_snps_written).map_err(|_| WriteError::TooManyVariants)?;
        self.inner.seek(SeekFrom::Start(self.start + 4))?;
        bgen::write_header_block(&mut self.inner, &self.context)?;
        self.inner.seek(SeekFrom::End(0))?;
        self.inner.flush()?;
        self.closed = true;
        Ok(())
    }
}
