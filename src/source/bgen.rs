use std::{io::Read, path::Path, sync::Arc};

use log::debug;

use super::{truncated, ReadState, SnpDataSource, StreamState};
use crate::{
    bgen::{self, Context, ProbabilityCodec},
    endian::skip_bytes,
    error::Result,
    stream::InputStream,
    HeaderError, VariantDataReader, VariantIdentifyingData,
};

/// Everything stored before the first variant of a BGEN file
#[derive(Debug, Clone)]
pub(crate) struct Preamble {
    pub context: Context,
    pub sample_ids: Option<Vec<String>>,
    /// Offset of the first variant from the start of the file
    pub first_variant: u64,
}

/// Reads the offset, header and sample block, leaving `reader` at the first variant
pub(crate) fn read_preamble<R: Read>(reader: &mut R) -> Result<Preamble> {
    let offset = bgen::read_offset(reader)?;
    let (context, mut bytes_read) = bgen::read_header_block(reader)?;
    context.layout()?;
    context.compression()?;
    if u64::from(offset) < context.header_size() {
        return Err(HeaderError::OffsetTooSmall {
            offset,
            header_size: context.header_size(),
        }
        .into());
    }

    let sample_ids = if context.has_sample_identifiers() {
        let (ids, block_size) = bgen::read_sample_identifier_block(reader, &context)?;
        bytes_read += block_size;
        Some(ids)
    } else {
        None
    };
    if u64::from(offset) < bytes_read {
        return Err(HeaderError::OffsetTooSmall {
            offset,
            header_size: bytes_read,
        }
        .into());
    }
    skip_bytes(reader, u64::from(offset) - bytes_read)?;

    debug!(
        "Read BGEN header: {} variants, {} samples, flags {:#x}",
        context.number_of_variants, context.number_of_samples, context.flags
    );
    Ok(Preamble {
        context,
        sample_ids,
        first_variant: u64::from(offset) + 4,
    })
}

/// A source reading a BGEN file, plain or gzip-compressed
///
/// The v1.0, v1.1 and v1.2 layouts are supported, with or without compressed
/// probability blocks and sample identifiers.
#[derive(Debug)]
pub struct BgenSource {
    stream: InputStream,
    context: Context,
    sample_ids: Option<Vec<String>>,
    codec: ProbabilityCodec,
    state: StreamState,
    /// Number of alleles of the variant being read
    number_of_alleles: usize,
}
impl BgenSource {
    /// Opens a BGEN file, decompressing it first if its name ends in `.gz`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(InputStream::open(path)?)
    }

    /// Reads a BGEN file held in memory
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        Self::new(InputStream::from_bytes(bytes))
    }

    /// Reads the header from `stream` and positions it at the first variant
    ///
    /// # Errors
    ///
    /// * `HeaderError` - if the header is malformed, its layout is unsupported or
    ///   the offset to the first variant overlaps the header
    /// * `Error::Io` - if the stream ends within the header
    pub fn new(mut stream: InputStream) -> Result<Self> {
        let Preamble {
            context,
            sample_ids,
            ..
        } = read_preamble(&mut stream)?;
        Ok(Self {
            stream,
            context,
            sample_ids,
            codec: ProbabilityCodec::new(),
            state: StreamState::default(),
            number_of_alleles: 2,
        })
    }

    /// The header of the file
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }
}
impl SnpDataSource for BgenSource {
    fn number_of_samples(&self) -> u32 {
        self.context.number_of_samples
    }

    fn total_number_of_snps(&self) -> Option<u64> {
        Some(u64::from(self.context.number_of_variants))
    }

    fn number_of_snps_read(&self) -> u64 {
        self.state.number_of_snps_read()
    }

    fn state(&self) -> ReadState {
        self.state.state()
    }

    fn source_spec(&self) -> String {
        self.stream.spec()
    }

    fn sample_ids(&self) -> Option<&[String]> {
        self.sample_ids.as_deref()
    }

    fn read_snp_identifying_data(&mut self) -> Result<Option<VariantIdentifyingData>> {
        self.state.expect_new_variant();
        let variant = bgen::read_snp_identifying_data(&mut self.stream, &self.context)
            .map_err(|e| truncated(e, self.state.number_of_snps_read()))?;
        if let Some(variant) = &variant {
            self.number_of_alleles = variant.number_of_alleles();
            self.state.identifying_data_read();
        }
        Ok(variant)
    }

    fn read_variant_data(&mut self) -> Result<VariantDataReader> {
        self.state.expect_probability_data();
        let data = self
            .codec
            .read_snp_probability_data(&mut self.stream, &self.context, self.number_of_alleles)
            .map_err(|e| truncated(e, self.state.number_of_snps_read()))?;
        self.state.probability_data_read();
        Ok(VariantDataReader::new(data))
    }

    fn ignore_snp_probability_data(&mut self) -> Result<()> {
        self.state.expect_probability_data();
        bgen::ignore_snp_probability_data(&mut self.stream, &self.context)
            .map_err(|e| truncated(e, self.state.number_of_snps_read()))?;
        self.state.probability_data_read();
        Ok(())
    }

    fn reset_to_start(&mut self) -> Result<()> {
        self.stream.rewind()?;
        read_preamble(&mut self.stream)?;
        self.state.reset();
        Ok(())
    }
}
