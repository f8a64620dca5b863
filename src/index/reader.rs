use std::{fs::File, path::Path};

use memmap2::Mmap;

use super::{FileRange, IndexQuery};
use crate::{
    bgen::{self, Context, ProbabilityCodec},
    error::Result,
    source::{read_preamble, Preamble},
    FileError, GenotypeProbabilities, IndexError, VariantDataReader, VariantIdentifyingData,
};

/// Random access to the variants of a memory-mapped BGEN file
///
/// Byte ranges usually come from an [`IndexQuery`]; each range must hold
/// exactly one variant record.
pub struct IndexedBgenReader {
    mmap: Mmap,
    context: Context,
    sample_ids: Option<Vec<String>>,
    first_variant: u64,
    codec: ProbabilityCodec,
}
impl IndexedBgenReader {
    /// Maps a BGEN file and reads its header
    ///
    /// Gzip-compressed files cannot be mapped and are rejected by the header checks.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FileError::open(path, e))?;

        // Safety: the file is open and won't be modified while mapped
        let mmap = unsafe { Mmap::map(&file)? };

        let Preamble {
            context,
            sample_ids,
            first_variant,
        } = read_preamble(&mut &mmap[..])?;
        Ok(Self {
            mmap,
            context,
            sample_ids,
            first_variant,
            codec: ProbabilityCodec::new(),
        })
    }

    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    #[must_use]
    pub fn sample_ids(&self) -> Option<&[String]> {
        self.sample_ids.as_deref()
    }

    /// Byte offset of the first variant record
    #[must_use]
    pub fn first_variant(&self) -> u64 {
        self.first_variant
    }

    /// Decodes the identifying data of the variant stored in `range`
    pub fn read_identifying_data(&self, range: FileRange) -> Result<VariantIdentifyingData> {
        let mut record = record(&self.mmap, range)?;
        bgen::read_snp_identifying_data(&mut record, &self.context)?
            .ok_or_else(|| IndexError::EmptyRange(range.start).into())
    }

    /// Decodes the variant stored in `range`, keeping its full genotype data
    pub fn read_variant_data(
        &mut self,
        range: FileRange,
    ) -> Result<(VariantIdentifyingData, VariantDataReader)> {
        let Self {
            mmap,
            context,
            codec,
            ..
        } = self;
        let mut record = record(mmap, range)?;
        let Some(variant) = bgen::read_snp_identifying_data(&mut record, context)? else {
            return Err(IndexError::EmptyRange(range.start).into());
        };
        let data =
            codec.read_snp_probability_data(&mut record, context, variant.number_of_alleles())?;
        Ok((variant, VariantDataReader::new(data)))
    }

    /// Decodes the variant stored in `range` as one triplet per sample
    ///
    /// # Errors
    ///
    /// As [`read_variant_data`](Self::read_variant_data), plus
    /// `ReadError::UnsupportedGenotypeShape` for variants without triplets.
    pub fn read_variant(
        &mut self,
        range: FileRange,
    ) -> Result<(VariantIdentifyingData, GenotypeProbabilities)> {
        let (variant, data) = self.read_variant_data(range)?;
        Ok((variant, data.into_probabilities()?))
    }

    /// Decodes every variant selected by an initialised query, in query order
    ///
    /// # Panics
    ///
    /// If the query has not been initialised.
    pub fn read_query<'a>(
        &'a mut self,
        query: &'a IndexQuery,
    ) -> impl Iterator<Item = Result<(VariantIdentifyingData, GenotypeProbabilities)>> + 'a {
        query.ranges().iter().map(move |&range| self.read_variant(range))
    }
}

/// The bytes of `range`, checked against the mapped file
fn record(mmap: &Mmap, range: FileRange) -> Result<&[u8]> {
    match usize::try_from(range.end) {
        Ok(end) if end <= mmap.len() && range.start <= range.end => {
            Ok(&mmap[range.start as usize..end])
        }
        _ => Err(IndexError::OutOfBounds {
            end: range.end,
            len: mmap.len(),
        }
        .into()),
    }
}
