//! Sequential access to variants
//!
//! Every format implements [`SnpDataSource`]. A source hands out one variant at
//! a time in two steps: its identifying data, then its probability data, which
//! can be decoded or skipped.
//!
//! ```text
//! HaveNotReadIdentifyingData --read_snp_identifying_data--> HaveReadIdentifyingData
//! HaveReadIdentifyingData --read_variant_data--> HaveNotReadIdentifyingData
//! HaveReadIdentifyingData --ignore_snp_probability_data--> HaveNotReadIdentifyingData
//! ```
//!
//! Reading probability data in any other state is a bug in the caller and panics.
//! Reaching the end of the data is not an error: reads return `Ok(None)`.

mod bgen;
mod caching;
mod chain;
mod gen;

pub use bgen::BgenSource;
pub use caching::IdentifyingDataCachingSource;
pub use chain::{MovedToNextSource, SourceChain};
pub use gen::GenSource;

pub(crate) use bgen::{read_preamble, Preamble};

use auto_impl::auto_impl;
use std::{io, path::Path};

use crate::{
    error::Result, Error, GenomePosition, GenomePositionRange, GenotypeProbabilities, ReadError,
    VariantDataReader, VariantIdentifyingData,
};

/// Position of a source within the record it is reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadState {
    /// The next read returns the identifying data of a new variant
    #[default]
    HaveNotReadIdentifyingData,
    /// The probability data of the current variant must be read or ignored next
    HaveReadIdentifyingData,
}

/// Read-state bookkeeping shared by the concrete sources
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StreamState {
    state: ReadState,
    number_of_snps_read: u64,
}
impl StreamState {
    pub fn state(self) -> ReadState {
        self.state
    }

    pub fn number_of_snps_read(self) -> u64 {
        self.number_of_snps_read
    }

    /// Panics if the identifying data of the current variant was already read
    pub fn expect_new_variant(self) {
        assert!(
            self.state == ReadState::HaveNotReadIdentifyingData,
            "identifying data read again before the probability data of variant {} was used",
            self.number_of_snps_read
        );
    }

    /// Panics unless the identifying data of the current variant was read
    pub fn expect_probability_data(self) {
        assert!(
            self.state == ReadState::HaveReadIdentifyingData,
            "probability data requested before the identifying data of variant {} was read",
            self.number_of_snps_read
        );
    }

    pub fn identifying_data_read(&mut self) {
        self.state = ReadState::HaveReadIdentifyingData;
    }

    pub fn probability_data_read(&mut self) {
        self.state = ReadState::HaveNotReadIdentifyingData;
        self.number_of_snps_read += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Reports an unexpected end of stream inside a record as a truncated record
pub(crate) fn truncated(error: Error, number_of_snps_read: u64) -> Error {
    match error {
        Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            ReadError::TruncatedRecord(number_of_snps_read).into()
        }
        other => other,
    }
}

/// A sequential reader of variants
///
/// Implemented for `&mut S` and `Box<S>`, so sources can be chained, wrapped
/// and used as trait objects.
#[auto_impl(&mut, Box)]
pub trait SnpDataSource {
    fn number_of_samples(&self) -> u32;

    /// Number of variants in the source, if known without a full scan
    fn total_number_of_snps(&self) -> Option<u64>;

    /// Number of variants whose probability data was read or ignored since the last reset
    fn number_of_snps_read(&self) -> u64;

    fn state(&self) -> ReadState;

    /// A short description of where the data comes from
    fn source_spec(&self) -> String;

    /// Sample identifiers stored in the source, if any
    fn sample_ids(&self) -> Option<&[String]> {
        None
    }

    /// A multi-line description of the source
    fn summary(&self) -> String {
        let total = self
            .total_number_of_snps()
            .map_or_else(|| "unknown".to_string(), |n| n.to_string());
        format!(
            "Spec: {}\nNumber of samples: {}\nNumber of SNPs: {}\n",
            self.source_spec(),
            self.number_of_samples(),
            total
        )
    }

    /// Reads the identifying data of the next variant
    ///
    /// # Returns
    ///
    /// * `Ok(Some(variant))` - the source moves to `HaveReadIdentifyingData`
    /// * `Ok(None)` - the source is exhausted
    /// * `Err(Error)` - the record is malformed or truncated
    ///
    /// # Panics
    ///
    /// Concrete sources panic if the probability data of the previous variant
    /// has not been read or ignored.
    fn read_snp_identifying_data(&mut self) -> Result<Option<VariantIdentifyingData>>;

    /// Decodes the probability data of the current variant
    ///
    /// # Panics
    ///
    /// If the identifying data of the variant has not been read.
    fn read_variant_data(&mut self) -> Result<VariantDataReader>;

    /// Skips the probability data of the current variant without decoding it
    ///
    /// # Panics
    ///
    /// If the identifying data of the variant has not been read.
    fn ignore_snp_probability_data(&mut self) -> Result<()>;

    /// Moves back to the first variant
    fn reset_to_start(&mut self) -> Result<()>;

    /// Decodes the probability data of the current variant into probabilities
    ///
    /// # Errors
    ///
    /// Besides read errors, `ReadError::UnsupportedGenotypeShape` for a variant
    /// that does not reduce to one `[AA, AB, BB]` triplet per sample. Use
    /// [`read_variant_data`](Self::read_variant_data) for such variants.
    fn read_snp_probability_data(&mut self) -> Result<GenotypeProbabilities> {
        self.read_variant_data()?.into_probabilities()
    }

    /// Reads the next variant in full
    fn read_snp(&mut self) -> Result<Option<(VariantIdentifyingData, GenotypeProbabilities)>> {
        let Some(variant) = self.read_snp_identifying_data()? else {
            return Ok(None);
        };
        let probabilities = self.read_snp_probability_data()?;
        Ok(Some((variant, probabilities)))
    }

    /// Moves forward to the next variant inside `range`
    ///
    /// Variants before the range have their probability data skipped. The source
    /// is assumed sorted by position, so the scan stops at the first variant past
    /// the end of a range on a single chromosome: that variant's identifying data
    /// has been consumed, the source is left in `HaveReadIdentifyingData` and
    /// `Ok(None)` is returned. A range without a chromosome is matched on every
    /// chromosome and never stops early.
    ///
    /// On `Ok(Some(variant))` the caller reads or ignores the probability data next.
    fn get_next_snp_with_position_in_range(
        &mut self,
        range: &GenomePositionRange,
    ) -> Result<Option<VariantIdentifyingData>> {
        let end = range.end();
        while let Some(variant) = self.read_snp_identifying_data()? {
            let position = variant.position();
            if range.contains(&position) {
                return Ok(Some(variant));
            }
            if range.has_chromosome() && position > end {
                return Ok(None);
            }
            self.ignore_snp_probability_data()?;
        }
        Ok(None)
    }

    /// Moves forward to the next variant at exactly `position`
    fn get_next_snp_with_specified_position(
        &mut self,
        position: GenomePosition,
    ) -> Result<Option<VariantIdentifyingData>> {
        self.get_next_snp_with_position_in_range(&GenomePositionRange::single(position))
    }

    /// Lists the identifying data of every variant, starting from the first
    ///
    /// `progress` receives the number of variants listed so far and the total, if known.
    fn list_snps(
        &mut self,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<Vec<VariantIdentifyingData>> {
        self.reset_to_start()?;
        let total = self.total_number_of_snps();
        let mut variants = Vec::new();
        while let Some(variant) = self.read_snp_identifying_data()? {
            self.ignore_snp_probability_data()?;
            variants.push(variant);
            progress(variants.len() as u64, total);
        }
        Ok(variants)
    }
}

/// File format of a source or sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    /// Chosen from the filename: `.bgen` is BGEN, anything else is GEN
    #[default]
    Detect,
    Bgen,
    Gen,
}
impl FileType {
    /// Resolves [`FileType::Detect`] using the filename, ignoring a trailing `.gz`
    pub fn resolve<P: AsRef<Path>>(self, path: P) -> Self {
        match self {
            Self::Detect => {
                let path = path.as_ref();
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                let name = name.strip_suffix(".gz").unwrap_or(name);
                if name.ends_with(".bgen") {
                    Self::Bgen
                } else {
                    Self::Gen
                }
            }
            other => other,
        }
    }
}

/// A source of any supported format
///
/// This is a convenience enum for workflows where the underlying format is
/// not important.
#[derive(Debug)]
pub enum DataSource {
    Bgen(BgenSource),
    Gen(GenSource),
    Chain(SourceChain),
}
impl DataSource {
    /// Opens a file, choosing the format from `file_type`
    ///
    /// Files ending in `.gz` are decompressed transparently.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use genfile::{DataSource, FileType, SnpDataSource};
    /// # fn main() -> genfile::Result<()> {
    /// let mut source = DataSource::open("example.bgen", FileType::Detect)?;
    /// while let Some((variant, probabilities)) = source.read_snp()? {
    ///     println!("{variant}: {} samples", probabilities.number_of_samples());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn open<P: AsRef<Path>>(path: P, file_type: FileType) -> Result<Self> {
        let path = path.as_ref();
        match file_type.resolve(path) {
            FileType::Bgen => Ok(Self::Bgen(BgenSource::open(path)?)),
            FileType::Gen | FileType::Detect => Ok(Self::Gen(GenSource::open(path)?)),
        }
    }

    /// Opens several files as one chained source
    pub fn open_chain<P: AsRef<Path>>(paths: &[P], file_type: FileType) -> Result<Self> {
        let mut chain = SourceChain::new();
        for path in paths {
            chain.add_source(Self::open(path, file_type)?)?;
        }
        Ok(Self::Chain(chain))
    }
}

macro_rules! dispatch {
    ($self:ident, $source:ident => $body:expr) => {
        match $self {
            DataSource::Bgen($source) => $body,
            DataSource::Gen($source) => $body,
            DataSource::Chain($source) => $body,
        }
    };
}

impl SnpDataSource for DataSource {
    fn number_of_samples(&self) -> u32 {
        dispatch!(self, source => source.number_of_samples())
    }

    fn total_number_of_snps(&self) -> Option<u64> {
        dispatch!(self, source => source.total_number_of_snps())
    }

    fn number_of_snps_read(&self) -> u64 {
        dispatch!(self, source => source.number_of_snps_read())
    }

    fn state(&self) -> ReadState {
        dispatch!(self, source => source.state())
    }

    fn source_spec(&self) -> String {
        dispatch!(self, source => source.source_spec())
    }

    fn sample_ids(&self) -> Option<&[String]> {
        dispatch!(self, source => source.sample_ids())
    }

    fn summary(&self) -> String {
        dispatch!(self, source => source.summary())
    }

    fn read_snp_identifying_data(&mut self) -> Result<Option<VariantIdentifyingData>> {
        dispatch!(self, source => source.read_snp_identifying_data())
    }

    fn read_variant_data(&mut self) -> Result<VariantDataReader> {
        dispatch!(self, source => source.read_variant_data())
    }

    fn ignore_snp_probability_data(&mut self) -> Result<()> {
        dispatch!(self, source => source.ignore_snp_probability_data())
    }

    fn reset_to_start(&mut self) -> Result<()> {
        dispatch!(self, source => source.reset_to_start())
    }
}
