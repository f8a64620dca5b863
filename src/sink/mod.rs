//! Sequential writing of variants
//!
//! Every output format implements [`SnpDataSink`]. Sinks must be closed
//! explicitly with [`SnpDataSink::close`]; BGEN sinks rewrite their header on
//! close so that it records the final number of variants.

mod bgen;
mod gen;

pub use bgen::{BgenSink, BgenSinkBuilder};
pub use gen::GenSink;

use auto_impl::auto_impl;
use std::{fs::File, io::BufWriter, path::Path};

use crate::{
    error::Result, stream::CompressionType, stream::OutputStream, ArgumentError, FileType,
    GenotypeProbabilities, SnpDataSource, VariantDataReader, VariantIdentifyingData,
};

/// A sequential writer of variants
#[auto_impl(&mut, Box)]
pub trait SnpDataSink {
    fn number_of_samples(&self) -> u32;

    fn number_of_snps_written(&self) -> u64;

    /// A short description of where the data goes
    fn sink_spec(&self) -> String;

    /// Writes one variant
    ///
    /// # Errors
    ///
    /// `WriteError::SampleCountMismatch` if `probabilities` does not cover every
    /// sample, or another `WriteError` if the variant does not fit the format.
    fn write_snp(
        &mut self,
        variant: &VariantIdentifyingData,
        probabilities: &GenotypeProbabilities,
    ) -> Result<()>;

    /// Writes one variant from the data reader of a source
    ///
    /// Sinks that only store `[AA, AB, BB]` triplets reject data without them
    /// with `ReadError::UnsupportedGenotypeShape`.
    fn write_variant_data(
        &mut self,
        variant: &VariantIdentifyingData,
        data: &VariantDataReader,
    ) -> Result<()> {
        self.write_snp(variant, &data.to_genotype_probabilities()?)
    }

    /// Completes the output; nothing may be written afterwards
    ///
    /// Calling `close` more than once has no further effect.
    fn close(&mut self) -> Result<()>;
}

/// Copies every remaining variant of `source` into `sink`
///
/// # Returns
///
/// The number of variants copied
pub fn transfer_snps<S: SnpDataSource + ?Sized, K: SnpDataSink + ?Sized>(
    source: &mut S,
    sink: &mut K,
) -> Result<u64> {
    let mut copied = 0;
    while let Some(variant) = source.read_snp_identifying_data()? {
        let data = source.read_variant_data()?;
        sink.write_variant_data(&variant, &data)?;
        copied += 1;
    }
    Ok(copied)
}

/// A sink of any supported format
pub enum DataSink {
    Bgen(BgenSink<BufWriter<File>>),
    Gen(GenSink<OutputStream>),
}
impl DataSink {
    /// Creates a file, choosing the format from `file_type`
    ///
    /// GEN output ending in `.gz` is gzip-compressed. BGEN output uses the
    /// default [`BgenSinkBuilder`] settings.
    ///
    /// # Errors
    ///
    /// `ArgumentError::UnsupportedCompression` for a BGEN filename ending in `.gz`,
    /// or `FileError::Create` if the file cannot be created.
    pub fn create<P: AsRef<Path>>(
        path: P,
        file_type: FileType,
        number_of_samples: u32,
    ) -> Result<Self> {
        let path = path.as_ref();
        match file_type.resolve(path) {
            FileType::Bgen => {
                if CompressionType::from_path(path) == CompressionType::Gzip {
                    return Err(
                        ArgumentError::UnsupportedCompression(path.display().to_string()).into(),
                    );
                }
                Ok(Self::Bgen(
                    BgenSinkBuilder::default().create(path, number_of_samples)?,
                ))
            }
            FileType::Gen | FileType::Detect => {
                Ok(Self::Gen(GenSink::create(path, number_of_samples)?))
            }
        }
    }
}
impl SnpDataSink for DataSink {
    fn number_of_samples(&self) -> u32 {
        match self {
            Self::Bgen(sink) => sink.number_of_samples(),
            Self::Gen(sink) => sink.number_of_samples(),
        }
    }

    fn number_of_snps_written(&self) -> u64 {
        match self {
            Self::Bgen(sink) => sink.number_of_snps_written(),
            Self::Gen(sink) => sink.number_of_snps_written(),
        }
    }

    fn sink_spec(&self) -> String {
        match self {
            Self::Bgen(sink) => sink.sink_spec(),
            Self::Gen(sink) => sink.sink_spec(),
        }
    }

    fn write_snp(
        &mut self,
        variant: &VariantIdentifyingData,
        probabilities: &GenotypeProbabilities,
    ) -> Result<()> {
        match self {
            Self::Bgen(sink) => sink.write_snp(variant, probabilities),
            Self::Gen(sink) => sink.write_snp(variant, probabilities),
        }
    }

    fn write_variant_data(
        &mut self,
        variant: &VariantIdentifyingData,
        data: &VariantDataReader,
    ) -> Result<()> {
        match self {
            Self::Bgen(sink) => sink.write_variant_data(variant, data),
            Self::Gen(sink) => sink.write_variant_data(variant, data),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Self::Bgen(sink) => sink.close(),
            Self::Gen(sink) => sink.close(),
        }
    }
}
