//! # genfile
//!
//! Reading and writing genome-wide genotype data in the BGEN binary format and
//! the GEN text format.
//!
//! The crate is organised in three layers:
//!
//! * [`bgen`] - bit-exact codecs for the blocks of a BGEN file
//! * [`SnpDataSource`] and [`SnpDataSink`] - sequential, format-independent
//!   access to variants, including chains of files and range scans
//! * [`index`] - random access to BGEN files through a SQLite index
//!
//! ```
//! # use genfile::{BgenSinkBuilder, BgenSource, Chromosome, GenomePosition, GenotypeProbabilities,
//! #     SnpDataSink, SnpDataSource, VariantIdentifyingData};
//! # use std::io::Cursor;
//! # fn main() -> genfile::Result<()> {
//! let mut sink = BgenSinkBuilder::default().build(Cursor::new(Vec::new()), 1)?;
//! let variant = VariantIdentifyingData::biallelic(
//!     "SNP1",
//!     "rs1",
//!     GenomePosition::new(Chromosome::Autosome(1), 1000),
//!     "A",
//!     "G",
//! );
//! sink.write_snp(&variant, &GenotypeProbabilities::from(vec![[0.0, 1.0, 0.0]]))?;
//! let bytes = sink.into_inner()?.into_inner();
//!
//! let mut source = BgenSource::from_bytes(bytes)?;
//! let (read, probabilities) = source.read_snp()?.expect("one variant");
//! assert_eq!(read, variant);
//! assert_eq!(probabilities[0], [0.0, 1.0, 0.0]);
//! # Ok(())
//! # }
//! ```

pub mod bgen;
mod chromosome;
pub mod endian;
mod error;
pub mod gen;
mod genotypes;
pub mod index;
mod reader;
mod sink;
mod source;
pub mod stream;
mod variant;

pub use chromosome::{Chromosome, GenomePosition, GenomePositionRange};
pub use error::{
    ArgumentError, Error, FileError, HeaderError, IndexError, ReadError, Result, WriteError,
};
pub use genotypes::{number_of_entries, GenotypeProbabilities, SampleProbabilities};
pub use reader::{
    PerSampleSetter, VariantDataReader, GENOTYPES, GENOTYPE_PROBABILITIES, HAPLOTYPE_PROBABILITIES,
};
pub use sink::{transfer_snps, BgenSink, BgenSinkBuilder, DataSink, GenSink, SnpDataSink};
pub use source::{
    BgenSource, DataSource, FileType, GenSource, IdentifyingDataCachingSource, MovedToNextSource,
    ReadState, SnpDataSource, SourceChain,
};
pub use variant::VariantIdentifyingData;

#[cfg(test)]
mod testing {
    use super::*;
    use anyhow::Result;
    use bgen::{BlockCompression, Layout};
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use std::io::Cursor;

    fn random_probabilities(rng: &mut SmallRng, number_of_samples: usize) -> GenotypeProbabilities {
        GenotypeProbabilities::from_fn(number_of_samples, |_| {
            let aa: f64 = rng.random();
            let ab: f64 = rng.random::<f64>() * (1.0 - aa);
            [aa, ab, 1.0 - aa - ab]
        })
    }

    fn variants(count: u32) -> Vec<VariantIdentifyingData> {
        (0..count)
            .map(|i| {
                VariantIdentifyingData::biallelic(
                    format!("SNP{i}"),
                    format!("rs{i}"),
                    GenomePosition::new(Chromosome::Autosome(1 + (i / 10) as u8), 1000 + i * 10),
                    "A",
                    "G",
                )
            })
            .collect()
    }

    fn round_trip(layout: Layout, compression: BlockCompression) -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(42);
        let number_of_samples = 17;
        let variants = variants(25);
        let written: Vec<GenotypeProbabilities> = variants
            .iter()
            .map(|_| random_probabilities(&mut rng, number_of_samples))
            .collect();

        let mut sink = BgenSinkBuilder::default()
            .layout(layout)
            .compression(compression)
            .build(Cursor::new(Vec::new()), number_of_samples as u32)?;
        for (variant, probabilities) in variants.iter().zip(&written) {
            sink.write_snp(variant, probabilities)?;
        }
        let bytes = sink.into_inner()?.into_inner();

        // v1.2 rounds each sample onto a simplex, so the derived last value
        // carries the error of the stored ones
        let tolerance = match layout.probability_conversion_factor() {
            Some(factor) => 0.5 / factor + 1e-12,
            None => 2.0 / 65535.0 + 1e-9,
        };
        let mut source = BgenSource::from_bytes(bytes)?;
        assert_eq!(source.total_number_of_snps(), Some(25));
        for (variant, probabilities) in variants.iter().zip(&written) {
            let (read_variant, read_probabilities) = source.read_snp()?.expect("variant");
            assert_eq!(&read_variant, variant);
            for (got, expected) in read_probabilities.iter().zip(probabilities) {
                for (g, e) in got.iter().zip(expected) {
                    assert!((g - e).abs() <= tolerance, "{g} vs {e}");
                }
            }
        }
        assert!(source.read_snp()?.is_none());
        Ok(())
    }

    #[test]
    fn test_bgen_round_trip_all_layouts() -> Result<()> {
        for layout in [Layout::V10, Layout::V11, Layout::V12] {
            for compression in [BlockCompression::None, BlockCompression::Zlib] {
                round_trip(layout, compression)?;
            }
        }
        round_trip(Layout::V12, BlockCompression::Zstd)?;
        Ok(())
    }

    #[test]
    fn test_range_scan_over_written_file() -> Result<()> {
        let mut sink = BgenSinkBuilder::default().build(Cursor::new(Vec::new()), 1)?;
        for variant in variants(30) {
            sink.write_snp(&variant, &GenotypeProbabilities::from(vec![[1.0, 0.0, 0.0]]))?;
        }
        let mut source = BgenSource::from_bytes(sink.into_inner()?.into_inner())?;

        // chromosome 2 holds positions 1100..=1190
        let range = GenomePositionRange::new(Chromosome::Autosome(2), 1120, 1135)?;
        let first = source.get_next_snp_with_position_in_range(&range)?.expect("first");
        assert_eq!(first.position().position, 1120);
        source.ignore_snp_probability_data()?;
        let second = source.get_next_snp_with_position_in_range(&range)?.expect("second");
        assert_eq!(second.position().position, 1130);
        source.ignore_snp_probability_data()?;
        assert!(source.get_next_snp_with_position_in_range(&range)?.is_none());

        // variants 0..=13 were consumed; variant 14 overshot the range
        assert_eq!(source.number_of_snps_read(), 14);
        assert_eq!(source.state(), ReadState::HaveReadIdentifyingData);
        Ok(())
    }
}
