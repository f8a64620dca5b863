use super::{ReadState, SnpDataSource};
use crate::{error::Result, VariantDataReader, VariantIdentifyingData};

/// Wraps a source so that repeated identifying-data reads return the same variant
///
/// While the probability data of the current variant is pending, further calls
/// to [`read_snp_identifying_data`](SnpDataSource::read_snp_identifying_data)
/// return the cached variant without touching the wrapped source.
#[derive(Debug)]
pub struct IdentifyingDataCachingSource<S: SnpDataSource> {
    inner: S,
    cached: Option<VariantIdentifyingData>,
}
impl<S: SnpDataSource> IdentifyingDataCachingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cached: None,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}
impl<S: SnpDataSource> SnpDataSource for IdentifyingDataCachingSource<S> {
    fn number_of_samples(&self) -> u32 {
        self.inner.number_of_samples()
    }

    fn total_number_of_snps(&self) -> Option<u64> {
        self.inner.total_number_of_snps()
    }

    fn number_of_snps_read(&self) -> u64 {
        self.inner.number_of_snps_read()
    }

    fn state(&self) -> ReadState {
        self.inner.state()
    }

    fn source_spec(&self) -> String {
        self.inner.source_spec()
    }

    fn sample_ids(&self) -> Option<&[String]> {
        self.inner.sample_ids()
    }

    fn read_snp_identifying_data(&mut self) -> Result<Option<VariantIdentifyingData>> {
        if self.inner.state() == ReadState::HaveReadIdentifyingData {
            if let Some(variant) = &self.cached {
                return Ok(Some(variant.clone()));
            }
        }
        self.cached = self.inner.read_snp_identifying_data()?;
        Ok(self.cached.clone())
    }

    fn read_variant_data(&mut self) -> Result<VariantDataReader> {
        let reader = self.inner.read_variant_data()?;
        self.cached = None;
        Ok(reader)
    }

    fn ignore_snp_probability_data(&mut self) -> Result<()> {
        self.inner.ignore_snp_probability_data()?;
        self.cached = None;
        Ok(())
    }

    fn reset_to_start(&mut self) -> Result<()> {
        self.cached = None;
        self.inner.reset_to_start()
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::{Chromosome, GenSource, GenomePosition, GenomePositionRange};
    use anyhow::Result;

    fn source() -> IdentifyingDataCachingSource<GenSource> {
        let text = "1 SNP1 rs1 100 A G 1 0 0\n1 SNP2 rs2 200 A G 0 1 0\n1 SNP3 rs3 300 A G 0 0 1\n";
        IdentifyingDataCachingSource::new(GenSource::from_bytes(text.as_bytes()).unwrap())
    }

    #[test]
    fn test_repeated_reads_return_cached_variant() -> Result<()> {
        let mut source = source();
        let first = source.read_snp_identifying_data()?.expect("first");
        let again = source.read_snp_identifying_data()?.expect("cached");
        assert_eq!(first, again);
        assert_eq!(source.read_snp_probability_data()?[0], [1.0, 0.0, 0.0]);

        let second = source.read_snp_identifying_data()?.expect("second");
        assert_eq!(second.snpid(), "SNP2");
        Ok(())
    }

    #[test]
    fn test_range_query_resumes_from_overshoot() -> Result<()> {
        let mut source = source();
        let early = GenomePositionRange::new(Chromosome::Autosome(1), 50, 150)?;
        assert!(source.get_next_snp_with_position_in_range(&early)?.is_some());
        source.ignore_snp_probability_data()?;
        assert!(source.get_next_snp_with_position_in_range(&early)?.is_none());

        // the overshooting variant is still available without rereading the file
        let point = GenomePosition::new(Chromosome::Autosome(1), 200);
        let variant = source
            .get_next_snp_with_specified_position(point)?
            .expect("overshooting variant");
        assert_eq!(variant.position(), point);
        assert_eq!(source.number_of_snps_read(), 1);
        Ok(())
    }
}
