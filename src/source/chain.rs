use std::fmt;

use log::debug;

use super::{DataSource, ReadState, SnpDataSource, StreamState};
use crate::{error::Result, ReadError, VariantDataReader, VariantIdentifyingData};

/// Callback invoked when a chain moves on to its next source
///
/// Receives the index of the source that is now being read.
pub type MovedToNextSource = Box<dyn FnMut(usize)>;

/// Several sources read one after the other as a single source
///
/// All sources must have the same number of samples. Variants are returned in
/// source order; errors from any source are returned unchanged.
///
/// # Examples
///
/// ```no_run
/// # use genfile::{DataSource, FileType, SnpDataSource, SourceChain};
/// # fn main() -> genfile::Result<()> {
/// let mut chain = SourceChain::new();
/// for chromosome in ["chr1.bgen", "chr2.bgen"] {
///     chain.add_source(DataSource::open(chromosome, FileType::Detect)?)?;
/// }
/// println!("{}", chain.summary());
/// # Ok(())
/// # }
/// ```
pub struct SourceChain<S: SnpDataSource = DataSource> {
    sources: Vec<S>,
    current: usize,
    number_of_samples: u32,
    state: StreamState,
    moved_to_next_source: Option<MovedToNextSource>,
}
impl<S: SnpDataSource> SourceChain<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            current: 0,
            number_of_samples: 0,
            state: StreamState::default(),
            moved_to_next_source: None,
        }
    }

    /// Appends a source to the chain, resetting it to its start
    ///
    /// # Errors
    ///
    /// `ReadError::SampleCountMismatch` if the source has a different number of
    /// samples than the sources already in the chain.
    pub fn add_source(&mut self, mut source: S) -> Result<()> {
        if self.sources.is_empty() {
            self.number_of_samples = source.number_of_samples();
        } else if source.number_of_samples() != self.number_of_samples {
            return Err(ReadError::SampleCountMismatch {
                expected: self.number_of_samples,
                got: source.number_of_samples(),
            }
            .into());
        }
        source.reset_to_start()?;
        self.sources.push(source);
        Ok(())
    }

    /// Registers a callback invoked each time the chain moves to its next source
    pub fn set_moved_to_next_source_callback(&mut self, callback: impl FnMut(usize) + 'static) {
        self.moved_to_next_source = Some(Box::new(callback));
    }

    #[must_use]
    pub fn number_of_sources(&self) -> usize {
        self.sources.len()
    }

    /// Index of the source currently being read
    #[must_use]
    pub fn current_source_index(&self) -> usize {
        self.current
    }

    /// Number of variants in source `index`, if known
    ///
    /// # Panics
    ///
    /// If `index` is out of bounds.
    #[must_use]
    pub fn number_of_snps_in_source(&self, index: usize) -> Option<u64> {
        self.sources[index].total_number_of_snps()
    }

    #[must_use]
    pub fn source(&self, index: usize) -> Option<&S> {
        self.sources.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.sources.iter()
    }

    #[must_use]
    pub fn into_sources(self) -> Vec<S> {
        self.sources
    }

    fn move_to_next_source(&mut self) {
        self.current += 1;
        if self.current < self.sources.len() {
            debug!(
                "Source chain moved to source {} of {}: {}",
                self.current + 1,
                self.sources.len(),
                self.sources[self.current].source_spec()
            );
            if let Some(callback) = self.moved_to_next_source.as_mut() {
                callback(self.current);
            }
        }
    }
}
impl<S: SnpDataSource> Default for SourceChain<S> {
    fn default() -> Self {
        Self::new()
    }
}
impl<S: SnpDataSource + fmt::Debug> fmt::Debug for SourceChain<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceChain")
            .field("sources", &self.sources)
            .field("current", &self.current)
            .field("number_of_samples", &self.number_of_samples)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
impl<S: SnpDataSource> SnpDataSource for SourceChain<S> {
    fn number_of_samples(&self) -> u32 {
        self.number_of_samples
    }

    /// Sum of the counts of every source, or `None` if any count is unknown
    fn total_number_of_snps(&self) -> Option<u64> {
        self.sources.iter().map(S::total_number_of_snps).sum()
    }

    fn number_of_snps_read(&self) -> u64 {
        self.state.number_of_snps_read()
    }

    fn state(&self) -> ReadState {
        self.state.state()
    }

    fn source_spec(&self) -> String {
        let specs: Vec<String> = self.sources.iter().map(S::source_spec).collect();
        format!("chain:{}", specs.join(","))
    }

    fn sample_ids(&self) -> Option<&[String]> {
        self.sources.first().and_then(S::sample_ids)
    }

    fn summary(&self) -> String {
        let mut summary = format!(
            "Spec: {}\nNumber of sources: {}\nNumber of samples: {}\n",
            self.source_spec(),
            self.sources.len(),
            self.number_of_samples
        );
        for (index, source) in self.sources.iter().enumerate() {
            let count = source
                .total_number_of_snps()
                .map_or_else(|| "unknown".to_string(), |n| n.to_string());
            summary.push_str(&format!(
                "  Source {}: {} ({} SNPs)\n",
                index + 1,
                source.source_spec(),
                count
            ));
        }
        summary
    }

    /// # Panics
    ///
    /// If the chain has no sources.
    fn read_snp_identifying_data(&mut self) -> Result<Option<VariantIdentifyingData>> {
        assert!(!self.sources.is_empty(), "cannot read from a chain with no sources");
        self.state.expect_new_variant();
        while self.current < self.sources.len() {
            if let Some(variant) = self.sources[self.current].read_snp_identifying_data()? {
                self.state.identifying_data_read();
                return Ok(Some(variant));
            }
            self.move_to_next_source();
        }
        Ok(None)
    }

    fn read_variant_data(&mut self) -> Result<VariantDataReader> {
        self.state.expect_probability_data();
        let reader = self.sources[self.current].read_variant_data()?;
        self.state.probability_data_read();
        Ok(reader)
    }

    fn ignore_snp_probability_data(&mut self) -> Result<()> {
        self.state.expect_probability_data();
        self.sources[self.current].ignore_snp_probability_data()?;
        self.state.probability_data_read();
        Ok(())
    }

    fn reset_to_start(&mut self) -> Result<()> {
        for source in &mut self.sources {
            source.reset_to_start()?;
        }
        self.current = 0;
        self.state.reset();
        Ok(())
    }
}
