use std::path::Path;

use super::SnpDataSink;
use crate::{
    error::Result,
    gen::write_line,
    stream::{FinishWrite, OutputStream},
    GenotypeProbabilities, VariantIdentifyingData, WriteError,
};

/// A sink writing GEN text, one line per variant
///
/// Lines start with a chromosome column unless disabled with
/// [`with_chromosome_column`](Self::with_chromosome_column).
pub struct GenSink<W: FinishWrite> {
    inner: W,
    number_of_samples: u32,
    with_chromosome_column: bool,
    number_of_snps_written: u64,
    closed: bool,
    spec: String,
}
impl GenSink<OutputStream> {
    /// Creates the file at `path`, gzip-compressed if its name ends in `.gz`
    pub fn create<P: AsRef<Path>>(path: P, number_of_samples: u32) -> Result<Self> {
        let path = path.as_ref();
        let mut sink = Self::new(OutputStream::create(path)?, number_of_samples);
        sink.spec = path.display().to_string();
        Ok(sink)
    }
}
impl<W: FinishWrite> GenSink<W> {
    pub fn new(inner: W, number_of_samples: u32) -> Self {
        Self {
            inner,
            number_of_samples,
            with_chromosome_column: true,
            number_of_snps_written: 0,
            closed: false,
            spec: "(stream)".to_string(),
        }
    }

    #[must_use]
    pub fn with_chromosome_column(mut self, with_chromosome_column: bool) -> Self {
        self.with_chromosome_column = with_chromosome_column;
        self
    }

    /// Closes the sink and returns the underlying writer
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?;
        Ok(self.inner)
    }
}
impl<W: FinishWrite> SnpDataSink for GenSink<W> {
    fn number_of_samples(&self) -> u32 {
        self.number_of_samples
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
        assert!(!self.closed, "write to a closed GEN sink");
        if probabilities.number_of_samples() != self.number_of_samples as usize {
            return Err(WriteError::SampleCountMismatch {
                expected: self.number_of_samples,
                got: probabilities.number_of_samples() as u32,
            }
            .into());
        }
        write_line(
            &mut self.inner,
            variant,
            probabilities,
            self.with_chromosome_column,
        )?;
        self.number_of_snps_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.inner.finish_write()?;
            self.closed = true;
        }
        Ok(())
    }
}
