use std::{io::BufRead, path::Path, sync::Arc};

use log::debug;

use super::{ReadState, SnpDataSource, StreamState};
use crate::{
    error::Result,
    gen::{parse_line, GenShape},
    stream::InputStream,
    Chromosome, GenotypeProbabilities, ReadError, VariantDataReader, VariantIdentifyingData,
};

/// A source reading a GEN text file, plain or gzip-compressed
///
/// The file is scanned once when opened to infer its shape from the first line
/// and to count its variants. Blank lines are skipped.
#[derive(Debug)]
pub struct GenSource {
    stream: InputStream,
    shape: GenShape,
    /// Assigned to variants when the file has no chromosome column
    chromosome: Chromosome,
    number_of_snps: u64,
    /// Reusable line buffer
    line: String,
    line_number: usize,
    /// Probabilities of the variant whose identifying data was last read
    pending: Option<GenotypeProbabilities>,
    state: StreamState,
}
impl GenSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(InputStream::open(path)?)
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        Self::new(InputStream::from_bytes(bytes))
    }

    /// Infers the shape of the file and counts its variants
    ///
    /// # Errors
    ///
    /// `ReadError::EmptyFile` if the stream holds no variants, or
    /// `ReadError::MalformedLine` if the first line fits no GEN shape.
    pub fn new(mut stream: InputStream) -> Result<Self> {
        let mut shape = None;
        let mut number_of_snps = 0u64;
        let mut line = String::new();
        let mut line_number = 0;
        loop {
            line.clear();
            if stream.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            if shape.is_none() {
                shape = Some(GenShape::from_line(&line, line_number)?);
            }
            number_of_snps += 1;
        }
        let Some(shape) = shape else {
            return Err(ReadError::EmptyFile.into());
        };
        stream.rewind()?;
        debug!(
            "Opened GEN source {}: {} samples, {} variants, chromosome column: {}",
            stream.spec(),
            shape.number_of_samples,
            number_of_snps,
            shape.has_chromosome_column
        );
        Ok(Self {
            stream,
            shape,
            chromosome: Chromosome::Unknown,
            number_of_snps,
            line,
            line_number: 0,
            pending: None,
            state: StreamState::default(),
        })
    }

    /// Sets the chromosome given to variants when the file has no chromosome column
    #[must_use]
    pub fn with_chromosome(mut self, chromosome: Chromosome) -> Self {
        self.chromosome = chromosome;
        self
    }

    /// Whether lines start with a chromosome column
    #[must_use]
    pub fn has_chromosome_column(&self) -> bool {
        self.shape.has_chromosome_column
    }

    /// Reads the next non-blank line into the line buffer
    fn next_line(&mut self) -> Result<bool> {
        loop {
            self.line.clear();
            if self.stream.read_line(&mut self.line)? == 0 {
                return Ok(false);
            }
            self.line_number += 1;
            if !self.line.trim().is_empty() {
                return Ok(true);
            }
        }
    }

    fn take_pending(&mut self) -> GenotypeProbabilities {
        self.state.expect_probability_data();
        self.pending.take().unwrap_or_default()
    }
}
impl SnpDataSource for GenSource {
    fn number_of_samples(&self) -> u32 {
        self.shape.number_of_samples
    }

    fn total_number_of_snps(&self) -> Option<u64> {
        Some(self.number_of_snps)
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

    fn read_snp_identifying_data(&mut self) -> Result<Option<VariantIdentifyingData>> {
        self.state.expect_new_variant();
        if !self.next_line()? {
            return Ok(None);
        }
        let (variant, probabilities) =
            parse_line(&self.line, self.line_number, self.shape, self.chromosome)?;
        self.pending = Some(probabilities);
        self.state.identifying_data_read();
        Ok(Some(variant))
    }

    fn read_variant_data(&mut self) -> Result<VariantDataReader> {
        let probabilities = self.take_pending();
        self.state.probability_data_read();
        Ok(VariantDataReader::from(probabilities))
    }

    fn ignore_snp_probability_data(&mut self) -> Result<()> {
        self.take_pending();
        self.state.probability_data_read();
        Ok(())
    }

    fn reset_to_start(&mut self) -> Result<()> {
        self.stream.rewind()?;
        self.line_number = 0;
        self.pending = None;
        self.state.reset();
        Ok(())
    }
}
