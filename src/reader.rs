//! Per-variant access to decoded genotype data
//!
//! A [`VariantDataReader`] is handed out once per variant by
//! [`SnpDataSource::read_variant_data`](crate::SnpDataSource::read_variant_data).
//! Callers either take the decoded [`SampleProbabilities`] directly, or request
//! a named spec and receive the values through a [`PerSampleSetter`].

use crate::{error::Result, ArgumentError, GenotypeProbabilities, SampleProbabilities};

/// Genotype probabilities, one per unphased genotype of each sample
pub const GENOTYPE_PROBABILITIES: &str = "GP";

/// Haplotype probabilities, one per allele of each haplotype of each sample
pub const HAPLOTYPE_PROBABILITIES: &str = "HP";

/// The stored probabilities, whichever kind the variant carries
pub const GENOTYPES: &str = ":genotypes:";

const UNPHASED_SPECS: &[(&str, &str)] = &[(GENOTYPE_PROBABILITIES, "Float"), (GENOTYPES, "Float")];
const PHASED_SPECS: &[(&str, &str)] = &[(HAPLOTYPE_PROBABILITIES, "Float"), (GENOTYPES, "Float")];

/// Visitor receiving per-sample values from a [`VariantDataReader`]
///
/// Calls arrive in the order `initialise`, then for each sample `set_sample`
/// followed (if it returned `true`) by `set_number_of_entries` and one
/// `set_value` or `set_missing_value` per entry, then `finalise`.
pub trait PerSampleSetter {
    /// Called once before any sample
    fn initialise(&mut self, number_of_samples: usize, number_of_alleles: usize);

    /// Moves to a sample; returning `false` skips its values
    fn set_sample(&mut self, sample: usize) -> bool;

    fn set_number_of_entries(&mut self, ploidy: usize, number_of_entries: usize);

    fn set_value(&mut self, entry: usize, value: f64);

    /// Called instead of `set_value` for every entry of a missing sample
    fn set_missing_value(&mut self, _entry: usize) {}

    /// Called once after the last sample
    fn finalise(&mut self) {}
}

/// The decoded genotype data of a single variant
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDataReader {
    data: SampleProbabilities,
}
impl VariantDataReader {
    #[must_use]
    pub fn new(data: SampleProbabilities) -> Self {
        Self { data }
    }

    /// Whether `spec` can be passed to [`get`](Self::get)
    #[must_use]
    pub fn supports(&self, spec: &str) -> bool {
        self.supported_specs().iter().any(|(name, _)| *name == spec)
    }

    /// The supported specs, each with the type of its values
    ///
    /// Phased data is offered as haplotype probabilities, unphased data as
    /// genotype probabilities.
    #[must_use]
    pub fn supported_specs(&self) -> &'static [(&'static str, &'static str)] {
        if self.data.is_phased() {
            PHASED_SPECS
        } else {
            UNPHASED_SPECS
        }
    }

    #[must_use]
    pub fn number_of_samples(&self) -> usize {
        self.data.number_of_samples()
    }

    #[must_use]
    pub fn number_of_alleles(&self) -> usize {
        self.data.number_of_alleles()
    }

    /// Feeds the values of `spec` to `setter`
    ///
    /// # Errors
    ///
    /// `ArgumentError::UnsupportedSpec` if the reader does not carry `spec`. No
    /// setter method is called in that case.
    pub fn get<S: PerSampleSetter + ?Sized>(&self, spec: &str, setter: &mut S) -> Result<&Self> {
        if !self.supports(spec) {
            return Err(ArgumentError::UnsupportedSpec(spec.to_string()).into());
        }
        setter.initialise(self.data.number_of_samples(), self.data.number_of_alleles());
        for sample in 0..self.data.number_of_samples() {
            if !setter.set_sample(sample) {
                continue;
            }
            let values = self.data.values(sample);
            setter.set_number_of_entries(usize::from(self.data.ploidy(sample)), values.len());
            if self.data.is_missing(sample) {
                (0..values.len()).for_each(|entry| setter.set_missing_value(entry));
            } else {
                for (entry, &value) in values.iter().enumerate() {
                    setter.set_value(entry, value);
                }
            }
        }
        setter.finalise();
        Ok(self)
    }

    #[must_use]
    pub fn data(&self) -> &SampleProbabilities {
        &self.data
    }

    /// The data as one `[AA, AB, BB]` triplet per sample
    ///
    /// # Errors
    ///
    /// `ReadError::UnsupportedGenotypeShape` if a sample has no such triplet.
    pub fn to_genotype_probabilities(&self) -> Result<GenotypeProbabilities> {
        self.data.to_genotype_probabilities()
    }

    /// Same as [`to_genotype_probabilities`](Self::to_genotype_probabilities)
    ///
    /// # Errors
    ///
    /// `ReadError::UnsupportedGenotypeShape` if a sample has no such triplet.
    pub fn into_probabilities(self) -> Result<GenotypeProbabilities> {
        self.data.to_genotype_probabilities()
    }

    #[must_use]
    pub fn into_data(self) -> SampleProbabilities {
        self.data
    }
}
impl From<GenotypeProbabilities> for VariantDataReader {
    fn from(probabilities: GenotypeProbabilities) -> Self {
        Self::new(SampleProbabilities::from(&probabilities))
    }
}
