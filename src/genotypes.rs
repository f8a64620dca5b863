use std::ops::Index;

use crate::{error::Result, ReadError};

/// Genotype-class probabilities for every sample at one variant
///
/// Each entry holds the probabilities of the AA, AB and BB genotypes of one
/// sample, in sample order. A sample with all three entries at zero is
/// treated as missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenotypeProbabilities {
    entries: Vec<[f64; 3]>,
}
impl GenotypeProbabilities {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(number_of_samples: usize) -> Self {
        Self {
            entries: Vec::with_capacity(number_of_samples),
        }
    }

    /// Builds the probabilities from `(AA, AB, BB)` getters indexed by sample
    pub fn from_fn<F>(number_of_samples: usize, mut get: F) -> Self
    where
        F: FnMut(usize) -> [f64; 3],
    {
        Self {
            entries: (0..number_of_samples).map(&mut get).collect(),
        }
    }

    pub fn push(&mut self, aa: f64, ab: f64, bb: f64) {
        self.entries.push([aa, ab, bb]);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn number_of_samples(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, sample: usize) -> Option<&[f64; 3]> {
        self.entries.get(sample)
    }

    #[must_use]
    pub fn is_missing(&self, sample: usize) -> bool {
        self.entries
            .get(sample)
            .is_none_or(|entry| entry.iter().all(|&p| p == 0.0))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, [f64; 3]> {
        self.entries.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[[f64; 3]] {
        &self.entries
    }
}
impl Index<usize> for GenotypeProbabilities {
    type Output = [f64; 3];

    fn index(&self, sample: usize) -> &Self::Output {
        &self.entries[sample]
    }
}
impl From<Vec<[f64; 3]>> for GenotypeProbabilities {
    fn from(entries: Vec<[f64; 3]>) -> Self {
        Self { entries }
    }
}
impl FromIterator<[f64; 3]> for GenotypeProbabilities {
    fn from_iter<I: IntoIterator<Item = [f64; 3]>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
impl<'a> IntoIterator for &'a GenotypeProbabilities {
    type Item = &'a [f64; 3];
    type IntoIter = std::slice::Iter<'a, [f64; 3]>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Number of values describing one sample
///
/// Unphased data holds one probability per unordered genotype, that is
/// `C(ploidy + alleles - 1, alleles - 1)` values. Phased data holds one
/// probability per allele for each haplotype. `None` if the count overflows.
#[must_use]
pub fn number_of_entries(ploidy: u8, number_of_alleles: usize, phased: bool) -> Option<usize> {
    if phased {
        return usize::from(ploidy).checked_mul(number_of_alleles);
    }
    let mut count = 1usize;
    for i in 1..=usize::from(ploidy) {
        count = count.checked_mul(number_of_alleles.saturating_sub(1) + i)? / i;
    }
    Some(count)
}

/// Per-sample probabilities of any ploidy, allele count and phasing
///
/// This is the general form of the data a BGEN v1.2 record carries. Unphased
/// samples list genotype probabilities in colex order of the allele counts
/// (for two alleles and ploidy two: AA, AB, BB). Phased samples list the
/// allele probabilities of each haplotype in turn. Missing samples hold zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleProbabilities {
    number_of_alleles: usize,
    phased: bool,
    ploidy: Vec<u8>,
    missing: Vec<bool>,
    /// Start of each sample's values, plus the end of the last one
    offsets: Vec<usize>,
    values: Vec<f64>,
}
impl SampleProbabilities {
    /// # Panics
    ///
    /// If fewer than two alleles are given.
    #[must_use]
    pub fn new(number_of_alleles: usize, phased: bool) -> Self {
        assert!(
            number_of_alleles >= 2,
            "probabilities need at least two alleles, got {number_of_alleles}"
        );
        Self {
            number_of_alleles,
            phased,
            ploidy: Vec::new(),
            missing: Vec::new(),
            offsets: vec![0],
            values: Vec::new(),
        }
    }

    /// Appends a sample
    ///
    /// # Panics
    ///
    /// If `values` does not hold [`number_of_entries`] values for `ploidy`.
    pub fn push_sample(&mut self, ploidy: u8, values: &[f64]) {
        assert_eq!(
            Some(values.len()),
            number_of_entries(ploidy, self.number_of_alleles, self.phased),
            "wrong number of values for ploidy {ploidy}"
        );
        self.push_decoded(ploidy, false, values);
    }

    /// Appends a sample whose values are missing
    pub fn push_missing(&mut self, ploidy: u8) {
        let len = number_of_entries(ploidy, self.number_of_alleles, self.phased).unwrap_or(0);
        self.ploidy.push(ploidy);
        self.missing.push(true);
        self.values.resize(self.values.len() + len, 0.0);
        self.offsets.push(self.values.len());
    }

    /// Appends a decoded sample without checking its number of values
    pub(crate) fn push_decoded(&mut self, ploidy: u8, missing: bool, values: &[f64]) {
        self.ploidy.push(ploidy);
        self.missing.push(missing);
        self.values.extend_from_slice(values);
        self.offsets.push(self.values.len());
    }

    #[must_use]
    pub fn number_of_samples(&self) -> usize {
        self.ploidy.len()
    }

    #[must_use]
    pub fn number_of_alleles(&self) -> usize {
        self.number_of_alleles
    }

    #[must_use]
    pub fn is_phased(&self) -> bool {
        self.phased
    }

    #[must_use]
    pub fn ploidy(&self, sample: usize) -> u8 {
        self.ploidy[sample]
    }

    #[must_use]
    pub fn is_missing(&self, sample: usize) -> bool {
        self.missing[sample]
    }

    #[must_use]
    pub fn values(&self, sample: usize) -> &[f64] {
        &self.values[self.offsets[sample]..self.offsets[sample + 1]]
    }

    /// Smallest and largest ploidy over all samples, `(0, 0)` if there are none
    #[must_use]
    pub fn ploidy_range(&self) -> (u8, u8) {
        let min = self.ploidy.iter().min().copied().unwrap_or(0);
        let max = self.ploidy.iter().max().copied().unwrap_or(0);
        (min, max)
    }

    /// Collapses the data to `[AA, AB, BB]` triplets
    ///
    /// Diploid phased samples combine their haplotypes, and haploid samples are
    /// reported as `[A, 0, B]`. Missing samples become `[0, 0, 0]`.
    ///
    /// # Errors
    ///
    /// `ReadError::UnsupportedGenotypeShape` for variants with more than two
    /// alleles, or samples with a ploidy above two.
    pub fn to_genotype_probabilities(&self) -> Result<GenotypeProbabilities> {
        let mut probabilities = GenotypeProbabilities::with_capacity(self.number_of_samples());
        for sample in 0..self.number_of_samples() {
            let ploidy = self.ploidy[sample];
            if self.number_of_alleles != 2 || ploidy > 2 {
                return Err(ReadError::UnsupportedGenotypeShape {
                    sample,
                    ploidy,
                    alleles: self.number_of_alleles,
                }
                .into());
            }
            let entry = match (self.missing[sample], self.values(sample)) {
                (true, _) | (false, [] | [_]) => [0.0; 3],
                (false, &[a, b]) => [a, 0.0, b],
                (false, &[a1, b1, a2, b2]) if self.phased => {
                    [a1 * a2, a1 * b2 + b1 * a2, b1 * b2]
                }
                (false, &[aa, ab, bb]) => [aa, ab, bb],
                (false, values) => unreachable!("{} values for ploidy {ploidy}", values.len()),
            };
            probabilities.push(entry[0], entry[1], entry[2]);
        }
        Ok(probabilities)
    }
}
impl From<&GenotypeProbabilities> for SampleProbabilities {
    /// Unphased diploid data; samples with all-zero probabilities are missing
    fn from(probabilities: &GenotypeProbabilities) -> Self {
        let mut data = Self::new(2, false);
        for (sample, entry) in probabilities.iter().enumerate() {
            if probabilities.is_missing(sample) {
                data.push_missing(2);
            } else {
                data.push_sample(2, entry);
            }
        }
        data
    }
}
