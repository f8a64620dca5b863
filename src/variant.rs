use std::fmt;

use crate::{Chromosome, GenomePosition};

/// Identifying data of a single variant
///
/// This is the identifiers, position and alleles of a variant, without any of
/// its per-sample data. Values are immutable once built; equality compares
/// every field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantIdentifyingData {
    snpid: String,
    rsid: String,
    position: GenomePosition,
    alleles: Vec<String>,
}
impl VariantIdentifyingData {
    /// Creates identifying data for a variant
    ///
    /// # Panics
    ///
    /// If fewer than two alleles are supplied.
    #[must_use]
    pub fn new(
        snpid: impl Into<String>,
        rsid: impl Into<String>,
        position: GenomePosition,
        alleles: Vec<String>,
    ) -> Self {
        assert!(
            alleles.len() >= 2,
            "a variant needs at least two alleles, got {}",
            alleles.len()
        );
        Self {
            snpid: snpid.into(),
            rsid: rsid.into(),
            position,
            alleles,
        }
    }

    /// Convenience constructor for the common biallelic case
    #[must_use]
    pub fn biallelic(
        snpid: impl Into<String>,
        rsid: impl Into<String>,
        position: GenomePosition,
        first_allele: impl Into<String>,
        second_allele: impl Into<String>,
    ) -> Self {
        Self::new(
            snpid,
            rsid,
            position,
            vec![first_allele.into(), second_allele.into()],
        )
    }

    #[must_use]
    pub fn snpid(&self) -> &str {
        &self.snpid
    }

    #[must_use]
    pub fn rsid(&self) -> &str {
        &self.rsid
    }

    #[must_use]
    pub fn position(&self) -> GenomePosition {
        self.position
    }

    #[must_use]
    pub fn chromosome(&self) -> Chromosome {
        self.position.chromosome
    }

    #[must_use]
    pub fn alleles(&self) -> &[String] {
        &self.alleles
    }

    #[must_use]
    pub fn first_allele(&self) -> &str {
        &self.alleles[0]
    }

    #[must_use]
    pub fn second_allele(&self) -> &str {
        &self.alleles[1]
    }

    #[must_use]
    pub fn number_of_alleles(&self) -> usize {
        self.alleles.len()
    }
}
impl fmt::Display for VariantIdentifyingData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.snpid, self.rsid, self.position)?;
        for allele in &self.alleles {
            write!(f, " {allele}")?;
        }
        Ok(())
    }
}
