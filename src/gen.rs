//! GEN text format
//!
//! One variant per line, whitespace separated:
//!
//! ```text
//! [chromosome] SNPID RSID position allele1 allele2 AA AB BB AA AB BB ...
//! ```
//!
//! The chromosome column is optional but must be used consistently throughout a
//! file; its presence is inferred from the token count of the first line.

use std::io::Write;

use crate::{
    error::Result, Chromosome, GenomePosition, GenotypeProbabilities, ReadError,
    VariantIdentifyingData,
};

/// Number of identifying columns when no chromosome column is present
const IDENTIFYING_COLUMNS: usize = 5;

/// Shape of a GEN file, inferred from its first line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenShape {
    /// Whether each line starts with a chromosome column
    pub has_chromosome_column: bool,
    /// Number of probability triplets per line
    pub number_of_samples: u32,
}
impl GenShape {
    /// Infers the shape from the number of tokens on a line
    ///
    /// `(n - 5) % 3 == 0` means no chromosome column and `(n - 6) % 3 == 0` means one is present.
    pub fn from_token_count(count: usize, line: usize) -> Result<Self> {
        let malformed = |reason: String| ReadError::MalformedLine { line, reason };
        if count < IDENTIFYING_COLUMNS {
            return Err(malformed(format!("expected at least 5 columns, found {count}")).into());
        }
        let (has_chromosome_column, probabilities) = if (count - IDENTIFYING_COLUMNS) % 3 == 0 {
            (false, count - IDENTIFYING_COLUMNS)
        } else if (count - IDENTIFYING_COLUMNS - 1) % 3 == 0 {
            (true, count - IDENTIFYING_COLUMNS - 1)
        } else {
            return Err(malformed(format!(
                "{count} columns fit neither 5 + 3n nor 6 + 3n"
            ))
            .into());
        };
        let number_of_samples = u32::try_from(probabilities / 3)
            .map_err(|_| malformed(format!("too many columns ({count})")))?;
        Ok(Self {
            has_chromosome_column,
            number_of_samples,
        })
    }

    /// Infers the shape from a full line of text
    pub fn from_line(text: &str, line: usize) -> Result<Self> {
        Self::from_token_count(text.split_whitespace().count(), line)
    }
}

/// Parses one GEN line
///
/// # Arguments
///
/// * `text` - The line, without its terminator
/// * `line` - 1-based line number, used in errors
/// * `shape` - The shape of the file
/// * `default_chromosome` - Chromosome given to variants when the file has no chromosome column
pub fn parse_line(
    text: &str,
    line: usize,
    shape: GenShape,
    default_chromosome: Chromosome,
) -> Result<(VariantIdentifyingData, GenotypeProbabilities)> {
    let malformed = |reason: String| ReadError::MalformedLine { line, reason };
    let mut tokens = text.split_whitespace();
    let mut next = |name: &str| {
        tokens
            .next()
            .ok_or_else(|| malformed(format!("missing {name} column")))
    };

    let chromosome = if shape.has_chromosome_column {
        next("chromosome")?.parse()?
    } else {
        default_chromosome
    };
    let snpid = next("SNPID")?.to_string();
    let rsid = next("RSID")?.to_string();
    let position_text = next("position")?;
    let position = position_text
        .parse::<u32>()
        .map_err(|_| malformed(format!("invalid position {position_text:?}")))?;
    let first_allele = next("allele1")?.to_string();
    let second_allele = next("allele2")?.to_string();

    let values = tokens
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| malformed(format!("invalid probability {token:?}")))
        })
        .collect::<std::result::Result<Vec<f64>, _>>()?;
    if values.len() % 3 != 0 {
        return Err(malformed(format!(
            "number of probabilities ({}) is not a multiple of 3",
            values.len()
        ))
        .into());
    }
    if values.len() / 3 != shape.number_of_samples as usize {
        return Err(malformed(format!(
            "found {} samples, expected {}",
            values.len() / 3,
            shape.number_of_samples
        ))
        .into());
    }
    let probabilities = values
        .chunks_exact(3)
        .map(|triplet| [triplet[0], triplet[1], triplet[2]])
        .collect();

    let variant = VariantIdentifyingData::biallelic(
        snpid,
        rsid,
        GenomePosition::new(chromosome, position),
        first_allele,
        second_allele,
    );
    Ok((variant, probabilities))
}

/// Writes one GEN line, including its newline
pub fn write_line<W: Write>(
    writer: &mut W,
    variant: &VariantIdentifyingData,
    probabilities: &GenotypeProbabilities,
    with_chromosome_column: bool,
) -> Result<()> {
    if with_chromosome_column {
        write!(writer, "{} ", variant.chromosome())?;
    }
    let mut position = itoa::Buffer::new();
    write!(
        writer,
        "{} {} {} {} {}",
        variant.snpid(),
        variant.rsid(),
        position.format(variant.position().position),
        variant.first_allele(),
        variant.second_allele()
    )?;
    for entry in probabilities {
        for value in entry {
            write!(writer, " {value}")?;
        }
    }
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod testing {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_shape_inference() -> Result<()> {
        let without = GenShape::from_token_count(5 + 3 * 4, 1)?;
        assert!(!without.has_chromosome_column);
        assert_eq!(without.number_of_samples, 4);

        let with = GenShape::from_token_count(6 + 3 * 4, 1)?;
        assert!(with.has_chromosome_column);
        assert_eq!(with.number_of_samples, 4);

        let no_samples = GenShape::from_token_count(5, 1)?;
        assert_eq!(no_samples.number_of_samples, 0);

        assert!(GenShape::from_token_count(4, 1).is_err());
        assert!(GenShape::from_token_count(7, 1).is_err());
        Ok(())
    }

    #[test]
    fn test_parse_without_chromosome() -> Result<()> {
        let text = "SNP1 rs1 1000 A G 1 0 0 0 0.5 0.5";
        let shape = GenShape::from_line(text, 1)?;
        let (variant, probabilities) = parse_line(text, 1, shape, Chromosome::Autosome(3))?;
        assert_eq!(variant.chromosome(), Chromosome::Autosome(3));
        assert_eq!(variant.snpid(), "SNP1");
        assert_eq!(variant.position().position, 1000);
        assert_eq!(probabilities.number_of_samples(), 2);
        assert_eq!(probabilities[1], [0.0, 0.5, 0.5]);
        Ok(())
    }

    #[test]
    fn test_parse_with_chromosome() -> Result<()> {
        let text = "X SNP1 rs1 1000 A G 0.1 0.2 0.7";
        let shape = GenShape::from_line(text, 1)?;
        let (variant, probabilities) = parse_line(text, 1, shape, Chromosome::Unknown)?;
        assert_eq!(variant.chromosome(), Chromosome::X);
        assert_eq!(probabilities[0], [0.1, 0.2, 0.7]);
        Ok(())
    }

    #[test]
    fn test_parse_errors() -> Result<()> {
        let shape = GenShape::from_line("SNP1 rs1 1000 A G 1 0 0", 1)?;
        // an extra probability makes the count not a multiple of three
        assert!(parse_line("SNP1 rs1 1000 A G 1 0 0 1", 2, shape, Chromosome::Unknown).is_err());
        let six = parse_line("SNP1 rs1 1000 A G 1 0 0 1 0 0", 2, shape, Chromosome::Unknown);
        assert!(six.is_err());
        assert!(parse_line("SNP1 rs1 pos A G 1 0 0", 2, shape, Chromosome::Unknown).is_err());
        assert!(parse_line("SNP1 rs1 1000 A G 1 x 0", 2, shape, Chromosome::Unknown).is_err());
        assert!(parse_line("SNP1 rs1", 2, shape, Chromosome::Unknown).is_err());
        Ok(())
    }

    #[test]
    fn test_write_then_parse() -> Result<()> {
        let variant = VariantIdentifyingData::biallelic(
            "SNP1",
            "rs1",
            GenomePosition::new(Chromosome::Autosome(12), 123_456),
            "A",
            "GT",
        );
        let probabilities = GenotypeProbabilities::from(vec![[0.1, 0.2, 0.7], [1.0, 0.0, 0.0]]);
        let mut buffer = Vec::new();
        write_line(&mut buffer, &variant, &probabilities, true)?;
        let text = String::from_utf8(buffer)?;
        assert_eq!(text, "12 SNP1 rs1 123456 A GT 0.1 0.2 0.7 1 0 0\n");

        let shape = GenShape::from_line(text.trim_end(), 1)?;
        let (read_variant, read_probabilities) =
            parse_line(text.trim_end(), 1, shape, Chromosome::Unknown)?;
        assert_eq!(read_variant, variant);
        assert_eq!(read_probabilities, probabilities);
        Ok(())
    }
}
