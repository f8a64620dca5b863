//! Chromosomes, genomic positions and inclusive position ranges

use std::{fmt, str::FromStr};

use crate::{error::Result, ArgumentError};

/// A chromosome of the human genome
///
/// Chromosomes are ordered by their one-byte code: autosomes first, then the
/// sex chromosomes, the pseudo-autosomal region, mitochondrial DNA and finally
/// the unknown chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Chromosome {
    /// Autosome 1 to 22
    Autosome(u8),
    X,
    Y,
    /// Pseudo-autosomal region shared by X and Y
    XYPseudoAutosomal,
    Mitochondrial,
    #[default]
    Unknown,
}
impl Chromosome {
    /// Code used by the BGEN v1.0 layout
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Autosome(n) => n,
            Self::X => 23,
            Self::Y => 24,
            Self::XYPseudoAutosomal => 253,
            Self::Mitochondrial => 254,
            Self::Unknown => 255,
        }
    }

    /// Decodes a BGEN v1.0 chromosome code; unrecognised codes map to `Unknown`
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            1..=22 => Self::Autosome(code),
            23 => Self::X,
            24 => Self::Y,
            253 => Self::XYPseudoAutosomal,
            254 => Self::Mitochondrial,
            _ => Self::Unknown,
        }
    }
}
impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Autosome(n) => write!(f, "{n:02}"),
            Self::X => f.write_str("X"),
            Self::Y => f.write_str("Y"),
            Self::XYPseudoAutosomal => f.write_str("XY"),
            Self::Mitochondrial => f.write_str("MT"),
            Self::Unknown => f.write_str("NA"),
        }
    }
}
impl FromStr for Chromosome {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let name = trimmed
            .strip_prefix("chr")
            .or_else(|| trimmed.strip_prefix("Chr"))
            .unwrap_or(trimmed);
        let chromosome = match name {
            "" | "NA" | "---" | "?" => Self::Unknown,
            "X" | "x" | "23" => Self::X,
            "Y" | "y" | "24" => Self::Y,
            "XY" | "xy" | "25" | "X_PAR" => Self::XYPseudoAutosomal,
            "MT" | "M" | "mt" | "26" => Self::Mitochondrial,
            digits => match digits.parse::<u8>() {
                Ok(n @ 1..=22) => Self::Autosome(n),
                _ => return Err(ArgumentError::InvalidChromosome(s.to_string()).into()),
            },
        };
        Ok(chromosome)
    }
}

/// A 1-based coordinate on a chromosome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GenomePosition {
    /// Compared first
    pub chromosome: Chromosome,
    pub position: u32,
}
impl GenomePosition {
    #[must_use]
    pub fn new(chromosome: Chromosome, position: u32) -> Self {
        Self {
            chromosome,
            position,
        }
    }
}
impl fmt::Display for GenomePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chromosome, self.position)
    }
}

/// An inclusive range of genome positions
///
/// A range either lies on a single chromosome, or has no chromosome and
/// matches the coordinate range on every chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenomePositionRange {
    start: GenomePosition,
    end: GenomePosition,
    has_chromosome: bool,
}
impl GenomePositionRange {
    /// Creates a range on a single chromosome
    pub fn new(chromosome: Chromosome, start: u32, end: u32) -> Result<Self> {
        Self::between(
            GenomePosition::new(chromosome, start),
            GenomePosition::new(chromosome, end),
        )
    }

    /// Creates a range between two positions on the same chromosome
    pub fn between(start: GenomePosition, end: GenomePosition) -> Result<Self> {
        if start.chromosome != end.chromosome || end < start {
            return Err(ArgumentError::InvalidRange(format!("{start}-{end}")).into());
        }
        Ok(Self {
            start,
            end,
            has_chromosome: true,
        })
    }

    /// Creates a range matching the coordinates on any chromosome
    pub fn any_chromosome(start: u32, end: u32) -> Result<Self> {
        if end < start {
            return Err(ArgumentError::InvalidRange(format!("{start}-{end}")).into());
        }
        Ok(Self {
            start: GenomePosition::new(Chromosome::Unknown, start),
            end: GenomePosition::new(Chromosome::Unknown, end),
            has_chromosome: false,
        })
    }

    /// A range holding exactly one position
    #[must_use]
    pub fn single(position: GenomePosition) -> Self {
        Self {
            start: position,
            end: position,
            has_chromosome: true,
        }
    }

    /// Parses `"chr:start-end"`, `"chr:start-"`, `"chr:-end"` or `"start-end"`
    ///
    /// A missing bound extends to the smallest or largest coordinate.
    ///
    /// # Examples
    ///
    /// ```
    /// # use genfile::{Chromosome, GenomePositionRange};
    /// let range: GenomePositionRange = "02:1000-2000".parse().unwrap();
    /// assert_eq!(range.start().chromosome, Chromosome::Autosome(2));
    /// assert_eq!(range.end().position, 2000);
    /// ```
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = || ArgumentError::InvalidRange(spec.to_string());
        let (chromosome, coordinates) = match spec.split_once(':') {
            Some((chromosome, coordinates)) => {
                (Some(chromosome.trim().parse::<Chromosome>()?), coordinates.trim())
            }
            None => (None, spec.trim()),
        };
        let (start, end) = coordinates.split_once('-').ok_or_else(invalid)?;
        let parse_bound = |bound: &str, default: u32| -> Result<u32> {
            if bound.is_empty() {
                Ok(default)
            } else {
                bound.parse::<u32>().map_err(|_| invalid().into())
            }
        };
        let start = parse_bound(start.trim(), 0)?;
        let end = parse_bound(end.trim(), u32::MAX)?;
        match chromosome {
            Some(chromosome) => Self::new(chromosome, start, end),
            None => Self::any_chromosome(start, end),
        }
    }

    #[must_use]
    pub fn start(&self) -> GenomePosition {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> GenomePosition {
        self.end
    }

    #[must_use]
    pub fn has_chromosome(&self) -> bool {
        self.has_chromosome
    }

    /// Whether the position lies within the range (bounds included)
    #[must_use]
    pub fn contains(&self, position: &GenomePosition) -> bool {
        if self.has_chromosome {
            self.start <= *position && *position <= self.end
        } else {
            self.start.position <= position.position && position.position <= self.end.position
        }
    }
}
impl FromStr for GenomePositionRange {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
impl fmt::Display for GenomePositionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_chromosome {
            write!(f, "{}:", self.start.chromosome)?;
        }
        write!(f, "{}-{}", self.start.position, self.end.position)
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_chromosome_order() {
        let ordered = [
            Chromosome::Autosome(1),
            Chromosome::Autosome(2),
            Chromosome::Autosome(22),
            Chromosome::X,
            Chromosome::Y,
            Chromosome::XYPseudoAutosomal,
            Chromosome::Mitochondrial,
            Chromosome::Unknown,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{} < {}", pair[0], pair[1]);
            assert!(pair[0].code() < pair[1].code());
        }
    }

    #[test]
    fn test_chromosome_codes() {
        for code in 0..=u8::MAX {
            let chromosome = Chromosome::from_code(code);
            if matches!(code, 1..=24 | 253..=255) {
                assert_eq!(chromosome.code(), code);
            } else {
                assert_eq!(chromosome, Chromosome::Unknown);
            }
        }
    }

    #[test]
    fn test_chromosome_names() -> Result<()> {
        assert_eq!("1".parse::<Chromosome>()?, Chromosome::Autosome(1));
        assert_eq!("01".parse::<Chromosome>()?, Chromosome::Autosome(1));
        assert_eq!("chr22".parse::<Chromosome>()?, Chromosome::Autosome(22));
        assert_eq!("X".parse::<Chromosome>()?, Chromosome::X);
        assert_eq!("MT".parse::<Chromosome>()?, Chromosome::Mitochondrial);
        assert_eq!("NA".parse::<Chromosome>()?, Chromosome::Unknown);
        assert!("23andMe".parse::<Chromosome>().is_err());
        assert!("0".parse::<Chromosome>().is_err());

        for chromosome in [
            Chromosome::Autosome(7),
            Chromosome::X,
            Chromosome::XYPseudoAutosomal,
            Chromosome::Mitochondrial,
            Chromosome::Unknown,
        ] {
            assert_eq!(chromosome.to_string().parse::<Chromosome>()?, chromosome);
        }
        Ok(())
    }

    #[test]
    fn test_position_order_is_lexicographic() {
        let a = GenomePosition::new(Chromosome::Autosome(1), 5_000_000);
        let b = GenomePosition::new(Chromosome::Autosome(2), 10);
        let c = GenomePosition::new(Chromosome::Autosome(2), 11);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_range_parse() -> Result<()> {
        let range = GenomePositionRange::parse("03:100-200")?;
        assert_eq!(range.start(), GenomePosition::new(Chromosome::Autosome(3), 100));
        assert_eq!(range.end(), GenomePosition::new(Chromosome::Autosome(3), 200));

        let open_end = GenomePositionRange::parse("X:100-")?;
        assert_eq!(open_end.end().position, u32::MAX);

        let open_start = GenomePositionRange::parse("X:-100")?;
        assert_eq!(open_start.start().position, 0);

        let anywhere = GenomePositionRange::parse("10-20")?;
        assert!(!anywhere.has_chromosome());
        assert!(anywhere.contains(&GenomePosition::new(Chromosome::Y, 15)));

        assert!(GenomePositionRange::parse("03:200-100").is_err());
        assert!(GenomePositionRange::parse("03:200").is_err());
        assert!(GenomePositionRange::parse("03:a-b").is_err());
        Ok(())
    }

    #[test]
    fn test_range_contains_bounds() -> Result<()> {
        let range = GenomePositionRange::new(Chromosome::Autosome(4), 10, 20)?;
        assert!(range.contains(&GenomePosition::new(Chromosome::Autosome(4), 10)));
        assert!(range.contains(&GenomePosition::new(Chromosome::Autosome(4), 20)));
        assert!(!range.contains(&GenomePosition::new(Chromosome::Autosome(4), 21)));
        assert!(!range.contains(&GenomePosition::new(Chromosome::Autosome(5), 15)));
        Ok(())
    }
}
