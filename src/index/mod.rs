//! Index-assisted random access to BGEN files
//!
//! An index is a SQLite database built out-of-band (for example by `bgenix`)
//! with one row per variant:
//!
//! ```text
//! Variant(chromosome TEXT, position INT, rsid TEXT, number_of_alleles INT,
//!         allele1 TEXT, allele2 TEXT, file_start_position INT, size_in_bytes INT)
//! ```
//!
//! and optionally a `Metadata` table describing the indexed file. An
//! [`IndexQuery`] selects variants by range and rsid and reports the byte range
//! of each; an [`IndexedBgenReader`] decodes the variants at those ranges.

mod query;
mod reader;

pub use query::{FileMetadata, FileRange, IndexQuery, DEFAULT_TABLE_NAME};
pub use reader::IndexedBgenReader;
