use std::{
    collections::HashSet,
    fs::File,
    io::{self, Read},
    path::Path,
};

use log::{debug, warn};
use rusqlite::{Connection, OpenFlags, OptionalExtension};

use crate::{error::Result, Chromosome, FileError, GenomePositionRange, IndexError};

/// Default name of the table holding one row per variant
pub const DEFAULT_TABLE_NAME: &str = "Variant";

/// Number of rows between progress reports while a query runs
const PROGRESS_INTERVAL: usize = 1000;

/// Half-open byte range `[start, end)` holding one variant record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileRange {
    pub start: u64,
    pub end: u64,
}
impl FileRange {
    /// Builds a range from the start offset and size stored in an index
    pub fn from_index(start: i64, size: i64) -> Result<Self> {
        match (u64::try_from(start), u64::try_from(size)) {
            (Ok(start), Ok(size)) => Ok(Self {
                start,
                end: start + size,
            }),
            _ => Err(IndexError::InvalidRange { start, size }.into()),
        }
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Description of the indexed file recorded when the index was built
///
/// Compare it against the file on disk with [`matches_file`](Self::matches_file)
/// to detect an index that no longer describes its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub filename: String,
    pub size: u64,
    /// Modification time in seconds since the Unix epoch
    pub last_write_time: i64,
    /// The leading bytes of the file
    pub first_bytes: Vec<u8>,
}
impl FileMetadata {
    /// Whether the file at `path` has the recorded size and leading bytes
    ///
    /// A mismatch is logged as a warning; deciding what to do about it is left
    /// to the caller.
    pub fn matches_file<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FileError::open(path, e))?;
        let size = file.metadata()?.len();
        if size != self.size {
            warn!(
                "Index describes {} as {} bytes but it holds {size}",
                self.filename, self.size
            );
            return Ok(false);
        }
        let mut first_bytes = Vec::with_capacity(self.first_bytes.len());
        file.take(self.first_bytes.len() as u64)
            .read_to_end(&mut first_bytes)?;
        if first_bytes != self.first_bytes {
            warn!("Leading bytes of {} differ from those recorded in its index", path.display());
            return Ok(false);
        }
        Ok(true)
    }
}

/// A query against a bgenix-style SQLite index of a BGEN file
///
/// Predicates are accumulated with the `include_*` and `exclude_*` methods and
/// the query is run by [`initialise`](Self::initialise). A variant is selected
/// if it matches any inclusion (or there are none) and no exclusion, so
/// exclusions always take precedence. Results are ordered by chromosome,
/// position and file offset.
///
/// # Examples
///
/// ```no_run
/// # use genfile::{index::IndexQuery, GenomePositionRange};
/// # fn main() -> genfile::Result<()> {
/// let mut query = IndexQuery::open("example.bgen.bgi")?;
/// query
///     .include_range(&"01:1000-50000".parse()?)
///     .exclude_rsids(&["rs123"]);
/// query.initialise(&mut |_, _| {})?;
/// for i in 0..query.number_of_variants() {
///     let range = query.locate_variant(i);
///     println!("variant {i} occupies bytes {}..{}", range.start, range.end);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct IndexQuery {
    connection: Connection,
    metadata: Option<FileMetadata>,
    table_name: String,
    inclusions: Vec<String>,
    exclusions: Vec<String>,
    positions: Option<Vec<FileRange>>,
}
impl IndexQuery {
    /// Opens an index read-only, querying the `Variant` table
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_table(path, DEFAULT_TABLE_NAME)
    }

    /// Opens an index read-only, querying `table_name`
    ///
    /// # Errors
    ///
    /// * `FileError::Open` - if the index file does not exist
    /// * `IndexError::MissingTable` - if the index has no such table
    /// * `Error::Sqlite` - if the file is not a readable SQLite database
    pub fn open_with_table<P: AsRef<Path>>(path: P, table_name: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FileError::open(path, io::Error::from(io::ErrorKind::NotFound)).into());
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(path, flags)?;
        if !table_exists(&connection, table_name)? {
            return Err(IndexError::MissingTable(table_name.to_string()).into());
        }
        let metadata = load_metadata(&connection)?;
        debug!(
            "Opened index {} (table {table_name}, metadata: {})",
            path.display(),
            metadata.is_some()
        );
        Ok(Self {
            connection,
            metadata,
            table_name: table_name.to_string(),
            inclusions: Vec::new(),
            exclusions: Vec::new(),
            positions: None,
        })
    }

    /// Metadata describing the indexed file, if the index stores it
    #[must_use]
    pub fn file_metadata(&self) -> Option<&FileMetadata> {
        self.metadata.as_ref()
    }

    /// Includes variants in `range`
    ///
    /// # Panics
    ///
    /// If the query has already been initialised.
    pub fn include_range(&mut self, range: &GenomePositionRange) -> &mut Self {
        self.assert_building();
        self.inclusions.push(range_clause(range));
        self
    }

    /// Excludes variants in `range`, even if an inclusion selects them
    ///
    /// # Panics
    ///
    /// If the query has already been initialised.
    pub fn exclude_range(&mut self, range: &GenomePositionRange) -> &mut Self {
        self.assert_building();
        self.exclusions.push(range_clause(range));
        self
    }

    pub fn include_ranges(&mut self, ranges: &[GenomePositionRange]) -> &mut Self {
        for range in ranges {
            self.include_range(range);
        }
        self
    }

    pub fn exclude_ranges(&mut self, ranges: &[GenomePositionRange]) -> &mut Self {
        for range in ranges {
            self.exclude_range(range);
        }
        self
    }

    /// Includes variants with one of the given rsids
    ///
    /// # Panics
    ///
    /// If `rsids` contains duplicates, or the query has already been initialised.
    pub fn include_rsids<S: AsRef<str>>(&mut self, rsids: &[S]) -> &mut Self {
        self.assert_building();
        self.inclusions.push(rsid_clause(rsids));
        self
    }

    /// Excludes variants with one of the given rsids, even if an inclusion selects them
    ///
    /// # Panics
    ///
    /// If `rsids` contains duplicates, or the query has already been initialised.
    pub fn exclude_rsids<S: AsRef<str>>(&mut self, rsids: &[S]) -> &mut Self {
        self.assert_building();
        self.exclusions.push(rsid_clause(rsids));
        self
    }

    fn assert_building(&self) {
        assert!(
            self.positions.is_none(),
            "index query predicates changed after initialise"
        );
    }

    /// The SQL statement implementing the accumulated predicates
    ///
    /// A predicate evaluating to NULL, as `rsid IN (...)` does for a NULL rsid,
    /// counts as not matching.
    #[must_use]
    pub fn sql(&self) -> String {
        let inclusion = if self.inclusions.is_empty() {
            "1".to_string()
        } else {
            self.inclusions.join(" OR ")
        };
        let exclusion = if self.exclusions.is_empty() {
            "0".to_string()
        } else {
            self.exclusions.join(" OR ")
        };
        format!(
            "SELECT file_start_position, size_in_bytes FROM {} \
             WHERE COALESCE(({inclusion}), 0) AND NOT COALESCE(({exclusion}), 0) \
             ORDER BY chromosome, position, file_start_position",
            quote_identifier(&self.table_name)
        )
    }

    /// Runs the query, storing the byte range of every selected variant
    ///
    /// `progress` receives the number of variants found so far; the total is
    /// only reported with the final call.
    pub fn initialise(&mut self, progress: &mut dyn FnMut(usize, Option<usize>)) -> Result<()> {
        let sql = self.sql();
        debug!("Running index query: {sql}");
        let mut statement = self.connection.prepare(&sql)?;
        let mut rows = statement.query([])?;
        let mut positions = Vec::new();
        progress(0, None);
        while let Some(row) = rows.next()? {
            positions.push(FileRange::from_index(row.get(0)?, row.get(1)?)?);
            if positions.len() % PROGRESS_INTERVAL == 0 {
                progress(positions.len(), None);
            }
        }
        progress(positions.len(), Some(positions.len()));
        self.positions = Some(positions);
        Ok(())
    }

    #[must_use]
    pub fn is_initialised(&self) -> bool {
        self.positions.is_some()
    }

    fn positions(&self) -> &[FileRange] {
        match &self.positions {
            Some(positions) => positions,
            None => panic!("index query used before initialise"),
        }
    }

    /// Number of variants selected by the query
    ///
    /// # Panics
    ///
    /// If the query has not been initialised.
    #[must_use]
    pub fn number_of_variants(&self) -> usize {
        self.positions().len()
    }

    /// Byte range of the `index`-th selected variant
    ///
    /// # Panics
    ///
    /// If the query has not been initialised or `index` is out of bounds.
    #[must_use]
    pub fn locate_variant(&self, index: usize) -> FileRange {
        self.positions()[index]
    }

    /// Byte ranges of every selected variant, in query order
    ///
    /// # Panics
    ///
    /// If the query has not been initialised.
    #[must_use]
    pub fn ranges(&self) -> &[FileRange] {
        self.positions()
    }
}

fn table_exists(connection: &Connection, name: &str) -> Result<bool> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
        (name,),
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn load_metadata(connection: &Connection) -> Result<Option<FileMetadata>> {
    if !table_exists(connection, "Metadata")? {
        return Ok(None);
    }
    let metadata = connection
        .query_row(
            "SELECT filename, file_size, last_write_time, first_1000_bytes FROM Metadata LIMIT 1",
            [],
            |row| {
                Ok(FileMetadata {
                    filename: row.get(0)?,
                    size: row.get(1)?,
                    last_write_time: row.get(2)?,
                    first_bytes: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(metadata)
}

/// Spellings under which an index may store a chromosome
fn chromosome_names(chromosome: Chromosome) -> Vec<String> {
    let mut names = vec![chromosome.to_string()];
    match chromosome {
        Chromosome::Autosome(n) => names.push(n.to_string()),
        Chromosome::Mitochondrial => names.push("M".to_string()),
        _ => {}
    }
    names.dedup();
    let prefixed: Vec<String> = names.iter().map(|name| format!("chr{name}")).collect();
    names.extend(prefixed);
    names
}

fn range_clause(range: &GenomePositionRange) -> String {
    let positions = format!(
        "position BETWEEN {} AND {}",
        range.start().position,
        range.end().position
    );
    if range.has_chromosome() {
        let names: Vec<String> = chromosome_names(range.start().chromosome)
            .iter()
            .map(|name| quote_literal(name))
            .collect();
        format!("(chromosome IN ({}) AND {positions})", names.join(", "))
    } else {
        format!("({positions})")
    }
}

fn rsid_clause<S: AsRef<str>>(rsids: &[S]) -> String {
    let mut seen = HashSet::with_capacity(rsids.len());
    for rsid in rsids {
        assert!(
            seen.insert(rsid.as_ref()),
            "duplicate rsid {:?} passed to an index query",
            rsid.as_ref()
        );
    }
    if rsids.is_empty() {
        return "0".to_string();
    }
    let literals: Vec<String> = rsids.iter().map(|rsid| quote_literal(rsid.as_ref())).collect();
    format!("(rsid IN ({}))", literals.join(", "))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn quote_identifier(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}
