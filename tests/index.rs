use std::{fs::File, io::BufWriter, path::Path};

use anyhow::Result;
use genfile::{
    bgen, index::IndexQuery, index::IndexedBgenReader, BgenSinkBuilder, Chromosome,
    GenomePosition, GenotypeProbabilities, SnpDataSink, VariantIdentifyingData,
};
use rusqlite::Connection;

fn variants() -> Vec<VariantIdentifyingData> {
    [(1, 100, "rs1"), (1, 200, "rs2"), (1, 300, "rs3"), (2, 150, "rs4"), (2, 250, "rs5")]
        .into_iter()
        .map(|(chromosome, position, rsid)| {
            VariantIdentifyingData::biallelic(
                format!("SNP_{rsid}"),
                rsid,
                GenomePosition::new(Chromosome::Autosome(chromosome), position),
                "C",
                "G",
            )
        })
        .collect()
}

fn probabilities(i: usize) -> GenotypeProbabilities {
    const CALLS: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    GenotypeProbabilities::from_fn(3, |sample| CALLS[(sample + i) % 3])
}

fn write_bgen(path: &Path) -> Result<()> {
    let mut sink = BgenSinkBuilder::default()
        .sample_ids(vec!["a".into(), "b".into(), "c".into()])
        .build(BufWriter::new(File::create(path)?), 3)?;
    for (i, variant) in variants().iter().enumerate() {
        sink.write_snp(variant, &probabilities(i))?;
    }
    sink.close()?;
    Ok(())
}

/// Builds a `Variant` table from the record boundaries of a written file
fn write_index(bgen_path: &Path, index_path: &Path) -> Result<()> {
    let reader = IndexedBgenReader::open(bgen_path)?;
    let bytes = std::fs::read(bgen_path)?;
    let mut cursor = std::io::Cursor::new(&bytes[..]);
    cursor.set_position(reader.first_variant());

    let connection = Connection::open(index_path)?;
    connection.execute_batch(
        "CREATE TABLE Variant (chromosome TEXT, position INT, rsid TEXT, number_of_alleles INT, \
         allele1 TEXT, allele2 TEXT, file_start_position INT, size_in_bytes INT);",
    )?;
    loop {
        let start = cursor.position();
        let Some(variant) = bgen::read_snp_identifying_data(&mut cursor, reader.context())? else {
            break;
        };
        bgen::ignore_snp_probability_data(&mut cursor, reader.context())?;
        let size = cursor.position() - start;
        connection.execute(
            "INSERT INTO Variant VALUES (?1, ?2, ?3, 2, ?4, ?5, ?6, ?7)",
            (
                variant.chromosome().to_string(),
                variant.position().position,
                variant.rsid(),
                variant.first_allele(),
                variant.second_allele(),
                start as i64,
                size as i64,
            ),
        )?;
    }
    Ok(())
}

fn setup() -> Result<(tempfile::TempDir, IndexedBgenReader, IndexQuery)> {
    let dir = tempfile::tempdir()?;
    let bgen_path = dir.path().join("data.bgen");
    let index_path = dir.path().join("data.bgen.bgi");
    write_bgen(&bgen_path)?;
    write_index(&bgen_path, &index_path)?;
    let reader = IndexedBgenReader::open(&bgen_path)?;
    let query = IndexQuery::open(&index_path)?;
    Ok((dir, reader, query))
}

#[test]
fn test_read_all_indexed_variants() -> Result<()> {
    let (_dir, mut reader, mut query) = setup()?;
    assert_eq!(reader.sample_ids(), Some(&["a".to_string(), "b".into(), "c".into()][..]));
    query.initialise(&mut |_, _| {})?;
    assert_eq!(query.number_of_variants(), 5);

    let read = reader.read_query(&query).collect::<genfile::Result<Vec<_>>>()?;
    for (i, ((variant, read), expected)) in read.iter().zip(variants()).enumerate() {
        assert_eq!(variant, &expected);
        assert_eq!(read, &probabilities(i));
    }
    Ok(())
}

#[test]
fn test_exclusions_override_inclusions() -> Result<()> {
    let (_dir, mut reader, mut query) = setup()?;
    query
        .include_range(&"01:150-400".parse()?)
        .include_rsids(&["rs5"])
        .exclude_rsids(&["rs3"]);
    let mut reports = Vec::new();
    query.initialise(&mut |n, total| reports.push((n, total)))?;
    assert_eq!(reports.first(), Some(&(0, None)));
    assert_eq!(reports.last(), Some(&(2, Some(2))));

    let rsids: Vec<String> = reader
        .read_query(&query)
        .map(|result| result.map(|(variant, _)| variant.rsid().to_string()))
        .collect::<genfile::Result<_>>()?;
    assert_eq!(rsids, vec!["rs2", "rs5"]);
    Ok(())
}

#[test]
fn test_range_matches_unpadded_chromosome_names() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let index_path = dir.path().join("names.bgi");
    let connection = Connection::open(&index_path)?;
    connection.execute_batch(
        "CREATE TABLE Variant (chromosome TEXT, position INT, rsid TEXT, number_of_alleles INT, \
         allele1 TEXT, allele2 TEXT, file_start_position INT, size_in_bytes INT);
         INSERT INTO Variant VALUES ('chr2', 10, 'rsA', 2, 'A', 'G', 100, 10);
         INSERT INTO Variant VALUES ('2', 20, 'rsB', 2, 'A', 'G', 110, 10);
         INSERT INTO Variant VALUES ('02', 30, 'rsC', 2, 'A', 'G', 120, 10);
         INSERT INTO Variant VALUES ('12', 30, 'rsD', 2, 'A', 'G', 130, 10);",
    )?;
    drop(connection);

    let mut query = IndexQuery::open(&index_path)?;
    query.include_range(&"02:1-100".parse()?);
    query.initialise(&mut |_, _| {})?;
    let starts: Vec<u64> = query.ranges().iter().map(|range| range.start).collect();
    assert_eq!(starts.len(), 3);
    assert!(!starts.contains(&130));
    Ok(())
}

#[test]
fn test_out_of_bounds_range() -> Result<()> {
    let (_dir, mut reader, _query) = setup()?;
    let range = genfile::index::FileRange::from_index(1_000_000, 10)?;
    assert!(reader.read_variant(range).is_err());
    Ok(())
}
