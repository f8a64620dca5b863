//! Identifying-data block of a variant record
//!
//! v1.2 layout:
//! ```text
//! [u16 len][SNPID][u16 len][RSID][u16 len][chromosome][u32 position]
//! [u16 num_alleles]([u32 len][allele]) * num_alleles
//! ```
//!
//! v1.1 layout:
//! ```text
//! [u32 num_samples][u16 len][SNPID][u16 len][RSID][u16 len][chromosome]
//! [u32 position][u32 len][allele1][u32 len][allele2]
//! ```
//!
//! v1.0 layout:
//! ```text
//! [u32 num_samples][u8 max_id_size][u8 len][SNPID, padded to max_id_size]
//! [u8 len][RSID, padded to max_id_size][u8 chromosome][u32 position]
//! [allele1][allele2]    (one byte each, or u32-prefixed with MULTI_CHARACTER_ALLELES)
//! ```

use log::warn;
use std::io::{Read, Write};

use super::{Context, Layout};
use crate::{
    endian::{
        read_bytes, read_length_followed_by_data, read_length_followed_by_string,
        read_little_endian_integer, skip_bytes, try_read_little_endian_integer,
        write_length_followed_by_data, write_little_endian_integer,
    },
    error::Result,
    Chromosome, GenomePosition, ReadError, VariantIdentifyingData, WriteError,
};

/// Reads the identifying data of the next variant
///
/// # Returns
///
/// * `Ok(Some(variant))` - if a full block was read
/// * `Ok(None)` - if the stream was exhausted before the block started
/// * `Err(Error)` - if the block is truncated or malformed
pub fn read_snp_identifying_data<R: Read>(
    reader: &mut R,
    context: &Context,
) -> Result<Option<VariantIdentifyingData>> {
    let layout = context.layout()?;
    if layout == Layout::V12 {
        let Some(len) = try_read_little_endian_integer::<u16, _>(reader)? else {
            return Ok(None);
        };
        let mut snpid = Vec::new();
        read_bytes(reader, usize::from(len), &mut snpid)?;
        let snpid = String::from_utf8(snpid).map_err(|e| e.utf8_error())?;
        return read_length_prefixed_fields(reader, snpid, layout).map(Some);
    }

    let Some(number_of_samples) = try_read_little_endian_integer::<u32, _>(reader)? else {
        return Ok(None);
    };
    if number_of_samples != context.number_of_samples {
        return Err(ReadError::SampleCountMismatch {
            expected: context.number_of_samples,
            got: number_of_samples,
        }
        .into());
    }
    let variant = if layout == Layout::V11 {
        let snpid = read_length_followed_by_string::<u16, _>(reader)?;
        read_length_prefixed_fields(reader, snpid, layout)?
    } else {
        read_v10_fields(reader, context)?
    };
    Ok(Some(variant))
}

/// Reads the v1.1 and v1.2 fields that follow the SNPID
fn read_length_prefixed_fields<R: Read>(
    reader: &mut R,
    snpid: String,
    layout: Layout,
) -> Result<VariantIdentifyingData> {
    let rsid = read_length_followed_by_string::<u16, _>(reader)?;
    let chromosome_name = read_length_followed_by_string::<u16, _>(reader)?;
    let position: u32 = read_little_endian_integer(reader)?;
    let number_of_alleles = if layout == Layout::V12 {
        usize::from(read_little_endian_integer::<u16, _>(reader)?)
    } else {
        2
    };
    if number_of_alleles < 2 {
        return Err(ReadError::TooFewAlleles(number_of_alleles).into());
    }
    let alleles = (0..number_of_alleles)
        .map(|_| read_length_followed_by_string::<u32, _>(reader))
        .collect::<Result<Vec<_>>>()?;

    let chromosome = chromosome_name.parse().unwrap_or_else(|_| {
        warn!(
            "Unrecognised chromosome {chromosome_name:?} at {snpid} {rsid}, recording as unknown"
        );
        Chromosome::Unknown
    });
    Ok(VariantIdentifyingData::new(
        snpid,
        rsid,
        GenomePosition::new(chromosome, position),
        alleles,
    ))
}

fn read_v10_fields<R: Read>(reader: &mut R, context: &Context) -> Result<VariantIdentifyingData> {
    let max_id_size: u8 = read_little_endian_integer(reader)?;
    let snpid = read_padded_identifier(reader, max_id_size)?;
    let rsid = read_padded_identifier(reader, max_id_size)?;
    let chromosome = Chromosome::from_code(read_little_endian_integer(reader)?);
    let position: u32 = read_little_endian_integer(reader)?;

    let (first_allele, second_allele) = if context.has_multi_character_alleles() {
        (
            read_length_followed_by_string::<u32, _>(reader)?,
            read_length_followed_by_string::<u32, _>(reader)?,
        )
    } else {
        let mut alleles = [0u8; 2];
        reader.read_exact(&mut alleles)?;
        (
            char::from(alleles[0]).to_string(),
            char::from(alleles[1]).to_string(),
        )
    };
    Ok(VariantIdentifyingData::biallelic(
        snpid,
        rsid,
        GenomePosition::new(chromosome, position),
        first_allele,
        second_allele,
    ))
}

fn read_padded_identifier<R: Read>(reader: &mut R, max_id_size: u8) -> Result<String> {
    let data = read_length_followed_by_data::<u8, _>(reader)?;
    if data.len() > usize::from(max_id_size) {
        return Err(ReadError::IdentifierOverflow {
            len: data.len(),
            max: usize::from(max_id_size),
        }
        .into());
    }
    skip_bytes(reader, u64::from(max_id_size) - data.len() as u64)?;
    String::from_utf8(data).map_err(|e| e.utf8_error().into())
}

/// Writes the identifying data of a variant
///
/// # Arguments
///
/// * `writer` - Destination stream
/// * `context` - Header fields of the file being written
/// * `max_id_size` - Width of the identifier fields (v1.0 layout only)
/// * `variant` - The variant to write
///
/// # Errors
///
/// If the variant has more alleles than the layout stores, or a field does not
/// fit the layout.
pub fn write_snp_identifying_data<W: Write>(
    writer: &mut W,
    context: &Context,
    max_id_size: u8,
    variant: &VariantIdentifyingData,
) -> Result<()> {
    let layout = context.layout()?;
    if layout != Layout::V12 && variant.number_of_alleles() != 2 {
        return Err(WriteError::TooManyAlleles(variant.number_of_alleles()).into());
    }
    if layout != Layout::V12 {
        write_little_endian_integer(writer, context.number_of_samples)?;
    }
    if layout == Layout::V10 {
        return write_v10_fields(writer, context, max_id_size, variant);
    }

    write_length_followed_by_data::<u16, _>(writer, "SNPID", variant.snpid().as_bytes())?;
    write_length_followed_by_data::<u16, _>(writer, "RSID", variant.rsid().as_bytes())?;
    let chromosome = variant.chromosome().to_string();
    write_length_followed_by_data::<u16, _>(writer, "chromosome", chromosome.as_bytes())?;
    write_little_endian_integer(writer, variant.position().position)?;
    if layout == Layout::V12 {
        let Ok(number_of_alleles) = u16::try_from(variant.number_of_alleles()) else {
            return Err(WriteError::FieldTooLong {
                field: "alleles",
                len: variant.number_of_alleles(),
            }
            .into());
        };
        write_little_endian_integer(writer, number_of_alleles)?;
    }
    for allele in variant.alleles() {
        write_length_followed_by_data::<u32, _>(writer, "allele", allele.as_bytes())?;
    }
    Ok(())
}

fn write_v10_fields<W: Write>(
    writer: &mut W,
    context: &Context,
    max_id_size: u8,
    variant: &VariantIdentifyingData,
) -> Result<()> {
    write_little_endian_integer(writer, max_id_size)?;
    write_padded_identifier(writer, "SNPID", variant.snpid(), max_id_size)?;
    write_padded_identifier(writer, "RSID", variant.rsid(), max_id_size)?;
    write_little_endian_integer(writer, variant.chromosome().code())?;
    write_little_endian_integer(writer, variant.position().position)?;
    for allele in variant.alleles() {
        if context.has_multi_character_alleles() {
            write_length_followed_by_data::<u32, _>(writer, "allele", allele.as_bytes())?;
        } else if allele.len() == 1 {
            writer.write_all(allele.as_bytes())?;
        } else {
            return Err(WriteError::FieldTooLong {
                field: "allele",
                len: allele.len(),
            }
            .into());
        }
    }
    Ok(())
}

fn write_padded_identifier<W: Write>(
    writer: &mut W,
    field: &'static str,
    identifier: &str,
    max_id_size: u8,
) -> Result<()> {
    if identifier.len() > usize::from(max_id_size) {
        return Err(WriteError::FieldTooLong {
            field,
            len: identifier.len(),
        }
        .into());
    }
    write_length_followed_by_data::<u8, _>(writer, field, identifier.as_bytes())?;
    let padding = vec![b' '; usize::from(max_id_size) - identifier.len()];
    writer.write_all(&padding)?;
    Ok(())
}
