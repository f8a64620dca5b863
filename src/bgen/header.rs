//! Offset, header block and sample identifier block
//!
//! ```text
//! [u32 offset]
//! [u32 header_length][u32 num_variants][u32 num_samples][u32 reserved=0]
//! [free_data: header_length - 20 bytes][u32 flags]
//! (optional) [u32 block_size][u32 num_samples]([u16 len][id])*
//! ```

use byteorder::{ByteOrder, LittleEndian};
use std::io::{Read, Write};

use super::{Context, FIXED_HEADER_SIZE};
use crate::{
    endian::{
        read_bytes, read_length_followed_by_string, read_little_endian_integer,
        write_length_followed_by_data, write_little_endian_integer,
    },
    error::Result,
    HeaderError, WriteError,
};

/// Reads the offset from the start of the file to the first variant block
///
/// The offset is counted from the end of the offset field itself.
pub fn read_offset<R: Read>(reader: &mut R) -> Result<u32> {
    Ok(read_little_endian_integer(reader)?)
}

/// Writes the offset to the first variant block
pub fn write_offset<W: Write>(writer: &mut W, offset: u32) -> Result<()> {
    write_little_endian_integer(writer, offset)?;
    Ok(())
}

/// Reads a header block
///
/// The declared header length determines how much free data is consumed, so a
/// header written by a newer writer with extra trailing data is read unchanged.
///
/// # Returns
///
/// * `Ok((Context, u64))` - the header fields and the number of bytes consumed
/// * `Err(Error)` - if the stream ends early or the declared length is too small
pub fn read_header_block<R: Read>(reader: &mut R) -> Result<(Context, u64)> {
    let mut fixed = [0u8; 16];
    reader.read_exact(&mut fixed)?;
    let header_length = LittleEndian::read_u32(&fixed[0..4]);
    let number_of_variants = LittleEndian::read_u32(&fixed[4..8]);
    let number_of_samples = LittleEndian::read_u32(&fixed[8..12]);
    // fixed[12..16] is reserved

    if header_length < FIXED_HEADER_SIZE {
        return Err(HeaderError::InvalidHeaderLength(header_length).into());
    }

    let mut free_data = Vec::new();
    read_bytes(reader, (header_length - FIXED_HEADER_SIZE) as usize, &mut free_data)?;
    let flags: u32 = read_little_endian_integer(reader)?;

    let context = Context::new(number_of_variants, number_of_samples, free_data, flags);
    Ok((context, u64::from(header_length)))
}

/// Writes a header block
///
/// The header length is always `20 + free_data.len()` and the reserved word is zero.
pub fn write_header_block<W: Write>(writer: &mut W, context: &Context) -> Result<()> {
    let Ok(header_length) = u32::try_from(context.header_size()) else {
        return Err(WriteError::FieldTooLong {
            field: "free_data",
            len: context.free_data.len(),
        }
        .into());
    };
    let mut fixed = [0u8; 16];
    LittleEndian::write_u32(&mut fixed[0..4], header_length);
    LittleEndian::write_u32(&mut fixed[4..8], context.number_of_variants);
    LittleEndian::write_u32(&mut fixed[8..12], context.number_of_samples);
    LittleEndian::write_u32(&mut fixed[12..16], 0);
    writer.write_all(&fixed)?;
    writer.write_all(&context.free_data)?;
    write_little_endian_integer(writer, context.flags)?;
    Ok(())
}

/// Reads a sample identifier block
///
/// # Returns
///
/// * `Ok((Vec<String>, u64))` - the identifiers in file order and the number of bytes consumed
/// * `Err(HeaderError)` - if the block disagrees with the header or with its declared size
pub fn read_sample_identifier_block<R: Read>(
    reader: &mut R,
    context: &Context,
) -> Result<(Vec<String>, u64)> {
    let block_size: u32 = read_little_endian_integer(reader)?;
    let number_of_samples: u32 = read_little_endian_integer(reader)?;
    if number_of_samples != context.number_of_samples {
        return Err(HeaderError::SampleBlockMismatch {
            expected: context.number_of_samples,
            got: number_of_samples,
        }
        .into());
    }

    // the count comes from the file, so the list grows as identifiers are read
    let mut bytes_read = 8u64;
    let mut identifiers = Vec::new();
    for _ in 0..number_of_samples {
        let identifier = read_length_followed_by_string::<u16, _>(reader)?;
        bytes_read += 2 + identifier.len() as u64;
        identifiers.push(identifier);
    }

    if bytes_read != u64::from(block_size) {
        return Err(HeaderError::SampleBlockSize {
            declared: block_size,
            actual: bytes_read,
        }
        .into());
    }
    Ok((identifiers, bytes_read))
}

/// Writes a sample identifier block
///
/// # Returns
///
/// The number of bytes written
pub fn write_sample_identifier_block<W: Write>(
    writer: &mut W,
    context: &Context,
    sample_ids: &[String],
) -> Result<u64> {
    if sample_ids.len() != context.number_of_samples as usize {
        return Err(WriteError::SampleIdCount {
            expected: context.number_of_samples,
            got: sample_ids.len(),
        }
        .into());
    }
    let block_size = 8 + sample_ids.iter().map(|id| 2 + id.len() as u64).sum::<u64>();
    let Ok(declared) = u32::try_from(block_size) else {
        return Err(WriteError::FieldTooLong {
            field: "sample_ids",
            len: block_size as usize,
        }
        .into());
    };
    write_little_endian_integer(writer, declared)?;
    write_little_endian_integer(writer, context.number_of_samples)?;
    for id in sample_ids {
        write_length_followed_by_data::<u16, _>(writer, "sample_id", id.as_bytes())?;
    }
    Ok(block_size)
}
