//! Little-endian integer codec
//!
//! Every multi-byte integer in a BGEN file is stored little-endian regardless of the
//! host. The helpers here wrap `byteorder` so that callers read and write fixed-width
//! unsigned integers, and length-prefixed byte strings, through a single generic API.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::{error::Result, WriteError};

/// Byte order of a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Byte order of the host this crate was compiled for
///
/// Rust only targets little- and big-endian platforms, so this is decided at
/// compile time and never re-detected.
pub const HOST_ENDIANNESS: Endianness = if cfg!(target_endian = "little") {
    Endianness::Little
} else {
    Endianness::Big
};

/// Fixed-width unsigned integers with a little-endian wire representation
pub trait LittleEndianInteger: Sized + Copy {
    /// Width of the integer on the wire
    const SIZE: usize;

    /// Reads one value, advancing the reader by `SIZE` bytes
    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self>;

    /// Writes one value, advancing the writer by `SIZE` bytes
    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()>;

    /// Widens the value to a `usize`
    fn to_usize(self) -> usize;

    /// Narrows a length to this width, if it fits
    fn from_usize(value: usize) -> Option<Self>;
}

impl LittleEndianInteger for u8 {
    const SIZE: usize = 1;

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
        reader.read_u8()
    }

    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self)
    }

    fn to_usize(self) -> usize {
        self as usize
    }

    fn from_usize(value: usize) -> Option<Self> {
        Self::try_from(value).ok()
    }
}

macro_rules! impl_little_endian_integer {
    ($t:ty, $read:ident, $write:ident) => {
        impl LittleEndianInteger for $t {
            const SIZE: usize = std::mem::size_of::<$t>();

            fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
                reader.$read::<LittleEndian>()
            }

            fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
                writer.$write::<LittleEndian>(self)
            }

            fn to_usize(self) -> usize {
                self as usize
            }

            fn from_usize(value: usize) -> Option<Self> {
                Self::try_from(value).ok()
            }
        }
    };
}

impl_little_endian_integer!(u16, read_u16, write_u16);
impl_little_endian_integer!(u32, read_u32, write_u32);
impl_little_endian_integer!(u64, read_u64, write_u64);

/// Reads a little-endian integer from the stream
///
/// Fails with [`io::ErrorKind::UnexpectedEof`] if fewer than `T::SIZE` bytes remain;
/// the partial value is discarded.
pub fn read_little_endian_integer<T: LittleEndianInteger, R: Read>(
    reader: &mut R,
) -> io::Result<T> {
    T::read_le(reader)
}

/// Writes a little-endian integer to the stream
pub fn write_little_endian_integer<T: LittleEndianInteger, W: Write>(
    writer: &mut W,
    value: T,
) -> io::Result<()> {
    value.write_le(writer)
}

/// Reads a little-endian integer, distinguishing a clean end of stream
///
/// # Returns
///
/// * `Ok(Some(value))` - if a full value was read
/// * `Ok(None)` - if the stream was already exhausted
/// * `Err(_)` - if the stream ended part-way through the value
pub fn try_read_little_endian_integer<T: LittleEndianInteger, R: Read>(
    reader: &mut R,
) -> io::Result<Option<T>> {
    let mut buffer = [0u8; 8];
    let buffer = &mut buffer[..T::SIZE];
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    match filled {
        0 => Ok(None),
        n if n == buffer.len() => T::read_le(&mut &buffer[..]).map(Some),
        _ => Err(io::ErrorKind::UnexpectedEof.into()),
    }
}

/// Replaces the contents of `buffer` with the next `len` bytes of the stream
///
/// The buffer only grows as bytes arrive, so a corrupt length cannot force a
/// large allocation. Fails with [`io::ErrorKind::UnexpectedEof`] if fewer than
/// `len` bytes remain.
pub fn read_bytes<R: Read>(reader: &mut R, len: usize, buffer: &mut Vec<u8>) -> io::Result<()> {
    buffer.clear();
    reader.by_ref().take(len as u64).read_to_end(buffer)?;
    if buffer.len() == len {
        Ok(())
    } else {
        Err(io::ErrorKind::UnexpectedEof.into())
    }
}

/// Reads a length of type `L` followed by that many bytes
pub fn read_length_followed_by_data<L: LittleEndianInteger, R: Read>(
    reader: &mut R,
) -> io::Result<Vec<u8>> {
    let len = L::read_le(reader)?.to_usize();
    let mut data = Vec::new();
    read_bytes(reader, len, &mut data)?;
    Ok(data)
}

/// Reads a length-prefixed UTF-8 string
pub fn read_length_followed_by_string<L: LittleEndianInteger, R: Read>(
    reader: &mut R,
) -> Result<String> {
    let data = read_length_followed_by_data::<L, R>(reader)?;
    String::from_utf8(data).map_err(|e| e.utf8_error().into())
}

/// Writes the length of `data` as an `L` followed by the bytes themselves
///
/// # Arguments
///
/// * `writer` - Destination stream
/// * `field` - Name of the field, used in the error if `data` is too long for `L`
/// * `data` - Bytes to write
pub fn write_length_followed_by_data<L: LittleEndianInteger, W: Write>(
    writer: &mut W,
    field: &'static str,
    data: &[u8],
) -> Result<()> {
    let Some(len) = L::from_usize(data.len()) else {
        return Err(WriteError::FieldTooLong {
            field,
            len: data.len(),
        }
        .into());
    };
    len.write_le(writer)?;
    writer.write_all(data)?;
    Ok(())
}

/// Advances the reader by exactly `n` bytes without keeping them
pub fn skip_bytes<R: Read>(reader: &mut R, n: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(n), &mut io::sink())?;
    if skipped == n {
        Ok(())
    } else {
        Err(io::ErrorKind::UnexpectedEof.into())
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use anyhow::Result;
    use std::io::Cursor;

    #[test]
    fn test_known_byte_layout() -> Result<()> {
        let mut buffer = Vec::new();
        write_little_endian_integer(&mut buffer, 0x0102_0304u32)?;
        write_little_endian_integer(&mut buffer, 0xABCDu16)?;
        write_little_endian_integer(&mut buffer, 0x7Fu8)?;
        assert_eq!(buffer, [0x04, 0x03, 0x02, 0x01, 0xCD, 0xAB, 0x7F]);

        let mut cursor = Cursor::new(buffer);
        assert_eq!(read_little_endian_integer::<u32, _>(&mut cursor)?, 0x0102_0304);
        assert_eq!(read_little_endian_integer::<u16, _>(&mut cursor)?, 0xABCD);
        assert_eq!(read_little_endian_integer::<u8, _>(&mut cursor)?, 0x7F);
        assert_eq!(cursor.position(), 7);
        Ok(())
    }

    #[test]
    fn test_extremes() -> Result<()> {
        for value in [0u64, 1, u64::from(u32::MAX), u64::MAX] {
            let mut buffer = Vec::new();
            write_little_endian_integer(&mut buffer, value)?;
            assert_eq!(buffer.len(), 8);
            let read: u64 = read_little_endian_integer(&mut buffer.as_slice())?;
            assert_eq!(read, value);
        }
        Ok(())
    }

    #[test]
    fn test_short_read_is_eof() {
        let mut slice: &[u8] = &[1, 2, 3];
        let err = read_little_endian_integer::<u32, _>(&mut slice).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_try_read_distinguishes_clean_eof() -> Result<()> {
        let mut empty: &[u8] = &[];
        assert_eq!(try_read_little_endian_integer::<u32, _>(&mut empty)?, None);

        let mut full: &[u8] = &[5, 0, 0, 0];
        assert_eq!(try_read_little_endian_integer::<u32, _>(&mut full)?, Some(5));

        let mut partial: &[u8] = &[5, 0];
        assert!(try_read_little_endian_integer::<u32, _>(&mut partial).is_err());
        Ok(())
    }

    #[test]
    fn test_length_prefixed_data() -> Result<()> {
        let mut buffer = Vec::new();
        write_length_followed_by_data::<u16, _>(&mut buffer, "id", b"rs123")?;
        assert_eq!(&buffer[..2], &[5, 0]);
        let text = read_length_followed_by_string::<u16, _>(&mut buffer.as_slice())?;
        assert_eq!(text, "rs123");

        let too_long = vec![b'A'; 300];
        assert!(write_length_followed_by_data::<u8, _>(&mut Vec::new(), "id", &too_long).is_err());
        Ok(())
    }

    #[test]
    fn test_declared_length_beyond_stream() {
        // a u32 length near its maximum followed by three bytes
        let mut bytes = vec![0xFF, 0xFF, 0xFF, 0xFE];
        bytes.extend_from_slice(b"abc");
        let err = read_length_followed_by_data::<u32, _>(&mut bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_bytes_reuses_buffer() -> Result<()> {
        let mut buffer = b"stale contents".to_vec();
        let mut reader: &[u8] = b"fresh";
        read_bytes(&mut reader, 3, &mut buffer)?;
        assert_eq!(buffer, b"fre");
        assert!(read_bytes(&mut reader, 3, &mut buffer).is_err());
        Ok(())
    }

    #[test]
    fn test_skip_bytes() -> Result<()> {
        let mut cursor = Cursor::new(vec![0u8; 10]);
        skip_bytes(&mut cursor, 6)?;
        assert_eq!(cursor.position(), 6);
        assert!(skip_bytes(&mut cursor, 5).is_err());
        Ok(())
    }

    #[test]
    fn test_host_endianness() {
        let expected = if u16::from_ne_bytes([1, 0]) == 1 {
            Endianness::Little
        } else {
            Endianness::Big
        };
        assert_eq!(HOST_ENDIANNESS, expected);
    }
}
