//! Byte streams backing sources and sinks
//!
//! Sources read through an [`InputStream`], which transparently decompresses gzip
//! files and can be rewound to the start. Text sinks write through an
//! [`OutputStream`], which gzip-compresses when the filename asks for it.

use flate2::{read::MultiGzDecoder, write::GzEncoder, Compression};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Cursor, Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{error::Result, FileError};

/// Compression applied to a whole file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    #[default]
    None,
    Gzip,
}
impl CompressionType {
    /// Gzip if the filename ends in `.gz`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Self::Gzip,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone)]
enum Origin {
    File {
        path: PathBuf,
        compression: CompressionType,
    },
    Memory(Arc<[u8]>),
}

/// A buffered, rewindable input stream
pub struct InputStream {
    origin: Origin,
    reader: Box<dyn BufRead + Send>,
}
impl InputStream {
    /// Opens a file, decompressing it if its name ends in `.gz`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let origin = Origin::File {
            path: path.to_path_buf(),
            compression: CompressionType::from_path(path),
        };
        let reader = Self::open_origin(&origin)?;
        Ok(Self { origin, reader })
    }

    /// Wraps an in-memory buffer
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes: Arc<[u8]> = bytes.into();
        let reader = Box::new(Cursor::new(Arc::clone(&bytes)));
        Self {
            origin: Origin::Memory(bytes),
            reader,
        }
    }

    fn open_origin(origin: &Origin) -> Result<Box<dyn BufRead + Send>> {
        match origin {
            Origin::File { path, compression } => {
                let file = File::open(path).map_err(|e| FileError::open(path, e))?;
                Ok(match compression {
                    CompressionType::None => Box::new(BufReader::new(file)),
                    CompressionType::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(file))),
                })
            }
            Origin::Memory(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
        }
    }

    /// Moves the stream back to its first byte
    ///
    /// Files are reopened, which also restarts decompression.
    pub fn rewind(&mut self) -> Result<()> {
        self.reader = Self::open_origin(&self.origin)?;
        Ok(())
    }

    /// Describes where the stream reads from
    #[must_use]
    pub fn spec(&self) -> String {
        match &self.origin {
            Origin::File { path, .. } => path.display().to_string(),
            Origin::Memory(bytes) => format!("(memory, {} bytes)", bytes.len()),
        }
    }
}
impl Read for InputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}
impl BufRead for InputStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt);
    }
}
impl std::fmt::Debug for InputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStream").field("origin", &self.spec()).finish()
    }
}

/// A buffered output file, gzip-compressed if its name ends in `.gz`
pub enum OutputStream {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}
impl OutputStream {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| FileError::create(path, e))?;
        let writer = BufWriter::new(file);
        Ok(match CompressionType::from_path(path) {
            CompressionType::None => Self::Plain(writer),
            CompressionType::Gzip => Self::Gzip(GzEncoder::new(writer, Compression::default())),
        })
    }

    /// Writes any compression trailer and flushes the file
    ///
    /// Nothing may be written after this call.
    pub fn finish(&mut self) -> Result<()> {
        match self {
            Self::Plain(writer) => writer.flush()?,
            Self::Gzip(encoder) => {
                encoder.try_finish()?;
                encoder.get_mut().flush()?;
            }
        }
        Ok(())
    }
}
impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(writer) => writer.write(buf),
            Self::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(writer) => writer.flush(),
            Self::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// A writer that may need a final step once all data is written
///
/// For most writers this is a flush; compressed streams also write their trailer.
pub trait FinishWrite: Write {
    fn finish_write(&mut self) -> Result<()> {
        self.flush()?;
        Ok(())
    }
}
impl FinishWrite for OutputStream {
    fn finish_write(&mut self) -> Result<()> {
        self.finish()
    }
}
impl FinishWrite for Vec<u8> {}
impl FinishWrite for File {}
impl<W: Write> FinishWrite for BufWriter<W> {}
impl<T> FinishWrite for Cursor<T> where Cursor<T>: Write {}
