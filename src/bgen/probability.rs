//! Probability-data block of a variant record
//!
//! v1.0 and v1.1: uncompressed, the block is `6 * num_samples` bytes, three
//! little-endian `u16` values (AA, AB, BB) per sample, each a probability scaled
//! by the layout's conversion factor. Compressed, the block is a `u32` payload
//! size followed by a zlib stream that must inflate to the uncompressed block.
//!
//! v1.2:
//! ```text
//! [u32 block_size]([u32 uncompressed_size] if compressed)[payload]
//!
//! payload, once decompressed:
//! [u32 num_samples][u16 num_alleles][u8 min_ploidy][u8 max_ploidy]
//! [u8 ploidy (bit 7: missing)] * num_samples
//! [u8 phased][u8 bits][bit-packed probabilities]
//! ```
//! The last probability of each sample (unphased) or haplotype (phased) is
//! implied by the others and not stored.

use byteorder::{ByteOrder, LittleEndian};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use log::warn;
use std::io::{self, Read, Write};
use zstd::{Decoder as ZstdDecoder, Encoder as ZstdEncoder};

use super::{
    bits::{self, BitReader, BitWriter, MAX_BITS},
    BlockCompression, Context, Layout, PROBABILITY_ENTRY_SIZE,
};
use crate::{
    endian::{read_bytes, read_little_endian_integer, skip_bytes, write_little_endian_integer},
    error::Result,
    genotypes::number_of_entries,
    Error, GenotypeProbabilities, ReadError, SampleProbabilities, WriteError,
};

/// Bit width of v1.2 probabilities unless configured otherwise
pub const DEFAULT_BITS_PER_PROBABILITY: u8 = 16;

/// Ploidy byte bit marking a missing sample
const MISSING_SAMPLE: u8 = 0x80;

/// Ploidy byte bits holding the ploidy
const PLOIDY_MASK: u8 = 0x3F;

/// Fixed fields of a v1.2 payload, not counting the per-sample ploidy bytes
const V12_FIXED_SIZE: usize = 10;

/// Converts a probability to its stored 16-bit representation
///
/// Values are scaled by `factor` and rounded to the nearest integer. Negative
/// values are clamped to zero and values too large for a `u16` are clamped to
/// `u16::MAX`, with a warning in both cases.
#[must_use]
pub fn to_integer_representation(probability: f64, factor: f64) -> u16 {
    let mut scaled = probability * factor;
    if scaled < 0.0 {
        warn!("Probability {probability} is negative, clamping to 0");
        scaled = 0.0;
    } else if scaled >= 65535.5 {
        warn!("Probability {probability} is too large, clamping");
        scaled = 65535.0;
    }
    (scaled + 0.5).floor() as u16
}

/// Converts a stored 16-bit value back to a probability
#[must_use]
pub fn from_integer_representation(value: u16, factor: f64) -> f64 {
    f64::from(value) / factor
}

/// Skips over the probability block of the current variant
///
/// The stream is advanced by exactly the number of bytes the block occupies,
/// without inflating it.
pub fn ignore_snp_probability_data<R: Read>(reader: &mut R, context: &Context) -> Result<()> {
    let size = if context.layout()? == Layout::V12 || context.is_compressed() {
        u64::from(read_little_endian_integer::<u32, _>(reader)?)
    } else {
        context.uncompressed_probability_size() as u64
    };
    skip_bytes(reader, size)?;
    Ok(())
}

fn inflate_error(error: io::Error) -> ReadError {
    ReadError::Inflate(error.to_string())
}

fn malformed(reason: impl Into<String>) -> Error {
    ReadError::MalformedProbabilityBlock(reason.into()).into()
}

fn block_length(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        WriteError::FieldTooLong {
            field: "probability block",
            len,
        }
        .into()
    })
}

/// Number of probabilities stored for a sample, leaving out the implied ones
fn stored_values(ploidy: u8, number_of_alleles: usize, phased: bool) -> Option<usize> {
    let implied = if phased { usize::from(ploidy) } else { 1 };
    number_of_entries(ploidy, number_of_alleles, phased).map(|n| n.saturating_sub(implied))
}

/// Scales probabilities summing to one onto integers summing to `scale`
///
/// Every value is rounded down, then the values with the largest remainders
/// are rounded up until the total matches the rounded scaled sum.
fn round_to_scaled_simplex(probabilities: &[f64], scale: u64, out: &mut Vec<u64>) {
    let scale_f = f64::from(scale as u32);
    let total: f64 = probabilities.iter().map(|p| p.clamp(0.0, 1.0)).sum();
    let norm = total.max(1.0);

    out.clear();
    let mut remainders = Vec::with_capacity(probabilities.len());
    for p in probabilities {
        let scaled = p.clamp(0.0, 1.0) / norm * scale_f;
        let floor = scaled.floor();
        out.push(floor as u64);
        remainders.push(scaled - floor);
    }
    let round_up = (remainders.iter().sum::<f64>().round() as usize).min(out.len());
    let mut order: Vec<usize> = (0..out.len()).collect();
    order.sort_by(|&a, &b| remainders[b].total_cmp(&remainders[a]));
    for &i in &order[..round_up] {
        out[i] = (out[i] + 1).min(scale);
    }
}

/// Reads and writes probability blocks, reusing its internal buffers between variants
#[derive(Debug, Clone)]
pub struct ProbabilityCodec {
    /// Raw block bytes, compressed or not
    raw: Vec<u8>,
    /// Inflated block bytes
    uncompressed: Vec<u8>,
    /// Size the last raw block must decompress to
    expected_size: usize,
    /// Bit width of the v1.2 probabilities this codec writes
    bits: u8,
    /// Scaled values of the group being encoded
    scaled: Vec<u64>,
}
impl Default for ProbabilityCodec {
    fn default() -> Self {
        Self::new()
    }
}
impl ProbabilityCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::with_bits_per_probability(DEFAULT_BITS_PER_PROBABILITY)
    }

    /// A codec writing v1.2 probabilities with `bits` bits each
    ///
    /// # Panics
    ///
    /// If `bits` is not between 1 and 32.
    #[must_use]
    pub fn with_bits_per_probability(bits: u8) -> Self {
        assert!(
            (1..=MAX_BITS).contains(&bits),
            "bits per probability must be between 1 and {MAX_BITS}, got {bits}"
        );
        Self {
            raw: Vec::new(),
            uncompressed: Vec::new(),
            expected_size: 0,
            bits,
            scaled: Vec::new(),
        }
    }

    /// Reads the raw bytes of the next probability block
    ///
    /// For compressed files this is the compressed payload, without its size
    /// prefixes. The buffer only grows as bytes arrive, so a corrupt size field
    /// ends in an `UnexpectedEof` error rather than a large allocation.
    pub fn read_raw_probability_data<R: Read>(
        &mut self,
        reader: &mut R,
        context: &Context,
    ) -> Result<&[u8]> {
        let compressed = context.is_compressed();
        self.expected_size = if context.layout()? == Layout::V12 {
            let size = read_little_endian_integer::<u32, _>(reader)? as usize;
            if compressed {
                let Some(payload) = size.checked_sub(4) else {
                    return Err(ReadError::ProbabilityBlockSize {
                        expected: 4,
                        got: size,
                    }
                    .into());
                };
                let declared = read_little_endian_integer::<u32, _>(reader)? as usize;
                read_bytes(reader, payload, &mut self.raw)?;
                declared
            } else {
                read_bytes(reader, size, &mut self.raw)?;
                size
            }
        } else {
            let size = if compressed {
                read_little_endian_integer::<u32, _>(reader)? as usize
            } else {
                context.uncompressed_probability_size()
            };
            read_bytes(reader, size, &mut self.raw)?;
            context.uncompressed_probability_size()
        };
        Ok(&self.raw)
    }

    /// Decompresses the last raw block read into the uncompressed buffer
    ///
    /// Decompression stops one byte past the expected size, so an oversized
    /// block is reported without being inflated in full.
    ///
    /// # Errors
    ///
    /// * `ReadError::Inflate` - if the payload is not a valid compressed stream
    /// * `ReadError::ProbabilityBlockSize` - if the decompressed size differs from
    ///   the declared size (v1.2) or the size implied by the sample count
    pub fn uncompress_raw_probability_data(&mut self, context: &Context) -> Result<&[u8]> {
        let expected = self.expected_size;
        let limit = expected as u64 + 1;
        self.uncompressed.clear();
        match context.compression()? {
            BlockCompression::None => self.uncompressed.extend_from_slice(&self.raw),
            BlockCompression::Zlib => {
                ZlibDecoder::new(self.raw.as_slice())
                    .take(limit)
                    .read_to_end(&mut self.uncompressed)
                    .map_err(inflate_error)?;
            }
            BlockCompression::Zstd => {
                ZstdDecoder::with_buffer(self.raw.as_slice())
                    .map_err(inflate_error)?
                    .take(limit)
                    .read_to_end(&mut self.uncompressed)
                    .map_err(inflate_error)?;
            }
        }

        let got = self.uncompressed.len();
        if got != expected {
            return Err(ReadError::ProbabilityBlockSize { expected, got }.into());
        }
        Ok(&self.uncompressed)
    }

    /// Decodes the uncompressed buffer
    ///
    /// `number_of_alleles` is the allele count of the variant's identifying data.
    /// v1.2 blocks must agree with it; older layouts are always biallelic.
    pub fn parse_probability_data(
        &self,
        context: &Context,
        number_of_alleles: usize,
    ) -> Result<SampleProbabilities> {
        match context.layout()?.probability_conversion_factor() {
            Some(factor) => Ok(SampleProbabilities::from(&self.parse_fixed_width(factor))),
            None => self.parse_v12(context, number_of_alleles),
        }
    }

    fn parse_fixed_width(&self, factor: f64) -> GenotypeProbabilities {
        self.uncompressed
            .chunks_exact(PROBABILITY_ENTRY_SIZE)
            .map(|entry| {
                [
                    from_integer_representation(LittleEndian::read_u16(&entry[0..2]), factor),
                    from_integer_representation(LittleEndian::read_u16(&entry[2..4]), factor),
                    from_integer_representation(LittleEndian::read_u16(&entry[4..6]), factor),
                ]
            })
            .collect()
    }

    fn parse_v12(
        &self,
        context: &Context,
        number_of_alleles: usize,
    ) -> Result<SampleProbabilities> {
        let data = self.uncompressed.as_slice();
        if data.len() < V12_FIXED_SIZE {
            return Err(malformed(format!("{} bytes is too short", data.len())));
        }
        let number_of_samples = LittleEndian::read_u32(&data[0..4]);
        if number_of_samples != context.number_of_samples {
            return Err(ReadError::SampleCountMismatch {
                expected: context.number_of_samples,
                got: number_of_samples,
            }
            .into());
        }
        let stored_alleles = usize::from(LittleEndian::read_u16(&data[4..6]));
        if stored_alleles != number_of_alleles {
            return Err(ReadError::AlleleCountMismatch {
                expected: number_of_alleles,
                got: stored_alleles,
            }
            .into());
        }
        let (min_ploidy, max_ploidy) = (data[6], data[7]);

        let n = number_of_samples as usize;
        if data.len() < V12_FIXED_SIZE + n {
            return Err(malformed(format!("no room for {n} ploidy bytes")));
        }
        let ploidy = &data[8..8 + n];
        let phased = match data[8 + n] {
            0 => false,
            1 => true,
            other => return Err(malformed(format!("phased flag is {other}"))),
        };
        let bits = data[9 + n];
        if !(1..=MAX_BITS).contains(&bits) {
            return Err(malformed(format!("{bits} bits per probability")));
        }
        let packed = &data[V12_FIXED_SIZE + n..];

        // check the packed size before decoding anything
        let mut total = 0usize;
        for &byte in ploidy {
            let sample_ploidy = byte & PLOIDY_MASK;
            if !(min_ploidy..=max_ploidy).contains(&sample_ploidy) {
                return Err(malformed(format!(
                    "ploidy {sample_ploidy} outside {min_ploidy}..={max_ploidy}"
                )));
            }
            total = stored_values(sample_ploidy, number_of_alleles, phased)
                .and_then(|count| total.checked_add(count))
                .ok_or_else(|| malformed("too many probabilities"))?;
        }
        if bits::packed_size(total, bits) != Some(packed.len()) {
            return Err(malformed(format!(
                "{} bytes of probabilities for {total} values of {bits} bits",
                packed.len()
            )));
        }

        let scale = f64::from(bits::mask(bits) as u32);
        let mut reader = BitReader::new(packed);
        let mut decoded = SampleProbabilities::new(number_of_alleles, phased);
        let mut values = Vec::new();
        for &byte in ploidy {
            let sample_ploidy = byte & PLOIDY_MASK;
            let missing = byte & MISSING_SAMPLE != 0;
            let (groups, group_len) = if phased {
                (usize::from(sample_ploidy), number_of_alleles)
            } else {
                let entries = number_of_entries(sample_ploidy, number_of_alleles, false)
                    .ok_or_else(|| malformed("too many probabilities"))?;
                (1, entries)
            };
            values.clear();
            for _ in 0..groups {
                let mut sum = 0.0;
                for _ in 1..group_len {
                    let value = reader
                        .read(bits)
                        .ok_or_else(|| malformed("probabilities end early"))?;
                    let value = f64::from(value as u32) / scale;
                    sum += value;
                    values.push(value);
                }
                values.push((1.0 - sum).max(0.0));
            }
            if missing {
                values.fill(0.0);
            }
            decoded.push_decoded(sample_ploidy, missing, &values);
        }
        Ok(decoded)
    }

    /// Reads, decompresses and decodes the next probability block
    pub fn read_snp_probability_data<R: Read>(
        &mut self,
        reader: &mut R,
        context: &Context,
        number_of_alleles: usize,
    ) -> Result<SampleProbabilities> {
        self.read_raw_probability_data(reader, context)?;
        self.uncompress_raw_probability_data(context)?;
        self.parse_probability_data(context, number_of_alleles)
    }

    /// Encodes and writes a probability block
    ///
    /// v1.0 and v1.1 blocks only hold diploid biallelic data, so `data` is
    /// collapsed to genotype triplets first.
    ///
    /// # Errors
    ///
    /// If the number of samples in `data` differs from the context, or `data`
    /// cannot be represented in the layout.
    pub fn write_snp_probability_data<W: Write>(
        &mut self,
        writer: &mut W,
        context: &Context,
        data: &SampleProbabilities,
    ) -> Result<()> {
        if data.number_of_samples() != context.number_of_samples as usize {
            return Err(WriteError::SampleCountMismatch {
                expected: context.number_of_samples,
                got: data.number_of_samples() as u32,
            }
            .into());
        }
        let layout = context.layout()?;
        match layout.probability_conversion_factor() {
            Some(factor) => {
                self.encode_fixed_width(context, &data.to_genotype_probabilities()?, factor);
            }
            None => self.encode_v12(data)?,
        }
        self.compress_and_write(writer, context, layout)
    }

    fn encode_fixed_width(
        &mut self,
        context: &Context,
        probabilities: &GenotypeProbabilities,
        factor: f64,
    ) {
        self.uncompressed.clear();
        self.uncompressed
            .resize(context.uncompressed_probability_size(), 0);
        for (entry, values) in self
            .uncompressed
            .chunks_exact_mut(PROBABILITY_ENTRY_SIZE)
            .zip(probabilities)
        {
            for (slot, &value) in entry.chunks_exact_mut(2).zip(values) {
                LittleEndian::write_u16(slot, to_integer_representation(value, factor));
            }
        }
    }

    fn encode_v12(&mut self, data: &SampleProbabilities) -> Result<()> {
        let Ok(number_of_alleles) = u16::try_from(data.number_of_alleles()) else {
            return Err(WriteError::FieldTooLong {
                field: "alleles",
                len: data.number_of_alleles(),
            }
            .into());
        };
        let (min_ploidy, max_ploidy) = data.ploidy_range();
        if max_ploidy > PLOIDY_MASK {
            return Err(WriteError::FieldTooLong {
                field: "ploidy",
                len: usize::from(max_ploidy),
            }
            .into());
        }

        let bits = self.bits;
        self.uncompressed.clear();
        write_little_endian_integer(&mut self.uncompressed, data.number_of_samples() as u32)?;
        write_little_endian_integer(&mut self.uncompressed, number_of_alleles)?;
        self.uncompressed.extend_from_slice(&[min_ploidy, max_ploidy]);
        for sample in 0..data.number_of_samples() {
            let missing = if data.is_missing(sample) { MISSING_SAMPLE } else { 0 };
            self.uncompressed.push(data.ploidy(sample) | missing);
        }
        self.uncompressed.extend_from_slice(&[u8::from(data.is_phased()), bits]);

        let scale = bits::mask(bits);
        let mut writer = BitWriter::new(&mut self.uncompressed);
        for sample in 0..data.number_of_samples() {
            let values = data.values(sample);
            if values.is_empty() {
                continue;
            }
            let group_len = if data.is_phased() {
                data.number_of_alleles()
            } else {
                values.len()
            };
            for group in values.chunks_exact(group_len) {
                if data.is_missing(sample) {
                    self.scaled.clear();
                    self.scaled.resize(group_len, 0);
                } else {
                    round_to_scaled_simplex(group, scale, &mut self.scaled);
                }
                for &value in &self.scaled[..group_len - 1] {
                    writer.write(value, bits);
                }
            }
        }
        writer.finish();
        Ok(())
    }

    fn compress_and_write<W: Write>(
        &mut self,
        writer: &mut W,
        context: &Context,
        layout: Layout,
    ) -> Result<()> {
        let compression = context.compression()?;
        self.raw.clear();
        match compression {
            BlockCompression::None => {}
            BlockCompression::Zlib => {
                let mut encoder = ZlibEncoder::new(&mut self.raw, Compression::default());
                encoder.write_all(&self.uncompressed)?;
                encoder.finish()?;
            }
            BlockCompression::Zstd => {
                let mut encoder = ZstdEncoder::new(&mut self.raw, 0)?;
                encoder.write_all(&self.uncompressed)?;
                encoder.finish()?;
            }
        }

        match (layout, compression) {
            (Layout::V12, BlockCompression::None) => {
                write_little_endian_integer(writer, block_length(self.uncompressed.len())?)?;
                writer.write_all(&self.uncompressed)?;
            }
            (Layout::V12, _) => {
                write_little_endian_integer(writer, block_length(self.raw.len() + 4)?)?;
                write_little_endian_integer(writer, block_length(self.uncompressed.len())?)?;
                writer.write_all(&self.raw)?;
            }
            (_, BlockCompression::None) => writer.write_all(&self.uncompressed)?,
            _ => {
                write_little_endian_integer(writer, block_length(self.raw.len())?)?;
                writer.write_all(&self.raw)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::bgen::{COMPRESSED_SNP_BLOCKS, ZSTD_SNP_BLOCKS};
    use anyhow::Result;
    use std::io::Cursor;

    fn context(number_of_samples: u32, layout: Layout, compressed: bool) -> Context {
        let mut flags = layout.flag_bits();
        if compressed {
            flags |= COMPRESSED_SNP_BLOCKS;
        }
        Context::new(1, number_of_samples, Vec::new(), flags)
    }

    fn test_probabilities(number_of_samples: usize) -> GenotypeProbabilities {
        GenotypeProbabilities::from_fn(number_of_samples, |i| {
            let p = i as f64 / 10000.0;
            [p, p, p]
        })
    }

    fn write_block(
        codec: &mut ProbabilityCodec,
        context: &Context,
        probabilities: &GenotypeProbabilities,
    ) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        codec.write_snp_probability_data(
            &mut buffer,
            context,
            &SampleProbabilities::from(probabilities),
        )?;
        Ok(buffer)
    }

    fn read_block(bytes: &[u8], context: &Context) -> crate::Result<GenotypeProbabilities> {
        ProbabilityCodec::new()
            .read_snp_probability_data(&mut &bytes[..], context, 2)?
            .to_genotype_probabilities()
    }

    #[test]
    fn test_quantization() {
        assert_eq!(to_integer_representation(0.0, 32768.0), 0);
        assert_eq!(to_integer_representation(1.0, 32768.0), 32768);
        assert_eq!(to_integer_representation(0.5, 10000.0), 5000);
        assert_eq!(to_integer_representation(-0.25, 32768.0), 0);
        assert_eq!(to_integer_representation(3.0, 32768.0), u16::MAX);
        // round half up
        assert_eq!(to_integer_representation(0.25, 2.0), 1);
        assert!((from_integer_representation(32768, 32768.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_v10_values_are_exact() -> Result<()> {
        // with a factor of 10000, i / 10000 survives the round trip exactly
        let context = context(1000, Layout::V10, true);
        let probabilities = test_probabilities(1000);
        let buffer = write_block(&mut ProbabilityCodec::new(), &context, &probabilities)?;

        let decoded = read_block(&buffer, &context)?;
        assert_eq!(decoded.number_of_samples(), 1000);
        for (i, entry) in decoded.iter().enumerate() {
            let expected = i as f64 / 10000.0;
            assert!(entry.iter().all(|&p| (p - expected).abs() < 1e-12));
        }
        Ok(())
    }

    #[test]
    fn test_round_trip_within_quantization() -> Result<()> {
        let values = [[0.1, 0.2, 0.7], [0.0, 1.0, 0.0], [0.33, 0.33, 0.34]];
        let probabilities = GenotypeProbabilities::from(values.to_vec());
        for compressed in [true, false] {
            let context = context(3, Layout::V11, compressed);
            let buffer = write_block(&mut ProbabilityCodec::new(), &context, &probabilities)?;
            if !compressed {
                assert_eq!(buffer.len(), 18);
            }
            let decoded = read_block(&buffer, &context)?;
            for (read, written) in decoded.iter().zip(values) {
                for (a, b) in read.iter().zip(written) {
                    assert!((a - b).abs() <= 0.5 / 32768.0);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_inflated_bytes_match_uncompressed_encoding() -> Result<()> {
        let probabilities =
            GenotypeProbabilities::from(vec![[0.1, 0.2, 0.7], [0.0, 1.0, 0.0], [0.33, 0.33, 0.34]]);
        let mut codec = ProbabilityCodec::new();
        let plain = write_block(&mut codec, &context(3, Layout::V11, false), &probabilities)?;

        let compressed_context = context(3, Layout::V11, true);
        let compressed = write_block(&mut codec, &compressed_context, &probabilities)?;
        codec.read_raw_probability_data(&mut compressed.as_slice(), &compressed_context)?;
        let inflated = codec.uncompress_raw_probability_data(&compressed_context)?;
        assert_eq!(inflated, plain.as_slice());
        Ok(())
    }

    fn zlib(payload: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload)?;
        Ok(encoder.finish()?)
    }

    fn compressed_block(payload: &[u8]) -> Result<Vec<u8>> {
        let compressed = zlib(payload)?;
        let mut block = (compressed.len() as u32).to_le_bytes().to_vec();
        block.extend_from_slice(&compressed);
        Ok(block)
    }

    #[test]
    fn test_inflated_size_not_multiple_of_entry() -> Result<()> {
        let context = context(2, Layout::V11, true);
        let block = compressed_block(&[0u8; 11])?;
        let err = read_block(&block, &context).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Read(ReadError::ProbabilityBlockSize { got: 11, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_inflated_size_disagrees_with_samples() -> Result<()> {
        let context = context(2, Layout::V11, true);
        let block = compressed_block(&[0u8; 18])?;
        assert!(read_block(&block, &context).is_err());
        Ok(())
    }

    #[test]
    fn test_inflation_stops_past_expected_size() -> Result<()> {
        // a few kilobytes of zlib that would inflate to 16 MiB
        let context = context(2, Layout::V11, true);
        let block = compressed_block(&vec![0u8; 16 << 20])?;
        assert!(block.len() < 64 << 10);

        let mut codec = ProbabilityCodec::new();
        let err = codec
            .read_snp_probability_data(&mut block.as_slice(), &context, 2)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Read(ReadError::ProbabilityBlockSize {
                expected: 12,
                got: 13
            })
        ));
        assert!(codec.uncompressed.len() <= 13);
        Ok(())
    }

    #[test]
    fn test_oversized_block_length_is_truncation() {
        let mut block = u32::MAX.to_le_bytes().to_vec();
        block.extend_from_slice(&[1, 2, 3]);
        for layout in [Layout::V11, Layout::V12] {
            let context = context(2, layout, true);
            let err = read_block(&block, &context).unwrap_err();
            assert!(matches!(
                err,
                crate::Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof
            ));
        }
    }

    #[test]
    fn test_corrupt_payload() {
        let context = context(2, Layout::V11, true);
        let mut block = 4u32.to_le_bytes().to_vec();
        block.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let err = read_block(&block, &context).unwrap_err();
        assert!(matches!(err, crate::Error::Read(ReadError::Inflate(_))));
    }

    #[test]
    fn test_sample_count_mismatch_on_write() {
        let context = context(4, Layout::V11, true);
        let probabilities = test_probabilities(3);
        assert!(write_block(&mut ProbabilityCodec::new(), &context, &probabilities).is_err());
    }

    #[test]
    fn test_skip_equivalence() -> Result<()> {
        for layout in [Layout::V11, Layout::V12] {
            for compressed in [true, false] {
                let context = context(50, layout, compressed);
                let mut codec = ProbabilityCodec::new();
                let mut buffer = write_block(&mut codec, &context, &test_probabilities(50))?;
                buffer.extend_from_slice(b"trailing");

                let mut decoded = Cursor::new(buffer.clone());
                codec.read_snp_probability_data(&mut decoded, &context, 2)?;

                let mut skipped = Cursor::new(buffer);
                ignore_snp_probability_data(&mut skipped, &context)?;

                assert_eq!(decoded.position(), skipped.position());
                assert_eq!(
                    skipped.position() as usize,
                    skipped.get_ref().len() - b"trailing".len()
                );
            }
        }
        Ok(())
    }

    #[test]
    fn test_v12_byte_layout() -> Result<()> {
        let context = context(1, Layout::V12, false);
        let probabilities = GenotypeProbabilities::from(vec![[1.0, 0.0, 0.0]]);
        let block = write_block(
            &mut ProbabilityCodec::with_bits_per_probability(8),
            &context,
            &probabilities,
        )?;
        let mut expected = 13u32.to_le_bytes().to_vec();
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.extend_from_slice(&2u16.to_le_bytes());
        // min and max ploidy, one ploidy byte, unphased, 8 bits, then AA and AB
        expected.extend_from_slice(&[2, 2, 2, 0, 8, 255, 0]);
        assert_eq!(block, expected);
        assert_eq!(read_block(&block, &context)?, probabilities);
        Ok(())
    }

    fn mixed_samples() -> SampleProbabilities {
        let mut data = SampleProbabilities::new(3, true);
        data.push_sample(2, &[0.7, 0.2, 0.1, 0.0, 0.5, 0.5]);
        data.push_missing(2);
        data.push_sample(1, &[0.0, 0.0, 1.0]);
        data.push_sample(0, &[]);
        data
    }

    #[test]
    fn test_v12_phased_multiallelic_round_trip() -> Result<()> {
        let written = mixed_samples();
        for flags in [0x8, 0x8 | COMPRESSED_SNP_BLOCKS, 0x8 | ZSTD_SNP_BLOCKS] {
            for bits in [8u8, 16, 32] {
                let context = Context::new(1, 4, Vec::new(), flags);
                let mut codec = ProbabilityCodec::with_bits_per_probability(bits);
                let mut buffer = Vec::new();
                codec.write_snp_probability_data(&mut buffer, &context, &written)?;
                let read = codec.read_snp_probability_data(&mut buffer.as_slice(), &context, 3)?;

                assert!(read.is_phased());
                assert_eq!(read.number_of_samples(), 4);
                assert!(read.is_missing(1));
                assert_eq!(read.values(1), [0.0; 6]);
                assert_eq!(read.ploidy(2), 1);
                assert!(read.values(3).is_empty());
                let tolerance = 1.0 / bits::mask(bits) as f64 + 1e-12;
                for sample in [0, 2] {
                    for (got, expected) in read.values(sample).iter().zip(written.values(sample)) {
                        assert!((got - expected).abs() <= tolerance, "{got} vs {expected}");
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_v12_unphased_values_sum_to_one() -> Result<()> {
        let context = context(1, Layout::V12, true);
        let mut written = SampleProbabilities::new(2, false);
        written.push_sample(2, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);
        let mut codec = ProbabilityCodec::with_bits_per_probability(3);
        let mut buffer = Vec::new();
        codec.write_snp_probability_data(&mut buffer, &context, &written)?;
        let read = codec.read_snp_probability_data(&mut buffer.as_slice(), &context, 2)?;
        let sum: f64 = read.values(0).iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_v12_declared_size_is_checked() -> Result<()> {
        let context = context(1, Layout::V12, true);
        let mut codec = ProbabilityCodec::new();
        let mut buffer = Vec::new();
        let data = SampleProbabilities::from(&GenotypeProbabilities::from(vec![[0.0, 1.0, 0.0]]));
        codec.write_snp_probability_data(&mut buffer, &context, &data)?;

        // the declared uncompressed size follows the block size
        let declared = u32::from_le_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]);
        buffer[4..8].copy_from_slice(&(declared - 1).to_le_bytes());
        let err = codec
            .read_snp_probability_data(&mut buffer.as_slice(), &context, 2)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Read(ReadError::ProbabilityBlockSize { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_v12_block_disagreeing_with_variant() -> Result<()> {
        let context = context(1, Layout::V12, false);
        let data = SampleProbabilities::from(&GenotypeProbabilities::from(vec![[0.0, 1.0, 0.0]]));
        let mut buffer = Vec::new();
        ProbabilityCodec::new().write_snp_probability_data(&mut buffer, &context, &data)?;

        let err = ProbabilityCodec::new()
            .read_snp_probability_data(&mut buffer.as_slice(), &context, 3)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Read(ReadError::AlleleCountMismatch {
                expected: 3,
                got: 2
            })
        ));

        // block size, the fields before the bit width and one ploidy byte
        let bits_at = 4 + 9 + 1;
        assert_eq!(buffer[bits_at], DEFAULT_BITS_PER_PROBABILITY);
        buffer[bits_at] = 40;
        assert!(ProbabilityCodec::new()
            .read_snp_probability_data(&mut buffer.as_slice(), &context, 2)
            .is_err());
        Ok(())
    }
}
