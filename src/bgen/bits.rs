//! Little-endian bit packing of v1.2 probabilities
//!
//! Values of `bits` bits are packed back to back starting at the least
//! significant bit of the first byte. The final byte is zero-padded.

/// Largest bit width a v1.2 probability may use
pub const MAX_BITS: u8 = 32;

/// Appends fixed-width values to a byte buffer
pub struct BitWriter<'a> {
    out: &'a mut Vec<u8>,
    buffer: u64,
    filled: u32,
}
impl<'a> BitWriter<'a> {
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        Self {
            out,
            buffer: 0,
            filled: 0,
        }
    }

    /// Writes the lowest `bits` bits of `value`
    pub fn write(&mut self, value: u64, bits: u8) {
        debug_assert!((1..=MAX_BITS).contains(&bits));
        self.buffer |= (value & mask(bits)) << self.filled;
        self.filled += u32::from(bits);
        while self.filled >= 8 {
            self.out.push(self.buffer as u8);
            self.buffer >>= 8;
            self.filled -= 8;
        }
    }

    /// Writes any partial byte
    pub fn finish(self) {
        if self.filled > 0 {
            self.out.push(self.buffer as u8);
        }
    }
}

/// Reads fixed-width values from a byte slice
pub struct BitReader<'a> {
    data: &'a [u8],
    buffer: u64,
    filled: u32,
}
impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            buffer: 0,
            filled: 0,
        }
    }

    /// Reads the next `bits`-bit value, or `None` once the data runs out
    pub fn read(&mut self, bits: u8) -> Option<u64> {
        while self.filled < u32::from(bits) {
            let (&byte, rest) = self.data.split_first()?;
            self.data = rest;
            self.buffer |= u64::from(byte) << self.filled;
            self.filled += 8;
        }
        let value = self.buffer & mask(bits);
        self.buffer >>= bits;
        self.filled -= u32::from(bits);
        Some(value)
    }
}

/// The largest value representable in `bits` bits
#[must_use]
pub fn mask(bits: u8) -> u64 {
    (1u64 << bits) - 1
}

/// Bytes needed to hold `count` values of `bits` bits, `None` on overflow
#[must_use]
pub fn packed_size(count: usize, bits: u8) -> Option<usize> {
    count
        .checked_mul(usize::from(bits))
        .map(|total| total.div_ceil(8))
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_packing_order() {
        let mut out = Vec::new();
        let mut writer = BitWriter::new(&mut out);
        writer.write(0b101, 3);
        writer.write(0b11, 2);
        writer.write(0x1FF, 9);
        writer.finish();
        // 101 | 11 << 3 | 111111111 << 5, little-endian
        assert_eq!(out, [0b1111_1101, 0b0011_1111]);
        assert_eq!(packed_size(3, 5), Some(2));
        assert_eq!(packed_size(usize::MAX, 2), None);

        let mut reader = BitReader::new(&out);
        assert_eq!(reader.read(3), Some(0b101));
        assert_eq!(reader.read(2), Some(0b11));
        assert_eq!(reader.read(9), Some(0x1FF));
        assert_eq!(reader.read(8), None);
    }

    #[test]
    fn test_widths() {
        for bits in [1u8, 7, 8, 13, 16, 31, 32] {
            let values: Vec<u64> = (0..20).map(|i| (i * 2_654_435_761) & mask(bits)).collect();
            let mut out = Vec::new();
            let mut writer = BitWriter::new(&mut out);
            for &value in &values {
                writer.write(value, bits);
            }
            writer.finish();
            assert_eq!(Some(out.len()), packed_size(values.len(), bits));

            let mut reader = BitReader::new(&out);
            for &value in &values {
                assert_eq!(reader.read(bits), Some(value));
            }
        }
    }
}
