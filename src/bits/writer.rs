use super::reverse_bits;

/// Partial-bit register shared by consecutive DEFLATE blocks.
///
/// Bits are appended LSB-first. Whole bytes are moved out by [`flush`](Self::flush),
/// which leaves `count` in `0..=7`; the remainder is carried into whatever
/// block is written next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BitAccumulator {
    register: u64,
    count: u8,
}

impl BitAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the low `n` bits (0-32) of `value`
    #[inline]
    pub fn push(&mut self, value: u32, n: u8) {
        debug_assert!(n <= 32);
        debug_assert!(self.count <= 31, "accumulator must be flushed between pushes");
        if n == 0 {
            return;
        }
        let mask = (1u64 << n) - 1;
        self.register |= (value as u64 & mask) << self.count;
        self.count += n;
    }

    /// Move every complete byte into `out`
    #[inline]
    pub fn flush(&mut self, out: &mut Vec<u8>) {
        while self.count >= 8 {
            out.push(self.register as u8);
            self.register >>= 8;
            self.count -= 8;
        }
    }

    /// Zero-pad to a byte boundary and move everything into `out`
    pub fn pad(&mut self, out: &mut Vec<u8>) {
        self.flush(out);
        if self.count > 0 {
            out.push(self.register as u8);
            self.register = 0;
            self.count = 0;
        }
    }

    /// Number of bits waiting in the register
    #[inline]
    pub fn count(&self) -> u8 {
        self.count
    }
}

/// Bit-level writer for DEFLATE output
///
/// Writes bits LSB-first to match DEFLATE format.
#[derive(Clone, Debug, Default)]
pub struct BitWriter {
    /// Completed output bytes
    output: Vec<u8>,
    acc: BitAccumulator,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `n` bits (0-32) from value in LSB-first order
    pub fn write_bits(&mut self, value: u32, n: u8) {
        self.acc.push(value, n);
        self.acc.flush(&mut self.output);
    }

    /// Write a single bit
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(bit as u32, 1);
    }

    /// Write a Huffman code, most significant bit first
    pub fn write_bits_reversed(&mut self, code: u32, length: u8) {
        self.write_bits(reverse_bits(code, length), length);
    }

    /// Pad to byte boundary with zero bits
    pub fn align_to_byte(&mut self) {
        self.acc.pad(&mut self.output);
    }

    /// Write a 16-bit value in little-endian
    pub fn write_u16_le(&mut self, value: u16) {
        self.write_bits(value as u32, 16);
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.acc.count() == 0 {
            self.output.extend_from_slice(bytes);
        } else {
            for &b in bytes {
                self.write_bits(b as u32, 8);
            }
        }
    }

    /// Total number of bits written so far
    pub fn bit_len(&self) -> usize {
        self.output.len() * 8 + self.acc.count() as usize
    }

    /// Bits waiting in the partial byte
    pub fn pending_bits(&self) -> u8 {
        self.acc.count()
    }

    /// Current output length in bytes (including partial byte)
    pub fn len(&self) -> usize {
        self.output.len() + usize::from(self.acc.count() > 0)
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty() && self.acc.count() == 0
    }

    /// Completed bytes, excluding the partial byte
    pub fn as_bytes(&self) -> &[u8] {
        &self.output
    }

    /// Pad the final byte and return the output
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.output
    }
}
