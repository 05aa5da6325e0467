use super::tables::{fixed_distance_lengths, fixed_literal_lengths};
use crate::bits::BitReader;
use crate::error::{Error, Result};

/// Canonical Huffman decoder for the fixed DEFLATE alphabets
pub struct HuffmanDecoder {
    /// Minimum code length
    min_bits: u8,
    /// Maximum code length
    max_bits: u8,
    /// For each bit length: (first_code, first_symbol_index, count)
    bit_info: [(u32, usize, usize); 16],
    /// Symbols sorted by code length, then by symbol value
    symbols: Vec<u16>,
}

impl HuffmanDecoder {
    /// Build from a complete set of code lengths (each at most 15)
    fn from_code_lengths(lengths: &[u8]) -> Self {
        let mut bl_count = [0usize; 16];
        for &len in lengths {
            debug_assert!(len <= 15);
            if len > 0 {
                bl_count[len as usize] += 1;
            }
        }

        let max_bits = lengths.iter().copied().max().unwrap_or(0);
        let min_bits = (1..=15).find(|&i| bl_count[i] > 0).unwrap_or(1) as u8;

        let mut symbols: Vec<(u16, u8)> = lengths
            .iter()
            .enumerate()
            .filter(|(_, &len)| len > 0)
            .map(|(sym, &len)| (sym as u16, len))
            .collect();
        symbols.sort_by_key(|&(sym, len)| (len, sym));

        let mut bit_info = [(0u32, 0usize, 0usize); 16];
        let mut code = 0u32;
        let mut symbol_idx = 0;
        for bits in 1..=15 {
            code = (code + bl_count[bits - 1] as u32) << 1;
            bit_info[bits] = (code, symbol_idx, bl_count[bits]);
            symbol_idx += bl_count[bits];
        }

        Self {
            min_bits,
            max_bits,
            bit_info,
            symbols: symbols.into_iter().map(|(sym, _)| sym).collect(),
        }
    }

    /// Fixed Huffman table for literal/length codes (RFC 1951 section 3.2.6)
    pub fn fixed_literal_length() -> Self {
        Self::from_code_lengths(&fixed_literal_lengths())
    }

    /// Fixed Huffman table for distance codes
    pub fn fixed_distance() -> Self {
        Self::from_code_lengths(&fixed_distance_lengths())
    }

    /// Decode next symbol from bitstream
    pub fn decode(&self, bits: &mut BitReader<'_>) -> Result<u16> {
        let mut code = 0u32;
        for len in 1..=self.max_bits {
            // codes are packed MSB-first
            code = (code << 1) | bits.read_bits(1)?;
            if len < self.min_bits {
                continue;
            }
            let (first_code, first_idx, count) = self.bit_info[len as usize];
            if count > 0 && code >= first_code && code < first_code + count as u32 {
                return Ok(self.symbols[first_idx + (code - first_code) as usize]);
            }
        }

        Err(Error::InvalidHuffmanSymbol(code as u16))
    }
}
