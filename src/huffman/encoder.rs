use crate::bits::{u16_le, BitWriter};
use crate::deflate::tables::{
    encode_distance, encode_length, END_OF_BLOCK, MAX_MATCH, MAX_STORED_LEN, MIN_MATCH,
};
use crate::deflate::tokens::Token;

/// Block header plus end-of-block code of a fixed Huffman block
const STATIC_BLOCK_OVERHEAD_BITS: usize = 3 + 7;

/// DEFLATE encoder restricted to stored and fixed-Huffman blocks.
///
/// The encoder owns the partial byte left behind by a fixed-Huffman block, so
/// consecutive calls append to one continuous bit stream. Each call returns
/// only the bytes it completed; the whole stream is available from
/// [`into_bytes`](Self::into_bytes).
pub struct StaticHuffmanEncoder {
    writer: BitWriter,
    /// Bytes already returned by earlier calls
    emitted: usize,
    /// Fixed literal/length codes (precomputed)
    lit_codes: Vec<(u32, u8)>,
    /// Fixed distance codes (precomputed)
    dist_codes: Vec<(u32, u8)>,
}

impl Default for StaticHuffmanEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticHuffmanEncoder {
    pub fn new() -> Self {
        Self {
            writer: BitWriter::new(),
            emitted: 0,
            lit_codes: build_codes_from_lengths(&super::tables::fixed_literal_lengths()),
            dist_codes: build_codes_from_lengths(&super::tables::fixed_distance_lengths()),
        }
    }

    /// Bits of the current partial byte (0-7)
    pub fn pending_bits(&self) -> u8 {
        self.writer.pending_bits()
    }

    /// Stream length so far, counting a partial byte as a whole one
    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    fn take_new(&mut self) -> Vec<u8> {
        let done = self.writer.as_bytes();
        let new = done[self.emitted..].to_vec();
        self.emitted = done.len();
        new
    }

    /// Write a stored block holding `literals` verbatim.
    ///
    /// # Panics
    ///
    /// If `literals` is longer than a stored block can describe.
    pub fn encode_stored_block(&mut self, literals: &[u8], is_last: bool) -> Vec<u8> {
        assert!(literals.len() <= MAX_STORED_LEN, "stored block of {} bytes", literals.len());
        let len = literals.len() as u16;

        self.writer.write_bit(is_last);
        self.writer.write_bits(0, 2); // BTYPE = 00 (stored)
        self.writer.align_to_byte();
        self.writer.write_u16_le(len);
        self.writer.write_u16_le(!len);
        self.writer.write_bytes(literals);

        self.take_new()
    }

    /// Write a fixed-Huffman block. The final partial byte is held back for
    /// the next block unless `is_last` is set.
    pub fn encode_repeat_static_block(&mut self, tokens: &[Token], is_last: bool) -> Vec<u8> {
        self.writer.write_bit(is_last);
        self.writer.write_bits(1, 2); // BTYPE = 01 (fixed Huffman)

        for token in tokens {
            match *token {
                Token::Literal(byte) => {
                    let (code, len) = self.lit_codes[byte as usize];
                    self.writer.write_bits_reversed(code, len);
                }
                Token::Repeat { distance, length } => {
                    let entry = encode_length(length);
                    let (code, code_len) = self.lit_codes[entry.code as usize];
                    self.writer.write_bits_reversed(code, code_len);
                    self.writer.write_bits(entry.extra_value as u32, entry.extra_bits);

                    let entry = encode_distance(distance);
                    let (code, code_len) = self.dist_codes[entry.code as usize];
                    self.writer.write_bits_reversed(code, code_len);
                    self.writer.write_bits(entry.extra_value as u32, entry.extra_bits);
                }
            }
        }

        let (code, len) = self.lit_codes[END_OF_BLOCK as usize];
        self.writer.write_bits_reversed(code, len);

        if is_last {
            self.writer.align_to_byte();
        }
        self.take_new()
    }

    /// Zero-pad the partial byte and return it
    pub fn align(&mut self) -> Vec<u8> {
        self.writer.align_to_byte();
        self.take_new()
    }

    /// Encode a whole token stream: literal runs become stored blocks and
    /// repeat runs become fixed-Huffman blocks, alternating as the stream
    /// switches kind. The last block is marked final.
    pub fn encode(&mut self, tokens: &[Token]) -> Vec<u8> {
        let mut out = Vec::new();
        if tokens.is_empty() {
            out.extend(self.encode_stored_block(&[], true));
            return out;
        }

        let mut start = 0;
        while start < tokens.len() {
            let literal_run = tokens[start].is_literal();
            let end = tokens[start..]
                .iter()
                .position(|t| t.is_literal() != literal_run)
                .map_or(tokens.len(), |i| start + i);
            let is_last = end == tokens.len();

            if literal_run {
                let bytes: Vec<u8> = tokens[start..end]
                    .iter()
                    .filter_map(|t| match t {
                        Token::Literal(b) => Some(*b),
                        Token::Repeat { .. } => None,
                    })
                    .collect();
                let chunks: Vec<&[u8]> = bytes.chunks(MAX_STORED_LEN).collect();
                for (i, chunk) in chunks.iter().enumerate() {
                    out.extend(self.encode_stored_block(chunk, is_last && i + 1 == chunks.len()));
                }
            } else {
                out.extend(self.encode_repeat_static_block(&tokens[start..end], is_last));
            }
            start = end;
        }
        out
    }

    /// The complete stream, with the partial byte zero-padded
    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.finish()
    }
}

/// Bits one token takes inside a fixed-Huffman block
pub fn token_bits(token: &Token) -> usize {
    match *token {
        Token::Literal(byte) => {
            if byte < 144 {
                8
            } else {
                9
            }
        }
        Token::Repeat { distance, length } => {
            let len = encode_length(length);
            // codes 257-279 are 7 bits, 280-287 are 8
            let len_code_bits = if len.code < 280 { 7 } else { 8 };
            let dist = encode_distance(distance);
            len_code_bits + len.extra_bits as usize + 5 + dist.extra_bits as usize
        }
    }
}

/// Bits of a complete fixed-Huffman block, header and end-of-block included
pub fn static_block_bits(tokens: &[Token]) -> usize {
    STATIC_BLOCK_OVERHEAD_BITS + tokens.iter().map(token_bits).sum::<usize>()
}

/// A fixed-Huffman block written from a byte boundary, zero-padded
pub fn static_block_bytes(tokens: &[Token]) -> Vec<u8> {
    let mut encoder = StaticHuffmanEncoder::new();
    let mut bytes = encoder.encode_repeat_static_block(tokens, false);
    bytes.extend(encoder.align());
    bytes
}

/// Bytes a non-final stored header adds after a block that left `pending`
/// bits (0-7) in the partial byte: the three header bits fit in that byte
/// when `pending` is 1 to 5.
pub fn stored_header_len(pending: u8) -> usize {
    if (1..=5).contains(&pending) {
        4
    } else {
        5
    }
}

/// Bytes of a non-final stored header for `len` bytes of payload, as laid
/// down after `pending` carried bits
pub fn stored_header(len: usize, pending: u8) -> Vec<u8> {
    debug_assert!(len <= MAX_STORED_LEN);
    let mut header = Vec::with_capacity(5);
    if stored_header_len(pending) == 5 {
        header.push(0);
    }
    header.extend_from_slice(&u16_le(len as u32));
    header.extend_from_slice(&u16_le(!(len as u32)));
    header
}

/// Split one repeat into two whose fixed-Huffman block is exactly five bytes
pub fn five_byte_repeat(token: &Token) -> Option<[Token; 2]> {
    let Token::Repeat { distance, length } = *token else {
        return None;
    };
    let (min, max) = (MIN_MATCH as u32, MAX_MATCH as u32);
    // both halves stay inside 3..=258
    (length.saturating_sub(max).max(min)..=length.saturating_sub(min).min(max)).find_map(|first| {
        let pair = [Token::repeat(distance, first), Token::repeat(distance, length - first)];
        ((static_block_bits(&pair) + 7) / 8 == 5).then_some(pair)
    })
}

/// Build canonical Huffman codes from code lengths
fn build_codes_from_lengths(lengths: &[u8]) -> Vec<(u32, u8)> {
    let max_bits = *lengths.iter().max().unwrap_or(&0);

    // Count codes of each length
    let mut bl_count = vec![0u32; max_bits as usize + 1];
    for &len in lengths {
        if len > 0 {
            bl_count[len as usize] += 1;
        }
    }

    // Compute first code for each bit length
    let mut next_code = vec![0u32; max_bits as usize + 1];
    let mut code = 0u32;
    for bits in 1..=max_bits as usize {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }

    let mut codes = vec![(0u32, 0u8); lengths.len()];
    for (sym, &len) in lengths.iter().enumerate() {
        if len > 0 {
            codes[sym] = (next_code[len as usize], len);
            next_code[len as usize] += 1;
        }
    }

    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deflate::inflate::inflate;

    /// Two `Repeat(20, 10)` tokens: exactly forty bits
    const R4: [u8; 5] = [0x42, 0x88, 0x21, 0xc4, 0x00];

    #[test]
    fn test_build_fixed_literal_codes() {
        let codes = build_codes_from_lengths(&crate::huffman::tables::fixed_literal_lengths());
        assert_eq!(codes.len(), 288);
        assert_eq!(codes[0], (0x30, 8));
        assert_eq!(codes[143], (0xBF, 8));
        assert_eq!(codes[144], (0x190, 9));
        assert_eq!(codes[256], (0, 7));
        assert_eq!(codes[279], (0x17, 7));
        assert_eq!(codes[280], (0xC0, 8));
    }

    #[test]
    fn test_stored_block() {
        let mut encoder = StaticHuffmanEncoder::new();
        let out = encoder.encode_stored_block(b"abc", false);
        assert_eq!(out, [0x00, 0x03, 0x00, 0xFC, 0xFF, b'a', b'b', b'c']);
        // LEN and NLEN are complements and the block is 5 + len bytes
        assert_eq!(u16::from_le_bytes([out[1], out[2]]), !u16::from_le_bytes([out[3], out[4]]));

        let out = encoder.encode_stored_block(&[], true);
        assert_eq!(out, [0x01, 0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_r4_block() {
        let tokens = [Token::repeat(20, 10), Token::repeat(20, 10)];
        assert_eq!(static_block_bits(&tokens), 40);
        let mut encoder = StaticHuffmanEncoder::new();
        assert_eq!(encoder.encode_repeat_static_block(&tokens, false), R4);
        assert_eq!(encoder.pending_bits(), 0);
        assert_eq!(static_block_bytes(&tokens), R4);
    }

    #[test]
    fn test_partial_byte_carries_into_stored_header() {
        let tokens = [Token::repeat(24, 12), Token::repeat(24, 12)];
        let mut encoder = StaticHuffmanEncoder::new();
        let first = encoder.encode_repeat_static_block(&tokens, false);
        // 42 bits: five whole bytes out, two bits held back
        assert_eq!(first.len(), 5);
        assert_eq!(encoder.pending_bits(), 2);
        let second = encoder.encode_stored_block(&[], false);
        assert_eq!(second, [0x00, 0x00, 0x00, 0xFF, 0xFF]);
        assert_eq!(stored_header_len(2), 4);
    }

    #[test]
    fn test_encode_golden_vector() {
        let input = [
            0x1f, 0x8b, 0x08, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x71, 0x75, 0x69, 0x6e,
            0x65, 0x2e, 0x67, 0x7a, 0x00, 0x00, 0x18, 0x00, 0xe7, 0xff,
        ];
        let mut tokens: Vec<Token> = input.iter().map(|&b| Token::Literal(b)).collect();
        tokens.push(Token::repeat(24, 12));
        tokens.push(Token::repeat(24, 12));
        tokens.push(Token::Literal(0x77));

        let out = StaticHuffmanEncoder::new().encode(&tokens);

        let mut expected = vec![0x00, 0x18, 0x00, 0xe7, 0xff];
        expected.extend_from_slice(&input);
        expected.extend_from_slice(&[0x42, 0x16, 0x47, 0x16, 0x07, 0x04, 0x01, 0x00, 0xfe, 0xff, 0x77]);
        assert_eq!(out, expected);

        let mut plain = input.to_vec();
        plain.extend_from_slice(&input);
        plain.push(0x77);
        assert_eq!(inflate(&out).unwrap(), plain);
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(StaticHuffmanEncoder::new().encode(&[]), [0x01, 0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_encode_ends_on_repeat() {
        let tokens = [Token::Literal(b'a'), Token::repeat(1, 20)];
        let mut encoder = StaticHuffmanEncoder::new();
        let out = encoder.encode(&tokens);
        assert_eq!(encoder.len(), out.len());
        assert_eq!(inflate(&out).unwrap(), vec![b'a'; 21]);
    }

    #[test]
    fn test_encode_long_literal_run() {
        let data: Vec<u8> = (0..70_000u32).map(|i| (i * 7 % 251) as u8).collect();
        let tokens: Vec<Token> = data.iter().map(|&b| Token::Literal(b)).collect();
        let out = StaticHuffmanEncoder::new().encode(&tokens);
        // two stored blocks
        assert_eq!(out.len(), data.len() + 10);
        assert_eq!(inflate(&out).unwrap(), data);
    }

    #[test]
    fn test_token_bits_match_encoder() {
        for &(d, l) in &[(1, 3), (20, 10), (300, 258), (32768, 257), (24577, 131), (5, 11)] {
            let tokens = [Token::repeat(d, l)];
            let mut encoder = StaticHuffmanEncoder::new();
            let bytes = encoder.encode_repeat_static_block(&tokens, false);
            let total = bytes.len() * 8 + encoder.pending_bits() as usize;
            assert_eq!(total, static_block_bits(&tokens), "Repeat({d}, {l})");
        }
    }

    #[test]
    fn test_stored_header_widths() {
        assert_eq!(stored_header(20, 0), [0x00, 0x14, 0x00, 0xEB, 0xFF]);
        assert_eq!(stored_header(20, 3), [0x14, 0x00, 0xEB, 0xFF]);
        assert_eq!(stored_header(0, 6), [0x00, 0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_five_byte_repeat() {
        let pair = five_byte_repeat(&Token::repeat(20, 20)).unwrap();
        assert_eq!(pair, [Token::repeat(20, 10), Token::repeat(20, 10)]);
        assert_eq!(static_block_bytes(&pair), R4);

        // single short repeats are too small to pad out to five bytes
        assert!(five_byte_repeat(&Token::repeat(21, 21)).is_none());
        assert!(five_byte_repeat(&Token::Literal(0)).is_none());
        assert!(five_byte_repeat(&Token::repeat(5, 5)).is_none());
    }

    #[test]
    fn test_five_byte_repeat_long_lengths() {
        for length in [259, 300, 516, 517, 600, 1000, 32768] {
            if let Some(pair) = five_byte_repeat(&Token::repeat(length, length)) {
                for token in pair {
                    let Token::Repeat { length: l, .. } = token else { panic!("literal in pair") };
                    assert!((3..=258).contains(&l), "half of {length} is {l}");
                }
            }
        }
        assert!(five_byte_repeat(&Token::repeat(600, 600)).is_none());
    }
}
