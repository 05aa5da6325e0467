use super::tables::{decode_distance, decode_length, DISTANCE_TABLE, END_OF_BLOCK, LENGTH_TABLE};
use super::tokens::Token;
use crate::bits::BitReader;
use crate::error::{Error, Result};
use crate::huffman::HuffmanDecoder;

/// One decoded DEFLATE block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub is_final: bool,
    /// 0 = stored, 1 = fixed Huffman
    pub block_type: u8,
    pub tokens: Vec<Token>,
}

/// Reference inflater for the subset of DEFLATE this crate writes.
///
/// Handles stored and fixed-Huffman blocks; dynamic blocks are rejected
/// with [`Error::InvalidBlockType`].
pub struct Inflater<'a> {
    bits: BitReader<'a>,
    lit_decoder: HuffmanDecoder,
    dist_decoder: HuffmanDecoder,
    /// Whether we've seen the final block
    finished: bool,
}

impl<'a> Inflater<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            bits: BitReader::new(data),
            lit_decoder: HuffmanDecoder::fixed_literal_length(),
            dist_decoder: HuffmanDecoder::fixed_distance(),
            finished: false,
        }
    }

    /// Parse the next block, or `None` after the final one
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        if self.finished {
            return Ok(None);
        }

        let is_final = self.bits.read_bit()?;
        let block_type = self.bits.read_bits(2)? as u8;

        let tokens = match block_type {
            0 => self.parse_stored_block()?,
            1 => self.parse_fixed_block()?,
            _ => return Err(Error::InvalidBlockType(block_type)),
        };

        self.finished = is_final;
        Ok(Some(Block { is_final, block_type, tokens }))
    }

    fn parse_stored_block(&mut self) -> Result<Vec<Token>> {
        let len = self.bits.read_u16_le()?;
        let nlen = self.bits.read_u16_le()?;
        if len != !nlen {
            return Err(Error::StoredBlockLengthMismatch { len, nlen });
        }

        let mut raw = vec![0u8; len as usize];
        self.bits.read_bytes(&mut raw)?;
        Ok(raw.into_iter().map(Token::Literal).collect())
    }

    fn parse_fixed_block(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let sym = self.lit_decoder.decode(&mut self.bits)?;
            match sym {
                0..=255 => tokens.push(Token::Literal(sym as u8)),
                END_OF_BLOCK => break,
                257..=285 => {
                    let (_, extra_bits) = LENGTH_TABLE[(sym - 257) as usize];
                    let extra = self.bits.read_bits(extra_bits)?;
                    let length = decode_length(sym, extra).ok_or(Error::InvalidLengthCode(sym))?;

                    let dist_sym = self.dist_decoder.decode(&mut self.bits)?;
                    let (_, dist_extra_bits) = *DISTANCE_TABLE
                        .get(dist_sym as usize)
                        .ok_or(Error::InvalidDistanceCode(dist_sym))?;
                    let dist_extra = self.bits.read_bits(dist_extra_bits)?;
                    let distance = decode_distance(dist_sym, dist_extra)
                        .ok_or(Error::InvalidDistanceCode(dist_sym))?;

                    tokens.push(Token::repeat(distance as u32, length as u32));
                }
                _ => return Err(Error::InvalidLengthCode(sym)),
            }
        }

        Ok(tokens)
    }

    /// Bytes of input consumed so far
    pub fn bytes_consumed(&self) -> usize {
        self.bits.bytes_consumed()
    }
}

/// Apply one block's tokens to the output window
fn apply(out: &mut Vec<u8>, tokens: &[Token]) -> Result<()> {
    for token in tokens {
        match *token {
            Token::Literal(byte) => out.push(byte),
            Token::Repeat { distance, length } => {
                let distance = distance as usize;
                if distance > out.len() {
                    return Err(Error::InvalidBackReference { distance, available: out.len() });
                }
                let start = out.len() - distance;
                for i in 0..length as usize {
                    out.push(out[start + i]);
                }
            }
        }
    }
    Ok(())
}

/// Decompress a raw DEFLATE stream
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Inflater::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    while let Some(block) = inflater.next_block()? {
        apply(&mut out, &block.tokens)?;
    }
    Ok(out)
}

/// Decode every block of a raw DEFLATE stream without expanding it
pub fn blocks(data: &[u8]) -> Result<Vec<Block>> {
    let mut inflater = Inflater::new(data);
    let mut blocks = Vec::new();
    while let Some(block) = inflater.next_block()? {
        blocks.push(block);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stored_block() {
        // Stored block: BFINAL=1, BTYPE=00, LEN=5, NLEN=!5, "Hello"
        let data = vec![
            0b00000001, // BFINAL=1, BTYPE=00 (stored) - packed LSB first
            0x05, 0x00, // LEN = 5
            0xFA, 0xFF, // NLEN = !5 = 0xFFFA
            b'H', b'e', b'l', b'l', b'o',
        ];

        let mut inflater = Inflater::new(&data);
        let block = inflater.next_block().unwrap().unwrap();
        assert!(block.is_final);
        assert_eq!(block.block_type, 0);
        assert_eq!(block.tokens.len(), 5);
        assert_eq!(block.tokens[0], Token::Literal(b'H'));
        assert!(inflater.next_block().unwrap().is_none());
        assert_eq!(inflater.bytes_consumed(), data.len());
    }

    #[test]
    fn test_stored_length_mismatch() {
        let data = [0x01, 0x05, 0x00, 0xFB, 0xFF];
        assert!(matches!(inflate(&data), Err(Error::StoredBlockLengthMismatch { .. })));
    }

    #[test]
    fn test_empty_final_block() {
        assert_eq!(inflate(&[0x01, 0x00, 0x00, 0xFF, 0xFF]).unwrap(), b"");
    }

    #[test]
    fn test_fixed_block_from_flate2() {
        use std::io::Write;
        // short input at level 1 comes out as fixed Huffman
        let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(b"Hello, Hello, Hello, World!").unwrap();
        let compressed = encoder.finish().unwrap();

        let blocks = blocks(&compressed).unwrap();
        assert!(blocks.iter().any(|b| b.block_type == 1));
        assert_eq!(inflate(&compressed).unwrap(), b"Hello, Hello, Hello, World!");
    }

    #[test]
    fn test_bad_back_reference() {
        // fixed block holding only Repeat(1, 3): code 257 (0000001), distance code 0
        let mut writer = crate::bits::BitWriter::new();
        writer.write_bits(1, 1);
        writer.write_bits(1, 2);
        writer.write_bits_reversed(1, 7);
        writer.write_bits_reversed(0, 5);
        writer.write_bits_reversed(0, 7);
        let data = writer.finish();
        assert!(matches!(inflate(&data), Err(Error::InvalidBackReference { distance: 1, .. })));
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(inflate(&[0x00, 0x05]), Err(Error::UnexpectedEof)));
    }
}
