//! Single self-reproducing DEFLATE stream.
//!
//! Layout of the stream `Q` for a prefix `P` and suffix `S`:
//!
//! ```text
//! stored  [P, L(p+5)]
//! chain   repeat blocks, each followed by three stored blocks that
//!         reproduce it and describe the next, down to 20 bytes
//! unit    R4 and the constant 20-byte pieces that carry the chain
//!         across the closing literal
//! stored  [Y, S]
//! Y       repeat copying `Y S`, an empty stored block, a final empty block
//! ```
//!
//! Inflating `Q` yields `P Q S`.

use tracing::debug;

use super::layout::QuineLayout;
use super::plan::{plan_chain, tail_repeat, RepeatBlock, R4, UNIT_LEN};
use crate::deflate::tables::{MAX_DISTANCE, MAX_STORED_LEN};
use crate::error::{Error, Result};
use crate::huffman::encoder::{static_block_bytes, stored_header};
use crate::huffman::StaticHuffmanEncoder;

/// Bytes of a stored block header that follows another stored block
pub(crate) const STORED_HEADER_LEN: usize = 5;

/// A generated quine stream and where its copies landed
#[derive(Clone, Debug)]
pub struct Quine {
    pub bytes: Vec<u8>,
    pub layout: QuineLayout,
}

impl Quine {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Block-level writer for quine streams. All stored blocks are non-final
/// until [`finish`](Self::finish).
pub(crate) struct QuineStream {
    encoder: StaticHuffmanEncoder,
}

impl QuineStream {
    pub(crate) fn new() -> Self {
        Self { encoder: StaticHuffmanEncoder::new() }
    }

    /// Stream length so far
    pub(crate) fn len(&self) -> usize {
        self.encoder.len()
    }

    pub(crate) fn stored(&mut self, literals: &[u8]) {
        self.encoder.encode_stored_block(literals, false);
    }

    pub(crate) fn repeat(&mut self, block: &RepeatBlock) {
        self.encoder.encode_repeat_static_block(&block.tokens, false);
    }

    /// One step of the chain: the repeat block, then stored blocks that
    /// output the block, its header, and the bytes the next step copies
    pub(crate) fn chain_step(&mut self, block: &RepeatBlock) {
        let next = block.next_len() as usize;
        let own_header = block.header(block.bytes.len());

        self.repeat(block);
        self.stored(&block.bytes);
        self.stored(&own_header);

        let mut echo = Vec::with_capacity(next);
        echo.extend_from_slice(&block.bytes);
        echo.extend(stored_header(block.header_len, 0));
        echo.extend_from_slice(&own_header);
        echo.extend(stored_header(next, 0));
        debug_assert_eq!(echo.len(), next);
        self.stored(&echo);
    }

    /// The final unit of the chain, leading into a closing literal of
    /// `literal_len` bytes
    pub(crate) fn unit(&mut self, literal_len: usize) {
        let unit = RepeatBlock::new(R4.to_vec());
        let r4 = static_block_bytes(&R4);
        let l_unit = stored_header(UNIT_LEN as usize, 0);
        let l_empty = stored_header(0, 0);

        self.repeat(&unit);
        self.stored(&[r4.as_slice(), &l_unit, &r4, &l_unit].concat());
        self.repeat(&unit);
        self.stored(&[r4.as_slice(), &l_empty, &l_empty, &stored_header(literal_len, 0)].concat());
        self.repeat(&unit);
        self.stored(&[]);
        self.stored(&[]);
    }

    /// Write the closing literal and return its offset
    pub(crate) fn literal(&mut self, literal: &[u8]) -> usize {
        self.stored(literal);
        self.len() - literal.len()
    }

    /// Close with `tail`, an empty stored block and the final empty block
    pub(crate) fn finish(mut self, tail: &RepeatBlock) -> Result<Vec<u8>> {
        self.repeat(tail);
        self.encoder.encode_stored_block(&[], false);
        self.encoder.encode_stored_block(&[], true);
        let bytes = self.encoder.into_bytes();
        if !bytes.ends_with(&tail.terminated()) {
            return Err(Error::Internal("quine stream does not end on its closing repeat".into()));
        }
        Ok(bytes)
    }
}

/// Build the stream `Q` whose inflated form is `prefix Q suffix`.
///
/// `prefix` is everything in the archive before the quine entry's data
/// (its local header included) and `suffix` everything after it.
pub fn generate_quine(prefix: &[u8], suffix: &[u8]) -> Result<Quine> {
    let head_len = prefix.len() + STORED_HEADER_LEN;
    if head_len > MAX_STORED_LEN {
        return Err(Error::InputTooLarge { size: head_len, max: MAX_STORED_LEN });
    }
    if head_len > MAX_DISTANCE {
        return Err(Error::DistanceTooLarge { distance: head_len, max: MAX_DISTANCE });
    }

    let chain = plan_chain(head_len as u32)?;
    let tail = tail_repeat(suffix.len())?;
    let closing = [tail.terminated().as_slice(), suffix].concat();
    if closing.len() > MAX_STORED_LEN {
        return Err(Error::InputTooLarge { size: closing.len(), max: MAX_STORED_LEN });
    }

    let mut stream = QuineStream::new();
    stream.stored(&[prefix, &stored_header(head_len, 0)].concat());
    for block in &chain {
        stream.chain_step(block);
    }
    stream.unit(closing.len());
    let tail_literal = stream.literal(&closing);
    let bytes = stream.finish(&tail)?;

    debug!(
        prefix = prefix.len(),
        suffix = suffix.len(),
        chain = chain.len(),
        quine = bytes.len(),
        "Generated quine stream"
    );

    Ok(Quine {
        layout: QuineLayout {
            prefix_copies: vec![STORED_HEADER_LEN],
            tail_literal,
            tail_len: closing.len() - suffix.len(),
        },
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deflate::inflate;
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    fn filler(len: usize, mul: u32) -> Vec<u8> {
        (0..len as u32).map(|i| (i.wrapping_mul(mul) >> 3) as u8).collect()
    }

    fn flate2_inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        DeflateDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    fn assert_reproduces(prefix: &[u8], suffix: &[u8]) -> Quine {
        let quine = generate_quine(prefix, suffix).unwrap();
        let expected = [prefix, &quine.bytes, suffix].concat();
        assert_eq!(inflate(&quine.bytes).unwrap(), expected);
        assert_eq!(flate2_inflate(&quine.bytes), expected);
        quine
    }

    #[test]
    fn test_reproduces_itself() {
        for (p, s) in [(30, 22), (75, 68), (300, 80), (1000, 250)] {
            assert_reproduces(&filler(p, 0x9E37_79B9), &filler(s, 0x85EB_CA6B));
        }
    }

    #[test]
    fn test_copies_longer_than_two_tokens() {
        for p in [517, 600, 777, 2049, 9000] {
            for s in [22, 600] {
                assert_reproduces(&filler(p, 0x2545_F491), &filler(s, 0x85EB_CA6B));
            }
        }
    }

    #[test]
    fn test_empty_prefix() {
        assert_reproduces(&[], &filler(22, 7));
    }

    #[test]
    fn test_large_prefix() {
        assert_reproduces(&filler(20_000, 0x2545_F491), &filler(120, 3));
    }

    #[test]
    fn test_layout_points_at_copies() {
        let prefix = filler(64, 11);
        let suffix = filler(40, 13);
        let quine = assert_reproduces(&prefix, &suffix);

        let copy = quine.layout.prefix_copies[0];
        assert_eq!(&quine.bytes[copy..copy + prefix.len()], prefix.as_slice());

        let tail = quine.layout.tail_literal;
        let y = quine.layout.tail_len;
        assert_eq!(&quine.bytes[tail + y..tail + y + suffix.len()], suffix.as_slice());
        assert_eq!(&quine.bytes[tail..tail + y], &quine.bytes[quine.len() - y..]);
        assert_eq!(tail + y + suffix.len() + y, quine.len());
    }

    #[test]
    fn test_size_depends_only_on_lengths() {
        let a = generate_quine(&filler(200, 3), &filler(50, 5)).unwrap();
        let b = generate_quine(&filler(200, 17), &filler(50, 19)).unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(a.layout, b.layout);
    }

    #[test]
    fn test_prefix_too_large() {
        let err = generate_quine(&vec![0u8; 70_000], &[0u8; 22]).unwrap_err();
        assert!(matches!(err, Error::InputTooLarge { .. }));

        let err = generate_quine(&vec![0u8; 40_000], &[0u8; 22]).unwrap_err();
        assert!(matches!(err, Error::DistanceTooLarge { .. }));
    }
}
