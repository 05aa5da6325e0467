//! Two streams that reproduce each other.
//!
//! Stream A inflates to `P_B Q_B S_B` and stream B to `P_A Q_A S_A`, so an
//! archive holding `Q_A` contains the archive holding `Q_B` and the other
//! way round. Both prefixes must have the same length `p`.
//!
//! ```text
//! stored  [P_B, L(p+5)]           (stream B swaps the prefixes)
//! stored  [P_A, L(p+5), L(p+10)]
//! R       copies P_B L(p+5) from 2p+15 back and L(p+10) from p+10 back
//! chain   as for a single quine, starting from R
//! unit
//! stored  [Y_B, S_B, Y_A, S_A]   (same literal in both streams)
//! Y_A     copies Y_B S_B          (stream B: Y_B copies Y_A S_A)
//! ```

use tracing::debug;

use super::builder::{Quine, QuineStream, STORED_HEADER_LEN};
use super::layout::QuineLayout;
use super::plan::{chunks, loop_tail_repeats, plan_chain, RepeatBlock};
use crate::deflate::tables::{MAX_DISTANCE, MAX_STORED_LEN};
use crate::deflate::Token;
use crate::error::{Error, Result};
use crate::huffman::encoder::stored_header;

/// A pair of mutually reproducing streams
#[derive(Clone, Debug)]
pub struct QuineLoop {
    /// Lives in archive A, inflates to archive B
    pub a: Quine,
    /// Lives in archive B, inflates to archive A
    pub b: Quine,
}

/// Build the streams of a loop pair from the prefixes and suffixes of the
/// two archives
pub fn generate_quine_loop(
    prefix_a: &[u8],
    suffix_a: &[u8],
    prefix_b: &[u8],
    suffix_b: &[u8],
) -> Result<QuineLoop> {
    if prefix_a.len() != prefix_b.len() {
        return Err(Error::Internal(format!(
            "loop prefixes differ in length: {} and {}",
            prefix_a.len(),
            prefix_b.len()
        )));
    }
    let p = prefix_a.len();
    let reach = 2 * p + 3 * STORED_HEADER_LEN;
    if p + 2 * STORED_HEADER_LEN > MAX_STORED_LEN {
        return Err(Error::InputTooLarge { size: p + 2 * STORED_HEADER_LEN, max: MAX_STORED_LEN });
    }
    if reach > MAX_DISTANCE {
        return Err(Error::DistanceTooLarge { distance: reach, max: MAX_DISTANCE });
    }

    let first = head_repeat(p);
    let chain = plan_chain(first.next_len())?;
    let (tail_a, tail_b) = loop_tail_repeats(suffix_a.len(), suffix_b.len())?;

    let literal =
        [tail_b.terminated().as_slice(), suffix_b, &tail_a.terminated(), suffix_a].concat();
    if literal.len() > MAX_STORED_LEN {
        return Err(Error::InputTooLarge { size: literal.len(), max: MAX_STORED_LEN });
    }

    let build = |own: &[u8], peer: &[u8], tail: &RepeatBlock| -> Result<Quine> {
        let l1 = stored_header(p + STORED_HEADER_LEN, 0);
        let l2 = stored_header(p + 2 * STORED_HEADER_LEN, 0);

        let mut stream = QuineStream::new();
        stream.stored(&[peer, &l1].concat());
        stream.stored(&[own, &l1, &l2].concat());
        stream.chain_step(&first);
        for block in &chain {
            stream.chain_step(block);
        }
        stream.unit(literal.len());
        let tail_literal = stream.literal(&literal);
        let bytes = stream.finish(tail)?;

        Ok(Quine {
            layout: QuineLayout {
                // peer prefix first, then our own
                prefix_copies: vec![STORED_HEADER_LEN, p + 3 * STORED_HEADER_LEN],
                tail_literal,
                tail_len: tail.terminated().len(),
            },
            bytes,
        })
    };

    let a = build(prefix_a, prefix_b, &tail_a)?;
    let b = build(prefix_b, prefix_a, &tail_b)?;
    if a.len() != b.len() {
        return Err(Error::Internal(format!(
            "loop streams differ in length: {} and {}",
            a.len(),
            b.len()
        )));
    }

    debug!(prefix = p, chain = chain.len() + 1, quine = a.len(), "Generated quine loop");
    Ok(QuineLoop { a, b })
}

/// First repeat of a loop stream: copies the peer prefix with its header
/// and the header of the own-prefix block
fn head_repeat(p: usize) -> RepeatBlock {
    let reach = (2 * p + 3 * STORED_HEADER_LEN) as u32;
    let mut tokens: Vec<Token> = chunks((p + STORED_HEADER_LEN) as u32)
        .into_iter()
        .map(|len| Token::repeat(reach, len))
        .collect();
    tokens.push(Token::repeat((p + 2 * STORED_HEADER_LEN) as u32, STORED_HEADER_LEN as u32));
    RepeatBlock::new(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deflate::inflate;
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    fn filler(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect()
    }

    fn check_pair(p: usize, s_a: usize, s_b: usize) -> QuineLoop {
        let (pa, pb) = (filler(p, 1), filler(p, 2));
        let (sa, sb) = (filler(s_a, 3), filler(s_b, 4));
        let pair = generate_quine_loop(&pa, &sa, &pb, &sb).unwrap();

        let archive_a = [pa.as_slice(), &pair.a.bytes, &sa].concat();
        let archive_b = [pb.as_slice(), &pair.b.bytes, &sb].concat();
        assert_eq!(inflate(&pair.a.bytes).unwrap(), archive_b);
        assert_eq!(inflate(&pair.b.bytes).unwrap(), archive_a);

        let mut out = Vec::new();
        DeflateDecoder::new(pair.a.bytes.as_slice()).read_to_end(&mut out).unwrap();
        assert_eq!(out, archive_b);
        pair
    }

    #[test]
    fn test_streams_reproduce_each_other() {
        for (p, s_a, s_b) in [(60, 80, 95), (200, 100, 100), (3000, 150, 170)] {
            check_pair(p, s_a, s_b);
        }
    }

    #[test]
    fn test_suffixes_of_different_lengths() {
        for (p, s_a, s_b) in [(100, 20, 400), (60, 700, 60), (600, 20, 49)] {
            let pair = check_pair(p, s_a, s_b);
            assert_eq!(pair.a.layout.tail_len, pair.b.layout.tail_len);
        }
    }

    #[test]
    fn test_layout() {
        let p = 90;
        let (pa, pb) = (filler(p, 1), filler(p, 2));
        let (sa, sb) = (filler(70, 3), filler(85, 4));
        let pair = check_pair(p, 70, 85);

        assert_eq!(pair.a.layout.prefix_copies.len(), 2);
        let (peer, own) = (pair.a.layout.prefix_copies[0], pair.a.layout.prefix_copies[1]);
        assert_eq!(&pair.a.bytes[peer..peer + p], pb.as_slice());
        assert_eq!(&pair.a.bytes[own..own + p], pa.as_slice());

        // the closing literal is the same in both streams
        let (la, lb) = (pair.a.layout.tail_literal, pair.b.layout.tail_literal);
        let (ya, yb) = (pair.a.layout.tail_len, pair.b.layout.tail_len);
        let len = ya + sa.len() + yb + sb.len();
        assert_eq!(&pair.a.bytes[la..la + len], &pair.b.bytes[lb..lb + len]);
        assert_eq!(&pair.a.bytes[la + yb..la + yb + sb.len()], sb.as_slice());
        assert_eq!(&pair.a.bytes[la + yb + sb.len() + ya..la + len], sa.as_slice());
    }

    #[test]
    fn test_rejects_mismatched_prefixes() {
        let err = generate_quine_loop(&[0; 10], &[0; 22], &[0; 11], &[0; 22]).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_rejects_far_reach() {
        let big = vec![0u8; 17_000];
        let err = generate_quine_loop(&big, &[0; 22], &big, &[0; 22]).unwrap_err();
        assert!(matches!(err, Error::DistanceTooLarge { .. }));
    }
}
