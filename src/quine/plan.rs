//! Choosing how each self-describing repeat is split into tokens.
//!
//! Every step of the quine chain copies `n` bytes from `n` bytes back and
//! then has to describe its own encoding, which takes some smaller number
//! of bytes `n'`. The token split picked for each step decides `n'`, and
//! the chain has to land on the 20-byte unit [`R4`] that describes itself.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::deflate::tables::{MAX_DISTANCE, MAX_MATCH, MIN_MATCH};
use crate::deflate::Token;
use crate::error::{Error, Result};
use crate::huffman::encoder::{static_block_bytes, stored_header, stored_header_len};
use crate::huffman::{five_byte_repeat, static_block_bits};

/// Length of the self-describing unit: a 5-byte repeat block plus its
/// 5-byte stored header, twice
pub const UNIT_LEN: u32 = 20;

/// Two `Repeat(20, 10)` tokens: exactly 40 bits, so a fixed block of five
/// whole bytes that copies the 20 bytes before it
pub const R4: [Token; 2] = [
    Token::Repeat { distance: UNIT_LEN, length: 10 },
    Token::Repeat { distance: UNIT_LEN, length: 10 },
];

/// Upper bound on the encoded size of a closing repeat: 128 tokens of at
/// most 31 bits each cover the whole window
const MAX_TAIL_BYTES: usize = 1024;

/// Token counts tried for near-even splits, starting from the fewest
/// tokens that can cover a length
const EVEN_SPLIT_COUNTS: u32 = 12;

/// Last block of a stream: an empty final stored block
pub const FINAL_EMPTY_BLOCK: [u8; 5] = [0x01, 0x00, 0x00, 0xFF, 0xFF];

/// A fixed-Huffman block of repeats as it sits in the stream, together with
/// the stored header that follows it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepeatBlock {
    pub tokens: Vec<Token>,
    /// Block bytes, last byte zero-padded
    pub bytes: Vec<u8>,
    /// Width of the next stored header (4 when it shares the last byte)
    pub header_len: usize,
}

/// (block bytes, following header width) of a repeat block, without
/// encoding it
fn footprint(tokens: &[Token]) -> (usize, usize) {
    let bits = static_block_bits(tokens);
    ((bits + 7) / 8, stored_header_len((bits % 8) as u8))
}

impl RepeatBlock {
    pub fn new(tokens: Vec<Token>) -> Self {
        let (_, header_len) = footprint(&tokens);
        Self { bytes: static_block_bytes(&tokens), header_len, tokens }
    }

    /// Header of a non-final stored block of `len` bytes placed right after
    /// this block
    pub fn header(&self, len: usize) -> Vec<u8> {
        let pending = if self.header_len == 4 { 1 } else { 0 };
        stored_header(len, pending)
    }

    /// Bytes the following chain step has to reproduce
    pub fn next_len(&self) -> u32 {
        (self.bytes.len() + self.header_len + 10) as u32
    }

    /// The block followed by an empty stored block and the final empty
    /// block: how a stream ends on this repeat
    pub fn terminated(&self) -> Vec<u8> {
        let mut out = self.bytes.clone();
        out.extend(self.header(0));
        out.extend_from_slice(&FINAL_EMPTY_BLOCK);
        out
    }
}

/// Lengths of consecutive repeats covering `total` bytes: 258 each, the
/// last one raised to at least 3 by borrowing from the one before
pub fn chunks(total: u32) -> Vec<u32> {
    chunks_from(total.min(MAX_MATCH as u32), total).unwrap_or_default()
}

fn chunks_from(first: u32, total: u32) -> Option<Vec<u32>> {
    let max = MAX_MATCH as u32;
    let min = MIN_MATCH as u32;
    let mut out = vec![first];
    let mut rest = total - first;
    while rest > 0 {
        let c = rest.min(max);
        out.push(c);
        rest -= c;
    }

    let n = out.len();
    if n > 1 && out[n - 1] < min {
        let need = min - out[n - 1];
        if out[n - 2] < min + need {
            return None;
        }
        out[n - 2] -= need;
        out[n - 1] += need;
    }
    Some(out)
}

/// Ways to copy `length` bytes from `distance` back, in preference order:
/// a five-byte pair first, then every first-token length followed by full
/// tokens, then near-even splits
pub fn split_candidates(distance: u32, length: u32) -> Vec<Vec<Token>> {
    let min = MIN_MATCH as u32;
    let max = MAX_MATCH as u32;
    let mut out = Vec::new();
    if length < min {
        return out;
    }

    if let Some(pair) = five_byte_repeat(&Token::repeat(distance, length)) {
        out.push(pair.to_vec());
    }

    let to_tokens = |lens: Vec<u32>| lens.into_iter().map(|l| Token::repeat(distance, l)).collect();

    for first in min..=length.min(max) {
        if let Some(lens) = chunks_from(first, length) {
            out.push(to_tokens(lens));
        }
    }

    let k0 = ((length + max - 1) / max).max(1);
    for k in k0..k0 + EVEN_SPLIT_COUNTS {
        if length < min * k {
            break;
        }
        let (q, r) = (length / k, length % k);
        if q + u32::from(r > 0) > max {
            continue;
        }
        let lens = (0..k).map(|i| if i < r { q + 1 } else { q }).collect();
        out.push(to_tokens(lens));
    }
    out
}

/// The repeat blocks that take a chain starting at `start` bytes down to
/// the 20-byte unit, not counting the final [`R4`].
///
/// Breadth-first over chain lengths, so the plan is the shortest one the
/// candidate splits allow.
pub fn plan_chain(start: u32) -> Result<Vec<RepeatBlock>> {
    if start as usize > MAX_DISTANCE {
        return Err(Error::DistanceTooLarge { distance: start as usize, max: MAX_DISTANCE });
    }

    let mut prev: HashMap<u32, Option<(u32, RepeatBlock)>> = HashMap::new();
    let mut queue = VecDeque::new();
    prev.insert(start, None);
    queue.push_back(start);

    while let Some(n) = queue.pop_front() {
        if n == UNIT_LEN {
            let mut steps = Vec::new();
            let mut cur = n;
            while let Some(Some((from, block))) = prev.remove(&cur) {
                steps.push(block);
                cur = from;
            }
            steps.reverse();
            debug!(start, steps = steps.len(), "Planned repeat chain");
            return Ok(steps);
        }

        for tokens in split_candidates(n, n) {
            let (bytes, header_len) = footprint(&tokens);
            let next = (bytes + header_len + 10) as u32;
            if next as usize <= MAX_DISTANCE && !prev.contains_key(&next) {
                prev.insert(next, Some((n, RepeatBlock::new(tokens))));
                queue.push_back(next);
            }
        }
    }

    Err(Error::NoFixedPoint(format!("no repeat chain from {start} bytes reaches {UNIT_LEN}")))
}

/// The closing repeat of a single quine.
///
/// It copies itself plus the `suffix_len` bytes that follow it, so its own
/// encoded size is part of its length: search over block sizes until the
/// candidate's size agrees with the size it assumed.
pub fn tail_repeat(suffix_len: usize) -> Result<RepeatBlock> {
    for size in 1..MAX_TAIL_BYTES {
        for header_len in [4, 5] {
            let total = size + header_len + FINAL_EMPTY_BLOCK.len() + suffix_len;
            if total > MAX_DISTANCE {
                return Err(Error::DistanceTooLarge { distance: total, max: MAX_DISTANCE });
            }
            let total = total as u32;
            let found = split_candidates(total, total)
                .into_iter()
                .find(|tokens| footprint(tokens) == (size, header_len));
            if let Some(tokens) = found {
                return Ok(RepeatBlock::new(tokens));
            }
        }
    }
    Err(Error::NoFixedPoint(format!("no closing repeat for a {suffix_len} byte suffix")))
}

/// Closing repeats of a loop pair, `(a, b)`.
///
/// Both streams carry the literal `Y_B S_B Y_A S_A`. Stream A then copies
/// `Y_B S_B` from the start of that literal and stream B copies `Y_A S_A`
/// from its end. The two streams must come out the same length, so `Y_A`
/// and `Y_B` end on the same number of bytes: search over that length and
/// split each copy until both blocks fill it.
pub fn loop_tail_repeats(suffix_a: usize, suffix_b: usize) -> Result<(RepeatBlock, RepeatBlock)> {
    let extra = FINAL_EMPTY_BLOCK.len();
    for tail_len in extra + 1..MAX_TAIL_BYTES {
        let copy_b = tail_len + suffix_a;
        let copy_a = tail_len + suffix_b;
        let literal = copy_a + copy_b;
        if literal > MAX_DISTANCE {
            return Err(Error::DistanceTooLarge { distance: literal, max: MAX_DISTANCE });
        }

        let fills = |tokens: &Vec<Token>| {
            let (bytes, header_len) = footprint(tokens);
            bytes + header_len + extra == tail_len
        };
        let Some(tail_b) = split_candidates(copy_b as u32, copy_b as u32).into_iter().find(fills)
        else {
            continue;
        };
        if let Some(tail_a) = split_candidates(literal as u32, copy_a as u32).into_iter().find(fills) {
            return Ok((RepeatBlock::new(tail_a), RepeatBlock::new(tail_b)));
        }
    }
    Err(Error::NoFixedPoint(format!(
        "no closing repeats for suffixes of {suffix_a} and {suffix_b} bytes"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(tokens: &[Token]) -> usize {
        tokens.iter().map(Token::uncompressed_size).sum()
    }

    #[test]
    fn test_r4_is_five_whole_bytes() {
        let block = RepeatBlock::new(R4.to_vec());
        assert_eq!(block.bytes, vec![0x42, 0x88, 0x21, 0xC4, 0x00]);
        assert_eq!(static_block_bits(&R4), 40);
        assert_eq!(block.header_len, 5);
        assert_eq!(block.next_len(), UNIT_LEN);
    }

    #[test]
    fn test_chunks() {
        assert_eq!(chunks(5), vec![5]);
        assert_eq!(chunks(258), vec![258]);
        assert_eq!(chunks(516), vec![258, 258]);
        assert_eq!(chunks(260), vec![257, 3]);
        assert_eq!(chunks(259), vec![256, 3]);
        assert_eq!(chunks(1000).iter().sum::<u32>(), 1000);
    }

    #[test]
    fn test_split_candidates_cover_length() {
        for length in [3u32, 20, 100, 258, 259, 777, 4000] {
            let candidates = split_candidates(length, length);
            assert!(!candidates.is_empty(), "no splits for {length}");
            for tokens in &candidates {
                assert_eq!(total(tokens), length as usize);
                for token in tokens {
                    let Token::Repeat { distance, length: l } = *token else {
                        panic!("literal in a split");
                    };
                    assert_eq!(distance, length);
                    assert!((3..=258).contains(&l));
                }
            }
        }
        assert!(split_candidates(2, 2).is_empty());
    }

    #[test]
    fn test_five_byte_split_comes_first() {
        let candidates = split_candidates(20, 20);
        assert_eq!(candidates[0], R4.to_vec());
    }

    #[test]
    fn test_plan_chain_reaches_unit() {
        for start in [5u32, 20, 35, 100, 517, 600, 1000, 5000, 32768] {
            let plan = plan_chain(start).unwrap();
            let mut n = start;
            for block in &plan {
                assert_eq!(total(&block.tokens), n as usize);
                n = block.next_len();
            }
            assert_eq!(n, UNIT_LEN, "chain from {start}");
        }
        assert!(plan_chain(UNIT_LEN).unwrap().is_empty());
    }

    #[test]
    fn test_plan_chain_rejects_far_start() {
        assert!(matches!(plan_chain(40_000), Err(Error::DistanceTooLarge { .. })));
    }

    #[test]
    fn test_tail_repeat_describes_itself() {
        for suffix_len in [0usize, 22, 100, 511, 600, 1500, 5000] {
            let tail = tail_repeat(suffix_len).unwrap();
            let copied = tail.terminated().len() + suffix_len;
            assert_eq!(total(&tail.tokens), copied);
            assert!(tail
                .tokens
                .iter()
                .all(|t| matches!(t, Token::Repeat { distance, .. } if *distance as usize == copied)));
        }
    }

    #[test]
    fn test_loop_tail_repeats_agree() {
        for (suffix_a, suffix_b) in [(120, 87), (20, 49), (20, 400), (700, 60), (1500, 1500)] {
            check_loop_tails(suffix_a, suffix_b);
        }
    }

    fn check_loop_tails(suffix_a: usize, suffix_b: usize) {
        let (a, b) = loop_tail_repeats(suffix_a, suffix_b).unwrap();
        let (ya, yb) = (a.terminated().len(), b.terminated().len());
        assert_eq!(ya, yb, "tails for suffixes {suffix_a} and {suffix_b}");
        let literal = yb + suffix_b + ya + suffix_a;

        assert_eq!(total(&a.tokens), yb + suffix_b);
        assert!(a
            .tokens
            .iter()
            .all(|t| matches!(t, Token::Repeat { distance, .. } if *distance as usize == literal)));
        assert_eq!(total(&b.tokens), ya + suffix_a);
        assert!(b
            .tokens
            .iter()
            .all(|t| matches!(t, Token::Repeat { distance, .. } if *distance as usize == ya + suffix_a)));
    }
}
