//! Greedy LZSS tokenizer.
//!
//! At each position the longest earlier match inside the window is taken,
//! searching nearest-first so that among equally long matches the smallest
//! distance wins. Candidates are found through a hash chain over 3-byte
//! prefixes; the chain is walked to the end of the window, so the result is
//! the same as an exhaustive backwards scan.

use super::tables::{MAX_DISTANCE, MAX_MATCH, MIN_MATCH};
use super::tokens::Token;

const HASH_BITS: u32 = 15;
const HASH_SIZE: usize = 1 << HASH_BITS;
const NIL: u32 = u32::MAX;

#[inline]
fn hash3(data: &[u8], pos: usize) -> usize {
    let val = (data[pos] as u32) << 16 | (data[pos + 1] as u32) << 8 | data[pos + 2] as u32;
    (val.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
}

/// Tokenizer settings, clamped to what DEFLATE can express
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchParams {
    pub window: usize,
    pub lookahead: usize,
    pub min_match: usize,
}

impl MatchParams {
    pub fn new(window: usize, lookahead: usize, min_match: usize) -> Self {
        Self {
            window: window.clamp(1, MAX_DISTANCE),
            lookahead: lookahead.min(MAX_MATCH),
            min_match: min_match.max(MIN_MATCH),
        }
    }
}

impl Default for MatchParams {
    fn default() -> Self {
        Self::new(MAX_DISTANCE, MAX_MATCH, MIN_MATCH)
    }
}

/// Split `bytes` into literals and back-references.
///
/// Never emits a repeat shorter than `min_match` (at least 3), longer than
/// `lookahead` (at most 258) or reaching further back than `window`.
pub fn tokenize(bytes: &[u8], window: usize, lookahead: usize, min_match: usize) -> Vec<Token> {
    Tokenizer::new(MatchParams::new(window, lookahead, min_match)).run(bytes)
}

struct Tokenizer {
    params: MatchParams,
    /// Most recent position for each hash
    head: Vec<u32>,
    /// Previous position with the same hash, indexed by position
    prev: Vec<u32>,
}

impl Tokenizer {
    fn new(params: MatchParams) -> Self {
        Self { params, head: vec![NIL; HASH_SIZE], prev: Vec::new() }
    }

    fn run(mut self, data: &[u8]) -> Vec<Token> {
        self.prev = vec![NIL; data.len()];
        let mut tokens = Vec::with_capacity(data.len() / 2 + 1);
        let mut pos = 0;

        while pos < data.len() {
            match self.longest_match(data, pos) {
                Some((distance, length)) => {
                    tokens.push(Token::repeat(distance as u32, length as u32));
                    for p in pos..pos + length {
                        self.insert(data, p);
                    }
                    pos += length;
                }
                None => {
                    tokens.push(Token::Literal(data[pos]));
                    self.insert(data, pos);
                    pos += 1;
                }
            }
        }

        tokens
    }

    #[inline]
    fn insert(&mut self, data: &[u8], pos: usize) {
        if pos + 3 > data.len() {
            return;
        }
        let h = hash3(data, pos);
        self.prev[pos] = self.head[h];
        self.head[h] = pos as u32;
    }

    /// Best (distance, length) at `pos`, if one reaches `min_match`
    fn longest_match(&self, data: &[u8], pos: usize) -> Option<(usize, usize)> {
        let max_len = self.params.lookahead.min(data.len() - pos);
        if max_len < self.params.min_match || max_len < 3 {
            return None;
        }

        let mut best_len = 0;
        let mut best_dist = 0;
        let mut candidate = self.head[hash3(data, pos)];

        while candidate != NIL {
            let cand = candidate as usize;
            let distance = pos - cand;
            if distance > self.params.window {
                break;
            }

            // the source may run into the bytes being matched
            let len = data[cand..]
                .iter()
                .zip(&data[pos..pos + max_len])
                .take_while(|(a, b)| a == b)
                .count();

            if len > best_len {
                best_len = len;
                best_dist = distance;
                if len == max_len {
                    break;
                }
            }
            candidate = self.prev[cand];
        }

        (best_len >= self.params.min_match).then_some((best_dist, best_len))
    }
}
