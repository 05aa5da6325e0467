/// Where the self-referencing pieces sit inside a generated quine stream.
///
/// Each prefix and suffix byte appears several times in the final archive:
/// once in place and once for every stored block that copies it literally.
/// Checksum slots inside the prefix or suffix must be patched in each copy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuineLayout {
    /// Stream offset of each literal prefix copy, in stream order
    pub prefix_copies: Vec<usize>,
    /// Stream offset of the closing literal: `Y S` for a single quine,
    /// `Y_B S_B Y_A S_A` for either stream of a loop
    pub tail_literal: usize,
    /// Length of the closing repeat block with its terminators (`Y`)
    pub tail_len: usize,
}

impl QuineLayout {
    /// Archive offsets of `offset` (relative to the start of a prefix) in
    /// every literal prefix copy, for a stream placed at `stream_start`
    pub fn prefix_slots(&self, stream_start: usize, offset: usize) -> Vec<usize> {
        self.prefix_copies.iter().map(|copy| stream_start + copy + offset).collect()
    }

    /// Archive offset of `offset` inside the closing literal
    pub fn tail_slot(&self, stream_start: usize, offset: usize) -> usize {
        stream_start + self.tail_literal + offset
    }
}
