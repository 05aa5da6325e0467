pub mod decoder;
pub mod encoder;
pub mod tables;
pub mod tree;

pub use decoder::HuffmanDecoder;
pub use encoder::{five_byte_repeat, static_block_bits, StaticHuffmanEncoder};
pub use tree::{build_tree, compute_frequencies, Node};
