use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Format limits
    #[error("File too big to fit: {size} bytes exceeds the stored block limit of {max}")]
    InputTooLarge { size: usize, max: usize },

    #[error("File too big to fit: repeat distance {distance} exceeds the window of {max}")]
    DistanceTooLarge { distance: usize, max: usize },

    #[error("Quine construction did not converge: {0}")]
    NoFixedPoint(String),

    #[error("Quine size changed between passes: {first} then {second} bytes")]
    QuineSizeChanged { first: usize, second: usize },

    // Reference inflater errors
    #[error("Invalid DEFLATE block type: {0}")]
    InvalidBlockType(u8),

    #[error("Invalid Huffman symbol: {0}")]
    InvalidHuffmanSymbol(u16),

    #[error("Invalid length code: {0}")]
    InvalidLengthCode(u16),

    #[error("Invalid distance code: {0}")]
    InvalidDistanceCode(u16),

    #[error("Back-reference distance {distance} exceeds available window {available}")]
    InvalidBackReference { distance: usize, available: usize },

    #[error("Stored block length mismatch: LEN={len}, NLEN={nlen}")]
    StoredBlockLengthMismatch { len: u16, nlen: u16 },

    #[error("Unexpected end of input")]
    UnexpectedEof,

    // Usage errors
    #[error("Loop mode needs exactly two input files, got {0}")]
    LoopNeedsTwoInputs(usize),

    #[error("Archive failed self-verification: {0}")]
    VerificationFailed(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
