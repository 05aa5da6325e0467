pub mod bits;
pub mod crc;
pub mod deflate;
pub mod error;
pub mod huffman;
pub mod quine;
pub mod zip;

pub use deflate::tokens::Token;
pub use error::{Error, Result};
pub use quine::{generate_quine, generate_quine_loop, Quine, QuineLoop};
pub use zip::{create_zip_file, create_zip_loop, DosDateTime, InputFile};

use deflate::tables::{MAX_DISTANCE, MAX_MATCH, MIN_MATCH};

/// How the self-referencing CRC-32 of a quine entry is found
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CrcMode {
    /// Solve the linear system over GF(2) directly
    #[default]
    Solve,
    /// Search all 2^32 candidates on worker threads
    Bruteforce,
    /// Leave the checksum zero
    Skip,
}

/// Configuration for building quines
#[derive(Clone, Debug)]
pub struct QuineConfig {
    /// CRC-32 strategy for the quine entry
    pub crc: CrcMode,
    /// Number of brute-force threads (0 = auto)
    pub num_threads: usize,
    /// LZ77 search window for regular entries
    pub window_size: usize,
    /// Longest match the tokenizer looks for
    pub lookahead: usize,
    /// Shortest match the tokenizer emits as a repeat
    pub min_match: usize,
    /// Modification time written to every header
    pub timestamp: DosDateTime,
    /// Inflate the finished quine entry and compare it with the archive
    pub verify: bool,
    /// Log the token stream of each compressed input at debug level
    pub print_tokens: bool,
}

impl QuineConfig {
    /// Worker threads to use, resolving 0 to the number of CPUs
    pub fn effective_threads(&self) -> usize {
        match self.num_threads {
            0 => num_cpus::get().clamp(1, 32),
            n => n,
        }
    }
}

impl Default for QuineConfig {
    fn default() -> Self {
        Self {
            crc: CrcMode::Solve,
            num_threads: 0,
            window_size: MAX_DISTANCE,
            lookahead: MAX_MATCH,
            min_match: MIN_MATCH,
            timestamp: DosDateTime::default(),
            verify: true,
            print_tokens: false,
        }
    }
}
