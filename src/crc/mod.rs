pub mod bruteforce;
pub mod gf2;
pub mod system;
pub mod table;

pub use bruteforce::{bruteforce, bruteforce_range};
pub use system::{solve_crc_system, solve_rank1, CrcFile};
pub use table::{crc32, crc32_continue, crc32_update};

/// CRC-32 generator polynomial, x^32 term included
pub const POLYNOMIAL: u64 = 0x1_04C1_1DB7;
