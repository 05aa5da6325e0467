//! Exact solver for checksums that appear inside the data they cover.
//!
//! Over GF(2)[x] / G the CRC register is linear in the message bits, so
//! every file whose bytes embed some of the unknown checksums gives one
//! linear equation in those unknowns. The equations form an augmented
//! matrix of polynomials that Gauss-Jordan elimination solves directly.

use std::collections::BTreeMap;

use super::gf2::{divide, minv, multiply};
use super::POLYNOMIAL;
use crate::bits::{reverse_bits, reverse_byte, u32_le};

/// x^8 and x^32: shifting the register by one byte and by one checksum slot
const BYTE_SHIFT: u64 = 0x100;
const SLOT_SHIFT: u64 = 0x1_0000_0000;

/// One file of a checksum system
#[derive(Clone, Debug)]
pub struct CrcFile<'a> {
    /// File bytes; the contents of the four-byte slots are ignored
    pub data: &'a [u8],
    /// Offset of each embedded checksum slot, mapped to the index of the
    /// file whose checksum it holds
    pub slots: BTreeMap<usize, usize>,
}

impl<'a> CrcFile<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, slots: BTreeMap::new() }
    }

    /// Mark `offset` as holding the checksum of file `file`
    pub fn slot(mut self, offset: usize, file: usize) -> Self {
        debug_assert!(offset + 4 <= self.data.len());
        self.slots.insert(offset, file);
        self
    }
}

/// Solve for the checksums of all `files` at once.
///
/// Entry `i` of the result is the CRC-32 of file `i` once every slot holds
/// its solved value.
///
/// # Panics
///
/// If the system has no unique solution (no pivot for some column).
pub fn solve_crc_system(files: &[CrcFile<'_>]) -> Vec<u32> {
    let n = files.len();
    let mut matrix = vec![vec![0u64; n + 1]; n];

    for (row, file) in matrix.iter_mut().zip(files) {
        fold_file(row, file, n);
    }

    for (i, row) in matrix.iter_mut().enumerate() {
        row[i] ^= 1;
        row[n] ^= 0xFFFF_FFFF;
    }

    // Forward elimination
    for col in 0..n {
        let pivot = (col..n).find(|&r| matrix[r][col] != 0);
        let Some(pivot) = pivot else {
            panic!("CRC system is singular at column {col}");
        };
        matrix.swap(col, pivot);

        let inverse = minv(matrix[col][col], POLYNOMIAL);
        for r in col + 1..n {
            let factor = multiply(inverse, matrix[r][col], POLYNOMIAL);
            if factor == 0 {
                continue;
            }
            for c in 0..=n {
                let term = multiply(factor, matrix[col][c], POLYNOMIAL);
                matrix[r][c] ^= term;
            }
        }
    }

    // Back substitution
    let mut results = vec![0u64; n];
    for r in (0..n).rev() {
        let mut value = matrix[r][n];
        for c in r + 1..n {
            value ^= multiply(results[c], matrix[r][c], POLYNOMIAL);
        }
        results[r] = divide(value, matrix[r][r], POLYNOMIAL);
    }

    // bit 0 of the polynomial is the most significant bit of the register
    results.into_iter().map(|v| reverse_bits(v as u32, 32)).collect()
}

/// Walk one file, folding known bytes into the constant column and slots
/// into their unknown's column
fn fold_file(row: &mut [u64], file: &CrcFile<'_>, n: usize) {
    row[n] = 0xFFFF_FFFF;
    let mut i = 0;
    while i < file.data.len() {
        if let Some(&unknown) = file.slots.get(&i) {
            row[unknown] ^= 1;
            for cell in row.iter_mut() {
                *cell = multiply(*cell, SLOT_SHIFT, POLYNOMIAL);
            }
            i += 4;
            continue;
        }

        row[n] ^= (reverse_byte(file.data[i]) as u64) << 24;
        for cell in row.iter_mut() {
            *cell = multiply(*cell, BYTE_SHIFT, POLYNOMIAL);
        }
        i += 1;
    }
}

/// Solve a single file whose own checksum appears at each of `offsets`,
/// write it into every slot and return it.
pub fn solve_rank1(data: &mut [u8], offsets: &[usize]) -> u32 {
    let file = offsets.iter().fold(CrcFile::new(data), |f, &off| f.slot(off, 0));
    let crc = solve_crc_system(&[file])[0];
    for &off in offsets {
        data[off..off + 4].copy_from_slice(&u32_le(crc));
    }
    crc
}
