//! Polynomial arithmetic over GF(2).
//!
//! A `u64` holds a polynomial with bit `i` as the coefficient of `x^i`.
//! Products are taken modulo the 33-bit CRC-32 generator by the callers.

/// Index of the highest set bit, or 0 for the zero polynomial
#[inline]
pub fn probe(p: u64) -> u32 {
    if p == 0 {
        0
    } else {
        63 - p.leading_zeros()
    }
}

/// Carry-less product without reduction.
///
/// # Panics
///
/// If the product does not fit in 64 bits.
pub fn multiply_raw(p1: u64, p2: u64) -> u64 {
    let top = probe(p1);
    let mut ret = 0u64;
    for i in 0..64 {
        if p2 & (1u64 << i) != 0 {
            assert!(top + i < 64, "polynomial multiplication overflowed 64 bits");
            ret ^= p1 << i;
        }
    }
    ret
}

/// Polynomial long division, returning (quotient, remainder)
pub fn divmod(dividend: u64, divisor: u64) -> (u64, u64) {
    assert!(divisor != 0, "polynomial division by zero");
    let top = probe(divisor);
    let top_bit = 1u64 << top;
    let mut quot = 0u64;
    let mut rem = dividend;

    for shift in (0..=63 - top).rev() {
        if rem & (top_bit << shift) != 0 {
            quot |= 1u64 << shift;
            rem ^= divisor << shift;
        }
    }
    (quot, rem)
}

/// `p1 * p2 mod modulus`
pub fn multiply(p1: u64, p2: u64, modulus: u64) -> u64 {
    // reduce first so the raw product stays under 64 bits
    let (_, a) = divmod(p1, modulus);
    let (_, b) = divmod(p2, modulus);
    divmod(multiply_raw(a, b), modulus).1
}

/// Extended Euclid: (k1, k2, gcd) with `p1*k1 + p2*k2 = gcd`
pub fn xgcd(p1: u64, p2: u64) -> (u64, u64, u64) {
    if probe(p1) < probe(p2) {
        let (k2, k1, gcd) = xgcd(p2, p1);
        return (k1, k2, gcd);
    }
    if p2 == 0 {
        return (1, 0, p1);
    }

    let (quot, rem) = divmod(p1, p2);
    let (k1, k2, gcd) = xgcd(p2, rem);
    (k2, k1 ^ multiply_raw(k2, quot), gcd)
}

/// Inverse of `p` modulo `modulus`, or 0 when there is none
pub fn minv(p: u64, modulus: u64) -> u64 {
    let (k1, _, gcd) = xgcd(p, modulus);
    if gcd != 1 {
        return 0;
    }
    divmod(k1, modulus).1
}

/// `dividend / divisor mod modulus`, or 0 when the divisor is not invertible
pub fn divide(dividend: u64, divisor: u64, modulus: u64) -> u64 {
    multiply(dividend, minv(divisor, modulus), modulus)
}
