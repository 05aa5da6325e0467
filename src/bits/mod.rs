pub mod reader;
pub mod writer;

pub use reader::BitReader;
pub use writer::{BitAccumulator, BitWriter};

/// Two least significant bytes of `value`, little-endian
#[inline]
pub fn u16_le(value: u32) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

/// Four bytes of `value`, little-endian
#[inline]
pub fn u32_le(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Reverse the bottom `n` bits of `value`
pub fn reverse_bits(value: u32, n: u8) -> u32 {
    let mut result = 0u32;
    let mut v = value;
    for _ in 0..n {
        result = (result << 1) | (v & 1);
        v >>= 1;
    }
    result
}

/// Reverse the bit order of a byte (1000_0000 becomes 0000_0001)
#[inline]
pub fn reverse_byte(byte: u8) -> u8 {
    reverse_bits(byte as u32, 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_le_helpers() {
        assert_eq!(u16_le(0x1234), [0x34, 0x12]);
        // only the low half is kept, as for a one's-complement length
        assert_eq!(u16_le(!24u32), [0xE7, 0xFF]);
        assert_eq!(u32_le(0x1234_5678), [0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_reverse_bits() {
        assert_eq!(reverse_bits(0b1100, 4), 0b0011);
        assert_eq!(reverse_bits(0b10101, 5), 0b10101);
        assert_eq!(reverse_byte(0b1000_0000), 0b0000_0001);
        assert_eq!(reverse_bits(0x8000_0000, 32), 1);
    }
}
