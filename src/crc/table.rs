//! Table-driven CRC-32 (reflected polynomial 0xEDB88320).

const REFLECTED_POLY: u32 = 0xEDB8_8320;

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ REFLECTED_POLY } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC_TABLE: [u32; 256] = build_table();

/// Feed `data` into a raw (non-inverted) CRC register
#[inline]
pub fn crc32_update(mut state: u32, data: &[u8]) -> u32 {
    for &byte in data {
        state = (state >> 8) ^ CRC_TABLE[((state ^ byte as u32) & 0xFF) as usize];
    }
    state
}

/// CRC-32 of `data`
pub fn crc32(data: &[u8]) -> u32 {
    !crc32_update(0xFFFF_FFFF, data)
}

/// CRC-32 of `prefix ++ data`, given `prior = crc32(prefix)`
pub fn crc32_continue(data: &[u8], prior: u32) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(prior);
    hasher.update(data);
    hasher.finalize()
}
