/// Longest back-reference DEFLATE can express
pub const MAX_MATCH: usize = 258;

/// Shortest back-reference DEFLATE can express
pub const MIN_MATCH: usize = 3;

/// Largest distance a back-reference may reach (15-bit window)
pub const MAX_DISTANCE: usize = 32 * 1024;

/// Largest payload of a single stored block (16-bit LEN field)
pub const MAX_STORED_LEN: usize = u16::MAX as usize;

/// End-of-block symbol in the literal/length alphabet
pub const END_OF_BLOCK: u16 = 256;

/// Length codes 257-285: base length and extra bits
/// Index by (code - 257)
pub const LENGTH_TABLE: [(u16, u8); 29] = [
    // (base_length, extra_bits)
    (3, 0),   // 257
    (4, 0),   // 258
    (5, 0),   // 259
    (6, 0),   // 260
    (7, 0),   // 261
    (8, 0),   // 262
    (9, 0),   // 263
    (10, 0),  // 264
    (11, 1),  // 265
    (13, 1),  // 266
    (15, 1),  // 267
    (17, 1),  // 268
    (19, 2),  // 269
    (23, 2),  // 270
    (27, 2),  // 271
    (31, 2),  // 272
    (35, 3),  // 273
    (43, 3),  // 274
    (51, 3),  // 275
    (59, 3),  // 276
    (67, 4),  // 277
    (83, 4),  // 278
    (99, 4),  // 279
    (115, 4), // 280
    (131, 5), // 281
    (163, 5), // 282
    (195, 5), // 283
    (227, 5), // 284
    (258, 0), // 285 - special case
];

/// Distance codes 0-29: base distance and extra bits
pub const DISTANCE_TABLE: [(u16, u8); 30] = [
    // (base_distance, extra_bits)
    (1, 0),      // 0
    (2, 0),      // 1
    (3, 0),      // 2
    (4, 0),      // 3
    (5, 1),      // 4
    (7, 1),      // 5
    (9, 2),      // 6
    (13, 2),     // 7
    (17, 3),     // 8
    (25, 3),     // 9
    (33, 4),     // 10
    (49, 4),     // 11
    (65, 5),     // 12
    (97, 5),     // 13
    (129, 6),    // 14
    (193, 6),    // 15
    (257, 7),    // 16
    (385, 7),    // 17
    (513, 8),    // 18
    (769, 8),    // 19
    (1025, 9),   // 20
    (1537, 9),   // 21
    (2049, 10),  // 22
    (3073, 10),  // 23
    (4097, 11),  // 24
    (6145, 11),  // 25
    (8193, 12),  // 26
    (12289, 12), // 27
    (16385, 13), // 28
    (24577, 13), // 29
];

/// Code chosen for a length or distance: symbol, value of the extra bits,
/// and how many extra bits follow the symbol
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: u16,
    pub extra_value: u16,
    pub extra_bits: u8,
}

/// Index of the largest base that is <= `value`
fn largest_base_at_most(table: &[(u16, u8)], value: u32) -> usize {
    table.partition_point(|&(base, _)| base as u32 <= value) - 1
}

/// Look up the length code for a match length.
///
/// # Panics
///
/// Lengths outside 3..=258 never reach the encoder; asking for one is a bug.
pub fn encode_length(length: u32) -> CodeEntry {
    assert!(
        (MIN_MATCH as u32..=MAX_MATCH as u32).contains(&length),
        "length {length} outside the DEFLATE range"
    );
    let idx = largest_base_at_most(&LENGTH_TABLE, length);
    let (base, extra_bits) = LENGTH_TABLE[idx];
    CodeEntry { code: 257 + idx as u16, extra_value: (length - base as u32) as u16, extra_bits }
}

/// Look up the distance code for a match distance.
///
/// # Panics
///
/// Distances outside 1..=32768 never reach the encoder; asking for one is a bug.
pub fn encode_distance(distance: u32) -> CodeEntry {
    assert!(
        (1..=MAX_DISTANCE as u32).contains(&distance),
        "distance {distance} outside the DEFLATE range"
    );
    let idx = largest_base_at_most(&DISTANCE_TABLE, distance);
    let (base, extra_bits) = DISTANCE_TABLE[idx];
    CodeEntry { code: idx as u16, extra_value: (distance - base as u32) as u16, extra_bits }
}

/// Decode a length value from a length code (257-285) and extra bits
pub fn decode_length(code: u16, extra_bits: u32) -> Option<u16> {
    if !(257..=285).contains(&code) {
        return None;
    }
    let (base, _) = LENGTH_TABLE[(code - 257) as usize];
    Some(base + extra_bits as u16)
}

/// Decode a distance value from a distance code (0-29) and extra bits
pub fn decode_distance(code: u16, extra_bits: u32) -> Option<u16> {
    if code > 29 {
        return None;
    }
    let (base, _) = DISTANCE_TABLE[code as usize];
    Some(base + extra_bits as u16)
}
