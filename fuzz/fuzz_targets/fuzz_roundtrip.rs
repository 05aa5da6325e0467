#![no_main]

use std::io::Read;

use flate2::read::DeflateDecoder;
use libfuzzer_sys::fuzz_target;
use zipquine::deflate::tokenize;
use zipquine::huffman::StaticHuffmanEncoder;

fuzz_target!(|data: &[u8]| {
    let tokens = tokenize(data, 32768, 258, 3);
    let mut encoder = StaticHuffmanEncoder::new();
    encoder.encode(&tokens);
    let compressed = encoder.into_bytes();

    let mut out = Vec::new();
    DeflateDecoder::new(compressed.as_slice()).read_to_end(&mut out).expect("flate2 rejected stream");
    assert_eq!(out, data);
});
