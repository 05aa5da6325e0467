#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary input may be rejected - we're looking for panics, not errors
    let _ = zipquine::deflate::inflate(data);
});
