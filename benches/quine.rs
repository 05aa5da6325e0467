//! Benchmarks for quine construction.
//!
//! Covers the tokenizer on different data patterns, whole-archive builds
//! with the exact CRC solver, and the loop pair.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use zipquine::deflate::tokenize;
use zipquine::{create_zip_file, create_zip_loop, InputFile, QuineConfig};

/// Generate random (incompressible) data
fn generate_random_data(size: usize) -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut data = Vec::with_capacity(size);
    let mut hasher = DefaultHasher::new();

    for i in 0..size {
        i.hash(&mut hasher);
        data.push((hasher.finish() & 0xFF) as u8);
    }
    data
}

/// Generate English-like text with plenty of repeats
fn generate_text_data(size: usize) -> Vec<u8> {
    let words: [&[u8]; 8] =
        [b"the ", b"quick ", b"brown ", b"fox ", b"jumps ", b"over ", b"lazy ", b"dog. "];
    let mut data = Vec::with_capacity(size);
    let mut i = 0usize;
    while data.len() < size {
        data.extend_from_slice(words[(i * 7 + i / 3) % words.len()]);
        i += 1;
    }
    data.truncate(size);
    data
}

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");

    for size in [1024, 8 * 1024, 24 * 1024] {
        let text = generate_text_data(size);
        let random = generate_random_data(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("text", size), &text, |b, data| {
            b.iter(|| tokenize(data, 32768, 258, 3))
        });
        group.bench_with_input(BenchmarkId::new("random", size), &random, |b, data| {
            b.iter(|| tokenize(data, 32768, 258, 3))
        });
    }

    group.finish();
}

fn bench_single_archive(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_archive");
    let config = QuineConfig::default();

    for size in [100, 4 * 1024, 16 * 1024] {
        let inputs = [InputFile::new("input.txt", generate_text_data(size))];
        group.bench_with_input(BenchmarkId::new("text", size), &inputs, |b, inputs| {
            b.iter(|| create_zip_file(inputs, "quine.zip", &config).unwrap())
        });
    }

    group.finish();
}

fn bench_loop(c: &mut Criterion) {
    let config = QuineConfig::default();
    let inputs = [
        InputFile::new("a.txt", generate_text_data(2048)),
        InputFile::new("b.txt", generate_random_data(1024)),
    ];

    c.bench_function("loop_pair", |b| {
        b.iter(|| create_zip_loop(&inputs, ["a.zip", "b.zip"], &config).unwrap())
    });
}

criterion_group!(benches, bench_tokenize, bench_single_archive, bench_loop);
criterion_main!(benches);
