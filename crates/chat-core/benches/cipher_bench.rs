//! Criterion benchmarks for the connection cipher.
//!
//! Key generation happens once per accepted connection, so its latency is the
//! connection-setup cost; the line transform runs on every message in both
//! directions and dominates steady-state throughput.
//!
//! Run with:
//! ```bash
//! cargo bench --package chat-core --bench cipher_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chat_core::{decrypt_line, encrypt_line, KeyPair};

const KEY_SIZES: &[u64] = &[128, 256, 512];

/// A realistic mid-length chat line.
const SAMPLE_LINE: &str = "alice: has anyone seen the deployment runbook?";

fn bench_key_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_generation");
    // Prime search time is heavy-tailed; cap the sample count so the 512-bit
    // case finishes in a reasonable time.
    group.sample_size(10);
    for &bits in KEY_SIZES {
        group.bench_with_input(BenchmarkId::new("bits", bits), &bits, |b, &bits| {
            b.iter(|| KeyPair::generate(black_box(bits)).expect("generate"))
        });
    }
    group.finish();
}

fn bench_encrypt_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("encrypt_line");
    for &bits in KEY_SIZES {
        let pair = KeyPair::generate(bits).expect("generate");
        group.bench_with_input(BenchmarkId::new("bits", bits), &pair, |b, pair| {
            b.iter(|| encrypt_line(black_box(SAMPLE_LINE), pair.public()))
        });
    }
    group.finish();
}

fn bench_decrypt_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("decrypt_line");
    for &bits in KEY_SIZES {
        let pair = KeyPair::generate(bits).expect("generate");
        let wire = encrypt_line(SAMPLE_LINE, pair.public());
        group.bench_with_input(BenchmarkId::new("bits", bits), &wire, |b, wire| {
            b.iter(|| decrypt_line(black_box(wire), &pair).expect("decrypt"))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_key_generation,
    bench_encrypt_line,
    bench_decrypt_line
);
criterion_main!(benches);
