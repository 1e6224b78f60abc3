//! Kernel benchmarks
//!
//! - generator batches (2048 words per call)
//! - l2_norm / approx_equal / distance over growing buffers, f64 and f32

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use octa::{BATCH_LEN, Sfc64x8, XOR1024_SEED_LEN, Xor1024x8};

const SIZES: [usize; 4] = [64, 1_024, 16_384, 262_144];

fn samples(len: usize) -> Vec<f64> {
    let mut rng = Sfc64x8::new(&[1, 2, 3, 4, 5, 6, 7, 8]).expect("valid seeds");
    let mut out = vec![0u64; BATCH_LEN];
    let mut buf = Vec::with_capacity(len);

    while buf.len() < len {
        rng.next_batch(&mut out).expect("full batch");
        buf.extend(out.iter().map(|&w| (w >> 11) as f64 / (1u64 << 52) as f64 - 1.0));
    }

    buf.truncate(len);
    buf
}

fn bench_generators(c: &mut Criterion) {
    let mut group = c.benchmark_group("generators");
    group.throughput(Throughput::Bytes((BATCH_LEN * 8) as u64));

    group.bench_function("sfc64x8/next_batch", |b| {
        let mut rng = Sfc64x8::new(&[11, 22, 33, 44, 55, 66, 77, 88]).expect("valid seeds");
        let mut out = vec![0u64; BATCH_LEN];

        b.iter(|| rng.next_batch(black_box(&mut out)));
    });

    group.bench_function("xor1024x8/next_batch", |b| {
        let seeds: Vec<u64> = (1..=XOR1024_SEED_LEN as u64).collect();
        let mut rng = Xor1024x8::new(&seeds).expect("valid seeds");
        let mut out = vec![0u64; BATCH_LEN];

        b.iter(|| rng.next_batch(black_box(&mut out)));
    });

    group.bench_function("sfc64x8/reseed", |b| {
        let mut rng = Sfc64x8::new(&[11, 22, 33, 44, 55, 66, 77, 88]).expect("valid seeds");

        b.iter(|| rng.reseed(black_box(&[8, 7, 6, 5, 4, 3, 2, 1])));
    });

    group.finish();
}

fn bench_reductions(c: &mut Criterion) {
    let mut group = c.benchmark_group("reductions");

    for len in SIZES {
        let a = samples(len);
        let b_near: Vec<f64> = a.iter().map(|x| x + 1e-12).collect();

        let a32: Vec<f32> = a.iter().map(|&x| x as f32).collect();

        group.throughput(Throughput::Elements(len as u64));

        group.bench_with_input(BenchmarkId::new("l2_norm", len), &a, |b, a| {
            b.iter(|| octa::l2_norm(black_box(a)));
        });

        group.bench_with_input(BenchmarkId::new("l2_norm_f32", len), &a32, |b, a| {
            b.iter(|| octa::l2_norm_f32(black_box(a)));
        });

        // worst case, every chunk takes the tolerance path
        group.bench_with_input(BenchmarkId::new("approx_equal/near", len), &(&a, &b_near), |b, (x, y)| {
            b.iter(|| octa::approx_equal(black_box(x), black_box(y), 1e-9, 0.0));
        });

        group.bench_with_input(BenchmarkId::new("approx_equal/exact", len), &a, |b, a| {
            b.iter(|| octa::approx_equal(black_box(a), black_box(a), 0.0, 0.0));
        });

        group.bench_with_input(BenchmarkId::new("distance", len), &(&a, &b_near), |b, (x, y)| {
            b.iter(|| octa::distance(black_box(x), black_box(y)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generators, bench_reductions);
criterion_main!(benches);
