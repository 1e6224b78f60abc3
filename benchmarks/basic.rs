use octa::{BATCH_LEN, Sfc64x8, XOR1024_SEED_LEN, Xor1024x8};
use std::hint::black_box;
use std::time::Instant;

const NUM_BATCHES: usize = 1_000;
const NUM_ITER: usize = 101;

const SFC64_SEEDS: [u64; 8] = [
    0x9e37_79b9_7f4a_7c15,
    0xbf58_476d_1ce4_e5b9,
    0x94d0_49bb_1331_11eb,
    0xd6e8_feb8_6659_fd93,
    0xa076_1d64_78bd_642f,
    0xe703_7ed1_a0b4_28db,
    0x8ebc_6af0_9c88_c6e3,
    0x5899_65cc_7537_4cc3,
];

/// Median throughput in bits/µs of `fill`, called `NUM_BATCHES` times per sample.
fn bench_bits<F>(mut fill: F) -> f64
where
    F: FnMut(&mut [u64]),
{
    let mut out = vec![0u64; BATCH_LEN];
    let mut results = Vec::with_capacity(NUM_ITER);

    // warmup
    for _ in 0..100 {
        fill(out.as_mut_slice());
    }

    for _ in 0..NUM_ITER {
        let start = Instant::now();

        for _ in 0..NUM_BATCHES {
            fill(black_box(out.as_mut_slice()));
        }

        let elapsed_us = start.elapsed().as_secs_f64() * 1e6;
        results.push((NUM_BATCHES * BATCH_LEN * 64) as f64 / elapsed_us);
    }

    results.sort_by(f64::total_cmp);
    results[NUM_ITER / 2]
}

fn main() {
    let mut sfc = Sfc64x8::new(&SFC64_SEEDS).expect("valid seeds");
    let sfc_bits = bench_bits(|out| sfc.next_batch(out).expect("full batch"));

    let ring_seeds: Vec<u64> = (1..=XOR1024_SEED_LEN as u64).map(|i| i.wrapping_mul(SFC64_SEEDS[0])).collect();
    let mut ring = Xor1024x8::new(&ring_seeds).expect("valid seeds");
    let ring_bits = bench_bits(|out| ring.next_batch(out).expect("full batch"));

    println!("isa={}", octa::active_isa());
    println!();
    println!("| Generator   | Throughput (bits/µs) | Throughput (u64/µs) |");
    println!("|:-----------:|:--------------------:|:-------------------:|");
    println!("| sfc64x8     | {:>20.2} | {:>19.2} |", sfc_bits, sfc_bits / 64.0);
    println!("| xor1024x8   | {:>20.2} | {:>19.2} |", ring_bits, ring_bits / 64.0);
}
