//! Batch kernels over eight parallel lanes.
//!
//! - [`Sfc64x8`] and [`Xor1024x8`], two PRNGs emitting 8 independent streams,
//!   [`BATCH_LEN`] words per call
//! - [`l2_norm`], [`approx_equal`] and [`distance`] (plus `f32` variants) over flat,
//!   interleaved `(re, im)` buffers
//!
//! Every kernel runs on the best instruction set of the host (AVX2, NEON or a portable
//! scalar fallback), picked once per process. Set `OCTA_ISA` to `scalar`, `avx2` or
//! `neon` to pin it.
//!
//! ```rust
//! use octa::{BATCH_LEN, Sfc64x8};
//!
//! let mut rng = Sfc64x8::new(&[11, 22, 33, 44, 55, 66, 77, 88]).unwrap();
//! let mut out = vec![0u64; BATCH_LEN];
//!
//! rng.next_batch(&mut out).unwrap();
//!
//! let samples: Vec<f64> = out.iter().map(|&w| (w >> 11) as f64 / (1u64 << 53) as f64).collect();
//! assert!(octa::l2_norm(&samples).unwrap() > 0.0);
//! ```

mod engine;
mod error;
mod reduce;
mod sfc64;
mod simd;
mod state;
mod xor1024;

pub use error::{Error, Result};
pub use reduce::{approx_equal, approx_equal_f32, distance, distance_f32, l2_norm, l2_norm_f32};
pub use sfc64::Sfc64x8;
pub use simd::{ISA_ENV, Isa, active_isa};
pub use state::{BATCH_LEN, LANES, SFC64_SEED_LEN, STEPS_PER_BATCH, XOR1024_SEED_LEN};
pub use xor1024::Xor1024x8;

#[cfg(test)]
mod tests {
    use super::*;

    const SEEDS: [u64; SFC64_SEED_LEN] = [101, 202, 303, 404, 505, 606, 707, 808];

    fn ring_seeds(salt: u64) -> Vec<u64> {
        (1..=XOR1024_SEED_LEN as u64).map(|i| i.wrapping_mul(0xbf58_476d_1ce4_e5b9) ^ salt).collect()
    }

    fn draw(rng: &mut Sfc64x8) -> Vec<u64> {
        let mut out = vec![0u64; BATCH_LEN];
        rng.next_batch(&mut out).unwrap();
        out
    }

    fn draw_ring(rng: &mut Xor1024x8) -> Vec<u64> {
        let mut out = vec![0u64; BATCH_LEN];
        rng.next_batch(&mut out).unwrap();
        out
    }

    #[test]
    fn test_deterministic_for_same_seed() {
        let mut a = Sfc64x8::new(&SEEDS).unwrap();
        let mut b = Sfc64x8::new(&SEEDS).unwrap();

        assert_eq!(draw(&mut a), draw(&mut b), "identical seeds must yield same sequence");
        assert_eq!(draw(&mut a), draw(&mut b));

        let mut x = Xor1024x8::new(&ring_seeds(1)).unwrap();
        let mut y = Xor1024x8::new(&ring_seeds(1)).unwrap();

        assert_eq!(draw_ring(&mut x), draw_ring(&mut y), "identical seeds must yield same sequence");
    }

    #[test]
    fn test_different_seeds_produce_different_sequences() {
        let mut a = Sfc64x8::new(&SEEDS).unwrap();
        let mut b = Sfc64x8::new(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        assert_ne!(draw(&mut a), draw(&mut b), "different seeds should yield distinct output");

        let mut x = Xor1024x8::new(&ring_seeds(1)).unwrap();
        let mut y = Xor1024x8::new(&ring_seeds(2)).unwrap();

        assert_ne!(draw_ring(&mut x), draw_ring(&mut y));
    }

    #[test]
    fn test_lane_independence_sfc64() {
        let mut changed = SEEDS;
        changed[3] = 0xffff_0000_ffff;

        let base = draw(&mut Sfc64x8::new(&SEEDS).unwrap());
        let other = draw(&mut Sfc64x8::new(&changed).unwrap());

        for (i, (x, y)) in base.iter().zip(&other).enumerate() {
            if i % LANES == 3 {
                assert_ne!(x, y, "lane 3 must follow its new seed (word {i})");
            } else {
                assert_eq!(x, y, "only lane 3 may change (word {i})");
            }
        }
    }

    #[test]
    fn test_lane_independence_xor1024() {
        let seeds = ring_seeds(9);
        let mut changed = seeds.clone();

        // slot 4 of lane 6
        changed[6 * 16 + 4] ^= 0x8000_0000_0000_0001;

        let base = draw_ring(&mut Xor1024x8::new(&seeds).unwrap());
        let other = draw_ring(&mut Xor1024x8::new(&changed).unwrap());

        let mut lane_six_differs = false;

        for (i, (x, y)) in base.iter().zip(&other).enumerate() {
            if i % LANES == 6 {
                lane_six_differs |= x != y;
            } else {
                assert_eq!(x, y, "only lane 6 may change (word {i})");
            }
        }

        assert!(lane_six_differs);
    }

    #[test]
    fn test_can_move_across_threads() {
        use std::thread;

        let mut rng = Sfc64x8::new(&SEEDS).unwrap();
        let expected = draw(&mut rng.clone());

        let handle = thread::spawn(move || draw(&mut rng));
        let res = handle.join().expect("thread should run successfully");

        assert_eq!(res, expected);
    }

    #[test]
    fn test_handles_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Sfc64x8>();
        assert_send_sync::<Xor1024x8>();
    }

    #[test]
    fn test_output_bits_look_balanced() {
        let mut rng = Sfc64x8::new(&SEEDS).unwrap();
        let mut ones = 0u64;

        for _ in 0..8 {
            ones += draw(&mut rng).iter().map(|w| w.count_ones() as u64).sum::<u64>();
        }

        let total = (8 * BATCH_LEN * 64) as f64;
        let ratio = ones as f64 / total;

        assert!((ratio - 0.5).abs() < 0.01, "rough bit balance check failed: {ratio}");
    }

    #[test]
    fn test_reductions_are_reexported() {
        assert_eq!(l2_norm(&[]).unwrap(), 0.0);
        assert!(approx_equal(&[1.0, 2.0], &[1.0, 2.0], 0.0, 0.0).unwrap());
        assert_eq!(distance_f32(&[1.0, 2.0], &[2.0, 4.0]).unwrap(), 3.0);
        assert!(active_isa().is_supported());
        assert_eq!(ISA_ENV, "OCTA_ISA");
    }
}
