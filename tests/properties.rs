//! Property-based tests over the public kernels.
//!
//! - generators: determinism, lane independence, counter and cursor invariants
//! - l2_norm: agreement with the naive norm, invariance under power-of-two scaling
//! - approx_equal / distance: reflexivity, tolerance boundaries, symmetry

use proptest::prelude::*;

use octa::{
    BATCH_LEN, Error, LANES, SFC64_SEED_LEN, STEPS_PER_BATCH, Sfc64x8, XOR1024_SEED_LEN, Xor1024x8,
    approx_equal, approx_equal_f32, distance, l2_norm, l2_norm_f32,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn arb_sfc64_seeds() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::hash_set(1..=u64::MAX, SFC64_SEED_LEN).prop_map(|s| s.into_iter().collect())
}

fn arb_ring_seeds() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1..=u64::MAX, XOR1024_SEED_LEN)
}

/// Interleaved `(re, im)` buffers, always an even number of elements.
fn arb_pairs(max_pairs: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((-1e3f64..1e3, -1e3f64..1e3), 1..max_pairs)
        .prop_map(|pairs| pairs.into_iter().flat_map(|(re, im)| [re, im]).collect())
}

fn naive_norm(buf: &[f64]) -> f64 {
    buf.iter().map(|x| x * x).sum::<f64>().sqrt()
}

// ═══════════════════════════════════════════════════════════════════════
// 1. Generators
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_sfc64_is_deterministic(seeds in arb_sfc64_seeds()) {
        init_logger();

        let mut a = Sfc64x8::new(&seeds).unwrap();
        let mut b = Sfc64x8::new(&seeds).unwrap();

        let mut out_a = vec![0u64; BATCH_LEN];
        let mut out_b = vec![0u64; BATCH_LEN];

        a.next_batch(&mut out_a).unwrap();
        b.next_batch(&mut out_b).unwrap();

        prop_assert_eq!(out_a, out_b);
        prop_assert_eq!(a.warmup_fold(), b.warmup_fold());
    }

    #[test]
    fn prop_sfc64_counter_tracks_batches(seeds in arb_sfc64_seeds(), batches in 0usize..4) {
        let mut rng = Sfc64x8::new(&seeds).unwrap();
        let mut out = vec![0u64; BATCH_LEN];

        for _ in 0..batches {
            rng.next_batch(&mut out).unwrap();
        }

        let expected = 1 + 12 + (STEPS_PER_BATCH * batches) as u64;
        prop_assert_eq!(rng.counter(), [expected; LANES]);
    }

    #[test]
    fn prop_sfc64_lanes_are_independent(
        seeds in arb_sfc64_seeds(),
        lane in 0usize..LANES,
        replacement in 1..=u64::MAX,
    ) {
        let mut changed = seeds.clone();
        changed[lane] = replacement;
        prop_assume!(!seeds.contains(&replacement));

        let mut out_a = vec![0u64; BATCH_LEN];
        let mut out_b = vec![0u64; BATCH_LEN];

        Sfc64x8::new(&seeds).unwrap().next_batch(&mut out_a).unwrap();
        Sfc64x8::new(&changed).unwrap().next_batch(&mut out_b).unwrap();

        for (i, (x, y)) in out_a.iter().zip(&out_b).enumerate() {
            if i % LANES != lane {
                prop_assert_eq!(x, y);
            }
        }
    }

    #[test]
    fn prop_xor1024_cursor_is_home_after_batches(seeds in arb_ring_seeds(), batches in 1usize..3) {
        let mut rng = Xor1024x8::new(&seeds).unwrap();
        let mut again = Xor1024x8::new(&seeds).unwrap();

        let mut out = vec![0u64; BATCH_LEN];
        let mut out_again = vec![0u64; BATCH_LEN];

        for _ in 0..batches {
            rng.next_batch(&mut out).unwrap();
            again.next_batch(&mut out_again).unwrap();

            prop_assert_eq!(rng.position(), 0);
            prop_assert_eq!(&out, &out_again);
        }
    }

    #[test]
    fn prop_wrong_batch_length_is_rejected(seeds in arb_sfc64_seeds(), len in 0usize..(2 * BATCH_LEN)) {
        prop_assume!(len != BATCH_LEN);

        let mut rng = Sfc64x8::new(&seeds).unwrap();
        let mut out = vec![0u64; len];

        prop_assert_eq!(
            rng.next_batch(&mut out),
            Err(Error::BatchLength { expected: BATCH_LEN, got: len })
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 2. l2_norm
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn prop_l2_norm_matches_naive(buf in arb_pairs(200)) {
        let got = l2_norm(&buf).unwrap();
        let want = naive_norm(&buf);

        prop_assert!((got - want).abs() <= 1e-12 * want.max(1e-300), "got {} want {}", got, want);
    }

    #[test]
    fn prop_l2_norm_scale_invariant(buf in arb_pairs(64), exp in -900i32..900) {
        let factor = 2f64.powi(exp);
        let scaled: Vec<f64> = buf.iter().map(|x| x * factor).collect();

        let base = l2_norm(&buf).unwrap();
        let norm = l2_norm(&scaled).unwrap();

        prop_assert!(norm.is_finite());
        prop_assert!((norm / factor - base).abs() <= 1e-12 * base.max(1e-300), "{} vs {}", norm / factor, base);
    }

    #[test]
    fn prop_l2_norm_odd_count_is_rejected(buf in prop::collection::vec(-1.0f64..1.0, 1..64)) {
        prop_assume!(buf.len() % 2 == 1);

        prop_assert_eq!(l2_norm(&buf), Err(Error::OddCount(buf.len())));

        let f32s: Vec<f32> = buf.iter().map(|&x| x as f32).collect();
        prop_assert_eq!(l2_norm_f32(&f32s), Err(Error::OddCount(buf.len())));
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 3. approx_equal & distance
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn prop_approx_equal_is_reflexive(buf in arb_pairs(100)) {
        prop_assert_eq!(approx_equal(&buf, &buf, 0.0, 0.0), Ok(true));

        let f32s: Vec<f32> = buf.iter().map(|&x| x as f32).collect();
        prop_assert_eq!(approx_equal_f32(&f32s, &f32s, 0.0, 0.0), Ok(true));
    }

    #[test]
    fn prop_approx_equal_within_abs_tol(
        buf in arb_pairs(100),
        deltas in prop::collection::vec(-4e-4f64..4e-4, 200),
    ) {
        let moved: Vec<f64> = buf.iter().zip(&deltas).map(|(x, d)| x + d).collect();

        prop_assert_eq!(approx_equal(&buf, &moved, 0.0, 1e-3), Ok(true));
        prop_assert_eq!(approx_equal(&moved, &buf, 0.0, 1e-3), Ok(true));
    }

    #[test]
    fn prop_approx_equal_detects_one_outlier(buf in arb_pairs(100), idx in any::<prop::sample::Index>()) {
        let mut moved = buf.clone();
        let i = idx.index(moved.len());
        moved[i] += 1.0;

        prop_assert_eq!(approx_equal(&buf, &moved, 0.0, 0.5), Ok(false));
    }

    #[test]
    fn prop_distance_is_symmetric_and_zero_on_self(a in arb_pairs(100), b in arb_pairs(100)) {
        let n = a.len().min(b.len());
        let (a, b) = (&a[..n], &b[..n]);

        let ab = distance(a, b).unwrap();
        let ba = distance(b, a).unwrap();

        prop_assert!((ab - ba).abs() <= 1e-12 * ab.max(1.0));
        prop_assert_eq!(distance(a, a), Ok(0.0));
        prop_assert!(ab >= 0.0);
    }
}
