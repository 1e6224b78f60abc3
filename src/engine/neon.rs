//! # NEON Engine
//!
//! **Only for aarch64 architectures!**
//!
//! The 8 generator lanes are spread over four 128-bit registers per state word.
//! Reductions read 8 (f64) or 16 (f32) elements per iteration, also in four
//! registers, and hand the tail to the scalar engine.
//!
use super::Engine;
use super::scalar::{self, PHI};
use crate::state::{BATCH_LEN, LANES, Lanes, RING_LEN, STEPS_PER_BATCH, Sfc64State, Xor1024State};
use core::arch::aarch64::*;

const F64_CHUNK: usize = 8;
const F32_CHUNK: usize = 16;

/// Registers per 8-lane vector.
const QUADS: usize = LANES / 2;

pub(crate) struct Neon;

impl Engine for Neon {
    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn sfc64_batch(state: &mut Sfc64State, out: &mut [u64; BATCH_LEN]) {
        sfc64_fill(state, out)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn xor1024_batch(state: &mut Xor1024State, out: &mut [u64; BATCH_LEN]) {
        xor1024_fill(state, out)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn pair_l1_max_f64(buf: &[f64]) -> f64 {
        let mut vmax = vdupq_n_f64(0.0);
        let mut chunks = buf.chunks_exact(F64_CHUNK);

        for chunk in chunks.by_ref() {
            let p = chunk.as_ptr();

            // | x[0]+x[1] | x[2]+x[3] |, NaN survives both `vpaddq` and `vmaxq`
            let s0 = vpaddq_f64(vabsq_f64(vld1q_f64(p)), vabsq_f64(vld1q_f64(p.add(2))));
            let s1 = vpaddq_f64(vabsq_f64(vld1q_f64(p.add(4))), vabsq_f64(vld1q_f64(p.add(6))));

            vmax = vmaxq_f64(vmax, vmaxq_f64(s0, s1));
        }

        let scale = vmaxvq_f64(vmax);
        let tail = scalar::pair_l1_max(chunks.remainder());

        if tail > scale || tail.is_nan() { tail } else { scale }
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn pair_l1_max_f32(buf: &[f32]) -> f32 {
        let mut vmax = vdupq_n_f32(0.0);
        let mut chunks = buf.chunks_exact(F32_CHUNK);

        for chunk in chunks.by_ref() {
            let p = chunk.as_ptr();

            let s0 = vpaddq_f32(vabsq_f32(vld1q_f32(p)), vabsq_f32(vld1q_f32(p.add(4))));
            let s1 = vpaddq_f32(vabsq_f32(vld1q_f32(p.add(8))), vabsq_f32(vld1q_f32(p.add(12))));

            vmax = vmaxq_f32(vmax, vmaxq_f32(s0, s1));
        }

        let scale = vmaxvq_f32(vmax);
        let tail = scalar::pair_l1_max(chunks.remainder());

        if tail > scale || tail.is_nan() { tail } else { scale }
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn scaled_sum_squares_f64(buf: &[f64], pre: f64, post: f64) -> f64 {
        let vpre = vdupq_n_f64(pre);
        let vpost = vdupq_n_f64(post);

        let mut acc0 = vdupq_n_f64(0.0);
        let mut acc1 = vdupq_n_f64(0.0);
        let mut chunks = buf.chunks_exact(F64_CHUNK);

        for chunk in chunks.by_ref() {
            let p = chunk.as_ptr();

            for q in 0..QUADS {
                let x = vmulq_f64(vmulq_f64(vld1q_f64(p.add(2 * q)), vpre), vpost);
                let sq = vmulq_f64(x, x);

                if q % 2 == 0 {
                    acc0 = vaddq_f64(acc0, sq);
                } else {
                    acc1 = vaddq_f64(acc1, sq);
                }
            }
        }

        vaddvq_f64(vaddq_f64(acc0, acc1)) + scalar::scaled_sum_squares(chunks.remainder(), pre, post)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn scaled_sum_squares_f32(buf: &[f32], pre: f32, post: f32) -> f32 {
        let vpre = vdupq_n_f32(pre);
        let vpost = vdupq_n_f32(post);

        let mut acc0 = vdupq_n_f32(0.0);
        let mut acc1 = vdupq_n_f32(0.0);
        let mut chunks = buf.chunks_exact(F32_CHUNK);

        for chunk in chunks.by_ref() {
            let p = chunk.as_ptr();

            for q in 0..QUADS {
                let x = vmulq_f32(vmulq_f32(vld1q_f32(p.add(4 * q)), vpre), vpost);
                let sq = vmulq_f32(x, x);

                if q % 2 == 0 {
                    acc0 = vaddq_f32(acc0, sq);
                } else {
                    acc1 = vaddq_f32(acc1, sq);
                }
            }
        }

        vaddvq_f32(vaddq_f32(acc0, acc1)) + scalar::scaled_sum_squares(chunks.remainder(), pre, post)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn all_close_f64(a: &[f64], b: &[f64], rel_tol: f64, abs_tol: f64) -> bool {
        let rel = vdupq_n_f64(rel_tol);
        let abs = vdupq_n_f64(abs_tol);

        let mut ca = a.chunks_exact(F64_CHUNK);
        let mut cb = b.chunks_exact(F64_CHUNK);

        for (xa, xb) in ca.by_ref().zip(cb.by_ref()) {
            let (pa, pb) = (xa.as_ptr(), xb.as_ptr());

            let va = load_f64s(pa);
            let vb = load_f64s(pb);
            let eq = [
                vceqq_f64(va[0], vb[0]),
                vceqq_f64(va[1], vb[1]),
                vceqq_f64(va[2], vb[2]),
                vceqq_f64(va[3], vb[3]),
            ];

            // whole chunk equal, skip the tolerance math
            let all_eq = vandq_u64(vandq_u64(eq[0], eq[1]), vandq_u64(eq[2], eq[3]));
            if all_true_u64(all_eq) {
                continue;
            }

            for q in 0..QUADS {
                let diff = vabdq_f64(va[q], vb[q]);
                let bound = vmulq_f64(rel, vmaxq_f64(vabsq_f64(va[q]), vabsq_f64(vb[q])));

                let ok = vorrq_u64(eq[q], vorrq_u64(vcleq_f64(diff, abs), vcleq_f64(diff, bound)));

                if !all_true_u64(ok) {
                    return false;
                }
            }
        }

        scalar::all_close(ca.remainder(), cb.remainder(), rel_tol, abs_tol)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn all_close_f32(a: &[f32], b: &[f32], rel_tol: f32, abs_tol: f32) -> bool {
        let rel = vdupq_n_f32(rel_tol);
        let abs = vdupq_n_f32(abs_tol);

        let mut ca = a.chunks_exact(F32_CHUNK);
        let mut cb = b.chunks_exact(F32_CHUNK);

        for (xa, xb) in ca.by_ref().zip(cb.by_ref()) {
            let (pa, pb) = (xa.as_ptr(), xb.as_ptr());

            let va = load_f32s(pa);
            let vb = load_f32s(pb);
            let eq = [
                vceqq_f32(va[0], vb[0]),
                vceqq_f32(va[1], vb[1]),
                vceqq_f32(va[2], vb[2]),
                vceqq_f32(va[3], vb[3]),
            ];

            let all_eq = vandq_u32(vandq_u32(eq[0], eq[1]), vandq_u32(eq[2], eq[3]));
            if vminvq_u32(all_eq) == u32::MAX {
                continue;
            }

            for q in 0..QUADS {
                let diff = vabdq_f32(va[q], vb[q]);
                let bound = vmulq_f32(rel, vmaxq_f32(vabsq_f32(va[q]), vabsq_f32(vb[q])));

                let ok = vorrq_u32(eq[q], vorrq_u32(vcleq_f32(diff, abs), vcleq_f32(diff, bound)));

                if vminvq_u32(ok) != u32::MAX {
                    return false;
                }
            }
        }

        scalar::all_close(ca.remainder(), cb.remainder(), rel_tol, abs_tol)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn abs_diff_sum_f64(a: &[f64], b: &[f64]) -> f64 {
        let mut acc = [vdupq_n_f64(0.0); QUADS];

        let mut ca = a.chunks_exact(F64_CHUNK);
        let mut cb = b.chunks_exact(F64_CHUNK);

        for (xa, xb) in ca.by_ref().zip(cb.by_ref()) {
            let (pa, pb) = (xa.as_ptr(), xb.as_ptr());

            for (q, slot) in acc.iter_mut().enumerate() {
                *slot = vaddq_f64(*slot, vabdq_f64(vld1q_f64(pa.add(2 * q)), vld1q_f64(pb.add(2 * q))));
            }
        }

        let sum = vaddq_f64(vaddq_f64(acc[0], acc[1]), vaddq_f64(acc[2], acc[3]));
        vaddvq_f64(sum) + scalar::abs_diff_sum(ca.remainder(), cb.remainder())
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn abs_diff_sum_f32(a: &[f32], b: &[f32]) -> f32 {
        let mut acc = [vdupq_n_f32(0.0); QUADS];

        let mut ca = a.chunks_exact(F32_CHUNK);
        let mut cb = b.chunks_exact(F32_CHUNK);

        for (xa, xb) in ca.by_ref().zip(cb.by_ref()) {
            let (pa, pb) = (xa.as_ptr(), xb.as_ptr());

            for (q, slot) in acc.iter_mut().enumerate() {
                *slot = vaddq_f32(*slot, vabdq_f32(vld1q_f32(pa.add(4 * q)), vld1q_f32(pb.add(4 * q))));
            }
        }

        let sum = vaddq_f32(vaddq_f32(acc[0], acc[1]), vaddq_f32(acc[2], acc[3]));
        vaddvq_f32(sum) + scalar::abs_diff_sum(ca.remainder(), cb.remainder())
    }
}

#[inline(always)]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn all_true_u64(m: uint64x2_t) -> bool {
    vminvq_u32(vreinterpretq_u32_u64(m)) == u32::MAX
}

#[inline(always)]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn load_f64s(p: *const f64) -> [float64x2_t; QUADS] {
    [vld1q_f64(p), vld1q_f64(p.add(2)), vld1q_f64(p.add(4)), vld1q_f64(p.add(6))]
}

#[inline(always)]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn load_f32s(p: *const f32) -> [float32x4_t; QUADS] {
    [vld1q_f32(p), vld1q_f32(p.add(4)), vld1q_f32(p.add(8)), vld1q_f32(p.add(12))]
}

#[inline(always)]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn load_lanes(l: &Lanes) -> [uint64x2_t; QUADS] {
    let p = l.0.as_ptr();
    [vld1q_u64(p), vld1q_u64(p.add(2)), vld1q_u64(p.add(4)), vld1q_u64(p.add(6))]
}

#[inline(always)]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn store_lanes(l: &mut Lanes, v: [uint64x2_t; QUADS]) {
    let p = l.0.as_mut_ptr();

    for (q, x) in v.into_iter().enumerate() {
        vst1q_u64(p.add(2 * q), x);
    }
}

#[inline(always)]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn rotl_24(x: uint64x2_t) -> uint64x2_t {
    vorrq_u64(vshlq_n_u64(x, 24), vshrq_n_u64(x, 40))
}

#[inline(always)]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn sfc64_fill(st: &mut Sfc64State, out: &mut [u64; BATCH_LEN]) {
    let mut a = load_lanes(&st.a);
    let mut b = load_lanes(&st.b);
    let mut c = load_lanes(&st.c);
    let mut n = load_lanes(&st.counter);

    let one = vdupq_n_u64(1);
    let dst = out.as_mut_ptr();

    for k in 0..STEPS_PER_BATCH {
        for q in 0..QUADS {
            let r = vaddq_u64(vaddq_u64(a[q], b[q]), n[q]);

            n[q] = vaddq_u64(n[q], one);
            a[q] = veorq_u64(b[q], vshrq_n_u64(b[q], 11));
            b[q] = vaddq_u64(c[q], vshlq_n_u64(c[q], 3));
            c[q] = vaddq_u64(rotl_24(c[q]), r);

            vst1q_u64(dst.add(k * LANES + 2 * q), r);
        }
    }

    store_lanes(&mut st.a, a);
    store_lanes(&mut st.b, b);
    store_lanes(&mut st.c, c);
    store_lanes(&mut st.counter, n);
}

#[inline(always)]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn xor1024_fill(st: &mut Xor1024State, out: &mut [u64; BATCH_LEN]) {
    let mut ring = [[vdupq_n_u64(0); QUADS]; RING_LEN];

    for (slot, lanes) in ring.iter_mut().zip(st.ring.iter()) {
        *slot = load_lanes(lanes);
    }

    let dst = out.as_mut_ptr();
    let mut pos = st.pos;

    for k in 0..STEPS_PER_BATCH {
        let next = (pos + 1) & (RING_LEN - 1);

        for q in 0..QUADS {
            let s0 = ring[pos][q];
            let mut s1 = ring[next][q];

            s1 = veorq_u64(s1, vshlq_n_u64(s1, 31));

            let t = veorq_u64(
                veorq_u64(s1, s0),
                veorq_u64(vshrq_n_u64(s1, 11), vshrq_n_u64(s0, 30)),
            );

            ring[next][q] = t;
            vst1q_u64(dst.add(k * LANES + 2 * q), t);
        }

        pos = next;
    }

    // NEON has no 64-bit lane multiply, scramble in a second pass
    for w in out.iter_mut() {
        *w = w.wrapping_mul(PHI);
    }

    for (lanes, slot) in st.ring.iter_mut().zip(ring) {
        store_lanes(lanes, slot);
    }

    st.pos = pos;
}

#[cfg(test)]
mod neon {
    use super::*;
    use crate::state::{SFC64_SEED_LEN, XOR1024_SEED_LEN};
    use crate::engine::scalar::Scalar;

    fn sample_f64(len: usize, seed: u64) -> Vec<f64> {
        let mut st = Sfc64State::seeded(&core::array::from_fn(|i| seed + i as u64 + 1));
        let mut words = Vec::with_capacity(len + LANES);

        while words.len() < len {
            words.extend(scalar::sfc64_step(&mut st).0);
        }

        words
            .into_iter()
            .take(len)
            .map(|w| (w >> 11) as f64 * (1.0 / (1u64 << 53) as f64) * 2.0 - 1.0)
            .collect()
    }

    mod generators {
        use super::*;

        #[test]
        fn test_sfc64_batch_bit_identical_to_scalar() {
            let seeds: [u64; SFC64_SEED_LEN] = [3, 1, 4, 1 << 40, 5, 9, 2, u64::MAX];
            let mut simd = Sfc64State::seeded(&seeds);
            let mut reference = simd.clone();

            let mut out_simd = [0u64; BATCH_LEN];
            let mut out_ref = [0u64; BATCH_LEN];

            for _ in 0..3 {
                unsafe {
                    Neon::sfc64_batch(&mut simd, &mut out_simd);
                    Scalar::sfc64_batch(&mut reference, &mut out_ref);
                }

                assert_eq!(out_simd, out_ref);
                assert_eq!(simd, reference, "state must match after every batch");
            }
        }

        #[test]
        fn test_xor1024_batch_bit_identical_to_scalar() {
            let seeds: [u64; XOR1024_SEED_LEN] =
                core::array::from_fn(|i| (i as u64 + 1).wrapping_mul(0xd1b5_4a32_d192_ed03));
            let mut simd = Xor1024State::seeded(&seeds);
            let mut reference = simd.clone();

            for _ in 0..5 {
                let _ = scalar::xor1024_step(&mut simd);
                let _ = scalar::xor1024_step(&mut reference);
            }

            let mut out_simd = [0u64; BATCH_LEN];
            let mut out_ref = [0u64; BATCH_LEN];

            for _ in 0..3 {
                unsafe {
                    Neon::xor1024_batch(&mut simd, &mut out_simd);
                    Scalar::xor1024_batch(&mut reference, &mut out_ref);
                }

                assert_eq!(out_simd, out_ref);
                assert_eq!(simd, reference);
            }
        }
    }

    mod reductions {
        use super::*;

        #[test]
        fn test_pair_l1_max_matches_scalar_for_all_tails() {
            for len in (0..48).step_by(2) {
                let buf = sample_f64(len, len as u64);
                let f32s: Vec<f32> = buf.iter().map(|&x| x as f32).collect();

                unsafe {
                    assert_eq!(Neon::pair_l1_max_f64(&buf), Scalar::pair_l1_max_f64(&buf));
                    assert_eq!(Neon::pair_l1_max_f32(&f32s), Scalar::pair_l1_max_f32(&f32s));
                }
            }
        }

        #[test]
        fn test_pair_l1_max_propagates_nan() {
            let mut buf = sample_f64(40, 7);
            buf[9] = f64::NAN;

            unsafe { assert!(Neon::pair_l1_max_f64(&buf).is_nan()) };
        }

        #[test]
        fn test_scaled_sum_squares_matches_scalar() {
            let buf = sample_f64(1030, 99);

            let (simd, reference) =
                unsafe { (Neon::scaled_sum_squares_f64(&buf, 1e3, 0.5), Scalar::scaled_sum_squares_f64(&buf, 1e3, 0.5)) };

            assert!((simd - reference).abs() <= 1e-12 * reference.abs(), "{simd} != {reference}");
        }

        #[test]
        fn test_all_close_matches_scalar() {
            let a = sample_f64(70, 1);

            for idx in [0, 5, 8, 15, 31, 64, 69] {
                for delta in [0.0, 1e-9, 1e-3, 1.0] {
                    let mut b = a.clone();
                    b[idx] += delta;

                    let fa: Vec<f32> = a.iter().map(|&x| x as f32).collect();
                    let fb: Vec<f32> = b.iter().map(|&x| x as f32).collect();

                    for (rel, abs) in [(0.0, 0.0), (1e-6, 0.0), (0.0, 1e-6), (1e-2, 1e-2)] {
                        unsafe {
                            assert_eq!(
                                Neon::all_close_f64(&a, &b, rel, abs),
                                Scalar::all_close_f64(&a, &b, rel, abs),
                                "idx={idx} delta={delta} rel={rel} abs={abs}"
                            );
                            assert_eq!(
                                Neon::all_close_f32(&fa, &fb, rel as f32, abs as f32),
                                Scalar::all_close_f32(&fa, &fb, rel as f32, abs as f32),
                            );
                        }
                    }
                }
            }
        }

        #[test]
        fn test_abs_diff_sum_matches_scalar() {
            let a = sample_f64(123, 5);
            let b = sample_f64(123, 6);

            let (simd, reference) = unsafe { (Neon::abs_diff_sum_f64(&a, &b), Scalar::abs_diff_sum_f64(&a, &b)) };

            assert!((simd - reference).abs() <= 1e-12 * reference.abs());
        }
    }
}
