//! # AVX2 Engine
//!
//! **Only for x86_64 architectures, selected at runtime!**
//!
//! Generators keep the 8 lanes in two 256-bit registers per state word. The
//! reductions process 8 (f64) or 16 (f32) elements per iteration in two
//! registers and finish the tail with the scalar engine.
//!
use super::Engine;
use super::scalar::{self, PHI};
use crate::state::{BATCH_LEN, Lanes, RING_LEN, STEPS_PER_BATCH, Sfc64State, Xor1024State};
use core::arch::x86_64::*;

const F64_CHUNK: usize = 8;
const F32_CHUNK: usize = 16;

pub(crate) struct Avx2;

impl Engine for Avx2 {
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
        pair_l1_max_pd(buf)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn pair_l1_max_f32(buf: &[f32]) -> f32 {
        pair_l1_max_ps(buf)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn scaled_sum_squares_f64(buf: &[f64], pre: f64, post: f64) -> f64 {
        scaled_sum_squares_pd(buf, pre, post)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn scaled_sum_squares_f32(buf: &[f32], pre: f32, post: f32) -> f32 {
        scaled_sum_squares_ps(buf, pre, post)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn all_close_f64(a: &[f64], b: &[f64], rel_tol: f64, abs_tol: f64) -> bool {
        all_close_pd(a, b, rel_tol, abs_tol)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn all_close_f32(a: &[f32], b: &[f32], rel_tol: f32, abs_tol: f32) -> bool {
        all_close_ps(a, b, rel_tol, abs_tol)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn abs_diff_sum_f64(a: &[f64], b: &[f64]) -> f64 {
        abs_diff_sum_pd(a, b)
    }

    #[inline(always)]
    #[allow(unsafe_op_in_unsafe_fn)]
    unsafe fn abs_diff_sum_f32(a: &[f32], b: &[f32]) -> f32 {
        abs_diff_sum_ps(a, b)
    }
}

//
// generators
//

#[inline]
#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn load_lanes(l: &Lanes) -> [__m256i; 2] {
    let p = l.0.as_ptr() as *const __m256i;
    [_mm256_load_si256(p), _mm256_load_si256(p.add(1))]
}

#[inline]
#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn store_lanes(l: &mut Lanes, v: [__m256i; 2]) {
    let p = l.0.as_mut_ptr() as *mut __m256i;
    _mm256_store_si256(p, v[0]);
    _mm256_store_si256(p.add(1), v[1]);
}

#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn sfc64_fill(st: &mut Sfc64State, out: &mut [u64; BATCH_LEN]) {
    let mut a = load_lanes(&st.a);
    let mut b = load_lanes(&st.b);
    let mut c = load_lanes(&st.c);
    let mut n = load_lanes(&st.counter);

    let one = _mm256_set1_epi64x(1);
    let dst = out.as_mut_ptr() as *mut __m256i;

    for k in 0..STEPS_PER_BATCH {
        // lanes 0..3 and 4..7 are independent, interleave them for ILP
        for h in 0..2 {
            let r = _mm256_add_epi64(_mm256_add_epi64(a[h], b[h]), n[h]);

            n[h] = _mm256_add_epi64(n[h], one);
            a[h] = _mm256_xor_si256(b[h], _mm256_srli_epi64(b[h], 11));
            b[h] = _mm256_add_epi64(c[h], _mm256_slli_epi64(c[h], 3));
            c[h] = _mm256_add_epi64(rotl_24(c[h]), r);

            _mm256_storeu_si256(dst.add(2 * k + h), r);
        }
    }

    store_lanes(&mut st.a, a);
    store_lanes(&mut st.b, b);
    store_lanes(&mut st.c, c);
    store_lanes(&mut st.counter, n);
}

#[inline]
#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn rotl_24(x: __m256i) -> __m256i {
    _mm256_or_si256(_mm256_slli_epi64(x, 24), _mm256_srli_epi64(x, 40))
}

#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn xor1024_fill(st: &mut Xor1024State, out: &mut [u64; BATCH_LEN]) {
    // slot `s` lives in ring[2 * s] (lanes 0..3) and ring[2 * s + 1] (lanes 4..7)
    let mut ring = [_mm256_setzero_si256(); 2 * RING_LEN];

    for (slot, lanes) in st.ring.iter().enumerate() {
        let [lo, hi] = load_lanes(lanes);
        ring[2 * slot] = lo;
        ring[2 * slot + 1] = hi;
    }

    let phi_lo = _mm256_set1_epi64x((PHI & 0xffff_ffff) as i64);
    let phi_hi = _mm256_set1_epi64x((PHI >> 32) as i64);
    let dst = out.as_mut_ptr() as *mut __m256i;

    let mut pos = st.pos;

    for k in 0..STEPS_PER_BATCH {
        let next = (pos + 1) & (RING_LEN - 1);

        for h in 0..2 {
            let s0 = ring[2 * pos + h];
            let mut s1 = ring[2 * next + h];

            s1 = _mm256_xor_si256(s1, _mm256_slli_epi64(s1, 31));

            let t = _mm256_xor_si256(
                _mm256_xor_si256(s1, s0),
                _mm256_xor_si256(_mm256_srli_epi64(s1, 11), _mm256_srli_epi64(s0, 30)),
            );

            ring[2 * next + h] = t;
            _mm256_storeu_si256(dst.add(2 * k + h), mul_lo_u64(t, phi_lo, phi_hi));
        }

        pos = next;
    }

    for (slot, lanes) in st.ring.iter_mut().enumerate() {
        store_lanes(lanes, [ring[2 * slot], ring[2 * slot + 1]]);
    }

    st.pos = pos;
}

/// Wrapping 64-bit multiply by a constant split into 32-bit halves.
///
/// AVX2 has no 64x64 multiply, so:
///
/// ```md
/// x * m mod 2^64 = lo(x) * lo(m) + ((hi(x) * lo(m) + lo(x) * hi(m)) << 32)
/// ```
#[inline]
#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn mul_lo_u64(x: __m256i, m_lo: __m256i, m_hi: __m256i) -> __m256i {
    let x_hi = _mm256_srli_epi64(x, 32);

    let lo = _mm256_mul_epu32(x, m_lo);
    let cross = _mm256_add_epi64(_mm256_mul_epu32(x_hi, m_lo), _mm256_mul_epu32(x, m_hi));

    _mm256_add_epi64(lo, _mm256_slli_epi64(cross, 32))
}

//
// f64 reductions
//

#[inline]
#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn hmax_pd(v: __m256d) -> f64 {
    let m = _mm_max_pd(_mm256_castpd256_pd128(v), _mm256_extractf128_pd(v, 1));
    _mm_cvtsd_f64(_mm_max_sd(m, _mm_unpackhi_pd(m, m)))
}

#[inline]
#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn hsum_pd(v: __m256d) -> f64 {
    let s = _mm_add_pd(_mm256_castpd256_pd128(v), _mm256_extractf128_pd(v, 1));
    _mm_cvtsd_f64(_mm_add_sd(s, _mm_unpackhi_pd(s, s)))
}

#[inline]
#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn abs_pd(v: __m256d) -> __m256d {
    _mm256_andnot_pd(_mm256_set1_pd(-0.0), v)
}

#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn pair_l1_max_pd(buf: &[f64]) -> f64 {
    let mut vmax = _mm256_setzero_pd();
    let mut nan = _mm256_setzero_pd();
    let mut chunks = buf.chunks_exact(F64_CHUNK);

    for chunk in chunks.by_ref() {
        let p = chunk.as_ptr();
        let x0 = abs_pd(_mm256_loadu_pd(p));
        let x1 = abs_pd(_mm256_loadu_pd(p.add(4)));

        // | x0[0]+x0[1] | x1[0]+x1[1] | x0[2]+x0[3] | x1[2]+x1[3] |
        let sums = _mm256_hadd_pd(x0, x1);

        nan = _mm256_or_pd(nan, _mm256_cmp_pd(sums, sums, _CMP_UNORD_Q));
        vmax = _mm256_max_pd(vmax, sums);
    }

    // NOTE: `max_pd` drops NaN depending on operand order, so it's tracked aside
    if _mm256_movemask_pd(nan) != 0 {
        return f64::NAN;
    }

    let scale = hmax_pd(vmax);
    let tail = scalar::pair_l1_max(chunks.remainder());

    if tail > scale || tail.is_nan() { tail } else { scale }
}

#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn scaled_sum_squares_pd(buf: &[f64], pre: f64, post: f64) -> f64 {
    let vpre = _mm256_set1_pd(pre);
    let vpost = _mm256_set1_pd(post);

    let mut acc0 = _mm256_setzero_pd();
    let mut acc1 = _mm256_setzero_pd();
    let mut chunks = buf.chunks_exact(F64_CHUNK);

    for chunk in chunks.by_ref() {
        let p = chunk.as_ptr();
        let x0 = _mm256_mul_pd(_mm256_mul_pd(_mm256_loadu_pd(p), vpre), vpost);
        let x1 = _mm256_mul_pd(_mm256_mul_pd(_mm256_loadu_pd(p.add(4)), vpre), vpost);

        acc0 = _mm256_add_pd(acc0, _mm256_mul_pd(x0, x0));
        acc1 = _mm256_add_pd(acc1, _mm256_mul_pd(x1, x1));
    }

    hsum_pd(_mm256_add_pd(acc0, acc1)) + scalar::scaled_sum_squares(chunks.remainder(), pre, post)
}

/// `true` iff every lane is equal or within tolerance; `eq` is the precomputed equality mask.
#[inline]
#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn close_pd(a: __m256d, b: __m256d, eq: __m256d, rel: __m256d, abs: __m256d) -> bool {
    let diff = abs_pd(_mm256_sub_pd(a, b));
    let bound = _mm256_mul_pd(rel, _mm256_max_pd(abs_pd(a), abs_pd(b)));

    let ok = _mm256_or_pd(
        eq,
        _mm256_or_pd(_mm256_cmp_pd(diff, abs, _CMP_LE_OQ), _mm256_cmp_pd(diff, bound, _CMP_LE_OQ)),
    );

    _mm256_movemask_pd(ok) == 0xF
}

#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn all_close_pd(a: &[f64], b: &[f64], rel_tol: f64, abs_tol: f64) -> bool {
    let rel = _mm256_set1_pd(rel_tol);
    let abs = _mm256_set1_pd(abs_tol);

    let mut ca = a.chunks_exact(F64_CHUNK);
    let mut cb = b.chunks_exact(F64_CHUNK);

    for (xa, xb) in ca.by_ref().zip(cb.by_ref()) {
        let (pa, pb) = (xa.as_ptr(), xb.as_ptr());

        let a0 = _mm256_loadu_pd(pa);
        let b0 = _mm256_loadu_pd(pb);
        let a1 = _mm256_loadu_pd(pa.add(4));
        let b1 = _mm256_loadu_pd(pb.add(4));

        let eq0 = _mm256_cmp_pd(a0, b0, _CMP_EQ_OQ);
        let eq1 = _mm256_cmp_pd(a1, b1, _CMP_EQ_OQ);

        // fast path, whole chunk bit-for-bit equal (up to signed zeros)
        if _mm256_movemask_pd(_mm256_and_pd(eq0, eq1)) == 0xF {
            continue;
        }

        if !close_pd(a0, b0, eq0, rel, abs) || !close_pd(a1, b1, eq1, rel, abs) {
            return false;
        }
    }

    scalar::all_close(ca.remainder(), cb.remainder(), rel_tol, abs_tol)
}

#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn abs_diff_sum_pd(a: &[f64], b: &[f64]) -> f64 {
    let mut acc0 = _mm256_setzero_pd();
    let mut acc1 = _mm256_setzero_pd();

    let mut ca = a.chunks_exact(F64_CHUNK);
    let mut cb = b.chunks_exact(F64_CHUNK);

    for (xa, xb) in ca.by_ref().zip(cb.by_ref()) {
        let (pa, pb) = (xa.as_ptr(), xb.as_ptr());

        acc0 = _mm256_add_pd(acc0, abs_pd(_mm256_sub_pd(_mm256_loadu_pd(pa), _mm256_loadu_pd(pb))));
        acc1 = _mm256_add_pd(
            acc1,
            abs_pd(_mm256_sub_pd(_mm256_loadu_pd(pa.add(4)), _mm256_loadu_pd(pb.add(4)))),
        );
    }

    hsum_pd(_mm256_add_pd(acc0, acc1)) + scalar::abs_diff_sum(ca.remainder(), cb.remainder())
}

//
// f32 reductions
//

#[inline]
#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn hmax_ps(v: __m256) -> f32 {
    let m = _mm_max_ps(_mm256_castps256_ps128(v), _mm256_extractf128_ps(v, 1));
    let m = _mm_max_ps(m, _mm_movehl_ps(m, m));
    _mm_cvtss_f32(_mm_max_ss(m, _mm_shuffle_ps(m, m, 0b01)))
}

#[inline]
#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn hsum_ps(v: __m256) -> f32 {
    let s = _mm_add_ps(_mm256_castps256_ps128(v), _mm256_extractf128_ps(v, 1));
    let s = _mm_add_ps(s, _mm_movehl_ps(s, s));
    _mm_cvtss_f32(_mm_add_ss(s, _mm_shuffle_ps(s, s, 0b01)))
}

#[inline]
#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn abs_ps(v: __m256) -> __m256 {
    _mm256_andnot_ps(_mm256_set1_ps(-0.0), v)
}

#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn pair_l1_max_ps(buf: &[f32]) -> f32 {
    let mut vmax = _mm256_setzero_ps();
    let mut nan = _mm256_setzero_ps();
    let mut chunks = buf.chunks_exact(F32_CHUNK);

    for chunk in chunks.by_ref() {
        let p = chunk.as_ptr();
        let x0 = abs_ps(_mm256_loadu_ps(p));
        let x1 = abs_ps(_mm256_loadu_ps(p.add(8)));

        // pairwise sums within each 128-bit half, all 8 pairs of the chunk
        let sums = _mm256_hadd_ps(x0, x1);

        nan = _mm256_or_ps(nan, _mm256_cmp_ps(sums, sums, _CMP_UNORD_Q));
        vmax = _mm256_max_ps(vmax, sums);
    }

    if _mm256_movemask_ps(nan) != 0 {
        return f32::NAN;
    }

    let scale = hmax_ps(vmax);
    let tail = scalar::pair_l1_max(chunks.remainder());

    if tail > scale || tail.is_nan() { tail } else { scale }
}

#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn scaled_sum_squares_ps(buf: &[f32], pre: f32, post: f32) -> f32 {
    let vpre = _mm256_set1_ps(pre);
    let vpost = _mm256_set1_ps(post);

    let mut acc0 = _mm256_setzero_ps();
    let mut acc1 = _mm256_setzero_ps();
    let mut chunks = buf.chunks_exact(F32_CHUNK);

    for chunk in chunks.by_ref() {
        let p = chunk.as_ptr();
        let x0 = _mm256_mul_ps(_mm256_mul_ps(_mm256_loadu_ps(p), vpre), vpost);
        let x1 = _mm256_mul_ps(_mm256_mul_ps(_mm256_loadu_ps(p.add(8)), vpre), vpost);

        acc0 = _mm256_add_ps(acc0, _mm256_mul_ps(x0, x0));
        acc1 = _mm256_add_ps(acc1, _mm256_mul_ps(x1, x1));
    }

    hsum_ps(_mm256_add_ps(acc0, acc1)) + scalar::scaled_sum_squares(chunks.remainder(), pre, post)
}

#[inline]
#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn close_ps(a: __m256, b: __m256, eq: __m256, rel: __m256, abs: __m256) -> bool {
    let diff = abs_ps(_mm256_sub_ps(a, b));
    let bound = _mm256_mul_ps(rel, _mm256_max_ps(abs_ps(a), abs_ps(b)));

    let ok = _mm256_or_ps(
        eq,
        _mm256_or_ps(_mm256_cmp_ps(diff, abs, _CMP_LE_OQ), _mm256_cmp_ps(diff, bound, _CMP_LE_OQ)),
    );

    _mm256_movemask_ps(ok) == 0xFF
}

#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn all_close_ps(a: &[f32], b: &[f32], rel_tol: f32, abs_tol: f32) -> bool {
    let rel = _mm256_set1_ps(rel_tol);
    let abs = _mm256_set1_ps(abs_tol);

    let mut ca = a.chunks_exact(F32_CHUNK);
    let mut cb = b.chunks_exact(F32_CHUNK);

    for (xa, xb) in ca.by_ref().zip(cb.by_ref()) {
        let (pa, pb) = (xa.as_ptr(), xb.as_ptr());

        let a0 = _mm256_loadu_ps(pa);
        let b0 = _mm256_loadu_ps(pb);
        let a1 = _mm256_loadu_ps(pa.add(8));
        let b1 = _mm256_loadu_ps(pb.add(8));

        let eq0 = _mm256_cmp_ps(a0, b0, _CMP_EQ_OQ);
        let eq1 = _mm256_cmp_ps(a1, b1, _CMP_EQ_OQ);

        if _mm256_movemask_ps(_mm256_and_ps(eq0, eq1)) == 0xFF {
            continue;
        }

        if !close_ps(a0, b0, eq0, rel, abs) || !close_ps(a1, b1, eq1, rel, abs) {
            return false;
        }
    }

    scalar::all_close(ca.remainder(), cb.remainder(), rel_tol, abs_tol)
}

#[target_feature(enable = "avx2")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn abs_diff_sum_ps(a: &[f32], b: &[f32]) -> f32 {
    let mut acc0 = _mm256_setzero_ps();
    let mut acc1 = _mm256_setzero_ps();

    let mut ca = a.chunks_exact(F32_CHUNK);
    let mut cb = b.chunks_exact(F32_CHUNK);

    for (xa, xb) in ca.by_ref().zip(cb.by_ref()) {
        let (pa, pb) = (xa.as_ptr(), xb.as_ptr());

        acc0 = _mm256_add_ps(acc0, abs_ps(_mm256_sub_ps(_mm256_loadu_ps(pa), _mm256_loadu_ps(pb))));
        acc1 = _mm256_add_ps(
            acc1,
            abs_ps(_mm256_sub_ps(_mm256_loadu_ps(pa.add(8)), _mm256_loadu_ps(pb.add(8)))),
        );
    }

    hsum_ps(_mm256_add_ps(acc0, acc1)) + scalar::abs_diff_sum(ca.remainder(), cb.remainder())
}
