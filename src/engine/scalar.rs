//! # Scalar Engine
//!
//! Portable reference implementation of every kernel. The reductions keep
//! fixed-width accumulator arrays so the compiler can autovectorize them, and so
//! that they combine partial results the same way the SIMD engines do
//! (horizontal max for scale discovery, horizontal sum for everything else).
use super::Engine;
use crate::reduce::Real;
use crate::state::{BATCH_LEN, LANES, Lanes, RING_LEN, Sfc64State, Xor1024State};

/// Multiplier of the xorshift1024**xφ output function (64-bit golden ratio, odd).
pub(crate) const PHI: u64 = 0x9e37_79b9_7f4a_7c13;

const CHUNK: usize = 16;
const PAIRS: usize = CHUNK / 2;

pub(crate) struct Scalar;

impl Engine for Scalar {
    #[inline(always)]
    unsafe fn sfc64_batch(state: &mut Sfc64State, out: &mut [u64; BATCH_LEN]) {
        for step in out.chunks_exact_mut(LANES) {
            step.copy_from_slice(&sfc64_step(state).0);
        }
    }

    #[inline(always)]
    unsafe fn xor1024_batch(state: &mut Xor1024State, out: &mut [u64; BATCH_LEN]) {
        for step in out.chunks_exact_mut(LANES) {
            step.copy_from_slice(&xor1024_step(state).0);
        }
    }

    #[inline(always)]
    unsafe fn pair_l1_max_f64(buf: &[f64]) -> f64 {
        pair_l1_max(buf)
    }

    #[inline(always)]
    unsafe fn pair_l1_max_f32(buf: &[f32]) -> f32 {
        pair_l1_max(buf)
    }

    #[inline(always)]
    unsafe fn scaled_sum_squares_f64(buf: &[f64], pre: f64, post: f64) -> f64 {
        scaled_sum_squares(buf, pre, post)
    }

    #[inline(always)]
    unsafe fn scaled_sum_squares_f32(buf: &[f32], pre: f32, post: f32) -> f32 {
        scaled_sum_squares(buf, pre, post)
    }

    #[inline(always)]
    unsafe fn all_close_f64(a: &[f64], b: &[f64], rel_tol: f64, abs_tol: f64) -> bool {
        all_close(a, b, rel_tol, abs_tol)
    }

    #[inline(always)]
    unsafe fn all_close_f32(a: &[f32], b: &[f32], rel_tol: f32, abs_tol: f32) -> bool {
        all_close(a, b, rel_tol, abs_tol)
    }

    #[inline(always)]
    unsafe fn abs_diff_sum_f64(a: &[f64], b: &[f64]) -> f64 {
        abs_diff_sum(a, b)
    }

    #[inline(always)]
    unsafe fn abs_diff_sum_f32(a: &[f32], b: &[f32]) -> f32 {
        abs_diff_sum(a, b)
    }
}

/// Advances all lanes of sfc64 by one step and returns the 8 outputs.
///
/// ```md
/// r        = a + b + counter
/// counter += 1
/// a        = b ^ (b >> 11)
/// b        = c + (c << 3)
/// c        = rotl(c, 24) + r
/// ```
#[inline(always)]
pub(crate) fn sfc64_step(st: &mut Sfc64State) -> Lanes {
    let mut r = Lanes::default();

    for i in 0..LANES {
        let a = st.a.0[i];
        let b = st.b.0[i];
        let c = st.c.0[i];
        let n = st.counter.0[i];

        let out = a.wrapping_add(b).wrapping_add(n);

        st.counter.0[i] = n.wrapping_add(1);
        st.a.0[i] = b ^ (b >> 11);
        st.b.0[i] = c.wrapping_add(c << 3);
        st.c.0[i] = c.rotate_left(24).wrapping_add(out);

        r.0[i] = out;
    }

    r
}

/// Advances the shared ring cursor by one and returns the 8 scrambled outputs.
#[inline(always)]
pub(crate) fn xor1024_step(st: &mut Xor1024State) -> Lanes {
    let s0 = st.ring[st.pos];
    st.pos = (st.pos + 1) & (RING_LEN - 1);
    let s1 = &mut st.ring[st.pos];

    let mut r = Lanes::default();

    for i in 0..LANES {
        let x0 = s0.0[i];
        let mut x1 = s1.0[i];

        x1 ^= x1 << 31;
        let t = x1 ^ x0 ^ (x1 >> 11) ^ (x0 >> 30);

        s1.0[i] = t;
        r.0[i] = t.wrapping_mul(PHI);
    }

    r
}

/// Max that sticks to NaN once it has seen one.
#[inline(always)]
fn nan_max<T: Real>(acc: T, x: T) -> T {
    if x > acc || x.is_nan() { x } else { acc }
}

pub(crate) fn pair_l1_max<T: Real>(buf: &[T]) -> T {
    let mut acc = [T::ZERO; PAIRS];
    let mut chunks = buf.chunks_exact(CHUNK);

    for chunk in chunks.by_ref() {
        for (slot, pair) in acc.iter_mut().zip(chunk.chunks_exact(2)) {
            *slot = nan_max(*slot, pair[0].abs() + pair[1].abs());
        }
    }

    let mut scale = acc.into_iter().fold(T::ZERO, nan_max);

    for pair in chunks.remainder().chunks_exact(2) {
        let (re, im) = (pair[0], pair[1]);

        if re != T::ZERO || im != T::ZERO {
            scale = nan_max(scale, re.abs() + im.abs());
        }
    }

    scale
}

pub(crate) fn scaled_sum_squares<T: Real>(buf: &[T], pre: T, post: T) -> T {
    let mut acc = [T::ZERO; CHUNK];
    let mut chunks = buf.chunks_exact(CHUNK);

    for chunk in chunks.by_ref() {
        for (slot, &x) in acc.iter_mut().zip(chunk) {
            let s = x * pre * post;
            *slot = *slot + s * s;
        }
    }

    let mut sum = acc.into_iter().fold(T::ZERO, |s, x| s + x);

    for &x in chunks.remainder() {
        if x != T::ZERO {
            let s = x * pre * post;
            sum = sum + s * s;
        }
    }

    sum
}

/// `x == y`, or `|x - y|` within the absolute or the relative bound.
#[inline(always)]
pub(crate) fn is_close<T: Real>(x: T, y: T, rel_tol: T, abs_tol: T) -> bool {
    if x == y {
        return true;
    }

    let diff = (x - y).abs();
    diff <= abs_tol || diff <= rel_tol * x.abs().max(y.abs())
}

pub(crate) fn all_close<T: Real>(a: &[T], b: &[T], rel_tol: T, abs_tol: T) -> bool {
    let mut ca = a.chunks_exact(CHUNK);
    let mut cb = b.chunks_exact(CHUNK);

    for (xa, xb) in ca.by_ref().zip(cb.by_ref()) {
        // exact match over the whole chunk skips the tolerance math
        if xa == xb {
            continue;
        }

        if !xa.iter().zip(xb).all(|(&x, &y)| is_close(x, y, rel_tol, abs_tol)) {
            return false;
        }
    }

    ca.remainder()
        .iter()
        .zip(cb.remainder())
        .all(|(&x, &y)| is_close(x, y, rel_tol, abs_tol))
}

pub(crate) fn abs_diff_sum<T: Real>(a: &[T], b: &[T]) -> T {
    let mut acc = [T::ZERO; CHUNK];
    let mut ca = a.chunks_exact(CHUNK);
    let mut cb = b.chunks_exact(CHUNK);

    for (xa, xb) in ca.by_ref().zip(cb.by_ref()) {
        for (slot, (&x, &y)) in acc.iter_mut().zip(xa.iter().zip(xb)) {
            *slot = *slot + (x - y).abs();
        }
    }

    let sum = acc.into_iter().fold(T::ZERO, |s, x| s + x);

    ca.remainder()
        .iter()
        .zip(cb.remainder())
        .fold(sum, |s, (&x, &y)| s + (x - y).abs())
}
