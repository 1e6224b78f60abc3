use crate::engine::dispatch;
use crate::error::{Error, Result};
use crate::simd::{Isa, active_isa};
use core::fmt::Debug;
use core::ops::{Add, Div, Mul, Sub};

/// Float element type the reductions are generic over (`f64` or `f32`).
///
/// Besides the arithmetic it carries the per-type engine entry points, so generic
/// reduction code can dispatch without knowing which `Engine` method to name.
pub(crate) trait Real:
    Copy
    + Debug
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    const ZERO: Self;
    const ONE: Self;

    /// Factor the norm's scale is boosted by while it is too small.
    const RESCALE_BASE: Self;
    /// Scales at or below this get boosted.
    const RESCALE_LIMIT: Self;

    fn abs(self) -> Self;
    fn max(self, other: Self) -> Self;
    fn sqrt(self) -> Self;
    fn powi(self, n: i32) -> Self;
    fn is_nan(self) -> bool;
    fn is_infinite(self) -> bool;
    fn to_f64(self) -> f64;

    fn pair_l1_max(isa: Isa, buf: &[Self]) -> Self;
    fn scaled_sum_squares(isa: Isa, buf: &[Self], pre: Self, post: Self) -> Self;
    fn all_close(isa: Isa, a: &[Self], b: &[Self], rel_tol: Self, abs_tol: Self) -> bool;
    fn abs_diff_sum(isa: Isa, a: &[Self], b: &[Self]) -> Self;
}

macro_rules! impl_real {
    ($t:ty, $pair:ident, $squares:ident, $close:ident, $diff:ident) => {
        impl Real for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
            const RESCALE_BASE: Self = 1000.0;
            const RESCALE_LIMIT: Self = 1.1;

            #[inline(always)]
            fn abs(self) -> Self {
                <$t>::abs(self)
            }

            #[inline(always)]
            fn max(self, other: Self) -> Self {
                <$t>::max(self, other)
            }

            #[inline(always)]
            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }

            #[inline(always)]
            fn powi(self, n: i32) -> Self {
                <$t>::powi(self, n)
            }

            #[inline(always)]
            fn is_nan(self) -> bool {
                <$t>::is_nan(self)
            }

            #[inline(always)]
            fn is_infinite(self) -> bool {
                <$t>::is_infinite(self)
            }

            #[inline(always)]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline(always)]
            fn pair_l1_max(isa: Isa, buf: &[Self]) -> Self {
                dispatch!(isa, $pair(buf))
            }

            #[inline(always)]
            fn scaled_sum_squares(isa: Isa, buf: &[Self], pre: Self, post: Self) -> Self {
                dispatch!(isa, $squares(buf, pre, post))
            }

            #[inline(always)]
            fn all_close(isa: Isa, a: &[Self], b: &[Self], rel_tol: Self, abs_tol: Self) -> bool {
                dispatch!(isa, $close(a, b, rel_tol, abs_tol))
            }

            #[inline(always)]
            fn abs_diff_sum(isa: Isa, a: &[Self], b: &[Self]) -> Self {
                dispatch!(isa, $diff(a, b))
            }
        }
    };
}

impl_real!(f64, pair_l1_max_f64, scaled_sum_squares_f64, all_close_f64, abs_diff_sum_f64);
impl_real!(f32, pair_l1_max_f32, scaled_sum_squares_f32, all_close_f32, abs_diff_sum_f32);

/// Factors applied as `(x * pre) * post` before squaring, with `pre * post ≈ 1 / scale`.
///
/// A small scale is boosted by `1000^k` until it exceeds `1.1`; the boost is split in
/// two half powers so neither factor overflows, even when `scale` is subnormal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rescale<T> {
    pub(crate) pre: T,
    pub(crate) post: T,
}

impl<T: Real> Rescale<T> {
    /// `scale` must be finite and positive.
    pub(crate) fn for_scale(scale: T) -> Self {
        let mut boosted = scale;
        let mut k = 0i32;

        while boosted <= T::RESCALE_LIMIT {
            boosted = boosted * T::RESCALE_BASE;
            k += 1;
        }

        let half = k / 2;

        Self {
            pre: T::RESCALE_BASE.powi(half),
            post: T::RESCALE_BASE.powi(k - half) * (T::ONE / boosted),
        }
    }

    #[inline(always)]
    pub(crate) fn undo(&self, norm: T) -> T {
        norm / self.post / self.pre
    }
}

/// Euclidean norm of `buf`, read as interleaved `(re, im)` pairs.
///
/// The vector is first scaled by the largest `|re| + |im|` so squaring neither
/// overflows nor underflows, then the norm is scaled back.
///
/// ## Errors
///
/// [`Error::OddCount`] if `buf` holds an odd number of elements.
///
/// ## Example
///
/// ```rust
/// let norm = octa::l2_norm(&[3.0, 4.0]).unwrap();
/// assert!((norm - 5.0).abs() < 1e-12);
///
/// // no overflow, no underflow
/// let tiny = octa::l2_norm(&[3e-200, 4e-200]).unwrap();
/// assert!((tiny / 5e-200 - 1.0).abs() < 1e-12);
///
/// assert_eq!(octa::l2_norm(&[]).unwrap(), 0.0);
/// assert!(octa::l2_norm(&[1.0, 2.0, 3.0]).is_err());
/// ```
pub fn l2_norm(buf: &[f64]) -> Result<f64> {
    l2_norm_with(active_isa(), buf)
}

/// Single precision [`l2_norm`].
pub fn l2_norm_f32(buf: &[f32]) -> Result<f32> {
    l2_norm_with(active_isa(), buf)
}

/// Whether `a` and `b` agree element-wise within `abs_tol` or `rel_tol`.
///
/// Element `i` passes when `a[i] == b[i]`, or when `|a[i] - b[i]|` is at most `abs_tol`
/// or at most `rel_tol * max(|a[i]|, |b[i]|)`. NaN never passes.
///
/// An empty slice on either side compares as `false`.
///
/// ## Errors
///
/// [`Error::LengthMismatch`], [`Error::OddCount`], or [`Error::NegativeTolerance`] for a
/// negative or NaN tolerance.
///
/// ## Example
///
/// ```rust
/// let a = [1.0, 2.0, 3.0, 4.0];
/// let b = [1.0, 2.0, 3.0, 4.001];
///
/// assert!(octa::approx_equal(&a, &b, 1e-3, 0.0).unwrap());
/// assert!(!octa::approx_equal(&a, &b, 1e-6, 0.0).unwrap());
/// assert!(!octa::approx_equal(&[], &b, 1.0, 1.0).unwrap());
/// ```
pub fn approx_equal(a: &[f64], b: &[f64], rel_tol: f64, abs_tol: f64) -> Result<bool> {
    approx_equal_with(active_isa(), a, b, rel_tol, abs_tol)
}

/// Single precision [`approx_equal`].
pub fn approx_equal_f32(a: &[f32], b: &[f32], rel_tol: f32, abs_tol: f32) -> Result<bool> {
    approx_equal_with(active_isa(), a, b, rel_tol, abs_tol)
}

/// Entry-wise L1 distance `Σ |a[i] - b[i]|`, zero if either slice is empty.
///
/// ## Errors
///
/// [`Error::LengthMismatch`] if the slices differ in length.
pub fn distance(a: &[f64], b: &[f64]) -> Result<f64> {
    distance_with(active_isa(), a, b)
}

/// Single precision [`distance`].
pub fn distance_f32(a: &[f32], b: &[f32]) -> Result<f32> {
    distance_with(active_isa(), a, b)
}

pub(crate) fn l2_norm_with<T: Real>(isa: Isa, buf: &[T]) -> Result<T> {
    if buf.is_empty() {
        return Ok(T::ZERO);
    }

    if buf.len() % 2 != 0 {
        return Err(Error::OddCount(buf.len()));
    }

    let mut scale = T::pair_l1_max(isa, buf);

    if scale.is_nan() {
        return Ok(scale);
    }

    if scale.is_infinite() {
        // `|re| + |im|` overflows for finite pairs near the type's max
        scale = buf.iter().fold(T::ZERO, |m, &x| m.max(x.abs()));

        if scale.is_infinite() {
            return Ok(scale);
        }
    }

    if scale == T::ZERO {
        return Ok(T::ZERO);
    }

    let rescale = Rescale::for_scale(scale);
    let sum = T::scaled_sum_squares(isa, buf, rescale.pre, rescale.post);

    Ok(rescale.undo(sum.sqrt()))
}

pub(crate) fn approx_equal_with<T: Real>(
    isa: Isa,
    a: &[T],
    b: &[T],
    rel_tol: T,
    abs_tol: T,
) -> Result<bool> {
    if a.is_empty() || b.is_empty() {
        return Ok(false);
    }

    if a.len() != b.len() {
        return Err(Error::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    if a.len() % 2 != 0 {
        return Err(Error::OddCount(a.len()));
    }

    check_tolerance("rel_tol", rel_tol)?;
    check_tolerance("abs_tol", abs_tol)?;

    Ok(T::all_close(isa, a, b, rel_tol, abs_tol))
}

pub(crate) fn distance_with<T: Real>(isa: Isa, a: &[T], b: &[T]) -> Result<T> {
    if a.is_empty() || b.is_empty() {
        return Ok(T::ZERO);
    }

    if a.len() != b.len() {
        return Err(Error::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    Ok(T::abs_diff_sum(isa, a, b))
}

fn check_tolerance<T: Real>(name: &'static str, value: T) -> Result<()> {
    if value.is_nan() || value < T::ZERO {
        return Err(Error::NegativeTolerance {
            name,
            value: value.to_f64(),
        });
    }

    Ok(())
}
