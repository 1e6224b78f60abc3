use crate::state::{BATCH_LEN, Sfc64State, Xor1024State};

pub(crate) mod scalar;

#[cfg(target_arch = "x86_64")]
pub(crate) mod avx2;

#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;

/// One implementation of every kernel for a given instruction set.
///
/// ## Safety
///
/// All methods require the engine's instruction set to be available on the running CPU
/// (see [`crate::simd::Isa::is_supported`]). Binary kernels require `a.len() == b.len()`
/// and the pair kernels an even length; callers validate both before dispatching.
///
/// Generator kernels must be bit-identical across engines. Reductions may differ from the
/// scalar engine only by floating-point summation order.
pub(crate) trait Engine {
    unsafe fn sfc64_batch(state: &mut Sfc64State, out: &mut [u64; BATCH_LEN]);
    unsafe fn xor1024_batch(state: &mut Xor1024State, out: &mut [u64; BATCH_LEN]);

    /// Max of `|re| + |im|` over all pairs, NaN if any element is NaN.
    unsafe fn pair_l1_max_f64(buf: &[f64]) -> f64;
    unsafe fn pair_l1_max_f32(buf: &[f32]) -> f32;

    /// `Σ ((x * pre) * post)^2`
    unsafe fn scaled_sum_squares_f64(buf: &[f64], pre: f64, post: f64) -> f64;
    unsafe fn scaled_sum_squares_f32(buf: &[f32], pre: f32, post: f32) -> f32;

    unsafe fn all_close_f64(a: &[f64], b: &[f64], rel_tol: f64, abs_tol: f64) -> bool;
    unsafe fn all_close_f32(a: &[f32], b: &[f32], rel_tol: f32, abs_tol: f32) -> bool;

    /// `Σ |a[i] - b[i]|`
    unsafe fn abs_diff_sum_f64(a: &[f64], b: &[f64]) -> f64;
    unsafe fn abs_diff_sum_f32(a: &[f32], b: &[f32]) -> f32;
}

/// Calls `Engine::$method` on the engine selected by `$isa`.
///
/// An ISA that is not compiled for the target falls through to the scalar engine.
macro_rules! dispatch {
    ($isa:expr, $method:ident($($arg:expr),* $(,)?)) => {{
        let isa: crate::simd::Isa = $isa;
        debug_assert!(isa.is_supported(), "dispatch to unsupported ISA {isa}");

        match isa {
            #[cfg(target_arch = "x86_64")]
            crate::simd::Isa::Avx2 => unsafe {
                <crate::engine::avx2::Avx2 as crate::engine::Engine>::$method($($arg),*)
            },

            #[cfg(target_arch = "aarch64")]
            crate::simd::Isa::Neon => unsafe {
                <crate::engine::neon::Neon as crate::engine::Engine>::$method($($arg),*)
            },

            _ => unsafe { <crate::engine::scalar::Scalar as crate::engine::Engine>::$method($($arg),*) },
        }
    }};
}

pub(crate) use dispatch;
