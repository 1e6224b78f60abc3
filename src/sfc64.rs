use crate::engine::{dispatch, scalar};
use crate::error::Result;
use crate::simd::{Isa, active_isa};
use crate::state::{self, LANES, Lanes, SFC64_SEED_LEN, Sfc64State};

/// Inner steps run (and discarded) right after seeding.
const WARMUP_STEPS: usize = 12;

/// Eight Small Fast Counting (sfc64) streams advanced in lockstep.
///
/// Every [`Sfc64x8::next_batch`] call writes [`crate::BATCH_LEN`] words, step-major: word
/// `8k + lane` is the output of `lane` at step `k`.
///
/// ## Example
///
/// ```rust
/// use octa::{BATCH_LEN, Sfc64x8};
///
/// let mut rng = Sfc64x8::new(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
/// let mut out = vec![0u64; BATCH_LEN];
///
/// rng.next_batch(&mut out).unwrap();
/// assert_eq!(rng.counter(), [1 + 12 + 256; 8]);
///
/// // wrong length, nothing written
/// assert!(rng.next_batch(&mut out[..16]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sfc64x8 {
    state: Sfc64State,
    warmup_fold: u64,
}

impl Sfc64x8 {
    /// Seeds one lane per word; see [`Sfc64x8::reseed`] for the rules.
    pub fn new(seeds: &[u64]) -> Result<Self> {
        let (state, warmup_fold) = warm_up(seeds)?;

        Ok(Self { state, warmup_fold })
    }

    /// Restarts every lane from `seeds` and returns the XOR of the last warm-up outputs.
    ///
    /// `seeds` must hold exactly [`crate::SFC64_SEED_LEN`] non-zero, pairwise distinct
    /// words. On error the generator is left as it was.
    pub fn reseed(&mut self, seeds: &[u64]) -> Result<u64> {
        let (state, warmup_fold) = warm_up(seeds)?;

        self.state = state;
        self.warmup_fold = warmup_fold;

        Ok(warmup_fold)
    }

    /// XOR of the 8 lane outputs of the 12th warm-up step of the last seeding.
    #[inline(always)]
    pub fn warmup_fold(&self) -> u64 {
        self.warmup_fold
    }

    /// Per-lane step counter.
    #[inline(always)]
    pub fn counter(&self) -> [u64; LANES] {
        self.state.counter.0
    }

    /// Fills `out` with the next 256 steps of all lanes.
    ///
    /// ## Errors
    ///
    /// [`crate::Error::BatchLength`] unless `out.len() == BATCH_LEN`.
    #[inline]
    pub fn next_batch(&mut self, out: &mut [u64]) -> Result<()> {
        self.next_batch_with(active_isa(), out)
    }

    pub(crate) fn next_batch_with(&mut self, isa: Isa, out: &mut [u64]) -> Result<()> {
        let out = state::batch_buffer(out)?;

        dispatch!(isa, sfc64_batch(&mut self.state, out));
        log::trace!("sfc64x8 batch drawn, counter at {}", self.state.counter.0[0]);

        Ok(())
    }
}

fn warm_up(seeds: &[u64]) -> Result<(Sfc64State, u64)> {
    let seeds = state::check_seeds::<SFC64_SEED_LEN>(seeds)?;
    state::check_distinct(seeds)?;

    let mut st = Sfc64State::seeded(seeds);
    let mut last = Lanes::default();

    for _ in 0..WARMUP_STEPS {
        last = scalar::sfc64_step(&mut st);
    }

    let fold = last.xor_fold();
    log::debug!("sfc64x8 seeded, warm-up fold {fold:#018x}");

    Ok((st, fold))
}
