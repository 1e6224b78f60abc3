use crate::engine::dispatch;
use crate::error::Result;
use crate::simd::{Isa, active_isa};
use crate::state::{self, XOR1024_SEED_LEN, Xor1024State};

/// Eight xorshift1024 streams with a `* φ` output scrambler, sharing one ring cursor.
///
/// Each lane owns 16 words of state. One inner step advances the cursor for all
/// lanes at once, so a batch (256 steps) always brings it back to where it started.
///
/// ## Example
///
/// ```rust
/// use octa::{BATCH_LEN, XOR1024_SEED_LEN, Xor1024x8};
///
/// let seeds: Vec<u64> = (1..=XOR1024_SEED_LEN as u64).collect();
/// let mut rng = Xor1024x8::new(&seeds).unwrap();
///
/// let mut out = vec![0u64; BATCH_LEN];
/// rng.next_batch(&mut out).unwrap();
///
/// assert_eq!(rng.position(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xor1024x8 {
    state: Xor1024State,
}

impl Xor1024x8 {
    pub fn new(seeds: &[u64]) -> Result<Self> {
        Ok(Self {
            state: seeded(seeds)?,
        })
    }

    /// Replaces the whole ring and resets the cursor.
    ///
    /// `seeds` holds [`crate::XOR1024_SEED_LEN`] non-zero words, lane-major: word
    /// `lane * 16 + slot` seeds slot `slot` of `lane`. On error the generator is left as
    /// it was.
    pub fn reseed(&mut self, seeds: &[u64]) -> Result<()> {
        self.state = seeded(seeds)?;
        Ok(())
    }

    /// Ring cursor, in `0..16`.
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.state.pos
    }

    /// Fills `out` with the next 256 steps of all lanes, step-major.
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

        dispatch!(isa, xor1024_batch(&mut self.state, out));
        log::trace!("xor1024x8 batch drawn");

        Ok(())
    }
}

fn seeded(seeds: &[u64]) -> Result<Xor1024State> {
    let seeds = state::check_seeds::<XOR1024_SEED_LEN>(seeds)?;
    log::debug!("xor1024x8 seeded");

    Ok(Xor1024State::seeded(seeds))
}
