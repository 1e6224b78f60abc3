use crate::error::{Error, Result};

/// Independent streams advanced together by every generator step.
pub const LANES: usize = 8;

/// Inner steps per batch call.
pub const STEPS_PER_BATCH: usize = 256;

/// Words produced by one batch call (`LANES * STEPS_PER_BATCH`).
pub const BATCH_LEN: usize = LANES * STEPS_PER_BATCH;

/// Slots in the xorshift1024 ring, one 8-lane vector each.
pub const RING_LEN: usize = 16;

pub const SFC64_SEED_LEN: usize = LANES;
pub const XOR1024_SEED_LEN: usize = LANES * RING_LEN;

const _: () = assert!(RING_LEN.is_power_of_two());
const _: () = assert!(BATCH_LEN == 2048);

/// One 64-bit word per lane, aligned for a full 512-bit load.
#[repr(align(64))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Lanes(pub(crate) [u64; LANES]);

impl Lanes {
    #[inline(always)]
    pub(crate) fn splat(v: u64) -> Self {
        Self([v; LANES])
    }

    #[inline(always)]
    pub(crate) fn xor_fold(&self) -> u64 {
        self.0.iter().fold(0, |acc, &w| acc ^ w)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sfc64State {
    pub(crate) a: Lanes,
    pub(crate) b: Lanes,
    pub(crate) c: Lanes,
    pub(crate) counter: Lanes,
}

impl Sfc64State {
    /// `a = b = c = seeds`, counter at one in every lane. No warm-up.
    pub(crate) fn seeded(seeds: &[u64; SFC64_SEED_LEN]) -> Self {
        let s = Lanes(*seeds);

        Self {
            a: s,
            b: s,
            c: s,
            counter: Lanes::splat(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Xor1024State {
    pub(crate) ring: [Lanes; RING_LEN],
    pub(crate) pos: usize,
}

impl Xor1024State {
    /// Seeds are lane-major: word `lane * RING_LEN + slot` lands in `ring[slot][lane]`.
    pub(crate) fn seeded(seeds: &[u64; XOR1024_SEED_LEN]) -> Self {
        let mut ring = [Lanes::default(); RING_LEN];

        for (lane, row) in seeds.chunks_exact(RING_LEN).enumerate() {
            for (slot, &word) in row.iter().enumerate() {
                ring[slot].0[lane] = word;
            }
        }

        Self { ring, pos: 0 }
    }
}

/// Borrows `out` as a full batch, or reports its length.
#[inline(always)]
pub(crate) fn batch_buffer(out: &mut [u64]) -> Result<&mut [u64; BATCH_LEN]> {
    let got = out.len();

    out.try_into().map_err(|_| Error::BatchLength {
        expected: BATCH_LEN,
        got,
    })
}

/// Exact length, no zero words.
pub(crate) fn check_seeds<const N: usize>(seeds: &[u64]) -> Result<&[u64; N]> {
    let seeds: &[u64; N] = seeds.try_into().map_err(|_| Error::SeedLength {
        expected: N,
        got: seeds.len(),
    })?;

    if let Some(index) = seeds.iter().position(|&w| w == 0) {
        return Err(Error::ZeroSeed { index });
    }

    Ok(seeds)
}

/// Lanes seeded with the same word would emit identical streams.
pub(crate) fn check_distinct(seeds: &[u64]) -> Result<()> {
    for first in 0..seeds.len() {
        for second in (first + 1)..seeds.len() {
            if seeds[first] == seeds[second] {
                return Err(Error::DuplicateSeed { first, second });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod state_tests {
    use super::*;

    #[test]
    fn test_alignment_safety() {
        use std::mem::{align_of, size_of};

        assert_eq!(align_of::<Lanes>(), 64);
        assert_eq!(size_of::<Lanes>(), 64);
        assert_eq!(size_of::<[Lanes; RING_LEN]>(), XOR1024_SEED_LEN * 8);
    }

    #[test]
    fn test_sfc64_seeding_copies_seeds_into_all_three_words() {
        let seeds = [1, 2, 3, 4, 5, 6, 7, 8];
        let st = Sfc64State::seeded(&seeds);

        assert_eq!(st.a.0, seeds);
        assert_eq!(st.b.0, seeds);
        assert_eq!(st.c.0, seeds);
        assert_eq!(st.counter, Lanes::splat(1));
    }

    #[test]
    fn test_xor1024_seeding_is_lane_major() {
        let seeds: [u64; XOR1024_SEED_LEN] = core::array::from_fn(|i| i as u64 + 1);
        let st = Xor1024State::seeded(&seeds);

        assert_eq!(st.pos, 0);

        for lane in 0..LANES {
            for slot in 0..RING_LEN {
                assert_eq!(st.ring[slot].0[lane], (lane * RING_LEN + slot) as u64 + 1);
            }
        }
    }

    #[test]
    fn test_batch_buffer_accepts_exact_length_only() {
        let mut exact = vec![0u64; BATCH_LEN];
        assert!(batch_buffer(&mut exact).is_ok());

        let mut short = vec![0u64; BATCH_LEN - 1];
        assert_eq!(
            batch_buffer(&mut short).unwrap_err(),
            Error::BatchLength { expected: BATCH_LEN, got: BATCH_LEN - 1 }
        );

        let mut long = vec![0u64; BATCH_LEN + 8];
        assert!(batch_buffer(&mut long).is_err());
    }

    #[test]
    fn test_check_seeds_rejects_length_and_zero_words() {
        assert_eq!(
            check_seeds::<4>(&[1, 2, 3]).unwrap_err(),
            Error::SeedLength { expected: 4, got: 3 }
        );
        assert_eq!(check_seeds::<4>(&[1, 2, 0, 4]).unwrap_err(), Error::ZeroSeed { index: 2 });
        assert_eq!(check_seeds::<4>(&[1, 2, 3, 4]).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_check_distinct_reports_first_duplicate_pair() {
        assert!(check_distinct(&[9, 8, 7]).is_ok());
        assert_eq!(
            check_distinct(&[9, 8, 7, 8, 9]).unwrap_err(),
            Error::DuplicateSeed { first: 0, second: 4 }
        );
    }
}
