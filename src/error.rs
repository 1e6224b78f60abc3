use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("output buffer must hold exactly {expected} words, got {got}")]
    BatchLength { expected: usize, got: usize },

    #[error("expected exactly {expected} seed words, got {got}")]
    SeedLength { expected: usize, got: usize },

    #[error("seed word at index {index} is zero (seed words must be != 0)")]
    ZeroSeed { index: usize },

    #[error("seed words at index {first} and {second} are equal (lanes would produce identical streams)")]
    DuplicateSeed { first: usize, second: usize },

    #[error("element count must be even, got {0}")]
    OddCount(usize),

    #[error("buffer lengths differ: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("{name} must be a non-negative number, got {value}")]
    NegativeTolerance { name: &'static str, value: f64 },

    #[error("invalid OCTA_ISA override: {0}")]
    InvalidIsaOverride(String),
}

impl Error {
    /// `true` for every malformed-call error, i.e. everything except configuration errors.
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(self, Error::InvalidIsaOverride(_))
    }
}

pub type Result<T> = core::result::Result<T, Error>;
