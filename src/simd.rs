use crate::error::{Error, Result};
use std::sync::OnceLock;

/// Environment variable used to pin the instruction set (`auto`, `scalar`, `avx2`, `neon`).
pub const ISA_ENV: &str = "OCTA_ISA";

/// Instruction set a kernel call is executed with.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum Isa {
    // 256-bit integer and float lanes, picked at runtime on x86_64 when available
    Avx2,

    // Baseline on aarch64, as it's virtually available on all aarch64 CPU's
    Neon,

    // Portable fallback, also the reference every other engine is tested against
    Scalar,
}

static ACTIVE_ISA: OnceLock<Isa> = OnceLock::new();

/// The instruction set every public kernel dispatches to.
///
/// Resolved once per process: the `OCTA_ISA` override if it is valid and supported by the
/// host, runtime detection otherwise.
pub fn active_isa() -> Isa {
    *ACTIVE_ISA.get_or_init(select_isa)
}

fn select_isa() -> Isa {
    let isa = match Isa::from_env() {
        Ok(Some(isa)) => isa,
        Ok(None) => Isa::detect(),
        Err(err) => {
            log::warn!("{err}, falling back to runtime detection");
            Isa::detect()
        }
    };

    log::debug!("kernels dispatch to the {isa} engine");
    isa
}

impl Isa {
    /// Best instruction set supported by the running CPU.
    pub fn detect() -> Isa {
        // NOTE: On x86_64 we upgrade to AVX2 if available, otherwise the
        // scalar engine is used (it autovectorizes to SSE2)
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") {
                return Isa::Avx2;
            }

            Isa::Scalar
        }

        #[cfg(target_arch = "aarch64")]
        return Isa::Neon;

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        return Isa::Scalar;
    }

    pub fn is_supported(self) -> bool {
        match self {
            Isa::Scalar => true,

            #[cfg(target_arch = "x86_64")]
            Isa::Avx2 => is_x86_feature_detected!("avx2"),

            #[cfg(target_arch = "aarch64")]
            Isa::Neon => true,

            _ => false,
        }
    }

    /// Reads the `OCTA_ISA` override.
    ///
    /// `Ok(None)` when the variable is unset or `auto`; an error when the value names no
    /// known instruction set or one the host cannot execute.
    pub fn from_env() -> Result<Option<Isa>> {
        match std::env::var(ISA_ENV) {
            Ok(value) => parse_override(&value),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(raw)) => Err(Error::InvalidIsaOverride(format!("{raw:?}"))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Isa::Avx2 => "avx2",
            Isa::Neon => "neon",
            Isa::Scalar => "scalar",
        }
    }
}

impl core::fmt::Display for Isa {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl core::str::FromStr for Isa {
    type Err = Error;

    fn from_str(s: &str) -> Result<Isa> {
        let s = s.trim();

        [Isa::Avx2, Isa::Neon, Isa::Scalar]
            .into_iter()
            .find(|isa| s.eq_ignore_ascii_case(isa.name()))
            .ok_or_else(|| Error::InvalidIsaOverride(s.to_string()))
    }
}

pub(crate) fn parse_override(value: &str) -> Result<Option<Isa>> {
    let value = value.trim();

    if value.is_empty() || value.eq_ignore_ascii_case("auto") {
        return Ok(None);
    }

    let isa: Isa = value.parse()?;

    if !isa.is_supported() {
        return Err(Error::InvalidIsaOverride(format!("{isa} is not supported on this CPU")));
    }

    Ok(Some(isa))
}

/// Every instruction set the host can run, scalar first.
#[cfg(test)]
pub(crate) fn supported_isas() -> Vec<Isa> {
    [Isa::Scalar, Isa::Avx2, Isa::Neon]
        .into_iter()
        .filter(|isa| isa.is_supported())
        .collect()
}
