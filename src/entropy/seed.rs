//! Seed conditioning.
//!
//! An OS draw, optionally joined by a hardware draw, is hashed into a
//! fixed-size [`EntropySeed`]. The hash is a mix, so adding hardware
//! output can never reduce the entropy contributed by the OS.

use super::hardware::get_hardware_random;
use super::os::EntropySource;
use crate::error::Result;
use blake3::Hasher as Blake3Hasher;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

#[cfg(test)]
thread_local! {
    /// Replaces the hardware draw for seeds gathered on this thread.
    static HARDWARE_HOOK: std::cell::Cell<Option<fn(&mut [u8]) -> Result<()>>> =
        const { std::cell::Cell::new(None) };
}

fn hardware_draw(dest: &mut [u8]) -> Result<()> {
    #[cfg(test)]
    if let Some(hook) = HARDWARE_HOOK.with(std::cell::Cell::get) {
        return hook(dest);
    }
    get_hardware_random(dest)
}

/// Size of every seed handed to a DRBG.
pub const SEED_LEN: usize = 32;

/// Context string for BLAKE3 seed derivation.
const SEED_CONTEXT: &str = "tls-random seed conditioning v1";

/// Supported hash algorithms for conditioning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// BLAKE3 - fast, secure, recommended default.
    #[default]
    Blake3,
    /// SHA-256 - widely deployed, conservative choice.
    Sha256,
}

/// Conditioned seed material.
///
/// Erased when dropped, so a seed lives only as long as the reseed or
/// instantiate call that consumes it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EntropySeed {
    data: [u8; SEED_LEN],
    #[zeroize(skip)]
    hardware_mixed: bool,
}

impl EntropySeed {
    /// Draws and conditions a fresh seed.
    ///
    /// The OS draw is mandatory. When `mix_hardware` is set, a hardware draw
    /// is added if the CPU supports it; a hardware failure is logged and the
    /// seed is built from the OS draw alone.
    pub fn gather(
        source: &mut dyn EntropySource,
        mix_hardware: bool,
        algorithm: HashAlgorithm,
    ) -> Result<Self> {
        let mut os = Zeroizing::new([0u8; SEED_LEN]);
        source.fill(&mut os[..])?;

        let mut hw = Zeroizing::new([0u8; SEED_LEN]);
        let hardware_mixed = mix_hardware
            && match hardware_draw(&mut hw[..]) {
                Ok(()) => true,
                Err(err) => {
                    tracing::trace!(error = %err, "seed built from OS entropy only");
                    false
                }
            };

        let hw_part = if hardware_mixed { Some(&hw[..]) } else { None };
        let seed = Conditioner::new(algorithm).condition(&os[..], hw_part);

        tracing::trace!(
            source = source.name(),
            hardware_mixed,
            "gathered entropy seed"
        );
        Ok(seed)
    }

    /// Returns the seed bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.data
    }

    /// Returns true if hardware RNG output was mixed in.
    #[inline]
    pub fn hardware_mixed(&self) -> bool {
        self.hardware_mixed
    }

    /// Wraps known bytes as a seed, bypassing the entropy sources.
    #[cfg(any(test, feature = "testing"))]
    pub fn from_bytes_for_testing(data: [u8; SEED_LEN]) -> Self {
        Self {
            data,
            hardware_mixed: false,
        }
    }
}

impl std::fmt::Debug for EntropySeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropySeed")
            .field("hardware_mixed", &self.hardware_mixed)
            .finish_non_exhaustive()
    }
}

/// Hash-based combiner for raw entropy draws.
struct Conditioner {
    algorithm: HashAlgorithm,
}

impl Conditioner {
    fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    fn condition(&self, os: &[u8], hw: Option<&[u8]>) -> EntropySeed {
        let data = match self.algorithm {
            HashAlgorithm::Blake3 => {
                let mut hasher = Blake3Hasher::new_derive_key(SEED_CONTEXT);
                hasher.update(os);
                if let Some(hw) = hw {
                    hasher.update(hw);
                }
                *hasher.finalize().as_bytes()
            }
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(SEED_CONTEXT.as_bytes());
                hasher.update(os);
                if let Some(hw) = hw {
                    hasher.update(hw);
                }
                let result = hasher.finalize();
                let mut data = [0u8; SEED_LEN];
                data.copy_from_slice(&result);
                data
            }
        };

        EntropySeed {
            data,
            hardware_mixed: hw.is_some(),
        }
    }
}
