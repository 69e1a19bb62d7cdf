//! CPU hardware RNG (RDRAND).
//!
//! The instruction is only ever used to supplement OS entropy. Capability is
//! probed once per process and cached.

use crate::error::{RandomError, Result};
use std::sync::OnceLock;

/// Attempts per 64-bit word before the instruction is considered failed.
/// Intel recommends 10.
const RDRAND_RETRIES: usize = 10;

static RDRAND_SUPPORTED: OnceLock<bool> = OnceLock::new();

/// Returns true if the CPU provides RDRAND. Probed on first call only.
pub fn supports_hardware_rng() -> bool {
    *RDRAND_SUPPORTED.get_or_init(|| {
        let supported = probe();
        tracing::debug!(supported, "probed CPU hardware RNG capability");
        supported
    })
}

#[cfg(target_arch = "x86_64")]
fn probe() -> bool {
    is_x86_feature_detected!("rdrand")
}

#[cfg(not(target_arch = "x86_64"))]
fn probe() -> bool {
    false
}

/// Fills `dest` from the hardware RNG.
///
/// Fails with [`RandomError::HardwareRngUnavailable`] when the CPU lacks the
/// instruction or it keeps reporting failure; nothing is substituted.
pub fn get_hardware_random(dest: &mut [u8]) -> Result<()> {
    if !supports_hardware_rng() {
        return Err(RandomError::HardwareRngUnavailable);
    }

    for chunk in dest.chunks_mut(8) {
        let word = rdrand64().ok_or(RandomError::HardwareRngUnavailable)?;
        chunk.copy_from_slice(&word.to_le_bytes()[..chunk.len()]);
    }
    Ok(())
}

#[cfg(target_arch = "x86_64")]
#[allow(unsafe_code)]
fn rdrand64() -> Option<u64> {
    for _ in 0..RDRAND_RETRIES {
        let mut word = 0u64;
        // SAFETY: only reached after `supports_hardware_rng` confirmed the
        // CPU implements RDRAND.
        if unsafe { std::arch::x86_64::_rdrand64_step(&mut word) } == 1 {
            return Some(word);
        }
    }
    tracing::warn!(retries = RDRAND_RETRIES, "RDRAND kept reporting failure");
    None
}

#[cfg(not(target_arch = "x86_64"))]
fn rdrand64() -> Option<u64> {
    None
}
