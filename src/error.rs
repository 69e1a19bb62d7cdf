//! Error taxonomy for the random subsystem.
//!
//! Every public operation reports through [`RandomError`]. On failure the
//! caller's buffer is left in an unspecified state and must not be read.

use crate::config::ConfigError;
use crate::drbg::Domain;
use thiserror::Error;

/// Errors reported by the random subsystem.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RandomError {
    /// The operating system entropy source could not be read.
    #[error("OS entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    /// The CPU has no RDRAND instruction, or the instruction kept failing.
    #[error("hardware RNG unavailable")]
    HardwareRngUnavailable,

    /// The call was made while the subsystem was not initialized.
    #[error("random subsystem not initialized")]
    NotInitialized,

    /// The caller violated an input contract.
    #[error("safety violation: {0}")]
    SafetyViolation(&'static str),

    /// A mandatory reseed could not obtain fresh entropy.
    #[error("{domain} DRBG reseed failed")]
    ReseedFailure {
        /// Domain of the generator that could not reseed.
        domain: Domain,
        /// Why the entropy draw failed.
        #[source]
        source: Box<RandomError>,
    },

    /// The configuration passed at init was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl RandomError {
    pub(crate) fn reseed_failure(domain: Domain, cause: RandomError) -> Self {
        Self::ReseedFailure {
            domain,
            source: Box::new(cause),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RandomError>;
