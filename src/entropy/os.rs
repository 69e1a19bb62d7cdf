//! Operating system entropy source.
//!
//! This module provides a trait-based abstraction over the place seed
//! material comes from, so the DRBG layer can be driven by the OS in
//! production and by scripted sources in tests.

use crate::error::{RandomError, Result};
use rand_core::{OsRng, RngCore};
use std::io;

/// Trait for entropy source implementations.
///
/// Each DRBG owns its own source instance, so two domains never share
/// a source's internal state.
pub trait EntropySource {
    /// Fills `dest` completely with unpredictable bytes.
    fn fill(&mut self, dest: &mut [u8]) -> Result<()>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// The operating system CSPRNG (`getrandom(2)`, `/dev/urandom`, `BCryptGenRandom`, ...).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        get_os_entropy(dest)
    }

    fn name(&self) -> &'static str {
        "os"
    }
}

/// Fills `dest` from the operating system entropy source.
///
/// An interrupted read is retried once. Every other failure is reported as
/// [`RandomError::EntropyUnavailable`].
pub fn get_os_entropy(dest: &mut [u8]) -> Result<()> {
    read_with_retry(dest, |buf| OsRng.try_fill_bytes(buf))
}

fn read_with_retry<F>(dest: &mut [u8], mut read: F) -> Result<()>
where
    F: FnMut(&mut [u8]) -> std::result::Result<(), rand_core::Error>,
{
    match read(dest) {
        Ok(()) => Ok(()),
        Err(err) if is_interrupted(&err) => {
            tracing::warn!(len = dest.len(), "OS entropy read interrupted, retrying once");
            read(dest).map_err(|e| RandomError::EntropyUnavailable(e.to_string()))
        }
        Err(err) => Err(RandomError::EntropyUnavailable(err.to_string())),
    }
}

fn is_interrupted(err: &rand_core::Error) -> bool {
    err.raw_os_error()
        .map(io::Error::from_raw_os_error)
        .is_some_and(|e| e.kind() == io::ErrorKind::Interrupted)
}
