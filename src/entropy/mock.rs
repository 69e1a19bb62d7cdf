//! Deterministic entropy sources for tests.
//!
//! NOT for entropy. These only exist so DRBG behavior can be reproduced
//! and source failures can be injected.

use super::os::EntropySource;
use crate::error::{RandomError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Entropy source that produces a fixed pattern per draw and can be made
/// to fail after a given number of draws.
#[derive(Debug)]
pub struct ScriptedEntropy {
    tag: u8,
    draws: Arc<AtomicU64>,
    fail_after: Option<u64>,
}

impl ScriptedEntropy {
    /// Creates a source whose output is determined by `tag` and the draw number.
    pub fn new(tag: u8) -> Self {
        Self {
            tag,
            draws: Arc::new(AtomicU64::new(0)),
            fail_after: None,
        }
    }

    /// Creates a source that serves `draws` fills and fails afterwards.
    pub fn failing_after(tag: u8, draws: u64) -> Self {
        Self {
            fail_after: Some(draws),
            ..Self::new(tag)
        }
    }

    /// Creates a source that never produces output.
    pub fn always_failing() -> Self {
        Self::failing_after(0, 0)
    }

    /// Shared handle to the number of successful draws, readable after the
    /// source has been moved into a DRBG.
    pub fn draw_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.draws)
    }
}

impl EntropySource for ScriptedEntropy {
    fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        let draw = self.draws.load(Ordering::Relaxed);
        if self.fail_after.is_some_and(|limit| draw >= limit) {
            return Err(RandomError::EntropyUnavailable(
                "scripted entropy exhausted".to_string(),
            ));
        }

        for (i, byte) in dest.iter_mut().enumerate() {
            *byte = self
                .tag
                .wrapping_mul(31)
                .wrapping_add(draw as u8)
                .wrapping_add(i as u8);
        }
        self.draws.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
