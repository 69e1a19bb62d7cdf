//! Unbiased bounded integers.
//!
//! A 64-bit word is accepted only if it lies below the largest multiple of
//! `max` that fits in 2^64; accepted words are reduced modulo `max`. At
//! most half of the word space is ever rejected, so fewer than two draws
//! are needed on average.

use crate::error::{RandomError, Result};

/// Returns `v` with `0 <= v < max`, drawing words from `next_word` until one
/// falls outside the biased tail.
///
/// `max <= 0` is a [`RandomError::SafetyViolation`]; no word is drawn.
pub fn uniform_random<F>(max: i64, mut next_word: F) -> Result<i64>
where
    F: FnMut() -> Result<u64>,
{
    let bound = u64::try_from(max)
        .ok()
        .filter(|&b| b > 0)
        .ok_or(RandomError::SafetyViolation("range bound must be positive"))?;
    let limit = acceptance_limit(bound);

    loop {
        let word = next_word()?;
        if word <= limit {
            // bound <= i64::MAX, so the remainder fits.
            return Ok((word % bound) as i64);
        }
        tracing::trace!(bound, "rejected biased draw");
    }
}

/// Largest word that can be accepted for `bound`.
///
/// `2^64 mod bound` words at the top of the range form an incomplete final
/// block; everything at or below the returned value forms whole blocks.
fn acceptance_limit(bound: u64) -> u64 {
    let tail = (u64::MAX % bound + 1) % bound;
    u64::MAX - tail
}
