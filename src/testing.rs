//! Helpers for tests that touch the process-wide random state.

use crate::config::RandomConfig;
use std::sync::{Mutex, MutexGuard, PoisonError};

static GLOBAL_LOCK: Mutex<()> = Mutex::new(());

/// Serializes the calling test against every other test that inits or
/// cleans up the subsystem, and starts it from a fresh `Ready` state.
pub(crate) fn fresh_with(config: RandomConfig) -> MutexGuard<'static, ()> {
    let guard = GLOBAL_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    crate::cleanup().unwrap();
    crate::init_with_config(config).unwrap();
    guard
}

pub(crate) fn fresh() -> MutexGuard<'static, ()> {
    fresh_with(RandomConfig::default())
}

/// Serializes the calling test without changing the state.
pub(crate) fn serial() -> MutexGuard<'static, ()> {
    GLOBAL_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}
