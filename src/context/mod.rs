//! Generator lifecycle.
//!
//! Process-wide init/cleanup state lives in [`GlobalRandomState`]; generator
//! state lives in thread-local [`ThreadRandomContext`]s that are never
//! shared between threads. This module is the only place that decides when
//! generators are created, reseeded after a fork, or destroyed.

mod global;
mod thread;

pub use global::{global_state, GlobalRandomState, RandomState, SourceFactory};
pub use thread::{with_generator, with_private_drbg, with_public_drbg, ThreadRandomContext};

pub(crate) use global::GLOBAL;
#[cfg(any(test, feature = "testing"))]
pub(crate) use thread::replace_private;
pub(crate) use thread::{bytes_used, fill, release_current};
