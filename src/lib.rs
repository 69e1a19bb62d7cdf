//! Secure random numbers for a TLS stack.
//!
//! Every thread owns two independent DRBGs: a *public* one for protocol
//! values that may be observed, and a *private* one reserved for keys,
//! nonces and IVs. Generators are created lazily, reseeded from OS entropy
//! (optionally mixed with RDRAND), reseeded again after a `fork`, and erased
//! when the thread or the subsystem is cleaned up.
//!
//! # Architecture
//!
//! ```text
//! entropy (OS, RDRAND) → seed conditioning → drbg (ChaCha20, per domain)
//!                                               ↓
//!               context (global init state, thread-local pair, fork check)
//!                                               ↓
//!                            api (fills, counters, range sampler)
//! ```
//!
//! # Design Principles
//!
//! - **Fail-closed**: no output after a failed reseed or outside `Ready`
//! - **Domain separation**: exhausting the public generator never touches
//!   private state
//! - **Forward secrecy**: generator keys ratchet after every request
//! - **OS entropy is mandatory**: hardware output only ever supplements it
//!
//! # Example
//!
//! ```no_run
//! tls_random::init().unwrap();
//!
//! let mut key = [0u8; 32];
//! tls_random::get_private_random_data(&mut key).unwrap();
//!
//! let padding = tls_random::public_random(256).unwrap();
//! assert!((0..256).contains(&padding));
//!
//! tls_random::cleanup_thread().unwrap();
//! tls_random::cleanup().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

mod api;
pub mod config;
pub mod context;
pub mod drbg;
pub mod entropy;
pub mod error;
pub mod metrics;
pub mod sampling;

#[cfg(test)]
mod testing;

pub use api::{
    cleanup, cleanup_thread, cpu_supports_rdrand, get_private_random_bytes_used,
    get_private_random_data, get_public_random_bytes_used, get_public_random_data,
    get_rdrand_data, get_urandom_data, init, init_with_config, init_with_entropy_source,
    public_random,
};
#[cfg(any(test, feature = "testing"))]
pub use api::set_private_drbg_for_test;

pub use config::{ConfigError, FileConfig, RandomConfig};
pub use context::{with_private_drbg, with_public_drbg, RandomState, SourceFactory};
pub use drbg::{Domain, Drbg};
pub use entropy::{EntropySource, HashAlgorithm};
pub use error::{RandomError, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
