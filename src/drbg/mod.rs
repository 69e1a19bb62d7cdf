//! Deterministic random bit generators.
//!
//! A [`Drbg`] is a ChaCha20 keystream keyed through BLAKE3, tagged with a
//! security [`Domain`]. A [`GeneratorPair`] holds the public and private
//! instances of one thread.

mod domain;
mod engine;
mod pair;

pub use domain::Domain;
pub use engine::{Drbg, DrbgSettings, DrbgState};
pub use pair::GeneratorPair;
