//! Entropy acquisition.
//!
//! The OS source is mandatory for every seed. The CPU hardware RNG is an
//! optional supplement mixed in through the seed conditioner.

mod hardware;
#[cfg(any(test, feature = "testing"))]
mod mock;
mod os;
mod seed;

pub use hardware::{get_hardware_random, supports_hardware_rng};
#[cfg(any(test, feature = "testing"))]
pub use mock::ScriptedEntropy;
pub use os::{get_os_entropy, EntropySource, OsEntropy};
pub use seed::{EntropySeed, HashAlgorithm, SEED_LEN};
