//! ChaCha20 DRBG with BLAKE3 key derivation.
//!
//! # Key schedule
//!
//! - Instantiate: `key = BLAKE3-derive(instantiate ctx, personalization || seed)`
//! - Reseed: `key = BLAKE3-derive(reseed ctx, personalization || counter || key || seed)`
//! - Generate: output is drawn from `ChaCha20(key)`, then the next 32 bytes of
//!   the same stream become the new key and the stream is rebuilt.
//!
//! The post-generate rekey means the state held after a call cannot
//! regenerate the output of that call or any earlier one. Reseeding hashes
//! the old key with fresh entropy, so a compromised state is healed by the
//! next reseed.
//!
//! Both the key copy and the cipher state (key words and buffered
//! keystream) are erased whenever they are replaced or dropped.

use super::Domain;
use crate::config::RandomConfig;
use crate::entropy::{EntropySeed, EntropySource, HashAlgorithm};
use crate::error::{RandomError, Result};
use blake3::Hasher;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::{ChaCha20, Key, Nonce};
use zeroize::{Zeroize, Zeroizing};

const INSTANTIATE_CONTEXT: &str = "tls-random drbg instantiate v1";
const RESEED_CONTEXT: &str = "tls-random drbg reseed v1";

/// Largest single request: one key's keystream (2^32 blocks) minus room
/// for the ratchet.
const MAX_REQUEST_BYTES: u64 = (1 << 38) - 64;

/// Policy shared by every DRBG of a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrbgSettings {
    /// Output bytes per reseed period.
    pub reseed_threshold: u64,
    /// Mix RDRAND output into reseeds when available.
    pub mix_hardware: bool,
    /// Hash used to condition reseed entropy.
    pub conditioning: HashAlgorithm,
}

impl Default for DrbgSettings {
    fn default() -> Self {
        Self::from(&RandomConfig::default())
    }
}

impl From<&RandomConfig> for DrbgSettings {
    fn from(config: &RandomConfig) -> Self {
        Self {
            reseed_threshold: config.reseed_threshold_bytes,
            mix_hardware: config.mix_hardware_entropy,
            conditioning: config.conditioning,
        }
    }
}

/// Observable lifecycle position of a DRBG. Destruction is `Drop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrbgState {
    /// Freshly instantiated or reseeded, no output yet.
    Seeded,
    /// Has produced output since the last (re)seed.
    Active,
    /// The next generate must reseed first.
    ReseedRequired,
}

/// A deterministic random bit generator bound to one security domain.
pub struct Drbg {
    inner: ChaCha20,
    key: Zeroizing<[u8; 32]>,
    domain: Domain,
    /// Bytes emitted since the last (re)seed.
    generation: u64,
    reseed_count: u64,
    reseed_required: bool,
    settings: DrbgSettings,
    source: Box<dyn EntropySource>,
}

impl Drbg {
    /// Instantiates a DRBG from an already gathered seed.
    ///
    /// `source` is kept for later reseeds and must not be shared with any
    /// other instance.
    pub fn instantiate(
        domain: Domain,
        seed: &EntropySeed,
        source: Box<dyn EntropySource>,
        settings: DrbgSettings,
    ) -> Self {
        let key = derive_key(
            INSTANTIATE_CONTEXT,
            &[domain.personalization(), &seed.as_bytes()[..]],
        );
        let inner = keystream(&key);

        tracing::debug!(%domain, source = source.name(), "DRBG instantiated");

        Self {
            inner,
            key,
            domain,
            generation: 0,
            reseed_count: 0,
            reseed_required: false,
            settings,
            source,
        }
    }

    /// Draws a seed from `source` and instantiates a DRBG from it.
    pub fn from_source(
        domain: Domain,
        mut source: Box<dyn EntropySource>,
        settings: DrbgSettings,
    ) -> Result<Self> {
        let seed = EntropySeed::gather(
            source.as_mut(),
            settings.mix_hardware,
            settings.conditioning,
        )?;
        Ok(Self::instantiate(domain, &seed, source, settings))
    }

    /// Creates a DRBG from known seed bytes (for testing only).
    #[cfg(any(test, feature = "testing"))]
    pub fn from_seed_for_testing(
        domain: Domain,
        seed: [u8; 32],
        source: Box<dyn EntropySource>,
        settings: DrbgSettings,
    ) -> Self {
        let seed = EntropySeed::from_bytes_for_testing(seed);
        Self::instantiate(domain, &seed, source, settings)
    }

    /// Fills `dest` with DRBG output.
    ///
    /// Reseeds first when the threshold was reached or a reseed was marked
    /// required. If that reseed fails, returns [`RandomError::ReseedFailure`]
    /// and `dest` is not written.
    pub fn generate(&mut self, dest: &mut [u8]) -> Result<()> {
        if dest.is_empty() {
            return Ok(());
        }
        if dest.len() as u64 > MAX_REQUEST_BYTES {
            return Err(RandomError::SafetyViolation(
                "request exceeds the keystream limit",
            ));
        }

        if self.generation >= self.settings.reseed_threshold {
            self.reseed_required = true;
        }
        if self.reseed_required {
            self.reseed_from_source()?;
        }

        dest.fill(0);
        self.inner.apply_keystream(dest);
        self.generation = self.generation.saturating_add(dest.len() as u64);
        self.ratchet();

        tracing::trace!(
            domain = %self.domain,
            len = dest.len(),
            generation = self.generation,
            "DRBG output generated"
        );
        Ok(())
    }

    /// Returns one uniformly distributed 64-bit word.
    pub fn next_u64(&mut self) -> Result<u64> {
        let mut word = [0u8; 8];
        self.generate(&mut word)?;
        Ok(u64::from_le_bytes(word))
    }

    /// Mixes `seed` into the key and starts a new reseed period.
    pub fn reseed(&mut self, seed: &EntropySeed) {
        let next = derive_key(
            RESEED_CONTEXT,
            &[
                self.domain.personalization(),
                &self.reseed_count.to_le_bytes()[..],
                &self.key[..],
                &seed.as_bytes()[..],
            ],
        );
        self.key = next;
        self.rekey();

        self.reseed_count += 1;
        self.generation = 0;
        self.reseed_required = false;

        tracing::debug!(
            domain = %self.domain,
            reseed_count = self.reseed_count,
            hardware_mixed = seed.hardware_mixed(),
            "DRBG reseeded via BLAKE3 mixing"
        );
    }

    /// Draws fresh entropy from this instance's source and reseeds.
    pub fn reseed_from_source(&mut self) -> Result<()> {
        let seed = EntropySeed::gather(
            self.source.as_mut(),
            self.settings.mix_hardware,
            self.settings.conditioning,
        )
        .map_err(|e| RandomError::reseed_failure(self.domain, e))?;
        self.reseed(&seed);
        Ok(())
    }

    /// Forces a reseed before the next output.
    pub fn mark_reseed_required(&mut self) {
        self.reseed_required = true;
    }

    /// Returns the current lifecycle position.
    pub fn state(&self) -> DrbgState {
        if self.reseed_required || self.generation >= self.settings.reseed_threshold {
            DrbgState::ReseedRequired
        } else if self.generation == 0 {
            DrbgState::Seeded
        } else {
            DrbgState::Active
        }
    }

    /// Returns the security domain this instance serves.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Returns bytes generated since the last (re)seed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the number of reseeds performed.
    pub fn reseed_count(&self) -> u64 {
        self.reseed_count
    }

    /// Returns the policy this instance was created with.
    pub fn settings(&self) -> &DrbgSettings {
        &self.settings
    }

    fn ratchet(&mut self) {
        // The key is overwritten with the next 32 keystream bytes.
        self.key.zeroize();
        self.inner.apply_keystream(&mut self.key[..]);
        self.rekey();
    }

    /// Replaces the cipher; the old one erases itself on drop.
    fn rekey(&mut self) {
        self.inner = keystream(&self.key);
    }
}

impl std::fmt::Debug for Drbg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Drbg")
            .field("domain", &self.domain)
            .field("generation", &self.generation)
            .field("reseed_count", &self.reseed_count)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn keystream(key: &[u8; 32]) -> ChaCha20 {
    ChaCha20::new(Key::from_slice(key), &Nonce::default())
}

fn derive_key(context: &str, parts: &[&[u8]]) -> Zeroizing<[u8; 32]> {
    let mut hasher = Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    Zeroizing::new(*hasher.finalize().as_bytes())
}
