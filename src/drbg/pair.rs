//! Public/private generator pair.
//!
//! The two instances share nothing: separate seed draws, separate entropy
//! source instances, separate reseed schedules.

use super::{Domain, Drbg, DrbgSettings};
use crate::entropy::EntropySource;
use crate::error::{RandomError, Result};

/// One public and one private DRBG.
#[derive(Debug)]
pub struct GeneratorPair {
    public: Drbg,
    private: Drbg,
}

impl GeneratorPair {
    /// Seeds both domains from independent draws. `make_source` is called
    /// once per domain.
    pub fn instantiate<F>(settings: &DrbgSettings, mut make_source: F) -> Result<Self>
    where
        F: FnMut() -> Box<dyn EntropySource>,
    {
        let public = Drbg::from_source(Domain::Public, make_source(), settings.clone())?;
        let private = Drbg::from_source(Domain::Private, make_source(), settings.clone())?;
        Ok(Self { public, private })
    }

    /// Builds a pair from existing instances, checking their domain tags.
    pub fn from_parts(public: Drbg, private: Drbg) -> Result<Self> {
        if public.domain() != Domain::Public || private.domain() != Domain::Private {
            return Err(RandomError::SafetyViolation(
                "generator pair domains do not match their slots",
            ));
        }
        Ok(Self { public, private })
    }

    /// Returns the public-domain instance.
    pub fn public(&mut self) -> &mut Drbg {
        &mut self.public
    }

    /// Returns the private-domain instance.
    pub fn private(&mut self) -> &mut Drbg {
        &mut self.private
    }

    /// Returns the instance serving `domain`.
    pub fn get(&mut self, domain: Domain) -> &mut Drbg {
        match domain {
            Domain::Public => &mut self.public,
            Domain::Private => &mut self.private,
        }
    }

    /// Read-only view of the instance serving `domain`.
    pub fn peek(&self, domain: Domain) -> &Drbg {
        match domain {
            Domain::Public => &self.public,
            Domain::Private => &self.private,
        }
    }

    /// Swaps in `drbg` for its own domain and returns the previous instance.
    pub fn replace(&mut self, drbg: Drbg) -> Drbg {
        let slot = self.get(drbg.domain());
        std::mem::replace(slot, drbg)
    }

    /// Reseeds both instances from their sources.
    ///
    /// Both are marked first, so if one reseed fails the other instance
    /// still refuses to produce output until it has reseeded.
    pub fn reseed_all(&mut self) -> Result<()> {
        self.public.mark_reseed_required();
        self.private.mark_reseed_required();
        self.public.reseed_from_source()?;
        self.private.reseed_from_source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drbg::DrbgState;
    use crate::entropy::{HashAlgorithm, ScriptedEntropy};

    fn settings(threshold: u64) -> DrbgSettings {
        DrbgSettings {
            reseed_threshold: threshold,
            mix_hardware: false,
            conditioning: HashAlgorithm::Blake3,
        }
    }

    fn make_pair(threshold: u64) -> GeneratorPair {
        let public = Drbg::from_seed_for_testing(
            Domain::Public,
            [0x11; 32],
            Box::new(ScriptedEntropy::new(1)),
            settings(threshold),
        );
        let private = Drbg::from_seed_for_testing(
            Domain::Private,
            [0x22; 32],
            Box::new(ScriptedEntropy::new(2)),
            settings(threshold),
        );
        GeneratorPair::from_parts(public, private).unwrap()
    }

    #[test]
    fn test_instantiate_uses_one_source_per_domain() {
        let mut made = 0;
        let mut pair = GeneratorPair::instantiate(&settings(1 << 20), || {
            made += 1;
            Box::new(ScriptedEntropy::new(made))
        })
        .unwrap();

        assert_eq!(made, 2);
        assert_eq!(pair.public().domain(), Domain::Public);
        assert_eq!(pair.private().domain(), Domain::Private);
    }

    #[test]
    fn test_instantiate_fails_without_entropy() {
        let result = GeneratorPair::instantiate(&settings(1 << 20), || {
            Box::new(ScriptedEntropy::always_failing())
        });
        assert!(matches!(result, Err(RandomError::EntropyUnavailable(_))));
    }

    #[test]
    fn test_from_parts_rejects_swapped_domains() {
        let a = Drbg::from_seed_for_testing(
            Domain::Private,
            [0; 32],
            Box::new(ScriptedEntropy::new(0)),
            settings(64),
        );
        let b = Drbg::from_seed_for_testing(
            Domain::Public,
            [0; 32],
            Box::new(ScriptedEntropy::new(0)),
            settings(64),
        );
        assert!(matches!(
            GeneratorPair::from_parts(a, b),
            Err(RandomError::SafetyViolation(_))
        ));
    }

    #[test]
    fn test_public_exhaustion_does_not_touch_private() {
        let mut busy = make_pair(64);
        let mut idle = make_pair(64);

        // Push the busy pair's public DRBG through several reseed periods.
        let mut scratch = [0u8; 64];
        for _ in 0..10 {
            busy.public().generate(&mut scratch).unwrap();
        }
        busy.public().reseed_from_source().unwrap();
        assert!(busy.public().reseed_count() >= 9);

        // 48 bytes in total, below the private threshold.
        for _ in 0..3 {
            let mut a = [0u8; 16];
            let mut b = [0u8; 16];
            busy.private().generate(&mut a).unwrap();
            idle.private().generate(&mut b).unwrap();
            assert_eq!(a, b);
        }
        assert_eq!(busy.private().reseed_count(), 0);
        assert_eq!(idle.private().reseed_count(), 0);
    }

    #[test]
    fn test_private_reseed_does_not_touch_public() {
        let mut busy = make_pair(1 << 20);
        let mut idle = make_pair(1 << 20);

        busy.private().reseed_from_source().unwrap();
        busy.private().reseed_from_source().unwrap();

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        busy.public().generate(&mut a).unwrap();
        idle.public().generate(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_replace_targets_own_domain() {
        let mut pair = make_pair(1 << 20);
        let fresh = Drbg::from_seed_for_testing(
            Domain::Private,
            [0x33; 32],
            Box::new(ScriptedEntropy::new(3)),
            settings(1 << 20),
        );

        let old = pair.replace(fresh);
        assert_eq!(old.domain(), Domain::Private);
        assert_eq!(pair.peek(Domain::Public).domain(), Domain::Public);
    }

    #[test]
    fn test_reseed_all_reseeds_both() {
        let mut pair = make_pair(1 << 20);
        pair.reseed_all().unwrap();

        assert_eq!(pair.peek(Domain::Public).reseed_count(), 1);
        assert_eq!(pair.peek(Domain::Private).reseed_count(), 1);
        assert_eq!(pair.peek(Domain::Private).state(), DrbgState::Seeded);
    }

    #[test]
    fn test_reseed_all_failure_leaves_private_blocked() {
        let public = Drbg::from_seed_for_testing(
            Domain::Public,
            [0x11; 32],
            Box::new(ScriptedEntropy::new(1)),
            settings(1 << 20),
        );
        let private = Drbg::from_seed_for_testing(
            Domain::Private,
            [0x22; 32],
            Box::new(ScriptedEntropy::always_failing()),
            settings(1 << 20),
        );
        let mut pair = GeneratorPair::from_parts(public, private).unwrap();

        assert!(pair.reseed_all().is_err());
        assert_eq!(
            pair.peek(Domain::Private).state(),
            DrbgState::ReseedRequired
        );
        let mut buf = [0u8; 8];
        assert!(pair.private().generate(&mut buf).is_err());
    }
}
