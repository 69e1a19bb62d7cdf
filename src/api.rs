//! Entry points used by the TLS layer.
//!
//! Every operation checks the process-wide state first and fails with
//! [`RandomError::NotInitialized`] outside `Ready`. On any error the
//! destination buffer is unspecified and must not be used.

use crate::config::RandomConfig;
use crate::context::{self, SourceFactory, GLOBAL};
use crate::drbg::Domain;
use crate::entropy::{get_hardware_random, get_os_entropy, supports_hardware_rng};
use crate::error::Result;
use crate::sampling;

#[cfg(any(test, feature = "testing"))]
use crate::drbg::Drbg;

/// Initializes the subsystem with the default configuration.
///
/// Calling it again while initialized is a no-op.
pub fn init() -> Result<()> {
    init_with_config(RandomConfig::default())
}

/// Initializes the subsystem with `config`.
pub fn init_with_config(config: RandomConfig) -> Result<()> {
    GLOBAL.initialize(config, None)
}

/// Initializes the subsystem with a custom entropy source.
///
/// `factory` is called once per DRBG instance, so every generator gets its
/// own source object.
pub fn init_with_entropy_source(config: RandomConfig, factory: SourceFactory) -> Result<()> {
    GLOBAL.initialize(config, Some(factory))
}

/// Tears the subsystem down.
///
/// The calling thread's generators are destroyed immediately; other
/// threads' generators are discarded on their next use. Callers must have
/// stopped using randomness on every thread.
///
/// The state flips to `Uninitialized` even when releasing the calling
/// thread's generators fails; that error is returned afterwards.
pub fn cleanup() -> Result<()> {
    let released = context::release_current();
    GLOBAL.shutdown();
    released
}

/// Destroys the calling thread's generators before the thread exits.
pub fn cleanup_thread() -> Result<()> {
    context::release_current()
}

/// Fills `dest` from the public-domain generator.
pub fn get_public_random_data(dest: &mut [u8]) -> Result<()> {
    context::fill(Domain::Public, dest)
}

/// Fills `dest` from the private-domain generator. Use for keys, nonces
/// and IVs only.
pub fn get_private_random_data(dest: &mut [u8]) -> Result<()> {
    context::fill(Domain::Private, dest)
}

/// Public bytes generated by the calling thread since the current init.
pub fn get_public_random_bytes_used() -> Result<u64> {
    context::bytes_used(Domain::Public)
}

/// Private bytes generated by the calling thread since the current init.
pub fn get_private_random_bytes_used() -> Result<u64> {
    context::bytes_used(Domain::Private)
}

/// Fills `dest` straight from the OS entropy source, bypassing the DRBGs.
pub fn get_urandom_data(dest: &mut [u8]) -> Result<()> {
    GLOBAL.epoch()?;
    get_os_entropy(dest)
}

/// Returns an unbiased integer in `[0, max)` from the public domain.
pub fn public_random(max: i64) -> Result<i64> {
    sampling::uniform_random(max, || {
        let mut word = [0u8; 8];
        get_public_random_data(&mut word)?;
        Ok(u64::from_le_bytes(word))
    })
}

/// Reports whether the CPU has RDRAND. Probed once per process.
pub fn cpu_supports_rdrand() -> bool {
    supports_hardware_rng()
}

/// Fills `dest` straight from RDRAND.
pub fn get_rdrand_data(dest: &mut [u8]) -> Result<()> {
    GLOBAL.epoch()?;
    get_hardware_random(dest)
}

/// Replaces the calling thread's private generator with `drbg`.
///
/// Exists only in test builds and with the `testing` feature. `drbg` must
/// be tagged [`Domain::Private`].
#[cfg(any(test, feature = "testing"))]
pub fn set_private_drbg_for_test(drbg: Drbg) -> Result<()> {
    context::replace_private(drbg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drbg::DrbgSettings;
    use crate::entropy::{EntropySource, HashAlgorithm, ScriptedEntropy};
    use crate::error::RandomError;
    use crate::testing;
    use std::sync::Arc;

    fn scripted_private(seed: [u8; 32]) -> Drbg {
        Drbg::from_seed_for_testing(
            Domain::Private,
            seed,
            Box::new(ScriptedEntropy::new(0x5E)),
            DrbgSettings {
                reseed_threshold: 1 << 20,
                mix_hardware: false,
                conditioning: HashAlgorithm::Blake3,
            },
        )
    }

    #[test]
    fn test_fills_write_exactly_len() {
        let _guard = testing::fresh();

        for len in [1usize, 7, 8, 31, 32, 33, 64, 1000, 4096] {
            let mut buf = vec![0u8; len + 16];
            let canary = [0xC3u8; 16];
            buf[len..].copy_from_slice(&canary);

            get_public_random_data(&mut buf[..len]).unwrap();
            assert_eq!(buf[len..], canary, "public overran at len {len}");

            get_private_random_data(&mut buf[..len]).unwrap();
            assert_eq!(buf[len..], canary, "private overran at len {len}");
        }
    }

    #[test]
    fn test_public_and_private_outputs_differ() {
        let _guard = testing::fresh();

        let mut public = [0u8; 32];
        let mut private = [0u8; 32];
        get_public_random_data(&mut public).unwrap();
        get_private_random_data(&mut private).unwrap();

        assert_ne!(public, private);
    }

    #[test]
    fn test_bytes_used_counters() {
        let _guard = testing::fresh();
        assert_eq!(get_public_random_bytes_used().unwrap(), 0);
        assert_eq!(get_private_random_bytes_used().unwrap(), 0);

        let mut buf = [0u8; 100];
        get_public_random_data(&mut buf).unwrap();
        assert_eq!(get_public_random_bytes_used().unwrap(), 100);
        assert_eq!(get_private_random_bytes_used().unwrap(), 0);

        get_public_random_data(&mut buf[..1]).unwrap();
        get_private_random_data(&mut buf[..40]).unwrap();
        assert_eq!(get_public_random_bytes_used().unwrap(), 101);
        assert_eq!(get_private_random_bytes_used().unwrap(), 40);

        // Releasing generator state does not reset the counters.
        cleanup_thread().unwrap();
        assert_eq!(get_public_random_bytes_used().unwrap(), 101);

        // A full cycle does.
        cleanup().unwrap();
        init().unwrap();
        assert_eq!(get_public_random_bytes_used().unwrap(), 0);
        assert_eq!(get_private_random_bytes_used().unwrap(), 0);
    }

    #[test]
    fn test_counters_strictly_increase() {
        let _guard = testing::fresh();
        let mut last = 0;
        for len in 1..50 {
            let mut buf = vec![0u8; len];
            get_private_random_data(&mut buf).unwrap();
            let now = get_private_random_bytes_used().unwrap();
            assert!(now > last);
            last = now;
        }
    }

    #[test]
    fn test_calls_fail_after_cleanup() {
        let _guard = testing::fresh();
        cleanup().unwrap();

        let mut buf = [0u8; 16];
        assert!(matches!(
            get_public_random_data(&mut buf),
            Err(RandomError::NotInitialized)
        ));
        assert!(matches!(
            get_private_random_data(&mut buf),
            Err(RandomError::NotInitialized)
        ));
        assert!(matches!(
            get_urandom_data(&mut buf),
            Err(RandomError::NotInitialized)
        ));
        assert!(matches!(
            get_rdrand_data(&mut buf),
            Err(RandomError::NotInitialized)
        ));
        assert!(matches!(public_random(10), Err(RandomError::NotInitialized)));
        assert!(matches!(
            get_public_random_bytes_used(),
            Err(RandomError::NotInitialized)
        ));

        // No silent reinitialization.
        assert!(matches!(
            get_public_random_data(&mut buf),
            Err(RandomError::NotInitialized)
        ));
        init().unwrap();
        assert!(get_public_random_data(&mut buf).is_ok());
    }

    #[test]
    fn test_cleanup_flips_state_when_release_fails() {
        let _guard = testing::fresh();

        let inner = crate::with_public_drbg(|_| cleanup()).unwrap();
        assert!(matches!(inner, Err(RandomError::SafetyViolation(_))));
        assert_eq!(
            crate::context::global_state().state(),
            crate::RandomState::Uninitialized
        );
        assert!(matches!(
            get_public_random_data(&mut [0u8; 8]),
            Err(RandomError::NotInitialized)
        ));
    }

    #[test]
    fn test_init_is_idempotent() {
        let _guard = testing::fresh();
        let mut buf = [0u8; 16];
        get_public_random_data(&mut buf).unwrap();

        init().unwrap();
        assert_eq!(get_public_random_bytes_used().unwrap(), 16);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let _guard = testing::serial();
        cleanup().unwrap();

        let result = init_with_config(RandomConfig::with_reseed_threshold(0));
        assert!(matches!(result, Err(RandomError::Config(_))));
        assert!(matches!(
            get_public_random_data(&mut [0u8; 4]),
            Err(RandomError::NotInitialized)
        ));
    }

    #[test]
    fn test_public_random_bounds() {
        let _guard = testing::fresh();
        for max in [1i64, 2, 3, 100] {
            for _ in 0..1000 {
                let v = public_random(max).unwrap();
                assert!((0..max).contains(&v), "{v} outside [0, {max})");
            }
        }
    }

    #[test]
    fn test_public_random_is_balanced() {
        let _guard = testing::fresh();
        let draws = 100_000;
        let ones: i64 = (0..draws).map(|_| public_random(2).unwrap()).sum();

        // sigma = sqrt(100000 / 4) ~= 158; allow about six sigma.
        assert!((49_000..=51_000).contains(&ones), "ones = {ones}");
    }

    #[test]
    fn test_public_random_rejects_non_positive() {
        let _guard = testing::fresh();
        assert!(matches!(
            public_random(0),
            Err(RandomError::SafetyViolation(_))
        ));
        assert!(matches!(
            public_random(-1),
            Err(RandomError::SafetyViolation(_))
        ));
        assert_eq!(get_public_random_bytes_used().unwrap(), 0);
    }

    #[test]
    fn test_urandom_bypasses_drbg() {
        let _guard = testing::fresh();
        let mut buf = [0u8; 64];
        get_urandom_data(&mut buf).unwrap();

        assert_eq!(get_public_random_bytes_used().unwrap(), 0);
        assert_eq!(get_private_random_bytes_used().unwrap(), 0);
    }

    #[test]
    fn test_rdrand_matches_capability() {
        let _guard = testing::fresh();
        let supported = cpu_supports_rdrand();
        assert_eq!(cpu_supports_rdrand(), supported);

        let mut buf = [0u8; 24];
        let result = get_rdrand_data(&mut buf);
        if supported {
            assert!(result.is_ok());
        } else {
            assert!(matches!(result, Err(RandomError::HardwareRngUnavailable)));
        }
    }

    #[test]
    fn test_injected_private_drbg_is_deterministic() {
        let _guard = testing::fresh();
        let mut twin = scripted_private([0x42; 32]);
        set_private_drbg_for_test(scripted_private([0x42; 32])).unwrap();

        for len in [16usize, 5, 64] {
            let mut got = vec![0u8; len];
            let mut want = vec![0u8; len];
            get_private_random_data(&mut got).unwrap();
            twin.generate(&mut want).unwrap();
            assert_eq!(got, want);
        }
    }

    #[test]
    fn test_injection_rejects_public_drbg() {
        let _guard = testing::fresh();
        let public = Drbg::from_seed_for_testing(
            Domain::Public,
            [0; 32],
            Box::new(ScriptedEntropy::new(0)),
            DrbgSettings::default(),
        );
        assert!(matches!(
            set_private_drbg_for_test(public),
            Err(RandomError::SafetyViolation(_))
        ));
    }

    #[test]
    fn test_custom_source_drives_reseeds() {
        let _guard = testing::serial();
        cleanup().unwrap();

        let source = ScriptedEntropy::new(0x77);
        let draws = source.draw_counter();
        let shared = Arc::new(std::sync::Mutex::new(Some(source)));
        let factory: SourceFactory = Arc::new(move || -> Box<dyn EntropySource> {
            match shared.lock().ok().and_then(|mut s| s.take()) {
                Some(first) => Box::new(first),
                None => Box::new(ScriptedEntropy::new(0x78)),
            }
        });

        let config = RandomConfig {
            reseed_threshold_bytes: 32,
            mix_hardware_entropy: false,
            ..Default::default()
        };
        init_with_entropy_source(config, factory).unwrap();

        // The public DRBG is instantiated first and receives the counted source.
        let mut buf = [0u8; 32];
        for _ in 0..4 {
            get_public_random_data(&mut buf).unwrap();
        }
        // One draw to instantiate, one per reseed after the first period.
        assert_eq!(draws.load(std::sync::atomic::Ordering::Relaxed), 4);

        cleanup().unwrap();
    }

    #[test]
    fn test_failing_custom_source_reports_entropy_unavailable() {
        let _guard = testing::serial();
        cleanup().unwrap();

        let factory: SourceFactory =
            Arc::new(|| -> Box<dyn EntropySource> { Box::new(ScriptedEntropy::always_failing()) });
        init_with_entropy_source(RandomConfig::default(), factory).unwrap();

        let result = get_public_random_data(&mut [0u8; 8]);
        assert!(matches!(result, Err(RandomError::EntropyUnavailable(_))));

        cleanup().unwrap();
    }

    #[test]
    fn test_empty_buffer_accepted() {
        let _guard = testing::fresh();
        get_public_random_data(&mut []).unwrap();
        get_private_random_data(&mut []).unwrap();
        assert_eq!(get_public_random_bytes_used().unwrap(), 0);
    }
}
