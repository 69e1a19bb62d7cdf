//! Process-wide random state.
//!
//! The only cross-thread coordination point. The generation path reads two
//! atomics here; the settings lock is taken only when a thread builds its
//! context and by init/cleanup.

use crate::config::RandomConfig;
use crate::drbg::DrbgSettings;
use crate::entropy::{supports_hardware_rng, EntropySource, OsEntropy};
use crate::error::{RandomError, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Builds one entropy source per DRBG instance.
pub type SourceFactory = Arc<dyn Fn() -> Box<dyn EntropySource> + Send + Sync>;

/// Position in the process-wide lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomState {
    /// Before `init` or after `cleanup`.
    Uninitialized,
    /// Generation requests are served.
    Ready,
}

/// Settings captured at init and applied to every context built afterwards.
pub(crate) struct Settings {
    pub(crate) drbg: DrbgSettings,
    source_factory: Option<SourceFactory>,
}

impl Settings {
    pub(crate) fn make_source(&self) -> Box<dyn EntropySource> {
        match &self.source_factory {
            Some(factory) => factory(),
            None => Box::new(OsEntropy),
        }
    }
}

/// Process-wide initialization state.
///
/// `epoch` changes on every init and cleanup. Thread contexts remember the
/// epoch they were built under and are rebuilt when it no longer matches,
/// which is how a cleanup reaches contexts owned by other threads.
pub struct GlobalRandomState {
    ready: AtomicBool,
    epoch: AtomicU64,
    settings: RwLock<Option<Settings>>,
}

pub(crate) static GLOBAL: GlobalRandomState = GlobalRandomState::new();

/// Returns the process-wide state object.
pub fn global_state() -> &'static GlobalRandomState {
    &GLOBAL
}

impl GlobalRandomState {
    const fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            settings: RwLock::new(None),
        }
    }

    /// Returns the current lifecycle position.
    pub fn state(&self) -> RandomState {
        if self.ready.load(Ordering::Acquire) {
            RandomState::Ready
        } else {
            RandomState::Uninitialized
        }
    }

    /// Returns the current epoch, or `NotInitialized` outside `Ready`.
    pub(crate) fn epoch(&self) -> Result<u64> {
        if !self.ready.load(Ordering::Acquire) {
            return Err(RandomError::NotInitialized);
        }
        Ok(self.epoch.load(Ordering::Acquire))
    }

    /// Transitions to `Ready`. A call while already `Ready` keeps the
    /// existing settings and succeeds.
    pub(crate) fn initialize(
        &self,
        config: RandomConfig,
        source_factory: Option<SourceFactory>,
    ) -> Result<()> {
        config.validate()?;

        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        if self.ready.load(Ordering::Acquire) {
            tracing::debug!("random subsystem already initialized");
            return Ok(());
        }

        let custom_source = source_factory.is_some();
        *settings = Some(Settings {
            drbg: DrbgSettings::from(&config),
            source_factory,
        });
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.ready.store(true, Ordering::Release);

        tracing::info!(
            epoch,
            reseed_threshold_bytes = config.reseed_threshold_bytes,
            hardware_rng = supports_hardware_rng(),
            mix_hardware = config.mix_hardware_entropy,
            custom_source,
            "random subsystem initialized"
        );
        Ok(())
    }

    /// Transitions to `Uninitialized`. Always flips the state, even while
    /// other threads still hold contexts; those are discarded on their next
    /// use.
    pub(crate) fn shutdown(&self) {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let was_ready = self.ready.swap(false, Ordering::AcqRel);
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        *settings = None;

        tracing::info!(epoch, was_ready, "random subsystem cleaned up");
    }

    /// Runs `f` against the settings captured at init.
    pub(crate) fn with_settings<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Settings) -> Result<T>,
    {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        match settings.as_ref() {
            Some(settings) => f(settings),
            None => Err(RandomError::NotInitialized),
        }
    }
}

impl std::fmt::Debug for GlobalRandomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalRandomState")
            .field("state", &self.state())
            .field("epoch", &self.epoch.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
