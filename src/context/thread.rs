//! Per-thread generator context.
//!
//! Each thread owns its generator pair outright; nothing here is shared or
//! locked. A context is created lazily on the first request, checked for a
//! fork on every request, and dropped on thread exit, `cleanup_thread`,
//! `cleanup`, or when it was built under an older init epoch.

use super::global::GLOBAL;
use crate::drbg::{Domain, Drbg, GeneratorPair};
use crate::error::{RandomError, Result};
use std::cell::{Cell, RefCell};

thread_local! {
    static CONTEXT: RefCell<Option<ThreadRandomContext>> = const { RefCell::new(None) };
    static USAGE: Cell<ByteUsage> = const { Cell::new(ByteUsage::new(0)) };
}

/// The calling thread's public and private DRBGs.
#[derive(Debug)]
pub struct ThreadRandomContext {
    generators: GeneratorPair,
    /// Process ID recorded when the generators were last known fresh.
    pid: u32,
    epoch: u64,
}

impl ThreadRandomContext {
    fn create(epoch: u64) -> Result<Self> {
        let generators =
            GLOBAL.with_settings(|s| GeneratorPair::instantiate(&s.drbg, || s.make_source()))?;
        let pid = current_pid();

        tracing::debug!(pid, epoch, "created thread random context");
        Ok(Self {
            generators,
            pid,
            epoch,
        })
    }

    /// Reseeds both generators if the process ID changed since the last
    /// request, which means this state was cloned into a forked child.
    fn check_fork(&mut self) -> Result<()> {
        let pid = current_pid();
        if pid == self.pid {
            return Ok(());
        }

        tracing::warn!(
            recorded_pid = self.pid,
            current_pid = pid,
            "process ID changed, reseeding both DRBGs"
        );
        self.generators.reseed_all()?;
        self.pid = pid;
        Ok(())
    }
}

/// Cumulative per-domain output of this thread within one init epoch.
///
/// Kept beside the context rather than in it, so `cleanup_thread` releases
/// generator state without resetting the counters.
#[derive(Debug, Clone, Copy)]
struct ByteUsage {
    epoch: u64,
    public: u64,
    private: u64,
}

impl ByteUsage {
    const fn new(epoch: u64) -> Self {
        Self {
            epoch,
            public: 0,
            private: 0,
        }
    }

    fn get(&self, domain: Domain) -> u64 {
        match domain {
            Domain::Public => self.public,
            Domain::Private => self.private,
        }
    }
}

fn current_pid() -> u32 {
    std::process::id()
}

/// Runs `f` against the calling thread's context, creating it first if the
/// thread has none or its context predates the current init epoch.
///
/// Fails with `NotInitialized` outside `Ready`. A fork is detected and
/// handled before `f` runs.
pub(crate) fn with_context<T, F>(f: F) -> Result<T>
where
    F: FnOnce(&mut ThreadRandomContext) -> Result<T>,
{
    let epoch = GLOBAL.epoch()?;

    CONTEXT
        .try_with(|cell| {
            let mut slot = cell.try_borrow_mut().map_err(|_| {
                RandomError::SafetyViolation("re-entrant use of the thread random context")
            })?;

            if slot.as_ref().map_or(true, |ctx| ctx.epoch != epoch) {
                // Drop (and erase) stale state before seeding the new pair.
                *slot = None;
                *slot = Some(ThreadRandomContext::create(epoch)?);
            }
            let Some(ctx) = slot.as_mut() else {
                return Err(RandomError::NotInitialized);
            };

            ctx.check_fork()?;
            f(ctx)
        })
        .map_err(|_| RandomError::SafetyViolation("thread random context already destroyed"))?
}

/// Fills `dest` from the calling thread's `domain` generator.
pub(crate) fn fill(domain: Domain, dest: &mut [u8]) -> Result<()> {
    with_context(|ctx| {
        ctx.generators.get(domain).generate(dest)?;
        record_usage(ctx.epoch, domain, dest.len());
        Ok(())
    })
}

/// Runs `f` against a read-only view of the calling thread's `domain`
/// generator.
///
/// Output is drawn only through the fill operations, so every generated
/// byte reaches the usage counters.
pub fn with_generator<T, F>(domain: Domain, f: F) -> Result<T>
where
    F: FnOnce(&Drbg) -> T,
{
    with_context(|ctx| Ok(f(ctx.generators.peek(domain))))
}

/// Runs `f` against the calling thread's public generator.
pub fn with_public_drbg<T, F>(f: F) -> Result<T>
where
    F: FnOnce(&Drbg) -> T,
{
    with_generator(Domain::Public, f)
}

/// Runs `f` against the calling thread's private generator.
pub fn with_private_drbg<T, F>(f: F) -> Result<T>
where
    F: FnOnce(&Drbg) -> T,
{
    with_generator(Domain::Private, f)
}

fn record_usage(epoch: u64, domain: Domain, len: usize) {
    let _ = USAGE.try_with(|cell| {
        let mut usage = cell.get();
        if usage.epoch != epoch {
            usage = ByteUsage::new(epoch);
        }
        let counter = match domain {
            Domain::Public => &mut usage.public,
            Domain::Private => &mut usage.private,
        };
        *counter = counter.saturating_add(len as u64);
        cell.set(usage);
    });
}

/// Bytes the calling thread has drawn from `domain` since the current init.
pub(crate) fn bytes_used(domain: Domain) -> Result<u64> {
    let epoch = GLOBAL.epoch()?;
    let usage = USAGE
        .try_with(Cell::get)
        .map_err(|_| RandomError::SafetyViolation("thread random context already destroyed"))?;

    if usage.epoch == epoch {
        Ok(usage.get(domain))
    } else {
        Ok(0)
    }
}

/// Drops the calling thread's context, erasing its generator state.
pub(crate) fn release_current() -> Result<()> {
    let released = CONTEXT
        .try_with(|cell| {
            cell.try_borrow_mut()
                .map(|mut slot| slot.take())
                .map_err(|_| {
                    RandomError::SafetyViolation("re-entrant use of the thread random context")
                })
        })
        .unwrap_or(Ok(None))?;

    if released.is_some() {
        tracing::debug!("released thread random context");
    }
    Ok(())
}

/// Replaces the calling thread's private generator.
#[cfg(any(test, feature = "testing"))]
pub(crate) fn replace_private(drbg: Drbg) -> Result<()> {
    if drbg.domain() != Domain::Private {
        return Err(RandomError::SafetyViolation(
            "injected generator must be tagged private",
        ));
    }
    with_context(|ctx| {
        ctx.generators.replace(drbg);
        Ok(())
    })
}

/// Overwrites the recorded process ID, as if the context had been created
/// in another process.
#[cfg(test)]
pub(crate) fn set_recorded_pid_for_test(pid: u32) -> Result<()> {
    with_context(|ctx| {
        ctx.pid = pid;
        Ok(())
    })
}

/// Returns true if the calling thread currently holds a context.
#[cfg(test)]
pub(crate) fn has_context() -> bool {
    CONTEXT.with(|cell| cell.borrow().is_some())
}
