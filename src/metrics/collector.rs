//! Metrics collection and registry.

use crate::drbg::Domain;
use crate::error::Result;
use prometheus::{Encoder, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    /// Encoded output was not UTF-8.
    #[error("metrics output is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Per-domain generator figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomainSnapshot {
    /// Bytes drawn by this thread since init.
    pub bytes_used: u64,
    /// Reseeds performed by this thread's generator.
    pub reseed_count: u64,
    /// Bytes generated since the last reseed.
    pub bytes_since_reseed: u64,
}

/// A snapshot of the calling thread's random state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Public-domain figures.
    pub public: DomainSnapshot,
    /// Private-domain figures.
    pub private: DomainSnapshot,
    /// Whether the CPU offers RDRAND.
    pub hardware_rng_supported: bool,
}

impl MetricsSnapshot {
    /// Reads the calling thread's generators, creating them if needed.
    pub fn capture() -> Result<Self> {
        Ok(Self {
            public: DomainSnapshot::capture(Domain::Public)?,
            private: DomainSnapshot::capture(Domain::Private)?,
            hardware_rng_supported: crate::cpu_supports_rdrand(),
        })
    }

    fn domain(&self, domain: Domain) -> &DomainSnapshot {
        match domain {
            Domain::Public => &self.public,
            Domain::Private => &self.private,
        }
    }
}

impl DomainSnapshot {
    fn capture(domain: Domain) -> Result<Self> {
        let (reseed_count, bytes_since_reseed) =
            crate::context::with_generator(domain, |drbg| (drbg.reseed_count(), drbg.generation()))?;
        let bytes_used = match domain {
            Domain::Public => crate::get_public_random_bytes_used()?,
            Domain::Private => crate::get_private_random_bytes_used()?,
        };
        Ok(Self {
            bytes_used,
            reseed_count,
            bytes_since_reseed,
        })
    }
}

/// Prometheus metrics registry for the random subsystem.
pub struct MetricsRegistry {
    registry: Registry,
    bytes_used: IntGaugeVec,
    reseed_count: IntGaugeVec,
    bytes_since_reseed: IntGaugeVec,
    hardware_rng_supported: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all metrics registered.
    pub fn new() -> std::result::Result<Self, MetricsError> {
        let registry = Registry::new();

        let bytes_used = IntGaugeVec::new(
            Opts::new(
                "tls_random_bytes_used",
                "Bytes drawn by the sampled thread since init",
            ),
            &["domain"],
        )?;
        let reseed_count = IntGaugeVec::new(
            Opts::new(
                "tls_random_drbg_reseed_count",
                "Reseeds performed by the sampled thread's DRBG",
            ),
            &["domain"],
        )?;
        let bytes_since_reseed = IntGaugeVec::new(
            Opts::new(
                "tls_random_drbg_bytes_since_reseed",
                "Bytes generated since the DRBG's last reseed",
            ),
            &["domain"],
        )?;
        let hardware_rng_supported = IntGauge::new(
            "tls_random_hardware_rng_supported",
            "Whether the CPU supports RDRAND (1=yes, 0=no)",
        )?;

        registry.register(Box::new(bytes_used.clone()))?;
        registry.register(Box::new(reseed_count.clone()))?;
        registry.register(Box::new(bytes_since_reseed.clone()))?;
        registry.register(Box::new(hardware_rng_supported.clone()))?;

        Ok(Self {
            registry,
            bytes_used,
            reseed_count,
            bytes_since_reseed,
            hardware_rng_supported,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        for domain in [Domain::Public, Domain::Private] {
            let figures = snapshot.domain(domain);
            let label = [domain.as_str()];
            self.bytes_used
                .with_label_values(&label)
                .set(saturating_i64(figures.bytes_used));
            self.reseed_count
                .with_label_values(&label)
                .set(saturating_i64(figures.reseed_count));
            self.bytes_since_reseed
                .with_label_values(&label)
                .set(saturating_i64(figures.bytes_since_reseed));
        }
        self.hardware_rng_supported
            .set(i64::from(snapshot.hardware_rng_supported));
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> std::result::Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Returns the underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
