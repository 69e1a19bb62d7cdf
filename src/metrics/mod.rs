//! Prometheus metrics for the random subsystem.
//!
//! Figures are per thread: [`MetricsSnapshot::capture`] reads the calling
//! thread's generators. No exporter is bundled; callers serve
//! [`MetricsRegistry::encode`] however they like.
//!
//! # Metrics Exposed
//!
//! - `tls_random_bytes_used{domain}` - Bytes drawn since init
//! - `tls_random_drbg_reseed_count{domain}` - Reseeds performed
//! - `tls_random_drbg_bytes_since_reseed{domain}` - Bytes in the current reseed period
//! - `tls_random_hardware_rng_supported` - RDRAND capability (1=yes, 0=no)
//!
//! # Example
//!
//! ```no_run
//! use tls_random::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! tls_random::init().expect("init failed");
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.update(&MetricsSnapshot::capture().expect("capture failed"));
//! println!("{}", registry.encode().expect("encode failed"));
//! ```

mod collector;

pub use collector::{DomainSnapshot, MetricsError, MetricsRegistry, MetricsSnapshot};
