//! Diagnostic logging setup.
//!
//! Installs a `tracing` subscriber for the whole process. Raw protocol
//! traffic is logged under the [`WIRE_TARGET`] target so it can be filtered
//! independently, e.g. `RUST_LOG=info,wire=off`.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Target used for every sent and received protocol line.
pub const WIRE_TARGET: &str = "wire";

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured filter.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
