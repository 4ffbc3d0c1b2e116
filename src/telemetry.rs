//! Subscriber installation for binaries embedding the pipeline.

use tracing_subscriber::{filter::EnvFilter, prelude::*};

use crate::config::LoggingConfig;

/// Installs a compact `fmt` subscriber as the global default.
///
/// The filter comes from `RUST_LOG` if set, else from `config.filter`.
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init(config: &LoggingConfig) -> bool {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| config.filter.clone());

    tracing_subscriber::registry()
        .with(EnvFilter::new(directives))
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
        .is_ok()
}
