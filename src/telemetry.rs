//! Logging setup for the binaries.

use tracing_subscriber::EnvFilter;

/// Installs a formatted stderr subscriber. `RUST_LOG` overrides the default
/// `info` level, e.g. `RUST_LOG=guidebook=debug`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
