//! Tracing setup shared by both binaries

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_DIRECTIVE: &str = "room_relay=info";

/// Initialize logging with environment filter
///
/// Use RUST_LOG env var to control log level,
/// e.g. RUST_LOG=debug or RUST_LOG=room_relay=trace
///
/// Call once per process; a second call panics.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
        )
        .with_writer(std::io::stderr)
        .init();
}
