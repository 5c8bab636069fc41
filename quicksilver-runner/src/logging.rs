//! Tracing subscriber setup for the binaries.

use tracing_subscriber::EnvFilter;

/// Level used when neither `RUST_LOG` nor `LOG_LEVEL` is set.
const DEFAULT_LEVEL: &str = "info";

/// Install the global subscriber: compact single-line output, level from
/// `RUST_LOG` (full filter syntax) or `LOG_LEVEL` (plain level name).
/// A second call is a no-op, so tests may init freely.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
        EnvFilter::new(level)
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
