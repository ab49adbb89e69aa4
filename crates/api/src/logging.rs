//! Logging initialisation.

use tracing_subscriber::EnvFilter;

/// Initialise the global tracing subscriber.
///
/// Honors `RUST_LOG`; defaults to `info`. Output goes to stdout so
/// operator CLI progress is visible in the terminal and in cron capture.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
