//! Process-wide tracing setup

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber: RUST_LOG-filtered, writing to stderr
///
/// Called once from the binary entrypoint. Stdout stays clean for anything
/// that might want to pipe it.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
