//! Log output for tests.
//!
//! Filtered by `RUST_LOG`; defaults to debug output from the session token
//! crates so rejection reasons show up next to failing assertions.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a test subscriber. Safe to call from every test; only the first
/// call installs.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("session_token=debug,common=debug"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer())
        .try_init();
}
