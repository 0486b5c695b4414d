//! Log output for tests.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber that writes through the test harness.
///
/// The filter is read from `RUST_LOG` and defaults to `warn`. Safe to call
/// from every test; only the first call installs anything.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
