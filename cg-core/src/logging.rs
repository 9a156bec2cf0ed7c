//! Crate-standard logging setup.

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG`, when set, takes precedence over `verbosity`, which accepts anything an
/// [`EnvFilter`] does (`info`, `cg_gen=debug`, ...).
pub fn setup(verbosity: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity));

    // A subscriber may already be installed (e.g. by a test harness); that's fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
