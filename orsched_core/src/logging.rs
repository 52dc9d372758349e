//! Tracing subscriber setup for applications and tests using this crate
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global subscriber
///
/// The filter is read from `RUST_LOG` and defaults to `info`, for example
/// `RUST_LOG=orsched_core=debug` shows per iteration column generation progress.
///
/// # Examples
/// ```no_run
/// use orsched_core::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// Install a debug level subscriber writing through the test harness
///
/// Safe to call from every test, only the first call installs anything.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
