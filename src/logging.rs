//! Tracing subscriber setup for the command-line shell and tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global subscriber.
///
/// Level comes from `RUST_LOG` (default `info`), e.g.
/// `RUST_LOG=laminate_advisor=debug`. Output goes to stderr so stdout stays
/// clean for JSON results.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Debug-level subscriber routed through the test harness. Safe to call from
/// every test.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
