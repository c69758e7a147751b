//! Log subscriber setup for the binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Install a `fmt` subscriber writing to stderr, filtered by `RUST_LOG`.
///
/// Stdout stays free for piping. Calling this more than once is harmless:
/// only the first subscriber is installed.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    // A subscriber may already be set, e.g. by a test harness.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
