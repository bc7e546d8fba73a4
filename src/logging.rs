//! Diagnostic logging through `tracing`, enabled by `RUST_LOG`.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the diagnostic log subscriber.
///
/// Logging is off unless `RUST_LOG` is set (for example `RUST_LOG=suiterun=debug`).
/// Events go to stderr so they never mix with the coverage table on stdout.
/// Safe to call more than once.
pub fn init() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .init();
        }
    });
}
