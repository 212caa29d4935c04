//! Tracing setup for the worldops CLI.
//!
//! # Separation of Concerns
//!
//! - **Tracing (stderr layer)**: Dev diagnostics via `RUST_LOG`, output to
//!   stderr. Not persisted.
//!
//! - **Session capture (`io/session`)**: QA artifacts in the configured `qa`
//!   folder. Captures `info` and above while a session is active, unaffected
//!   by `RUST_LOG`.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::io::session::SessionRecorder;

/// Initialize the global subscriber.
///
/// Reads `RUST_LOG` env var for the stderr layer. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=worldops=debug worldops run
/// ```
pub fn init(recorder: SessionRecorder) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_filter(filter),
        )
        .with(recorder.with_filter(LevelFilter::INFO))
        .init();
}
