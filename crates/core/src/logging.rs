//! Logging initialization and configuration.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,trivis=debug";

/// Initialize the logging system with tracing.
///
/// `RUST_LOG` takes precedence; otherwise `default_filter` is used. An invalid
/// `default_filter` falls back to [`DEFAULT_LOG_FILTER`].
///
/// # Example
/// ```
/// trivis_core::init_logging("info");
/// tracing::info!("Viewer starting");
/// ```
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}
