//! Tracing subscriber bootstrap.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Filter applied until configuration has been read.
pub const DEFAULT_FILTER: &str = "info";

/// ## Summary
/// Installs the global tracing subscriber and applies the configured level.
///
/// An unparsable level is reported and the default filter is kept.
///
/// ## Errors
/// Returns an error if a global subscriber has already been installed.
pub fn init_tracing(
    logging: &LoggingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()?;

    if let Ok(filter) = EnvFilter::try_new(logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %logging.level, "Invalid log level in config, keeping {DEFAULT_FILTER}");
    }

    Ok(())
}
