//! Logging and tracing initialization.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Build the level filter: `RUST_LOG` wins over the configured level.
pub fn filter_for(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global tracing subscriber.
///
/// Only the first call takes effect; later calls are ignored so tests and
/// binaries can both call it.
pub fn init_logging(config: &LoggingConfig) {
    let builder = fmt::Subscriber::builder().with_env_filter(filter_for(config));

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(
            builder
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish(),
        )
    };

    if installed.is_ok() {
        tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
