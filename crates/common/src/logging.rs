//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level when set. Safe to call more
/// than once; later calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json {
        builder.json().try_init().ok();
    } else {
        builder.try_init().ok();
    }
}

/// Plain-text logging at the default level, for tests and one-off scripts.
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
