//! # Logging
//!
//! Tracing initialization for the sidecar binary. Honors `RUST_LOG`,
//! defaulting to `info` for our own crate and `warn` for dependencies.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber. Safe to call more than once;
/// only the first call has an effect.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,pgsentinel=info"));

        let subscriber = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(filter);

        // A subscriber may already be installed when embedded in tests.
        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }
    });
}
