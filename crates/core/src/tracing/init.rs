//! Initialization functions for tracing

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::tracing::config::{InstrumentationConfig, LogFormat};
use crate::{CoreError, CoreResult};

/// Initialize tracing with the given configuration
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &InstrumentationConfig) -> CoreResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
    };

    result.map_err(|e| CoreError::internal_error(format!("Failed to install subscriber: {e}")))?;
    tracing::debug!(service = %config.service_name, "Tracing initialized");
    Ok(())
}

/// Initialize with default configuration from environment
pub fn init_default() -> CoreResult<()> {
    init_tracing(&InstrumentationConfig::from_env())
}

/// Initialize with development configuration
pub fn init_dev() -> CoreResult<()> {
    init_tracing(&InstrumentationConfig::dev())
}
