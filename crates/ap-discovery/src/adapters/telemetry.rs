//! Log subscriber setup for hosts that do not install their own.

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("subscriber init failed: {0}")]
    Init(String),
}

/// Output options for [`init_tracing_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is unset, e.g. `"info"` or
    /// `"ap_discovery=debug"`
    pub default_level: String,
    pub ansi: bool,
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_level: "info".into(),
            ansi: true,
            with_target: true,
        }
    }
}

/// Install a fmt subscriber. `RUST_LOG` overrides `default_level`.
pub fn init_tracing(default_level: &str) -> Result<(), TelemetryError> {
    init_tracing_with(&TelemetryConfig {
        default_level: default_level.into(),
        ..TelemetryConfig::default()
    })
}

/// Install a fmt subscriber with explicit output options.
///
/// Fails instead of panicking when a global subscriber already exists.
pub fn init_tracing_with(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_level))
        .map_err(|e| TelemetryError::Filter(e.to_string()))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(config.with_target)
        .with_ansi(config.ansi);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error() {
        // Either this call or an earlier test installed the subscriber.
        let _ = init_tracing("debug");
        assert!(matches!(init_tracing("debug"), Err(TelemetryError::Init(_))));
    }
}
