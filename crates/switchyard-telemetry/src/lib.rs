//! Observability for Switchyard.
//!
//! - **Logging**: structured JSON or pretty output via `tracing-subscriber`
//! - **Metrics**: dispatch counters and histograms via the `metrics` facade
//!
//! Span instrumentation of individual events lives in the tracing stage of
//! `switchyard-middleware`; this crate only sets up sinks and names.
//!
//! # Example
//!
//! ```rust,no_run
//! use switchyard_telemetry::{init_telemetry, LogConfig, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder()
//!     .service_name("bookshelf")
//!     .logging(LogConfig::development())
//!     .build();
//!
//! init_telemetry(&config).expect("telemetry");
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{describe_metrics, InFlightGuard};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Validates the configuration, installs logging and describes metrics.
///
/// # Errors
///
/// Returns [`TelemetryError`] if the configuration is invalid or logging
/// cannot be installed.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    config.validate()?;
    init_logging(&config.logging)?;
    if config.metrics_enabled {
        describe_metrics();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_with_logging_disabled() {
        let config = TelemetryConfig::builder()
            .logging(LogConfig::disabled())
            .build();
        assert!(init_telemetry(&config).is_ok());
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let config = TelemetryConfig::builder()
            .service_name("")
            .logging(LogConfig::disabled())
            .build();
        assert!(init_telemetry(&config).is_err());
    }
}
