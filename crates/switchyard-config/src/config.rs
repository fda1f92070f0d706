//! Root configuration type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use switchyard_telemetry::{LogConfig, LogFormat, TelemetryConfig};

use crate::{ConfigError, ConfigStore, DispatchConfig, MetricsSection, RuntimeMode};

/// Complete Switchyard configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use switchyard_config::SwitchyardConfig;
///
/// let config = SwitchyardConfig::default();
/// assert_eq!(config.dispatch.service_name, "switchyard");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SwitchyardConfig {
    /// Dispatch engine settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LogConfig,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsSection,

    /// Free-form application values, seeded into the explicit layer of the
    /// [`ConfigStore`].
    #[serde(default = "empty_table")]
    pub app: Value,
}

impl Default for SwitchyardConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            logging: LogConfig::default(),
            metrics: MetricsSection::default(),
            app: empty_table(),
        }
    }
}

fn empty_table() -> Value {
    Value::Object(Map::new())
}

impl SwitchyardConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> SwitchyardConfigBuilder {
        SwitchyardConfigBuilder::new()
    }

    /// Settings for local development: pretty debug logging.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LogConfig::development(),
            ..Self::default()
        }
    }

    /// Settings for deployment: JSON logging at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            logging: LogConfig::production(),
            ..Self::default()
        }
    }

    /// Validates cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "dispatch.service_name",
                "must not be empty",
            ));
        }

        if self.dispatch.timeout_ms == Some(0) {
            return Err(ConfigError::invalid_value(
                "dispatch.timeout_ms",
                "must be greater than zero; omit it to disable the limit",
            ));
        }

        if matches!(&self.dispatch.default_layout, Some(name) if name.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                "dispatch.default_layout",
                "must not be empty",
            ));
        }

        if self.logging.enabled {
            switchyard_telemetry::logging::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        if !self.app.is_object() {
            return Err(ConfigError::invalid_value("app", "must be a table"));
        }

        Ok(())
    }

    /// Builds a [`ConfigStore`] whose explicit layer holds the `app` table.
    ///
    /// The dispatch section is exposed as implicit values under
    /// `switchyard.*` so handlers can read it through the same store.
    pub fn to_store(&self) -> Result<ConfigStore, ConfigError> {
        let store = ConfigStore::new(self.dispatch.mode);
        store.merge_defaults(serde_json::json!({
            "switchyard": serde_json::to_value(&self.dispatch)?,
        }))?;
        store.merge_explicit(self.app.clone())?;
        Ok(store)
    }

    /// Telemetry settings derived from this configuration.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig::builder()
            .service_name(self.dispatch.service_name.clone())
            .metrics_enabled(self.metrics.enabled)
            .logging(self.logging.clone())
            .build()
    }

    /// Runtime mode shortcut.
    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        self.dispatch.mode
    }
}

/// Builder for [`SwitchyardConfig`].
#[derive(Debug, Default)]
pub struct SwitchyardConfigBuilder {
    config: SwitchyardConfig,
}

impl SwitchyardConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dispatch section.
    #[must_use]
    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.config.dispatch = dispatch;
        self
    }

    /// Sets the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Sets the log format only.
    #[must_use]
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Sets the metrics section.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsSection) -> Self {
        self.config.metrics = metrics;
        self
    }

    /// Sets the application table.
    #[must_use]
    pub fn app(mut self, app: Value) -> Self {
        self.config.app = app;
        self
    }

    /// Builds without validation.
    #[must_use]
    pub fn build(self) -> SwitchyardConfig {
        self.config
    }

    /// Builds and validates.
    pub fn build_validated(self) -> Result<SwitchyardConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config_is_valid() {
        let config = SwitchyardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mode(), RuntimeMode::Server);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_presets() {
        assert_eq!(SwitchyardConfig::development().logging.format, LogFormat::Pretty);
        assert_eq!(SwitchyardConfig::production().logging.format, LogFormat::Json);
    }

    #[test]
    fn test_builder() {
        let config = SwitchyardConfig::builder()
            .dispatch(DispatchConfig {
                service_name: "bookshelf".to_string(),
                default_layout: Some("app".to_string()),
                ..Default::default()
            })
            .log_format(LogFormat::Pretty)
            .metrics(MetricsSection { enabled: false })
            .build();

        assert_eq!(config.dispatch.service_name, "bookshelf");
        assert_eq!(config.dispatch.default_layout.as_deref(), Some("app"));
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_validate_empty_service_name() {
        let result = SwitchyardConfig::builder()
            .dispatch(DispatchConfig {
                service_name: String::new(),
                ..Default::default()
            })
            .build_validated();
        assert!(matches!(result, Err(ConfigError::InvalidValue { field, .. }) if field == "dispatch.service_name"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = SwitchyardConfig::builder()
            .dispatch(DispatchConfig {
                timeout_ms: Some(0),
                ..Default::default()
            })
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_log_level() {
        let mut config = SwitchyardConfig::default();
        config.logging.level = "switchyard=chatty".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { field, .. }) if field == "logging.level"));

        config.logging.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_app_must_be_table() {
        let config = SwitchyardConfig::builder().app(json!(42)).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<SwitchyardConfig, _> = toml::from_str("[server]\nport = 8080\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_roundtrip_with_app_table() {
        let toml_str = r#"
            [dispatch]
            service_name = "bookshelf"
            mode = "cli"

            [app.api]
            base_url = "https://books.example"
            page_size = 20
        "#;
        let config: SwitchyardConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dispatch.mode, RuntimeMode::Cli);
        assert_eq!(config.app["api"]["page_size"], json!(20));
    }

    #[test]
    fn test_to_store() {
        let config = SwitchyardConfig::builder()
            .app(json!({"api": {"base_url": "https://books.example"}}))
            .build();
        let store = config.to_store().unwrap();

        assert_eq!(store.get("app.api.base_url"), None);
        assert_eq!(store.get("api.base_url"), Some(json!("https://books.example")));
        assert_eq!(store.get("switchyard.service_name"), Some(json!("switchyard")));
        assert_eq!(store.mode(), RuntimeMode::Server);
    }

    #[test]
    fn test_telemetry_section() {
        let mut config = SwitchyardConfig::default();
        config.dispatch.service_name = "bookshelf".to_string();
        config.metrics.enabled = false;

        let telemetry = config.telemetry();
        assert_eq!(telemetry.service_name, "bookshelf");
        assert!(!telemetry.metrics_enabled);
    }
}
