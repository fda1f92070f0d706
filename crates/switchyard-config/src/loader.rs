//! Layered configuration loading.
//!
//! [`ConfigLoader`] applies sources in order, later ones overriding earlier
//! ones:
//! 1. Built-in defaults (or a preset)
//! 2. Configuration files and strings (TOML or JSON), merged table by table
//! 3. Environment variables `PREFIX__SECTION__KEY`

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;
use switchyard_telemetry::LogFormat;

use crate::{ConfigError, RuntimeMode, SwitchyardConfig};

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use switchyard_config::ConfigLoader;
///
/// # fn main() -> Result<(), switchyard_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("switchyard.toml")?
///     .with_dotenv()
///     .with_env_prefix("SWITCHYARD")
///     .load()?;
///
/// println!("mode: {}", config.dispatch.mode);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: SwitchyardConfig,
    env_prefix: Option<String>,
    sources: Vec<String>,
}

impl ConfigLoader {
    /// Creates a loader seeded with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = SwitchyardConfig::development();
        self
    }

    /// Resets to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = SwitchyardConfig::production();
        self
    }

    /// Merges a configuration file; the format follows the extension.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable, has an unknown extension,
    /// does not parse, or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        self.merge_source(&content, Format::from_name(extension)?)?;
        self.sources.push(path.display().to_string());
        Ok(self)
    }

    /// Merges a configuration file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merges configuration text in the named format (`toml` or `json`).
    ///
    /// # Example
    ///
    /// ```
    /// use switchyard_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[dispatch]\nservice_name = \"bookshelf\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.dispatch.service_name, "bookshelf");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.merge_source(content, Format::from_name(format)?)?;
        self.sources.push(format!("<{format} string>"));
        Ok(self)
    }

    /// Enables environment overrides with `prefix`.
    ///
    /// With prefix `SWITCHYARD`:
    /// - `SWITCHYARD__DISPATCH__MODE=cli`
    /// - `SWITCHYARD__LOGGING__LEVEL=debug`
    /// - `SWITCHYARD__APP__API__BASE_URL=https://books.example` sets
    ///   `app.api.base_url`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` into the process environment if present.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        // A missing .env is normal outside development.
        let _ = dotenvy::dotenv();
        self
    }

    /// Names of the sources merged so far, in order.
    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Applies environment overrides and validates.
    pub fn load(mut self) -> Result<SwitchyardConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without environment overrides or
    /// validation.
    #[must_use]
    pub fn load_unvalidated(self) -> SwitchyardConfig {
        self.config
    }

    fn merge_source(&mut self, content: &str, format: Format) -> Result<(), ConfigError> {
        // Typed parse first so unknown fields are reported against the schema.
        let overlay: Value = match format {
            Format::Toml => {
                toml::from_str::<SwitchyardConfig>(content)?;
                toml::from_str(content)?
            }
            Format::Json => {
                serde_json::from_str::<SwitchyardConfig>(content)?;
                serde_json::from_str(content)?
            }
        };

        let mut merged = serde_json::to_value(&self.config)?;
        deep_merge(&mut merged, overlay);
        self.config = serde_json::from_value(merged)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let vars: BTreeMap<String, String> = env::vars()
            .filter(|(key, _)| key.starts_with(prefix))
            .collect();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(rest) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            return Ok(());
        };
        let parts: Vec<&str> = rest.split("__").collect();

        match parts.as_slice() {
            ["DISPATCH", "SERVICE_NAME"] => {
                self.config.dispatch.service_name = value.to_string();
            }
            ["DISPATCH", "MODE"] => {
                self.config.dispatch.mode = value.parse::<RuntimeMode>().map_err(|_| {
                    ConfigError::env_parse_error(key, "expected 'server', 'cli' or 'browser'")
                })?;
            }
            ["DISPATCH", "DEFAULT_LAYOUT"] => {
                self.config.dispatch.default_layout =
                    (!value.is_empty()).then(|| value.to_string());
            }
            ["DISPATCH", "TIMEOUT_MS"] => {
                self.config.dispatch.timeout_ms = if value.is_empty() || value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(value.parse().map_err(|_| {
                        ConfigError::env_parse_error(key, "expected integer or 'none'")
                    })?)
                };
            }
            ["DISPATCH", "TRUST_REQUEST_ID"] => {
                self.config.dispatch.trust_request_id = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            ["LOGGING", "ENABLED"] => {
                self.config.logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_ascii_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "SPAN_EVENTS"] => {
                self.config.logging.span_events = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            ["METRICS", "ENABLED"] => {
                self.config.metrics.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            ["APP", path @ ..] if !path.is_empty() && path.iter().all(|p| !p.is_empty()) => {
                let path: Vec<String> = path.iter().map(|p| p.to_ascii_lowercase()).collect();
                set_app_value(&mut self.config.app, &path, parse_scalar(value));
            }

            // Unknown keys are ignored.
            _ => {}
        }

        Ok(())
    }
}

fn set_app_value(app: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = app;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(serde_json::Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.clone(), value);
    }
}

fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Interprets an environment value as a boolean, number or string.
fn parse_scalar(s: &str) -> Value {
    if let Some(b) = parse_bool_strict(s) {
        return Value::Bool(b);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    Value::String(s.to_string())
}

fn parse_bool_strict(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, SwitchyardConfig::default());
    }

    #[test]
    fn test_loader_presets() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Pretty);

        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_with_string_json() {
        let config = ConfigLoader::new()
            .with_string(r#"{"dispatch": {"mode": "browser"}}"#, "json")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.dispatch.mode, RuntimeMode::Browser);
    }

    #[test]
    fn test_with_string_unsupported_format() {
        let result = ConfigLoader::new().with_string("mode: cli", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(f)) if f == "yaml"));
    }

    #[test]
    fn test_sources_merge_instead_of_replace() {
        let loader = ConfigLoader::new()
            .with_development()
            .with_string("[dispatch]\nservice_name = \"bookshelf\"\n[app]\nlocale = \"en\"", "toml")
            .unwrap()
            .with_string(r#"{"dispatch": {"timeout_ms": 1500}, "app": {"theme": "dark"}}"#, "json")
            .unwrap();
        assert_eq!(loader.sources(), ["<toml string>", "<json string>"]);

        let config = loader.load().unwrap();
        assert_eq!(config.dispatch.service_name, "bookshelf");
        assert_eq!(config.dispatch.timeout_ms, Some(1500));
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.app, json!({"locale": "en", "theme": "dark"}));
    }

    #[test]
    fn test_unknown_field_in_source_rejected() {
        let result = ConfigLoader::new().with_string("[dispatch]\nworkers = 4", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[dispatch]\nmode = \"cli\"\ndefault_layout = \"app\"").unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.dispatch.mode, RuntimeMode::Cli);
        assert_eq!(config.dispatch.default_layout.as_deref(), Some("app"));
    }

    #[test]
    fn test_with_file_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result = ConfigLoader::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/switchyard.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_with_optional_file_missing() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/switchyard.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.dispatch.service_name, "switchyard");
    }

    #[test]
    fn test_load_validates() {
        let result = ConfigLoader::new()
            .with_string("[dispatch]\ntimeout_ms = 0", "toml")
            .unwrap()
            .load();
        assert!(result.is_err());

        let config = ConfigLoader::new()
            .with_string("[dispatch]\ntimeout_ms = 0", "toml")
            .unwrap()
            .load_unvalidated();
        assert_eq!(config.dispatch.timeout_ms, Some(0));
    }

    #[test]
    fn test_parse_bool() {
        for yes in ["true", "True", "1", "yes", "on"] {
            assert_eq!(parse_bool(yes), Some(true), "{yes}");
        }
        for no in ["false", "FALSE", "0", "no", "off"] {
            assert_eq!(parse_bool(no), Some(false), "{no}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_scalar("true"), json!(true));
        assert_eq!(parse_scalar("42"), json!(42));
        assert_eq!(parse_scalar("0.5"), json!(0.5));
        assert_eq!(parse_scalar("https://books.example"), json!("https://books.example"));
        assert_eq!(parse_scalar("1"), json!(1));
    }

    // Environment overrides are exercised through apply_env_var so tests do
    // not race on the process environment.

    #[test]
    fn test_env_dispatch_section() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("T__DISPATCH__SERVICE_NAME", "bookshelf", "T").unwrap();
        loader.apply_env_var("T__DISPATCH__MODE", "CLI", "T").unwrap();
        loader.apply_env_var("T__DISPATCH__TIMEOUT_MS", "2500", "T").unwrap();
        loader.apply_env_var("T__DISPATCH__TRUST_REQUEST_ID", "yes", "T").unwrap();
        loader.apply_env_var("T__DISPATCH__DEFAULT_LAYOUT", "app", "T").unwrap();

        let dispatch = &loader.config.dispatch;
        assert_eq!(dispatch.service_name, "bookshelf");
        assert_eq!(dispatch.mode, RuntimeMode::Cli);
        assert_eq!(dispatch.timeout_ms, Some(2500));
        assert!(dispatch.trust_request_id);
        assert_eq!(dispatch.default_layout.as_deref(), Some("app"));

        loader.apply_env_var("T__DISPATCH__TIMEOUT_MS", "none", "T").unwrap();
        assert_eq!(loader.config.dispatch.timeout_ms, None);
    }

    #[test]
    fn test_env_invalid_values() {
        let mut loader = ConfigLoader::new();
        assert!(loader.apply_env_var("T__DISPATCH__MODE", "daemon", "T").is_err());
        assert!(loader.apply_env_var("T__DISPATCH__TIMEOUT_MS", "soon", "T").is_err());
        assert!(loader.apply_env_var("T__LOGGING__FORMAT", "xml", "T").is_err());
        assert!(loader.apply_env_var("T__METRICS__ENABLED", "perhaps", "T").is_err());
    }

    #[test]
    fn test_env_logging_and_metrics() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("T__LOGGING__LEVEL", "switchyard=trace", "T").unwrap();
        loader.apply_env_var("T__LOGGING__FORMAT", "pretty", "T").unwrap();
        loader.apply_env_var("T__METRICS__ENABLED", "off", "T").unwrap();

        assert_eq!(loader.config.logging.level, "switchyard=trace");
        assert_eq!(loader.config.logging.format, LogFormat::Pretty);
        assert!(!loader.config.metrics.enabled);
    }

    #[test]
    fn test_env_app_values() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("T__APP__API__BASE_URL", "https://books.example", "T").unwrap();
        loader.apply_env_var("T__APP__API__PAGE_SIZE", "50", "T").unwrap();
        loader.apply_env_var("T__APP__BETA", "true", "T").unwrap();

        assert_eq!(
            loader.config.app,
            json!({"api": {"base_url": "https://books.example", "page_size": 50}, "beta": true})
        );
    }

    #[test]
    fn test_env_unknown_keys_ignored() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("T__SERVER__PORT", "80", "T").unwrap();
        loader.apply_env_var("TOTALLY_UNRELATED", "1", "T").unwrap();
        assert_eq!(loader.config, SwitchyardConfig::default());
    }
}
