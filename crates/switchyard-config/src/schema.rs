//! Configuration section types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of process the application runs in.
///
/// Only long-lived servers consult the live layer of a
/// [`ConfigStore`](crate::ConfigStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Long-lived process serving many events.
    #[default]
    Server,
    /// Single-shot command line invocation.
    Cli,
    /// Browser-hosted client application.
    Browser,
}

impl RuntimeMode {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Cli => "cli",
            Self::Browser => "browser",
        }
    }

    /// Whether live configuration applies in this mode.
    #[must_use]
    pub const fn supports_live(self) -> bool {
        matches!(self, Self::Server)
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "cli" => Ok(Self::Cli),
            "browser" => Ok(Self::Browser),
            other => Err(format!("unknown runtime mode `{other}`")),
        }
    }
}

/// Dispatch engine settings.
///
/// # Example
///
/// ```
/// use switchyard_config::{DispatchConfig, RuntimeMode};
///
/// let config = DispatchConfig {
///     service_name: "bookshelf".to_string(),
///     mode: RuntimeMode::Cli,
///     ..Default::default()
/// };
/// assert_eq!(config.timeout_ms, None);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Service name used in logs and spans.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Runtime mode.
    #[serde(default)]
    pub mode: RuntimeMode,

    /// Layout applied to routes that do not name one.
    #[serde(default)]
    pub default_layout: Option<String>,

    /// Per-event time limit in milliseconds. `None` disables the limit.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Reuse an incoming `x-request-id` header as the event id.
    #[serde(default)]
    pub trust_request_id: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            mode: RuntimeMode::default(),
            default_layout: None,
            timeout_ms: None,
            trust_request_id: false,
        }
    }
}

fn default_service_name() -> String {
    "switchyard".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Whether dispatch metrics are recorded.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}
