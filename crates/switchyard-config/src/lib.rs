//! Typed configuration for Switchyard.
//!
//! Two pieces live here:
//!
//! - [`SwitchyardConfig`], loaded by [`ConfigLoader`] from defaults, TOML or
//!   JSON files, and `PREFIX__SECTION__KEY` environment variables. Unknown
//!   fields are rejected.
//! - [`ConfigStore`], the dotted-path value store handlers query at runtime,
//!   with explicit > implicit > live precedence.
//!
//! # Configuration File Format
//!
//! ```toml
//! [dispatch]
//! service_name = "bookshelf"
//! mode = "server"          # server | cli | browser
//! default_layout = "app"
//! timeout_ms = 5000
//! trust_request_id = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//!
//! [app.api]
//! base_url = "https://books.example"
//! ```
//!
//! # Example
//!
//! ```no_run
//! use switchyard_config::ConfigLoader;
//!
//! # fn main() -> Result<(), switchyard_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("switchyard.toml")?
//!     .with_env_prefix("SWITCHYARD")
//!     .load()?;
//! let store = config.to_store()?;
//! let base_url: Option<String> = store.get_as("api.base_url")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;
mod store;

pub use config::{SwitchyardConfig, SwitchyardConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{DispatchConfig, MetricsSection, RuntimeMode};
pub use store::{ConfigStore, Layer};
