//! Vista configuration system.
//!
//! TOML-based configuration for the web view core. Every section uses
//! serde defaults, so a partial file (or no file at all) works.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vista_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    AssetsConfig, DesktopWebSettings, EngineConfig, LogLevel, LoggingConfig, VistaConfig,
    WebSettings, CONFIG_SCHEMA_VERSION,
};

use vista_common::ConfigError;

/// Load config from the platform default path and validate it.
pub fn load_config() -> Result<VistaConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &VistaConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
