//! Full configuration validation.
//!
//! Each domain has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod engine;
mod helpers;
mod web;

#[cfg(test)]
mod tests;

use crate::schema::VistaConfig;
use vista_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &VistaConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    web::validate_web(&mut errors, config);
    engine::validate_engine(&mut errors, config);
    engine::validate_assets(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
