//! Validation for the `[engine]` and `[assets]` sections.

use crate::schema::VistaConfig;

use super::helpers::validate_range;

pub(crate) fn validate_engine(errors: &mut Vec<String>, config: &VistaConfig) {
    validate_range(
        errors,
        "engine.dispose_timeout_ms",
        config.engine.dispose_timeout_ms,
        1,
        60_000,
    );
    validate_range(
        errors,
        "engine.script_timeout_ms",
        config.engine.script_timeout_ms,
        1,
        600_000,
    );
}

pub(crate) fn validate_assets(errors: &mut Vec<String>, config: &VistaConfig) {
    if config.assets.dir.trim().is_empty() {
        errors.push("assets.dir must not be empty".to_string());
    }
}
