//! Validation for the `[web]` section.

use crate::schema::VistaConfig;

use super::helpers::validate_range_f64;

pub(crate) fn validate_web(errors: &mut Vec<String>, config: &VistaConfig) {
    validate_range_f64(errors, "web.zoom_level", config.web.zoom_level, 0.25, 5.0);

    if let Some(agent) = &config.web.custom_user_agent {
        if agent.trim().is_empty() {
            errors.push("web.custom_user_agent must not be blank".to_string());
        }
    }
}
