//! Tests for the full validation pipeline.

use super::*;
use crate::schema::VistaConfig;

#[test]
fn default_config_validates() {
    assert!(validate(&VistaConfig::default()).is_ok());
}

#[test]
fn catches_zoom_too_small() {
    let mut config = VistaConfig::default();
    config.web.zoom_level = 0.1;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("web.zoom_level"));
}

#[test]
fn catches_nan_zoom() {
    let mut config = VistaConfig::default();
    config.web.zoom_level = f64::NAN;
    assert!(validate(&config).is_err());
}

#[test]
fn catches_blank_user_agent() {
    let mut config = VistaConfig::default();
    config.web.custom_user_agent = Some("   ".into());
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("custom_user_agent"));
}

#[test]
fn catches_zero_timeouts() {
    let mut config = VistaConfig::default();
    config.engine.dispose_timeout_ms = 0;
    config.engine.script_timeout_ms = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("engine.dispose_timeout_ms"));
    assert!(err.contains("engine.script_timeout_ms"));
}

#[test]
fn catches_empty_asset_dir() {
    let mut config = VistaConfig::default();
    config.assets.dir = String::new();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("assets.dir"));
}

#[test]
fn collects_all_errors_into_one() {
    let mut config = VistaConfig::default();
    config.web.zoom_level = 10.0;
    config.assets.dir = " ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert_eq!(err.matches("; ").count(), 1);
}
