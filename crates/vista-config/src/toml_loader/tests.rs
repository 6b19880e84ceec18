//! Tests for TOML config loading, creation, and path resolution.

use super::template::default_config_toml;
use super::*;
use crate::schema::VistaConfig;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_vista_config.toml"));
    assert!(matches!(
        result.unwrap_err(),
        vista_common::ConfigError::FileNotFound(_)
    ));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[web]
custom_user_agent = "Vista/Test"

[web.desktop]
off_screen_rendering = true

[engine]
script_timeout_ms = 500
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.web.custom_user_agent.as_deref(), Some("Vista/Test"));
    assert!(config.web.desktop.off_screen_rendering);
    assert_eq!(config.engine.script_timeout_ms, 500);
    // Defaults preserved
    assert!(config.web.desktop.transparent);
    assert_eq!(config.engine.dispose_timeout_ms, 2_000);
    assert_eq!(config.assets.dir, "assets");
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, vista_common::ConfigError::ParseError(_)));
}

#[test]
fn load_config_with_invalid_values_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[web]
zoom_level = 40.0
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config, VistaConfig::default());
}

#[test]
fn create_default_config_writes_parseable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("vista").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config, VistaConfig::default());
}

#[test]
fn template_parses_to_defaults() {
    let config: VistaConfig = toml::from_str(&default_config_toml()).unwrap();
    assert_eq!(config, VistaConfig::default());
}

#[test]
fn default_config_path_ends_with_vista_config() {
    if let Ok(path) = default_config_path() {
        assert!(path.ends_with("vista/config.toml"));
    }
}
