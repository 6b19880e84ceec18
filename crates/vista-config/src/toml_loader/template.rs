//! Commented default config file.

pub(super) fn default_config_toml() -> String {
    r##"# Vista Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[web]
# javascript_enabled = true
# custom_user_agent = "Vista/0.1"
# devtools = false
# zoom_level = 1.0          # 0.25-5.0, applied live

[web.desktop]
# off_screen_rendering = false   # rebuilds the engine instance when changed
# transparent = true             # rebuilds the engine instance when changed
# disable_popup_windows = false  # applied live

[engine]
# dispose_timeout_ms = 2000      # 1-60000
# script_timeout_ms = 10000      # 1-600000

[assets]
# dir = "assets"

[logging]
# level = "info"            # trace, debug, info, warn, error
"##
    .to_string()
}
