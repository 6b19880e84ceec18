//! Web view settings.

use serde::{Deserialize, Serialize};

/// Desktop engine options.
///
/// `off_screen_rendering` and `transparent` are read when an engine
/// instance is built; changing either requires a new instance.
/// `disable_popup_windows` is applied to the live instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopWebSettings {
    pub off_screen_rendering: bool,
    pub transparent: bool,
    pub disable_popup_windows: bool,
}

impl Default for DesktopWebSettings {
    fn default() -> Self {
        Self {
            off_screen_rendering: false,
            transparent: true,
            disable_popup_windows: false,
        }
    }
}

/// Settings of a single web view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    pub javascript_enabled: bool,
    pub custom_user_agent: Option<String>,
    pub devtools: bool,
    /// Page zoom factor, applied live.
    pub zoom_level: f64,
    pub desktop: DesktopWebSettings,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            javascript_enabled: true,
            custom_user_agent: None,
            devtools: cfg!(debug_assertions),
            zoom_level: 1.0,
            desktop: DesktopWebSettings::default(),
        }
    }
}
