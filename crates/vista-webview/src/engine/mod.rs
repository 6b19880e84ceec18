//! The engine seam.
//!
//! An [`EngineBackend`] builds [`EngineInstance`]s. The process holds one
//! [`EngineRuntime`] around the backend, and every instance is owned by an
//! [`EngineHandle`] that refuses calls after disposal.

use std::fmt;
use std::sync::mpsc;
use std::sync::Arc;

use vista_common::EngineError;
use vista_config::WebSettings;

use crate::content::Headers;

mod handle;
mod runtime;

pub use handle::EngineHandle;
pub use runtime::{EngineRuntime, RuntimeStatus};

/// How an instance presents its pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Native child window.
    Windowed,
    /// Rendered into a buffer owned by the host.
    OffScreen,
}

/// Settings fixed for the lifetime of an instance. Any change means a new
/// instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceOptions {
    pub render_mode: RenderMode,
    pub transparent: bool,
    pub javascript_enabled: bool,
    pub devtools: bool,
    pub user_agent: Option<String>,
}

impl InstanceOptions {
    pub fn from_settings(settings: &WebSettings) -> Self {
        Self {
            render_mode: if settings.desktop.off_screen_rendering {
                RenderMode::OffScreen
            } else {
                RenderMode::Windowed
            },
            transparent: settings.desktop.transparent,
            javascript_enabled: settings.javascript_enabled,
            devtools: settings.devtools,
            user_agent: settings.custom_user_agent.clone(),
        }
    }
}

/// The first page an instance shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceSource {
    Url { url: String, headers: Headers },
    Html { html: String, base_url: String },
}

/// Everything a backend needs to build an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSpec {
    pub source: InstanceSource,
    pub options: InstanceOptions,
    /// Scripts run before page script in every document.
    pub init_scripts: Vec<String>,
}

/// Answer to a popup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupDecision {
    /// Suppress the popup.
    Block,
    /// Let the engine handle it as it normally would.
    Allow,
}

/// Completion of `evaluate_script`. May be called on any thread.
pub type ScriptReply = Box<dyn FnOnce(Result<String, String>) + Send>;

/// Handed to [`EngineInstance::release`]; the engine acknowledges once the
/// instance's resources are gone.
pub struct ReleaseAck(mpsc::Sender<()>);

impl ReleaseAck {
    pub(crate) fn channel() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel();
        (Self(tx), rx)
    }

    pub fn acknowledge(self) {
        // The receiver may have timed out already.
        let _ = self.0.send(());
    }
}

impl fmt::Debug for ReleaseAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReleaseAck")
    }
}

/// Engine-originated events. Engines may call these from any thread.
pub trait EngineCallbacks: Send + Sync {
    fn on_load_start(&self, url: &str);
    fn on_load_progress(&self, progress: f32);
    fn on_load_finish(&self, url: &str, title: &str);
    fn on_load_error(&self, code: i32, description: &str, failing_url: &str);
    fn on_display_change(&self, title: &str);
    fn on_address_change(&self, url: &str);
    fn on_ipc_message(&self, body: &str);
}

/// Decides what happens to popup windows.
pub trait PopupHandler: Send + Sync {
    fn on_popup_request(&self, url: &str) -> PopupDecision;
}

/// One live browser instance, as a backend exposes it.
pub trait EngineInstance {
    fn load_url(&self, url: &str, headers: &Headers) -> Result<(), EngineError>;
    fn load_html(&self, html: &str, base_url: &str) -> Result<(), EngineError>;
    fn evaluate_script(&self, code: &str, reply: ScriptReply) -> Result<(), EngineError>;
    fn stop(&self) -> Result<(), EngineError>;
    fn reload(&self) -> Result<(), EngineError>;
    fn go_back(&self) -> Result<(), EngineError>;
    fn go_forward(&self) -> Result<(), EngineError>;
    fn can_go_back(&self) -> bool;
    fn can_go_forward(&self) -> bool;

    fn set_zoom(&self, _factor: f64) -> Result<(), EngineError> {
        Ok(())
    }

    fn resize(&self, _width: u32, _height: u32) -> Result<(), EngineError> {
        Ok(())
    }

    fn add_popup_handler(&self, handler: Arc<dyn PopupHandler>);
    fn remove_popup_handler(&self);

    /// Free the instance. Must call `ack.acknowledge()` when done, possibly
    /// from another thread.
    fn release(&self, ack: ReleaseAck);
}

/// Builds instances for one kind of engine.
pub trait EngineBackend {
    fn name(&self) -> &str;

    /// One-time engine startup, run by `EngineRuntime::init`.
    fn boot(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// May block until the instance exists. A `popup_handler` must be in
    /// place before the first page starts loading.
    fn create_instance(
        &self,
        spec: &InstanceSpec,
        callbacks: Arc<dyn EngineCallbacks>,
        popup_handler: Option<Arc<dyn PopupHandler>>,
    ) -> Result<Box<dyn EngineInstance>, EngineError>;

    fn shutdown(&self) {}
}
