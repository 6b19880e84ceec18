use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, warn};
use vista_common::EngineError;

use super::{
    EngineCallbacks, EngineInstance, EngineRuntime, InstanceSpec, PopupHandler, ReleaseAck,
    ScriptReply,
};
use crate::content::Headers;

/// Single-slot popup handler registration. Installing a handler removes
/// the previous one from the engine first, so the engine never holds two.
#[derive(Default)]
struct HandlerSlot {
    installed: bool,
}

impl HandlerSlot {
    fn set(&mut self, instance: &dyn EngineInstance, handler: Arc<dyn PopupHandler>) {
        if self.installed {
            instance.remove_popup_handler();
        }
        instance.add_popup_handler(handler);
        self.installed = true;
    }

    fn clear(&mut self, instance: &dyn EngineInstance) -> bool {
        if !std::mem::take(&mut self.installed) {
            return false;
        }
        instance.remove_popup_handler();
        true
    }
}

/// Owns one engine instance and guards it against use after disposal.
///
/// Lives on the host thread, as the instance does. Engines may acknowledge
/// a release from any thread.
pub struct EngineHandle {
    instance: Box<dyn EngineInstance>,
    popup_slot: Mutex<HandlerSlot>,
    disposed: AtomicBool,
}

impl EngineHandle {
    /// Build an instance through the runtime. May block.
    ///
    /// `popup_handler` is handed to the engine with the creation request, so
    /// it answers popups raised by the very first page load.
    pub fn create(
        runtime: &EngineRuntime,
        spec: &InstanceSpec,
        callbacks: Arc<dyn EngineCallbacks>,
        popup_handler: Option<Arc<dyn PopupHandler>>,
    ) -> Result<Self, EngineError> {
        let installed = popup_handler.is_some();
        let instance = runtime.create_instance(spec, callbacks, popup_handler)?;
        debug!(engine = runtime.name(), source = ?spec.source, installed, "engine instance created");
        let handle = Self::new(instance);
        if installed {
            handle.slot().installed = true;
        }
        Ok(handle)
    }

    pub fn new(instance: Box<dyn EngineInstance>) -> Self {
        Self {
            instance,
            popup_slot: Mutex::new(HandlerSlot::default()),
            disposed: AtomicBool::new(false),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, HandlerSlot> {
        match self.popup_slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn live(&self) -> Result<&dyn EngineInstance, EngineError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(EngineError::InstanceDisposed);
        }
        Ok(self.instance.as_ref())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn load_url(&self, url: &str, headers: &Headers) -> Result<(), EngineError> {
        self.live()?.load_url(url, headers)
    }

    pub fn load_html(&self, html: &str, base_url: &str) -> Result<(), EngineError> {
        self.live()?.load_html(html, base_url)
    }

    pub fn evaluate_script(&self, code: &str, reply: ScriptReply) -> Result<(), EngineError> {
        self.live()?.evaluate_script(code, reply)
    }

    pub fn stop(&self) -> Result<(), EngineError> {
        self.live()?.stop()
    }

    pub fn reload(&self) -> Result<(), EngineError> {
        self.live()?.reload()
    }

    pub fn go_back(&self) -> Result<(), EngineError> {
        self.live()?.go_back()
    }

    pub fn go_forward(&self) -> Result<(), EngineError> {
        self.live()?.go_forward()
    }

    pub fn can_go_back(&self) -> bool {
        self.live().map(|i| i.can_go_back()).unwrap_or(false)
    }

    pub fn can_go_forward(&self) -> bool {
        self.live().map(|i| i.can_go_forward()).unwrap_or(false)
    }

    pub fn set_zoom(&self, factor: f64) -> Result<(), EngineError> {
        self.live()?.set_zoom(factor)
    }

    pub fn resize(&self, width: u32, height: u32) -> Result<(), EngineError> {
        self.live()?.resize(width, height)
    }

    /// Install `handler` as the only popup handler.
    pub fn set_popup_handler(&self, handler: Arc<dyn PopupHandler>) -> Result<(), EngineError> {
        let instance = self.live()?;
        self.slot().set(instance, handler);
        Ok(())
    }

    pub fn clear_popup_handler(&self) -> Result<bool, EngineError> {
        let instance = self.live()?;
        Ok(self.slot().clear(instance))
    }

    pub fn has_popup_handler(&self) -> bool {
        self.slot().installed
    }

    /// Release the instance and wait up to `timeout` for the engine to
    /// acknowledge. Only the first call releases; later calls return `true`.
    /// Returns `false` if the acknowledgement did not arrive in time.
    pub fn dispose(&self, timeout: Duration) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return true;
        }

        self.slot().clear(self.instance.as_ref());

        let (ack, released) = ReleaseAck::channel();
        self.instance.release(ack);
        match released.recv_timeout(timeout) {
            Ok(()) => {
                debug!("engine instance released");
                true
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "engine release not acknowledged in time");
                false
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                error!("engine dropped release acknowledgement");
                false
            }
        }
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
