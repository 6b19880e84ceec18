use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use vista_common::EngineError;
use vista_config::WebSettings;

use crate::adapter::CallbackAdapter;
use crate::content::BLANK_URL;
use crate::engine::{EngineHandle, PopupHandler, ScriptReply};
use crate::events::{BindingId, Inbox, InboxMessage};
use crate::navigator::{NavigationCommand, ScriptCallback};

struct PendingScript {
    callback: ScriptCallback,
    deadline: Instant,
}

/// One live engine instance with its adapter and command scope.
///
/// Created once per instance by the lifecycle coordinator, disposed once,
/// never reused. Script callbacks registered here are cancelled when the
/// binding is disposed.
pub struct EngineBinding {
    id: BindingId,
    handle: EngineHandle,
    adapter: Arc<CallbackAdapter>,
    inbox: Inbox,
    pending: RefCell<BTreeMap<u64, PendingScript>>,
    next_request: Cell<u64>,
    script_timeout: Duration,
    popup_gate: Cell<bool>,
    zoom: Cell<f64>,
}

impl EngineBinding {
    pub(crate) fn new(
        handle: EngineHandle,
        adapter: Arc<CallbackAdapter>,
        inbox: Inbox,
        script_timeout: Duration,
    ) -> Self {
        let popup_gate = Cell::new(handle.has_popup_handler());
        Self {
            id: adapter.binding(),
            handle,
            adapter,
            inbox,
            pending: RefCell::new(BTreeMap::new()),
            next_request: Cell::new(1),
            script_timeout,
            popup_gate,
            zoom: Cell::new(1.0),
        }
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn handle(&self) -> &EngineHandle {
        &self.handle
    }

    pub fn pending_scripts(&self) -> usize {
        self.pending.borrow().len()
    }

    pub(crate) fn execute(&self, command: NavigationCommand) -> Result<(), EngineError> {
        match command {
            NavigationCommand::Back => self.handle.go_back(),
            NavigationCommand::Forward => self.handle.go_forward(),
            NavigationCommand::Reload => self.handle.reload(),
            NavigationCommand::Stop => self.handle.stop(),
            NavigationCommand::LoadUrl { url, headers } => self.handle.load_url(&url, &headers),
            NavigationCommand::LoadHtml { html, base_url } => self
                .handle
                .load_html(&html, base_url.as_deref().unwrap_or(BLANK_URL)),
            NavigationCommand::EvaluateScript { code, on_result } => {
                self.evaluate_script(&code, on_result)
            }
        }
    }

    /// The result reaches `on_result` through the inbox, on the host thread.
    /// If the engine refuses the script outright the callback gets the error
    /// immediately, unless the instance is already disposed, in which case
    /// the callback is dropped like any other cancelled one.
    fn evaluate_script(
        &self,
        code: &str,
        on_result: Option<ScriptCallback>,
    ) -> Result<(), EngineError> {
        let Some(callback) = on_result else {
            return self.handle.evaluate_script(code, Box::new(|_| {}));
        };

        let request = self.next_request.get();
        self.next_request.set(request + 1);
        self.pending.borrow_mut().insert(
            request,
            PendingScript {
                callback,
                deadline: Instant::now() + self.script_timeout,
            },
        );

        let inbox = self.inbox.clone();
        let binding = self.id;
        let reply: ScriptReply = Box::new(move |result| {
            inbox.push(binding, InboxMessage::ScriptResult { request, result });
        });

        if let Err(e) = self.handle.evaluate_script(code, reply) {
            let pending = self.pending.borrow_mut().remove(&request);
            if let Some(pending) = pending {
                if e != EngineError::InstanceDisposed {
                    (pending.callback)(Err(e.clone()));
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Deliver a script result. Returns `false` for unknown, expired, or
    /// cancelled requests.
    pub(crate) fn complete_script(&self, request: u64, result: Result<String, String>) -> bool {
        let pending = self.pending.borrow_mut().remove(&request);
        match pending {
            Some(pending) => {
                (pending.callback)(result.map_err(EngineError::ScriptEvaluation));
                true
            }
            None => {
                debug!(binding = %self.id, request, "late script result dropped");
                false
            }
        }
    }

    /// Fail every script callback whose deadline has passed.
    pub(crate) fn expire_scripts(&self, now: Instant) -> usize {
        let expired: Vec<PendingScript> = {
            let mut pending = self.pending.borrow_mut();
            let due: Vec<u64> = pending
                .iter()
                .filter(|(_, p)| p.deadline <= now)
                .map(|(request, _)| *request)
                .collect();
            due.iter().filter_map(|r| pending.remove(r)).collect()
        };

        let count = expired.len();
        for pending in expired {
            (pending.callback)(Err(EngineError::ScriptEvaluation(format!(
                "timed out after {}ms",
                self.script_timeout.as_millis()
            ))));
        }
        if count > 0 {
            warn!(binding = %self.id, count, "script callbacks timed out");
        }
        count
    }

    /// Apply settings that do not need a new instance.
    pub(crate) fn apply_live_settings(&self, settings: &WebSettings) {
        let disabled = settings.desktop.disable_popup_windows;
        self.adapter.set_popups_disabled(disabled);
        if disabled != self.popup_gate.get() {
            let result = if disabled {
                let gate: Arc<dyn PopupHandler> = self.adapter.clone();
                self.handle.set_popup_handler(gate)
            } else {
                self.handle.clear_popup_handler().map(|_| ())
            };
            match result {
                Ok(()) => self.popup_gate.set(disabled),
                Err(e) => warn!(binding = %self.id, error = %e, "failed to update popup policy"),
            }
        }

        if self.zoom.get() != settings.zoom_level {
            match self.handle.set_zoom(settings.zoom_level) {
                Ok(()) => self.zoom.set(settings.zoom_level),
                Err(e) => warn!(binding = %self.id, error = %e, "failed to set zoom"),
            }
        }
    }

    /// Release the instance and cancel pending script callbacks.
    pub(crate) fn dispose(&self, timeout: Duration) -> bool {
        let released = self.handle.dispose(timeout);
        let cancelled = std::mem::take(&mut *self.pending.borrow_mut());
        if !cancelled.is_empty() {
            debug!(binding = %self.id, count = cancelled.len(), "script callbacks cancelled");
        }
        released
    }
}

impl std::fmt::Debug for EngineBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBinding")
            .field("id", &self.id)
            .field("disposed", &self.handle.is_disposed())
            .field("pending_scripts", &self.pending_scripts())
            .finish()
    }
}
