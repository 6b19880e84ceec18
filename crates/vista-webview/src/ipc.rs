//! JS bridge between page script and the host.
//!
//! Messages flow in both directions:
//! - **JS -> host**: page script calls `window.vista.ipc.send(kind, payload)`,
//!   which posts `{"kind": ..., "payload": ...}` through the engine's IPC
//!   channel. The body arrives in the inbox and is dispatched to the
//!   handler registered for `kind` in [`JsBridge`].
//! - **host -> JS**: `WebView::post_message` evaluates
//!   [`js_dispatch_message`] in the page.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A typed IPC message from JavaScript to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcMessage {
    /// The message type / command name.
    pub kind: String,
    /// The message payload (arbitrary JSON).
    #[serde(default)]
    pub payload: IpcPayload,
}

/// Payload of an IPC message: a simple string or structured JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IpcPayload {
    Text(String),
    Json(serde_json::Value),
    #[default]
    None,
}

impl IpcMessage {
    /// Parse an IPC message from a raw JSON string.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn text(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: IpcPayload::Text(text.into()),
        }
    }

    pub fn json(kind: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload: IpcPayload::Json(value),
        }
    }
}

/// Sets up `window.vista.ipc` in page script. Injected into every fresh
/// engine instance.
pub const IPC_INIT_SCRIPT: &str = r#"
(function() {
    window.vista = window.vista || {};
    window.vista.ipc = {
        send: function(kind, payload) {
            window.ipc.postMessage(JSON.stringify({
                kind: kind,
                payload: payload === undefined ? null : payload
            }));
        },
        _handlers: {},
        on: function(kind, callback) {
            this._handlers[kind] = callback;
        },
        _dispatch: function(kind, payload) {
            var handler = this._handlers[kind];
            if (handler) {
                handler(payload);
            }
        }
    };
})();
"#;

/// Generate a JS snippet that dispatches a message to the page's handler.
pub fn js_dispatch_message(kind: &str, payload: &serde_json::Value) -> String {
    let payload_json = serde_json::to_string(payload).unwrap_or_else(|_| "null".to_string());
    format!(
        "window.vista.ipc._dispatch({}, {});",
        serde_json::to_string(kind).unwrap_or_else(|_| "\"unknown\"".to_string()),
        payload_json,
    )
}

type Handler = Box<dyn FnMut(&IpcPayload)>;

/// Named-message handlers for page IPC. Lives on the host thread.
#[derive(Default)]
pub struct JsBridge {
    handlers: HashMap<String, Handler>,
}

impl JsBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `kind`. Returns `true` if it replaced one.
    pub fn register(&mut self, kind: impl Into<String>, handler: impl FnMut(&IpcPayload) + 'static) -> bool {
        self.handlers
            .insert(kind.into(), Box::new(handler))
            .is_some()
    }

    pub fn unregister(&mut self, kind: &str) -> bool {
        self.handlers.remove(kind).is_some()
    }

    pub fn has_handler(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Parse a raw IPC body and run its handler. Returns `true` if a
    /// handler ran.
    pub fn dispatch(&mut self, raw: &str) -> bool {
        let Some(msg) = IpcMessage::from_json(raw) else {
            warn!(body_len = raw.len(), "IPC message rejected: invalid JSON");
            return false;
        };
        match self.handlers.get_mut(&msg.kind) {
            Some(handler) => {
                debug!(kind = %msg.kind, "IPC message dispatched");
                handler(&msg.payload);
                true
            }
            None => {
                debug!(kind = %msg.kind, "IPC message without handler");
                false
            }
        }
    }
}

impl fmt::Debug for JsBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("JsBridge").field("kinds", &kinds).finish()
    }
}
