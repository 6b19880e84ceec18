//! Engine callbacks → web view state.
//!
//! A [`CallbackAdapter`] is created per engine binding and handed to the
//! engine. Its callbacks run on whatever thread the engine chooses, so they
//! only post [`StateUpdate`]s into the view's inbox; [`apply`] later writes
//! them into [`WebViewState`] on the host thread.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use crate::engine::{EngineCallbacks, PopupDecision, PopupHandler};
use crate::events::{BindingId, Inbox, InboxMessage, StateUpdate};
use crate::state::{LoadError, WebViewState};

pub struct CallbackAdapter {
    binding: BindingId,
    inbox: Inbox,
    popups_disabled: AtomicBool,
}

impl CallbackAdapter {
    pub fn new(binding: BindingId, inbox: Inbox, popups_disabled: bool) -> Self {
        Self {
            binding,
            inbox,
            popups_disabled: AtomicBool::new(popups_disabled),
        }
    }

    pub fn binding(&self) -> BindingId {
        self.binding
    }

    pub(crate) fn set_popups_disabled(&self, disabled: bool) {
        self.popups_disabled.store(disabled, Ordering::Release);
    }

    pub fn popups_disabled(&self) -> bool {
        self.popups_disabled.load(Ordering::Acquire)
    }

    fn post(&self, update: StateUpdate) {
        self.inbox.push(self.binding, InboxMessage::State(update));
    }
}

impl EngineCallbacks for CallbackAdapter {
    fn on_load_start(&self, url: &str) {
        self.post(StateUpdate::LoadStarted { url: url.to_string() });
    }

    fn on_load_progress(&self, progress: f32) {
        self.post(StateUpdate::LoadProgress(progress));
    }

    fn on_load_finish(&self, url: &str, title: &str) {
        self.post(StateUpdate::LoadFinished {
            url: url.to_string(),
            title: title.to_string(),
        });
    }

    fn on_load_error(&self, code: i32, description: &str, failing_url: &str) {
        self.post(StateUpdate::LoadFailed {
            code,
            description: description.to_string(),
            url: failing_url.to_string(),
        });
    }

    fn on_display_change(&self, title: &str) {
        self.post(StateUpdate::TitleChanged(title.to_string()));
    }

    fn on_address_change(&self, url: &str) {
        self.post(StateUpdate::AddressChanged(url.to_string()));
    }

    fn on_ipc_message(&self, body: &str) {
        self.inbox
            .push(self.binding, InboxMessage::Ipc(body.to_string()));
    }
}

impl PopupHandler for CallbackAdapter {
    fn on_popup_request(&self, url: &str) -> PopupDecision {
        if self.popups_disabled() {
            debug!(binding = %self.binding, url = %url, "popup blocked");
            self.inbox
                .push(self.binding, InboxMessage::PopupBlocked(url.to_string()));
            PopupDecision::Block
        } else {
            PopupDecision::Allow
        }
    }
}

/// Write one engine update into `state`. Returns whether anything changed.
pub(crate) fn apply(state: &mut WebViewState, update: StateUpdate) -> bool {
    trace!(?update, "applying engine update");
    match update {
        StateUpdate::LoadStarted { url } => state.begin_load(&url),
        StateUpdate::LoadProgress(p) => state.set_progress(p),
        StateUpdate::LoadFinished { url, title } => state.finish_load(&url, &title),
        StateUpdate::LoadFailed {
            code,
            description,
            url,
        } => state.record_load_error(LoadError {
            code,
            description,
            url,
        }),
        StateUpdate::TitleChanged(title) => state.set_title(&title),
        StateUpdate::AddressChanged(url) => state.set_current_url(&url),
    }
}

impl std::fmt::Debug for CallbackAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackAdapter")
            .field("binding", &self.binding)
            .field("popups_disabled", &self.popups_disabled())
            .finish()
    }
}
