//! One mounted web view.
//!
//! [`WebView`] owns the state, navigator, coordinator, and inbox of a
//! single host mount. The host drives it from its event loop: mutate
//! content or settings, then call [`WebView::sync`]; call
//! [`WebView::pump`] whenever the inbox waker fires.

use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, info, trace};
use vista_common::EngineError;
use vista_config::{EngineConfig, WebSettings};

use crate::adapter;
use crate::content::{AssetDirectory, AssetLoader, WebContent};
use crate::engine::EngineRuntime;
use crate::events::{Envelope, Inbox, InboxMessage};
use crate::ipc::{js_dispatch_message, JsBridge, IPC_INIT_SCRIPT};
use crate::lifecycle::{LifecycleCoordinator, SyncOutcome};
use crate::navigator::Navigator;
use crate::state::WebViewState;

type Hook = Box<dyn FnOnce()>;

/// Configures a [`WebView`] before mounting it.
pub struct MountBuilder {
    runtime: Rc<EngineRuntime>,
    state: WebViewState,
    navigator: Navigator,
    assets: Option<Rc<dyn AssetLoader>>,
    engine_config: EngineConfig,
    inbox: Inbox,
    bridge: JsBridge,
    init_scripts: Vec<String>,
    on_created: Option<Hook>,
    on_dispose: Option<Hook>,
}

impl MountBuilder {
    pub fn state(mut self, state: WebViewState) -> Self {
        self.state = state;
        self
    }

    /// Use a navigator the host already issued commands on.
    pub fn navigator(mut self, navigator: Navigator) -> Self {
        self.navigator = navigator;
        self
    }

    /// Where `WebContent::File` names are looked up. Defaults to the
    /// `assets` directory.
    pub fn assets(mut self, assets: Rc<dyn AssetLoader>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    /// Called after every inbox push, from the pushing thread.
    pub fn waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.inbox = Inbox::with_waker(waker);
        self
    }

    pub fn bridge(mut self, bridge: JsBridge) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn init_script(mut self, script: impl Into<String>) -> Self {
        self.init_scripts.push(script.into());
        self
    }

    /// Runs once, when the first engine instance attaches.
    pub fn on_created(mut self, hook: impl FnOnce() + 'static) -> Self {
        self.on_created = Some(Box::new(hook));
        self
    }

    /// Runs once, at unmount.
    pub fn on_dispose(mut self, hook: impl FnOnce() + 'static) -> Self {
        self.on_dispose = Some(Box::new(hook));
        self
    }

    /// Mount and run the first sync.
    pub fn mount(self) -> WebView {
        let assets = self
            .assets
            .unwrap_or_else(|| Rc::new(AssetDirectory::new("assets")));
        let mut init_scripts = vec![IPC_INIT_SCRIPT.to_string()];
        init_scripts.extend(self.init_scripts);
        let coordinator = LifecycleCoordinator::new(
            self.runtime,
            assets,
            self.inbox.clone(),
            &self.engine_config,
        )
        .with_init_scripts(init_scripts);

        let mut view = WebView {
            state: self.state,
            navigator: self.navigator,
            coordinator,
            inbox: self.inbox,
            bridge: self.bridge,
            on_created: self.on_created,
            on_dispose: self.on_dispose,
            mounted: true,
        };
        debug!(content = ?view.state.content(), "web view mounted");
        view.sync();
        view
    }
}

pub struct WebView {
    state: WebViewState,
    navigator: Navigator,
    coordinator: LifecycleCoordinator,
    inbox: Inbox,
    bridge: JsBridge,
    on_created: Option<Hook>,
    on_dispose: Option<Hook>,
    mounted: bool,
}

impl WebView {
    pub fn builder(runtime: Rc<EngineRuntime>) -> MountBuilder {
        MountBuilder {
            runtime,
            state: WebViewState::default(),
            navigator: Navigator::new(),
            assets: None,
            engine_config: EngineConfig::default(),
            inbox: Inbox::new(),
            bridge: JsBridge::new(),
            init_scripts: Vec::new(),
            on_created: None,
            on_dispose: None,
        }
    }

    /// Mount with defaults.
    pub fn mount(runtime: Rc<EngineRuntime>, state: WebViewState) -> Self {
        Self::builder(runtime).state(state).mount()
    }

    pub fn state(&self) -> &WebViewState {
        &self.state
    }

    /// Changes take effect at the next [`sync`](Self::sync).
    pub fn state_mut(&mut self) -> &mut WebViewState {
        &mut self.state
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn bridge_mut(&mut self) -> &mut JsBridge {
        &mut self.bridge
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn set_content(&mut self, content: WebContent) -> SyncOutcome {
        self.state.set_content(content);
        self.sync()
    }

    pub fn update_settings(&mut self, update: impl FnOnce(&mut WebSettings)) -> SyncOutcome {
        update(self.state.settings_mut());
        self.sync()
    }

    /// Reconcile the engine with the current state.
    pub fn sync(&mut self) -> SyncOutcome {
        if !self.mounted {
            return SyncOutcome::Unchanged;
        }
        let outcome = self.coordinator.sync(&mut self.state, &self.navigator);
        if outcome == SyncOutcome::Rebuilt {
            if let Some(hook) = self.on_created.take() {
                hook();
            }
        }
        outcome
    }

    /// Apply everything the engine posted since the last pump, then expire
    /// overdue script callbacks. Returns how many updates changed the state.
    pub fn pump(&mut self) -> usize {
        let current = self.state.binding();
        let binding = self.coordinator.binding();
        let mut changed = 0;

        for Envelope { binding: from, message } in self.inbox.drain() {
            if Some(from) != current {
                trace!(binding = %from, "message from detached binding dropped");
                continue;
            }
            match message {
                InboxMessage::State(update) => {
                    if adapter::apply(&mut self.state, update) {
                        changed += 1;
                    }
                }
                InboxMessage::ScriptResult { request, result } => {
                    if let Some(binding) = &binding {
                        binding.complete_script(request, result);
                    }
                }
                InboxMessage::Ipc(body) => {
                    self.bridge.dispatch(&body);
                }
                InboxMessage::PopupBlocked(url) => {
                    info!(binding = %from, url = %url, "popup window blocked");
                }
            }
        }

        if let Some(binding) = &binding {
            binding.expire_scripts(Instant::now());
        }
        changed
    }

    /// Send a message to page script's `window.vista.ipc.on(kind, ...)`
    /// handler.
    pub fn post_message(&self, kind: &str, payload: &serde_json::Value) {
        self.navigator
            .evaluate_script(js_dispatch_message(kind, payload), None);
    }

    pub fn resize(&self, width: u32, height: u32) -> Result<(), EngineError> {
        match self.coordinator.binding() {
            Some(binding) => binding.handle().resize(width, height),
            None => Ok(()),
        }
    }

    /// Dispose the engine instance and run the dispose hook. Later calls do
    /// nothing.
    pub fn unmount(&mut self) {
        if !std::mem::replace(&mut self.mounted, false) {
            return;
        }
        self.coordinator.teardown(&mut self.state, &self.navigator);
        self.navigator.close();
        let dropped = self.inbox.drain().len();
        if let Some(hook) = self.on_dispose.take() {
            hook();
        }
        info!(dropped, "web view unmounted");
    }
}

impl Drop for WebView {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for WebView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebView")
            .field("state", &self.state.snapshot())
            .field("navigator", &self.navigator)
            .field("mounted", &self.mounted)
            .finish()
    }
}

#[cfg(test)]
mod tests;
