//! Engine instance lifecycle.
//!
//! The [`LifecycleCoordinator`] watches three inputs: engine availability,
//! the construction-time settings, and the desired content. A change in the
//! first two disposes the current instance and builds a new one. A content
//! change alone navigates the live instance. At most one binding is live per
//! coordinator, and the old one is detached before the new one attaches.

use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use vista_common::AssetError;
use vista_config::EngineConfig;

use crate::adapter::CallbackAdapter;
use crate::content::{load_file_html, AssetLoader, WebContent, BLANK_URL};
use crate::engine::{
    EngineCallbacks, EngineHandle, EngineRuntime, InstanceOptions, InstanceSource, InstanceSpec,
    PopupHandler, RuntimeStatus,
};
use crate::events::{BindingId, Inbox};
use crate::navigator::Navigator;
use crate::state::{ErrorKind, WebViewState};

mod binding;

pub use binding::EngineBinding;

/// What a call to [`LifecycleCoordinator::sync`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Unchanged,
    /// The live instance was sent to new content.
    Navigated,
    /// A new instance was created and attached.
    Rebuilt,
    /// No instance could be created, or the content could not be loaded.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ConstructionKey {
    available: bool,
    options: InstanceOptions,
}

#[derive(Debug, Clone, Copy)]
struct Timeouts {
    dispose: Duration,
    script: Duration,
}

impl From<&EngineConfig> for Timeouts {
    fn from(config: &EngineConfig) -> Self {
        Self {
            dispose: Duration::from_millis(config.dispose_timeout_ms),
            script: Duration::from_millis(config.script_timeout_ms),
        }
    }
}

pub struct LifecycleCoordinator {
    runtime: Rc<EngineRuntime>,
    assets: Rc<dyn AssetLoader>,
    inbox: Inbox,
    timeouts: Timeouts,
    init_scripts: Vec<String>,
    binding: Option<Rc<EngineBinding>>,
    applied_key: Option<ConstructionKey>,
    applied_content: Option<u64>,
}

impl LifecycleCoordinator {
    pub fn new(
        runtime: Rc<EngineRuntime>,
        assets: Rc<dyn AssetLoader>,
        inbox: Inbox,
        config: &EngineConfig,
    ) -> Self {
        Self {
            runtime,
            assets,
            inbox,
            timeouts: Timeouts::from(config),
            init_scripts: Vec::new(),
            binding: None,
            applied_key: None,
            applied_content: None,
        }
    }

    /// Scripts injected into every instance this coordinator creates.
    pub fn with_init_scripts(mut self, scripts: Vec<String>) -> Self {
        self.init_scripts = scripts;
        self
    }

    /// The live binding, if any.
    pub fn binding(&self) -> Option<Rc<EngineBinding>> {
        self.binding.clone()
    }

    /// Bring the engine in line with `state`.
    ///
    /// A failed construction is not retried until the content or a
    /// construction setting changes.
    pub fn sync(&mut self, state: &mut WebViewState, navigator: &Navigator) -> SyncOutcome {
        let key = ConstructionKey {
            available: self.runtime.is_available(),
            options: InstanceOptions::from_settings(state.settings()),
        };
        let content = state.content_revision();

        if self.applied_key.as_ref() == Some(&key) {
            match &self.binding {
                Some(binding) => {
                    binding.apply_live_settings(state.settings());
                    if self.applied_content == Some(content) {
                        return SyncOutcome::Unchanged;
                    }
                    self.applied_content = Some(content);
                    return match navigate(navigator, state.content(), self.assets.as_ref()) {
                        Ok(()) => {
                            debug!(binding = %binding.id(), "content changed, navigating live instance");
                            SyncOutcome::Navigated
                        }
                        Err(e) => {
                            warn!(error = %e, "content could not be loaded");
                            state.fail(ErrorKind::AssetUnavailable, e.to_string());
                            SyncOutcome::Failed
                        }
                    };
                }
                None if self.applied_content == Some(content) => return SyncOutcome::Unchanged,
                None => {}
            }
        }

        self.rebuild(state, navigator, key)
    }

    fn rebuild(
        &mut self,
        state: &mut WebViewState,
        navigator: &Navigator,
        key: ConstructionKey,
    ) -> SyncOutcome {
        let replaced = self.teardown(state, navigator);
        self.applied_key = Some(key.clone());
        self.applied_content = Some(state.content_revision());

        if !key.available {
            let reason = match self.runtime.status() {
                RuntimeStatus::Failed(reason) => reason,
                RuntimeStatus::ShutDown => "engine runtime shut down".to_string(),
                RuntimeStatus::Ready => "engine runtime not ready".to_string(),
            };
            warn!(engine = self.runtime.name(), %reason, "no engine instance created");
            state.fail(ErrorKind::EngineUnavailable, reason);
            return SyncOutcome::Failed;
        }

        let source = match resolve_source(state.content(), self.assets.as_ref()) {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "content could not be loaded");
                state.fail(ErrorKind::AssetUnavailable, e.to_string());
                return SyncOutcome::Failed;
            }
        };

        let id = BindingId::next();
        let popups_disabled = state.settings().desktop.disable_popup_windows;
        let adapter = Arc::new(CallbackAdapter::new(id, self.inbox.clone(), popups_disabled));
        let spec = InstanceSpec {
            source,
            options: key.options,
            init_scripts: self.init_scripts.clone(),
        };
        let callbacks: Arc<dyn EngineCallbacks> = adapter.clone();
        // The gate goes in with the creation request so the first page load
        // is already covered.
        let gate = popups_disabled.then(|| adapter.clone() as Arc<dyn PopupHandler>);
        let handle = match EngineHandle::create(&self.runtime, &spec, callbacks, gate) {
            Ok(handle) => handle,
            Err(e) => {
                error!(engine = self.runtime.name(), error = %e, "engine instance creation failed");
                state.fail(ErrorKind::EngineUnavailable, e.to_string());
                return SyncOutcome::Failed;
            }
        };

        let binding = Rc::new(EngineBinding::new(
            handle,
            adapter,
            self.inbox.clone(),
            self.timeouts.script,
        ));
        binding.apply_live_settings(state.settings());
        state.attach(id);
        self.binding = Some(Rc::clone(&binding));
        info!(binding = %id, replaced, "engine instance attached");
        navigator.attach(&binding);
        SyncOutcome::Rebuilt
    }

    /// Detach and dispose the live binding, if any. The next `sync` builds a
    /// fresh instance. Returns whether a binding was disposed.
    pub fn teardown(&mut self, state: &mut WebViewState, navigator: &Navigator) -> bool {
        self.applied_key = None;
        self.applied_content = None;
        let Some(binding) = self.binding.take() else {
            return false;
        };

        navigator.detach();
        state.detach();
        if !binding.dispose(self.timeouts.dispose) {
            warn!(binding = %binding.id(), "engine instance disposed without acknowledgement");
        }
        debug!(binding = %binding.id(), "engine instance disposed");
        true
    }
}

impl Drop for LifecycleCoordinator {
    fn drop(&mut self) {
        if let Some(binding) = self.binding.take() {
            binding.dispose(self.timeouts.dispose);
        }
    }
}

impl std::fmt::Debug for LifecycleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleCoordinator")
            .field("runtime", &self.runtime)
            .field("binding", &self.binding.as_ref().map(|b| b.id()))
            .finish()
    }
}

/// The page a new instance starts on.
fn resolve_source(
    content: &WebContent,
    assets: &dyn AssetLoader,
) -> Result<InstanceSource, AssetError> {
    Ok(match content {
        WebContent::Url {
            url,
            additional_headers,
        } => InstanceSource::Url {
            url: url.clone(),
            headers: additional_headers.clone(),
        },
        WebContent::Data { data, base_url } => InstanceSource::Html {
            html: data.clone(),
            base_url: base_url.clone().unwrap_or_else(|| BLANK_URL.to_string()),
        },
        WebContent::File { file_name } => InstanceSource::Html {
            html: load_file_html(assets, file_name)?,
            base_url: BLANK_URL.to_string(),
        },
        WebContent::Empty => InstanceSource::Url {
            url: BLANK_URL.to_string(),
            headers: Default::default(),
        },
    })
}

/// Send a live instance to new content, behind any queued commands.
fn navigate(
    navigator: &Navigator,
    content: &WebContent,
    assets: &dyn AssetLoader,
) -> Result<(), AssetError> {
    match content {
        WebContent::Url {
            url,
            additional_headers,
        } => navigator.load_url(url.clone(), additional_headers.clone()),
        WebContent::Data { data, base_url } => navigator.load_html(data.clone(), base_url.clone()),
        WebContent::File { file_name } => {
            navigator.load_html(load_file_html(assets, file_name)?, None)
        }
        WebContent::Empty => navigator.load_url(BLANK_URL, Default::default()),
    }
    Ok(())
}
