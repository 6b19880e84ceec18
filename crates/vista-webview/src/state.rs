//! Observable web view state.
//!
//! The host owns a [`WebViewState`] and may replace its content and edit its
//! settings. Page-derived fields (loading state, title, current URL, errors,
//! binding) are written only by this crate, from engine callbacks that were
//! marshaled onto the host thread.

use tokio::sync::watch;
use vista_config::WebSettings;

use crate::content::WebContent;
use crate::events::BindingId;

/// Why a web view ended up in [`LoadingState::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No engine instance could be created.
    EngineUnavailable,
    /// `WebContent::File` could not be read.
    AssetUnavailable,
    /// The engine reported a failed load.
    Load { code: i32, url: String },
}

/// Page loading progress.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadingState {
    #[default]
    Initializing,
    /// Progress in `0.0..=1.0`.
    Loading(f32),
    Finished,
    Error { kind: ErrorKind, message: String },
}

impl LoadingState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadingState::Loading(_))
    }

    pub fn progress(&self) -> Option<f32> {
        match self {
            LoadingState::Loading(p) => Some(*p),
            LoadingState::Finished => Some(1.0),
            _ => None,
        }
    }
}

/// One load error reported during the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub code: i32,
    pub description: String,
    pub url: String,
}

/// Read-only view of page state, published after every change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageSnapshot {
    pub loading: LoadingState,
    pub title: Option<String>,
    pub current_url: Option<String>,
    pub attached: bool,
    pub revision: u64,
}

/// Desired content and settings plus engine-reported page state.
#[derive(Debug)]
pub struct WebViewState {
    content: WebContent,
    content_revision: u64,
    settings: WebSettings,
    loading: LoadingState,
    title: Option<String>,
    current_url: Option<String>,
    errors: Vec<LoadError>,
    binding: Option<BindingId>,
    revision: u64,
    snapshots: watch::Sender<PageSnapshot>,
}

impl WebViewState {
    pub fn new(content: WebContent) -> Self {
        Self::with_settings(content, WebSettings::default())
    }

    pub fn with_settings(content: WebContent, settings: WebSettings) -> Self {
        let (snapshots, _) = watch::channel(PageSnapshot::default());
        Self {
            content,
            content_revision: 0,
            settings,
            loading: LoadingState::Initializing,
            title: None,
            current_url: None,
            errors: Vec::new(),
            binding: None,
            revision: 0,
            snapshots,
        }
    }

    pub fn content(&self) -> &WebContent {
        &self.content
    }

    /// Replace the desired content. Setting an equal value is a no-op.
    pub fn set_content(&mut self, content: WebContent) {
        if self.content == content {
            return;
        }
        self.content = content;
        self.content_revision += 1;
        self.touch();
    }

    pub(crate) fn content_revision(&self) -> u64 {
        self.content_revision
    }

    pub fn settings(&self) -> &WebSettings {
        &self.settings
    }

    /// Settings take effect at the next `sync`.
    pub fn settings_mut(&mut self) -> &mut WebSettings {
        &mut self.settings
    }

    pub fn loading_state(&self) -> &LoadingState {
        &self.loading
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Load errors of the current request, oldest first.
    pub fn errors(&self) -> &[LoadError] {
        &self.errors
    }

    /// The active engine binding, if an instance is live and attached.
    pub fn binding(&self) -> Option<BindingId> {
        self.binding
    }

    pub fn is_attached(&self) -> bool {
        self.binding.is_some()
    }

    /// Incremented on every observable change; identical updates leave it
    /// unchanged.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            loading: self.loading.clone(),
            title: self.title.clone(),
            current_url: self.current_url.clone(),
            attached: self.binding.is_some(),
            revision: self.revision,
        }
    }

    /// Receive snapshots from any thread.
    pub fn subscribe(&self) -> watch::Receiver<PageSnapshot> {
        self.snapshots.subscribe()
    }

    // -- engine-derived updates ------------------------------------------

    pub(crate) fn attach(&mut self, binding: BindingId) -> bool {
        self.binding = Some(binding);
        self.loading = LoadingState::Initializing;
        self.title = None;
        self.current_url = None;
        self.errors.clear();
        self.touch();
        true
    }

    pub(crate) fn detach(&mut self) -> bool {
        if self.binding.take().is_none() {
            return false;
        }
        self.touch();
        true
    }

    pub(crate) fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) -> bool {
        let next = LoadingState::Error {
            kind,
            message: message.into(),
        };
        if self.loading == next {
            return false;
        }
        self.loading = next;
        self.touch();
        true
    }

    pub(crate) fn begin_load(&mut self, url: &str) -> bool {
        let next_url = non_empty(url).or_else(|| self.current_url.clone());
        if self.loading == LoadingState::Loading(0.0)
            && self.current_url == next_url
            && self.errors.is_empty()
        {
            return false;
        }
        self.loading = LoadingState::Loading(0.0);
        self.current_url = next_url;
        self.errors.clear();
        self.touch();
        true
    }

    /// Progress only moves forward within a request and never reopens a
    /// finished or failed one.
    pub(crate) fn set_progress(&mut self, progress: f32) -> bool {
        if progress.is_nan() {
            return false;
        }
        let progress = progress.clamp(0.0, 1.0);
        let next = match self.loading {
            LoadingState::Initializing => progress,
            LoadingState::Loading(current) if progress > current => progress,
            _ => return false,
        };
        self.loading = LoadingState::Loading(next);
        self.touch();
        true
    }

    /// An empty `title` keeps the current one. A request that already
    /// failed stays in its error state.
    pub(crate) fn finish_load(&mut self, url: &str, title: &str) -> bool {
        let next_loading = match &self.loading {
            LoadingState::Error { .. } => self.loading.clone(),
            _ => LoadingState::Finished,
        };
        let next_url = non_empty(url).or_else(|| self.current_url.clone());
        let next_title = non_empty(title).or_else(|| self.title.clone());
        if self.loading == next_loading && self.current_url == next_url && self.title == next_title
        {
            return false;
        }
        self.loading = next_loading;
        self.current_url = next_url;
        self.title = next_title;
        self.touch();
        true
    }

    pub(crate) fn record_load_error(&mut self, error: LoadError) -> bool {
        if self.errors.contains(&error) {
            return false;
        }
        self.loading = LoadingState::Error {
            kind: ErrorKind::Load {
                code: error.code,
                url: error.url.clone(),
            },
            message: error.description.clone(),
        };
        self.errors.push(error);
        self.touch();
        true
    }

    pub(crate) fn set_title(&mut self, title: &str) -> bool {
        if self.title.as_deref() == Some(title) {
            return false;
        }
        self.title = Some(title.to_string());
        self.touch();
        true
    }

    pub(crate) fn set_current_url(&mut self, url: &str) -> bool {
        if url.is_empty() || self.current_url.as_deref() == Some(url) {
            return false;
        }
        self.current_url = Some(url.to_string());
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.snapshots.send_replace(self.snapshot());
    }
}

impl Default for WebViewState {
    fn default() -> Self {
        Self::new(WebContent::Empty)
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
