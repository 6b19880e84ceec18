//! Platform-neutral web view core.
//!
//! Puts an embeddable browser engine behind an observable state model:
//! - `WebViewState` holds desired content, settings, and engine-reported page state
//! - `Navigator` issues commands, buffering them until an engine instance exists
//! - `CallbackAdapter` marshals engine callbacks through a per-view inbox
//! - `LifecycleCoordinator` creates, reconfigures, and disposes engine instances
//! - `WebView` ties them together for one host mount
//!
//! Engines plug in through the traits in [`engine`]. The `wry` feature
//! provides a backend over the system web view.

pub mod adapter;
pub mod content;
pub mod engine;
pub mod events;
pub mod ipc;
pub mod lifecycle;
pub mod navigator;
pub mod state;
pub mod webview;

#[cfg(feature = "wry")]
pub mod backend;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::CallbackAdapter;
pub use content::{load_file_html, AssetDirectory, AssetLoader, Headers, WebContent, BLANK_URL};
pub use engine::{
    EngineBackend, EngineCallbacks, EngineHandle, EngineInstance, EngineRuntime, InstanceOptions,
    InstanceSource, InstanceSpec, PopupDecision, PopupHandler, ReleaseAck, RenderMode,
    RuntimeStatus, ScriptReply,
};
pub use events::{BindingId, Envelope, Inbox, InboxMessage, StateUpdate};
pub use ipc::{IpcMessage, IpcPayload, JsBridge};
pub use lifecycle::{EngineBinding, LifecycleCoordinator, SyncOutcome};
pub use navigator::{NavigationCommand, NavigationQueue, Navigator, ScriptCallback};
pub use state::{ErrorKind, LoadError, LoadingState, PageSnapshot, WebViewState};
pub use webview::{MountBuilder, WebView};
