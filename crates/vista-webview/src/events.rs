//! Engine-originated events and the per-view inbox that carries them.
//!
//! Engine callbacks may fire on any thread. They never touch
//! [`WebViewState`](crate::state::WebViewState) directly; instead they push
//! an [`Envelope`] into the view's [`Inbox`], and the host thread drains it
//! in `WebView::pump`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Identifies one engine binding. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

static NEXT_BINDING: AtomicU64 = AtomicU64::new(1);

impl BindingId {
    pub(crate) fn next() -> Self {
        Self(NEXT_BINDING.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// A page-state change reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    LoadStarted {
        url: String,
    },
    LoadProgress(f32),
    LoadFinished {
        url: String,
        title: String,
    },
    LoadFailed {
        code: i32,
        description: String,
        url: String,
    },
    TitleChanged(String),
    AddressChanged(String),
}

/// Anything an engine thread can hand to the host thread.
#[derive(Debug, Clone, PartialEq)]
pub enum InboxMessage {
    State(StateUpdate),
    /// Completion of an `evaluate_script` request.
    ScriptResult {
        request: u64,
        result: Result<String, String>,
    },
    /// Raw IPC body posted by page script.
    Ipc(String),
    PopupBlocked(String),
}

/// A message tagged with the binding that produced it, so messages from a
/// disposed instance can be dropped on arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub binding: BindingId,
    pub message: InboxMessage,
}

type Waker = Arc<dyn Fn() + Send + Sync>;

/// Multi-producer, single-consumer message sink.
#[derive(Clone, Default)]
pub struct Inbox {
    queue: Arc<Mutex<Vec<Envelope>>>,
    waker: Option<Waker>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// An inbox that calls `waker` after every push, e.g. to post a user
    /// event into the host event loop.
    pub fn with_waker(waker: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Vec::new())),
            waker: Some(Arc::new(waker)),
        }
    }

    pub fn push(&self, binding: BindingId, message: InboxMessage) {
        match self.queue.lock() {
            Ok(mut queue) => queue.push(Envelope { binding, message }),
            Err(poisoned) => poisoned.into_inner().push(Envelope { binding, message }),
        }
        if let Some(wake) = &self.waker {
            wake();
        }
    }

    /// Take every pending envelope in arrival order.
    pub fn drain(&self) -> Vec<Envelope> {
        let mut queue = match self.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *queue)
    }

    pub fn len(&self) -> usize {
        match self.queue.lock() {
            Ok(queue) => queue.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Inbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbox")
            .field("pending", &self.len())
            .field("waker", &self.waker.is_some())
            .finish()
    }
}
