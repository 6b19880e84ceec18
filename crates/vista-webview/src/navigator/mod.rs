//! Host-facing navigation commands.
//!
//! A [`Navigator`] runs commands against the attached engine binding, or
//! buffers them in a FIFO queue while no instance exists. On attach the
//! queue replays in issue order before any newer command runs.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace, warn};
use vista_common::EngineError;

use crate::content::Headers;
use crate::lifecycle::EngineBinding;

mod command;
mod queue;

pub use command::{NavigationCommand, ScriptCallback};
pub use queue::NavigationQueue;

#[derive(Default)]
struct Inner {
    queue: NavigationQueue,
    binding: Weak<EngineBinding>,
    draining: bool,
    closed: bool,
}

/// Cheap to clone; clones share one queue and binding.
#[derive(Clone, Default)]
pub struct Navigator {
    inner: Rc<RefCell<Inner>>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_url(&self, url: impl Into<String>, headers: Headers) {
        self.submit(NavigationCommand::LoadUrl {
            url: url.into(),
            headers,
        });
    }

    pub fn load_html(&self, html: impl Into<String>, base_url: Option<String>) {
        self.submit(NavigationCommand::LoadHtml {
            html: html.into(),
            base_url,
        });
    }

    pub fn back(&self) {
        self.submit(NavigationCommand::Back);
    }

    pub fn forward(&self) {
        self.submit(NavigationCommand::Forward);
    }

    pub fn reload(&self) {
        self.submit(NavigationCommand::Reload);
    }

    pub fn stop_loading(&self) {
        self.submit(NavigationCommand::Stop);
    }

    /// `on_result` runs on the host thread during `WebView::pump`, or with
    /// an error if the script times out. It is dropped without being called
    /// if the instance is disposed first.
    pub fn evaluate_script(
        &self,
        code: impl Into<String>,
        on_result: Option<ScriptCallback>,
    ) {
        self.submit(NavigationCommand::EvaluateScript {
            code: code.into(),
            on_result,
        });
    }

    /// `false` while no instance is attached.
    pub fn can_go_back(&self) -> bool {
        self.binding()
            .map(|b| b.handle().can_go_back())
            .unwrap_or(false)
    }

    pub fn can_go_forward(&self) -> bool {
        self.binding()
            .map(|b| b.handle().can_go_forward())
            .unwrap_or(false)
    }

    /// Commands waiting for an instance.
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    pub fn is_attached(&self) -> bool {
        self.binding().is_some()
    }

    fn binding(&self) -> Option<Rc<EngineBinding>> {
        self.inner.borrow().binding.upgrade()
    }

    pub(crate) fn submit(&self, command: NavigationCommand) {
        let binding = {
            let mut inner = self.inner.borrow_mut();
            if inner.closed {
                debug!(command = command.name(), "navigation command dropped: web view unmounted");
                return;
            }
            match inner.binding.upgrade() {
                Some(binding) if !inner.draining && inner.queue.is_empty() => binding,
                attached => {
                    trace!(command = command.name(), "navigation command queued");
                    inner.queue.push(command);
                    if attached.is_none() || inner.draining {
                        return;
                    }
                    drop(inner);
                    self.drain();
                    return;
                }
            }
        };
        execute(&binding, command);
    }

    pub(crate) fn attach(&self, binding: &Rc<EngineBinding>) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            inner.binding = Rc::downgrade(binding);
            inner.closed = false;
            inner.queue.len()
        };
        debug!(binding = %binding.id(), pending, "navigator attached");
        self.drain();
    }

    pub(crate) fn detach(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.binding.upgrade().is_some() {
            debug!("navigator detached");
        }
        inner.binding = Weak::new();
    }

    /// Detach for good. Queued commands are dropped, script callbacks
    /// uncalled, and later commands are discarded until the next attach.
    pub(crate) fn close(&self) {
        let dropped = {
            let mut inner = self.inner.borrow_mut();
            inner.binding = Weak::new();
            inner.closed = true;
            inner.queue.drain().collect::<Vec<_>>()
        };
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "queued navigation commands dropped");
        }
    }

    /// Replay queued commands one at a time. The borrow is released while a
    /// command runs, so commands issued meanwhile land behind the queue.
    fn drain(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.draining {
                return;
            }
            inner.draining = true;
        }

        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                inner
                    .binding
                    .upgrade()
                    .and_then(|binding| inner.queue.pop().map(|command| (binding, command)))
            };
            let Some((binding, command)) = next else {
                break;
            };
            execute(&binding, command);
        }

        self.inner.borrow_mut().draining = false;
    }
}

fn execute(binding: &EngineBinding, command: NavigationCommand) {
    let name = command.name();
    match binding.execute(command) {
        Ok(()) => trace!(binding = %binding.id(), command = name, "navigation command executed"),
        Err(EngineError::InstanceDisposed) => {
            error!(binding = %binding.id(), command = name, "navigation command dropped: instance disposed")
        }
        Err(e) => {
            warn!(binding = %binding.id(), command = name, error = %e, "navigation command failed")
        }
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Navigator")
            .field("pending", &inner.queue.len())
            .field("attached", &inner.binding.upgrade().is_some())
            .finish()
    }
}
