use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use vista_common::EngineError;

use super::{EngineBackend, EngineCallbacks, EngineInstance, InstanceSpec, PopupHandler};

/// Set while a runtime exists anywhere in the process.
static RUNTIME_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Where the runtime is in its life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeStatus {
    Ready,
    /// The backend failed to boot; instances cannot be created.
    Failed(String),
    ShutDown,
}

/// The process-wide engine runtime.
///
/// Created once with [`EngineRuntime::init`], shared by every web view as an
/// `Rc`, and shut down once, explicitly or on drop. A backend that fails to
/// boot still yields a runtime: it reports itself unavailable, so views show
/// `EngineUnavailable` instead of failing to mount.
pub struct EngineRuntime {
    backend: Box<dyn EngineBackend>,
    status: RefCell<RuntimeStatus>,
    claimed: bool,
}

impl EngineRuntime {
    /// Fails with `AlreadyInitialized` while another runtime is alive.
    pub fn init(backend: Box<dyn EngineBackend>) -> Result<Rc<Self>, EngineError> {
        if RUNTIME_CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::AlreadyInitialized);
        }
        Ok(Rc::new(Self::boot(backend, true)))
    }

    /// A runtime outside the process-wide guard, so tests can run in
    /// parallel.
    #[cfg(test)]
    pub(crate) fn isolated(backend: Box<dyn EngineBackend>) -> Rc<Self> {
        Rc::new(Self::boot(backend, false))
    }

    fn boot(backend: Box<dyn EngineBackend>, claimed: bool) -> Self {
        let status = match backend.boot() {
            Ok(()) => {
                info!(engine = backend.name(), "engine runtime ready");
                RuntimeStatus::Ready
            }
            Err(e) => {
                warn!(engine = backend.name(), error = %e, "engine runtime failed to boot");
                RuntimeStatus::Failed(e.to_string())
            }
        };
        Self {
            backend,
            status: RefCell::new(status),
            claimed,
        }
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn status(&self) -> RuntimeStatus {
        self.status.borrow().clone()
    }

    pub fn is_available(&self) -> bool {
        *self.status.borrow() == RuntimeStatus::Ready
    }

    pub fn create_instance(
        &self,
        spec: &InstanceSpec,
        callbacks: Arc<dyn EngineCallbacks>,
        popup_handler: Option<Arc<dyn PopupHandler>>,
    ) -> Result<Box<dyn EngineInstance>, EngineError> {
        match &*self.status.borrow() {
            RuntimeStatus::Ready => {}
            RuntimeStatus::Failed(reason) => return Err(EngineError::Unavailable(reason.clone())),
            RuntimeStatus::ShutDown => {
                return Err(EngineError::Unavailable("engine runtime shut down".into()))
            }
        }
        self.backend.create_instance(spec, callbacks, popup_handler)
    }

    /// Shut the backend down. Later calls do nothing.
    pub fn shutdown(&self) {
        let previous = self.status.replace(RuntimeStatus::ShutDown);
        if previous == RuntimeStatus::ShutDown {
            return;
        }
        if previous == RuntimeStatus::Ready {
            self.backend.shutdown();
        }
        if self.claimed {
            RUNTIME_CLAIMED.store(false, Ordering::Release);
        }
        info!(engine = self.backend.name(), "engine runtime shut down");
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for EngineRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRuntime")
            .field("engine", &self.backend.name())
            .field("status", &*self.status.borrow())
            .finish()
    }
}
