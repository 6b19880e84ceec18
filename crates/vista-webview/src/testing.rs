//! Scripted in-process engine for tests. Records every call it receives and
//! lets tests play the engine's side of the conversation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use vista_common::EngineError;

use crate::adapter::CallbackAdapter;
use crate::content::Headers;
use crate::engine::{
    EngineBackend, EngineCallbacks, EngineHandle, EngineInstance, EngineRuntime, InstanceOptions,
    InstanceSource, InstanceSpec, PopupDecision, PopupHandler, ReleaseAck, ScriptReply,
};
use crate::events::{BindingId, Inbox};
use crate::lifecycle::EngineBinding;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Create { instance: usize, spec: InstanceSpec },
    LoadUrl(usize, String),
    LoadHtml { instance: usize, html: String, base_url: String },
    Evaluate(usize, String),
    Stop(usize),
    Reload(usize),
    Back(usize),
    Forward(usize),
    Zoom(usize, f64),
    Resize(usize, u32, u32),
    AddPopupHandler(usize),
    RemovePopupHandler(usize),
    Release(usize),
}

struct InstanceRecord {
    callbacks: Arc<dyn EngineCallbacks>,
    popup_handlers: Vec<Arc<dyn PopupHandler>>,
    scripts: VecDeque<ScriptReply>,
    can_go_back: bool,
    can_go_forward: bool,
}

#[derive(Default)]
struct Shared {
    calls: Vec<EngineCall>,
    instances: Vec<InstanceRecord>,
    fail_boot: Option<String>,
    fail_next_create: Option<EngineError>,
    reject_scripts: Option<EngineError>,
    hold_acks: bool,
    held_acks: Vec<ReleaseAck>,
    shutdowns: usize,
}

/// Test-side controls. Clones share state with every backend and instance
/// they hand out.
#[derive(Clone, Default)]
pub struct FakeEngine {
    shared: Rc<RefCell<Shared>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(&self) -> FakeBackend {
        FakeBackend {
            shared: Rc::clone(&self.shared),
        }
    }

    pub fn runtime(&self) -> Rc<EngineRuntime> {
        EngineRuntime::isolated(Box::new(self.backend()))
    }

    pub fn fail_boot(&self, reason: &str) {
        self.shared.borrow_mut().fail_boot = Some(reason.to_string());
    }

    pub fn fail_next_create(&self, error: EngineError) {
        self.shared.borrow_mut().fail_next_create = Some(error);
    }

    pub fn reject_scripts(&self, error: EngineError) {
        self.shared.borrow_mut().reject_scripts = Some(error);
    }

    pub fn hold_release_acks(&self) {
        self.shared.borrow_mut().hold_acks = true;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.shared.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.shared.borrow_mut().calls.clear();
    }

    pub fn created(&self) -> usize {
        self.shared.borrow().instances.len()
    }

    pub fn released(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Release(_)))
    }

    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.shared.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn shutdowns(&self) -> usize {
        self.shared.borrow().shutdowns
    }

    /// What the `instance`-th creation was asked to build.
    pub fn spec(&self, instance: usize) -> Option<InstanceSpec> {
        self.shared.borrow().calls.iter().find_map(|c| match c {
            EngineCall::Create { instance: i, spec } if *i == instance => Some(spec.clone()),
            _ => None,
        })
    }

    pub fn callbacks(&self, instance: usize) -> Arc<dyn EngineCallbacks> {
        Arc::clone(&self.shared.borrow().instances[instance].callbacks)
    }

    pub fn null_callbacks(&self) -> Arc<dyn EngineCallbacks> {
        Arc::new(NullCallbacks)
    }

    pub fn popup_handler_count(&self, instance: usize) -> usize {
        self.shared.borrow().instances[instance].popup_handlers.len()
    }

    /// Ask the installed popup handler, as the engine would when a page opens
    /// a window. Without a handler the engine's default applies.
    pub fn request_popup(&self, instance: usize, url: &str) -> PopupDecision {
        let handler = self.shared.borrow().instances[instance]
            .popup_handlers
            .last()
            .cloned();
        match handler {
            Some(handler) => handler.on_popup_request(url),
            None => PopupDecision::Allow,
        }
    }

    /// Complete the oldest pending script on `instance`.
    pub fn reply_script(&self, instance: usize, result: Result<String, String>) -> bool {
        let reply = self.shared.borrow_mut().instances[instance].scripts.pop_front();
        match reply {
            Some(reply) => {
                reply(result);
                true
            }
            None => false,
        }
    }

    pub fn set_history(&self, instance: usize, back: bool, forward: bool) {
        let mut shared = self.shared.borrow_mut();
        let record = &mut shared.instances[instance];
        record.can_go_back = back;
        record.can_go_forward = forward;
    }

    /// Acknowledge every release that was held back.
    pub fn flush_release_acks(&self) {
        let acks = std::mem::take(&mut self.shared.borrow_mut().held_acks);
        for ack in acks {
            ack.acknowledge();
        }
    }
}

pub struct FakeBackend {
    shared: Rc<RefCell<Shared>>,
}

impl EngineBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn boot(&self) -> Result<(), EngineError> {
        match &self.shared.borrow().fail_boot {
            Some(reason) => Err(EngineError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn create_instance(
        &self,
        spec: &InstanceSpec,
        callbacks: Arc<dyn EngineCallbacks>,
        popup_handler: Option<Arc<dyn PopupHandler>>,
    ) -> Result<Box<dyn EngineInstance>, EngineError> {
        let mut shared = self.shared.borrow_mut();
        if let Some(error) = shared.fail_next_create.take() {
            return Err(error);
        }
        let index = shared.instances.len();
        if popup_handler.is_some() {
            shared.calls.push(EngineCall::AddPopupHandler(index));
        }
        shared.instances.push(InstanceRecord {
            callbacks,
            popup_handlers: popup_handler.into_iter().collect(),
            scripts: VecDeque::new(),
            can_go_back: false,
            can_go_forward: false,
        });
        shared.calls.push(EngineCall::Create {
            instance: index,
            spec: spec.clone(),
        });
        Ok(Box::new(FakeInstance {
            index,
            shared: Rc::clone(&self.shared),
        }))
    }

    fn shutdown(&self) {
        self.shared.borrow_mut().shutdowns += 1;
    }
}

struct FakeInstance {
    index: usize,
    shared: Rc<RefCell<Shared>>,
}

impl FakeInstance {
    fn record(&self, call: EngineCall) -> Result<(), EngineError> {
        self.shared.borrow_mut().calls.push(call);
        Ok(())
    }
}

impl EngineInstance for FakeInstance {
    fn load_url(&self, url: &str, _headers: &Headers) -> Result<(), EngineError> {
        self.record(EngineCall::LoadUrl(self.index, url.to_string()))
    }

    fn load_html(&self, html: &str, base_url: &str) -> Result<(), EngineError> {
        self.record(EngineCall::LoadHtml {
            instance: self.index,
            html: html.to_string(),
            base_url: base_url.to_string(),
        })
    }

    fn evaluate_script(&self, code: &str, reply: ScriptReply) -> Result<(), EngineError> {
        let mut shared = self.shared.borrow_mut();
        if let Some(error) = shared.reject_scripts.clone() {
            return Err(error);
        }
        shared.calls.push(EngineCall::Evaluate(self.index, code.to_string()));
        shared.instances[self.index].scripts.push_back(reply);
        Ok(())
    }

    fn stop(&self) -> Result<(), EngineError> {
        self.record(EngineCall::Stop(self.index))
    }

    fn reload(&self) -> Result<(), EngineError> {
        self.record(EngineCall::Reload(self.index))
    }

    fn go_back(&self) -> Result<(), EngineError> {
        self.record(EngineCall::Back(self.index))
    }

    fn go_forward(&self) -> Result<(), EngineError> {
        self.record(EngineCall::Forward(self.index))
    }

    fn can_go_back(&self) -> bool {
        self.shared.borrow().instances[self.index].can_go_back
    }

    fn can_go_forward(&self) -> bool {
        self.shared.borrow().instances[self.index].can_go_forward
    }

    fn set_zoom(&self, factor: f64) -> Result<(), EngineError> {
        self.record(EngineCall::Zoom(self.index, factor))
    }

    fn resize(&self, width: u32, height: u32) -> Result<(), EngineError> {
        self.record(EngineCall::Resize(self.index, width, height))
    }

    fn add_popup_handler(&self, handler: Arc<dyn PopupHandler>) {
        let mut shared = self.shared.borrow_mut();
        shared.calls.push(EngineCall::AddPopupHandler(self.index));
        shared.instances[self.index].popup_handlers.push(handler);
    }

    fn remove_popup_handler(&self) {
        let mut shared = self.shared.borrow_mut();
        shared.calls.push(EngineCall::RemovePopupHandler(self.index));
        shared.instances[self.index].popup_handlers.pop();
    }

    fn release(&self, ack: ReleaseAck) {
        let mut shared = self.shared.borrow_mut();
        shared.calls.push(EngineCall::Release(self.index));
        shared.instances[self.index].scripts.clear();
        if shared.hold_acks {
            shared.held_acks.push(ack);
        } else {
            ack.acknowledge();
        }
    }
}

struct NullCallbacks;

impl EngineCallbacks for NullCallbacks {
    fn on_load_start(&self, _url: &str) {}
    fn on_load_progress(&self, _progress: f32) {}
    fn on_load_finish(&self, _url: &str, _title: &str) {}
    fn on_load_error(&self, _code: i32, _description: &str, _failing_url: &str) {}
    fn on_display_change(&self, _title: &str) {}
    fn on_address_change(&self, _url: &str) {}
    fn on_ipc_message(&self, _body: &str) {}
}

pub fn url_spec(url: &str) -> InstanceSpec {
    InstanceSpec {
        source: InstanceSource::Url {
            url: url.to_string(),
            headers: Headers::new(),
        },
        options: InstanceOptions::from_settings(&vista_config::WebSettings::default()),
        init_scripts: Vec::new(),
    }
}

/// A live binding over a fresh fake instance, outside any coordinator.
pub fn binding(engine: &FakeEngine, inbox: &Inbox) -> Rc<EngineBinding> {
    let runtime = engine.runtime();
    let adapter = Arc::new(CallbackAdapter::new(BindingId::next(), inbox.clone(), false));
    let callbacks: Arc<dyn EngineCallbacks> = adapter.clone();
    let handle = EngineHandle::create(&runtime, &url_spec("about:blank"), callbacks, None)
        .expect("fake engine creates instances");
    Rc::new(EngineBinding::new(
        handle,
        adapter,
        inbox.clone(),
        Duration::from_secs(10),
    ))
}
