use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::engine::PopupDecision;
use crate::ipc::IpcPayload;
use crate::state::{ErrorKind, LoadingState, PageSnapshot};
use crate::testing::{EngineCall, FakeEngine};

fn mount(engine: &FakeEngine, content: WebContent) -> WebView {
    WebView::mount(engine.runtime(), WebViewState::new(content))
}

fn creates(engine: &FakeEngine) -> usize {
    engine.count(|c| matches!(c, EngineCall::Create { .. }))
}

#[test]
fn url_content_walks_through_loading_states() {
    let engine = FakeEngine::new();
    let mut view = mount(&engine, WebContent::url("https://example.test"));
    let rx = view.state().subscribe();
    assert_eq!(creates(&engine), 1);
    assert_eq!(view.state().loading_state(), &LoadingState::Initializing);

    let engine_side = engine.callbacks(0);
    let mut seen: Vec<PageSnapshot> = Vec::new();

    engine_side.on_load_start("https://example.test");
    view.pump();
    seen.push(rx.borrow().clone());
    for p in [0.3, 0.7] {
        engine_side.on_load_progress(p);
        view.pump();
        seen.push(rx.borrow().clone());
    }
    engine_side.on_load_finish("https://example.test/", "Example Domain");
    view.pump();
    seen.push(rx.borrow().clone());

    let states: Vec<_> = seen.iter().map(|s| s.loading.clone()).collect();
    assert_eq!(
        states,
        vec![
            LoadingState::Loading(0.0),
            LoadingState::Loading(0.3),
            LoadingState::Loading(0.7),
            LoadingState::Finished,
        ]
    );
    assert_eq!(view.state().title(), Some("Example Domain"));
    assert_eq!(view.state().current_url(), Some("https://example.test/"));
    assert_eq!(creates(&engine), 1);
}

#[test]
fn duplicate_finish_leaves_revision() {
    let engine = FakeEngine::new();
    let mut view = mount(&engine, WebContent::url("https://example.test"));
    let engine_side = engine.callbacks(0);

    engine_side.on_load_finish("https://example.test", "Example");
    assert_eq!(view.pump(), 1);
    let rev = view.state().revision();

    engine_side.on_load_finish("https://example.test", "Example");
    assert_eq!(view.pump(), 0);
    assert_eq!(view.state().revision(), rev);
}

#[test]
fn commands_issued_before_mount_replay_in_order() {
    let engine = FakeEngine::new();
    let navigator = Navigator::new();
    navigator.load_url("https://second.test", Default::default());
    navigator.reload();
    navigator.evaluate_script("document.title", None);

    let view = WebView::builder(engine.runtime())
        .state(WebViewState::new(WebContent::url("https://first.test")))
        .navigator(navigator.clone())
        .mount();

    let calls: Vec<_> = engine
        .calls()
        .into_iter()
        .filter(|c| {
            matches!(
                c,
                EngineCall::LoadUrl(..) | EngineCall::Reload(_) | EngineCall::Evaluate(..)
            )
        })
        .collect();
    assert_eq!(
        calls,
        vec![
            EngineCall::LoadUrl(0, "https://second.test".into()),
            EngineCall::Reload(0),
            EngineCall::Evaluate(0, "document.title".into()),
        ]
    );
    assert_eq!(navigator.pending(), 0);
    assert!(view.navigator().is_attached());
}

#[test]
fn file_content_is_loaded_as_trimmed_html() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("page.html"), "  <html>Hi</html>\n\n").unwrap();

    let engine = FakeEngine::new();
    let _view = WebView::builder(engine.runtime())
        .state(WebViewState::new(WebContent::file("page.html")))
        .assets(Rc::new(AssetDirectory::new(dir.path())))
        .mount();

    let spec = engine.spec(0).unwrap();
    assert_eq!(
        spec.source,
        crate::engine::InstanceSource::Html {
            html: "<html>Hi</html>".into(),
            base_url: "about:blank".into(),
        }
    );
}

#[test]
fn offscreen_toggle_recreates_exactly_once() {
    let engine = FakeEngine::new();
    let mut view = mount(&engine, WebContent::url("https://example.test"));

    let outcome = view.update_settings(|s| s.desktop.off_screen_rendering = true);
    assert_eq!(outcome, SyncOutcome::Rebuilt);
    assert_eq!(engine.released(), 1);
    assert_eq!(creates(&engine), 2);

    let outcome = view.update_settings(|s| s.desktop.disable_popup_windows = true);
    assert_eq!(outcome, SyncOutcome::Unchanged);
    assert_eq!(engine.released(), 1);
    assert_eq!(creates(&engine), 2);
}

#[test]
fn disabled_popups_are_blocked_without_new_instance() {
    let engine = FakeEngine::new();
    let mut state = WebViewState::new(WebContent::url("https://example.test"));
    state.settings_mut().desktop.disable_popup_windows = true;
    let mut view = WebView::mount(engine.runtime(), state);

    assert_eq!(engine.request_popup(0, "https://ad.test"), PopupDecision::Block);
    view.pump();
    assert_eq!(creates(&engine), 1);
    assert_eq!(engine.popup_handler_count(0), 1);
}

#[test]
fn can_go_back_tracks_attachment() {
    let engine = FakeEngine::new();
    engine.fail_next_create(vista_common::EngineError::Unavailable("busy".into()));
    let mut view = mount(&engine, WebContent::url("https://a.test"));
    assert!(!view.navigator().can_go_back());

    view.set_content(WebContent::url("https://b.test"));
    assert!(view.navigator().is_attached());
    assert!(!view.navigator().can_go_back());
    engine.set_history(0, true, true);
    assert!(view.navigator().can_go_back());
    assert!(view.navigator().can_go_forward());
}

#[test]
fn unmount_disposes_once_and_runs_hooks_once() {
    let engine = FakeEngine::new();
    let created = Rc::new(Cell::new(0));
    let disposed = Rc::new(Cell::new(0));
    let (c, d) = (Rc::clone(&created), Rc::clone(&disposed));

    let mut view = WebView::builder(engine.runtime())
        .state(WebViewState::new(WebContent::url("https://example.test")))
        .on_created(move || c.set(c.get() + 1))
        .on_dispose(move || d.set(d.get() + 1))
        .mount();

    view.update_settings(|s| s.desktop.transparent = false);
    assert_eq!(created.get(), 1);

    view.unmount();
    view.unmount();
    drop(view);
    assert_eq!(disposed.get(), 1);
    assert_eq!(engine.released(), 2);
}

#[test]
fn commands_after_unmount_are_not_kept() {
    let engine = FakeEngine::new();
    engine.fail_boot("missing");
    let mut view = mount(&engine, WebContent::url("https://example.test"));
    view.navigator().reload();
    assert_eq!(view.navigator().pending(), 1);

    view.unmount();
    assert_eq!(view.navigator().pending(), 0);
    for _ in 0..100 {
        view.navigator().back();
    }
    assert_eq!(view.navigator().pending(), 0);
    assert_eq!(engine.calls(), Vec::new());
}

#[test]
fn dispose_hook_runs_even_without_instance() {
    let engine = FakeEngine::new();
    engine.fail_boot("missing");
    let disposed = Rc::new(Cell::new(false));
    let flag = Rc::clone(&disposed);

    let view = WebView::builder(engine.runtime())
        .state(WebViewState::new(WebContent::url("https://example.test")))
        .on_dispose(move || flag.set(true))
        .mount();
    assert!(matches!(
        view.state().loading_state(),
        LoadingState::Error { kind: ErrorKind::EngineUnavailable, .. }
    ));
    drop(view);
    assert!(disposed.get());
}

#[test]
fn late_events_from_replaced_instance_are_dropped() {
    let engine = FakeEngine::new();
    let mut view = mount(&engine, WebContent::url("https://example.test"));
    let old = engine.callbacks(0);

    view.update_settings(|s| s.devtools = !s.devtools);
    old.on_display_change("stale");
    engine.callbacks(1).on_display_change("fresh");

    view.pump();
    assert_eq!(view.state().title(), Some("fresh"));
}

#[test]
fn script_results_arrive_through_pump() {
    let engine = FakeEngine::new();
    let mut view = mount(&engine, WebContent::url("https://example.test"));
    let result = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&result);

    view.navigator().evaluate_script(
        "document.title",
        Some(Box::new(move |r| *sink.borrow_mut() = Some(r))),
    );
    assert!(engine.reply_script(0, Ok("\"Example\"".into())));
    // Delivered on the next pump, not from the engine's reply.
    assert!(result.borrow().is_none());

    view.pump();
    assert_eq!(*result.borrow(), Some(Ok("\"Example\"".to_string())));
}

#[test]
fn overdue_scripts_time_out() {
    let engine = FakeEngine::new();
    let mut view = WebView::builder(engine.runtime())
        .state(WebViewState::new(WebContent::url("https://example.test")))
        .engine_config(EngineConfig {
            script_timeout_ms: 1,
            ..EngineConfig::default()
        })
        .mount();
    let result = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&result);
    view.navigator()
        .evaluate_script("spin()", Some(Box::new(move |r| *sink.borrow_mut() = Some(r))));

    std::thread::sleep(Duration::from_millis(10));
    view.pump();
    assert_eq!(
        *result.borrow(),
        Some(Err(vista_common::EngineError::ScriptEvaluation(
            "timed out after 1ms".into()
        )))
    );

    // The engine answering afterwards changes nothing.
    engine.reply_script(0, Ok("1".into()));
    view.pump();
}

#[test]
fn disposal_cancels_pending_scripts() {
    let engine = FakeEngine::new();
    let mut view = mount(&engine, WebContent::url("https://example.test"));
    let called = Rc::new(Cell::new(false));
    let flag = Rc::clone(&called);
    view.navigator()
        .evaluate_script("1", Some(Box::new(move |_| flag.set(true))));

    view.update_settings(|s| s.desktop.transparent = false);
    view.pump();
    assert!(!called.get());
}

#[test]
fn ipc_messages_reach_bridge_handlers() {
    let engine = FakeEngine::new();
    let mut view = mount(&engine, WebContent::url("https://example.test"));
    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&received);
    view.bridge_mut()
        .register("greet", move |payload| sink.borrow_mut().push(payload.clone()));

    engine
        .callbacks(0)
        .on_ipc_message(r#"{"kind":"greet","payload":"hello"}"#);
    view.pump();
    assert_eq!(*received.borrow(), vec![IpcPayload::Text("hello".into())]);
}

#[test]
fn ipc_script_is_injected_into_every_instance() {
    let engine = FakeEngine::new();
    let _view = WebView::builder(engine.runtime())
        .state(WebViewState::new(WebContent::url("https://example.test")))
        .init_script("window.extra = 1;")
        .mount();

    let scripts = engine.spec(0).unwrap().init_scripts;
    assert_eq!(scripts.len(), 2);
    assert!(scripts[0].contains("window.vista.ipc"));
    assert_eq!(scripts[1], "window.extra = 1;");
}

#[test]
fn post_message_evaluates_dispatch_script() {
    let engine = FakeEngine::new();
    let view = mount(&engine, WebContent::url("https://example.test"));
    view.post_message("theme", &serde_json::json!({"dark": true}));

    assert_eq!(
        engine.count(|c| matches!(
            c,
            EngineCall::Evaluate(0, code) if code == r#"window.vista.ipc._dispatch("theme", {"dark":true});"#
        )),
        1
    );
}

#[test]
fn waker_fires_for_engine_events() {
    let engine = FakeEngine::new();
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&wakes);
    let _view = WebView::builder(engine.runtime())
        .state(WebViewState::new(WebContent::url("https://example.test")))
        .waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .mount();

    engine.callbacks(0).on_load_start("https://example.test");
    assert_eq!(wakes.load(Ordering::SeqCst), 1);
}

#[test]
fn resize_reaches_live_instance() {
    let engine = FakeEngine::new();
    let view = mount(&engine, WebContent::url("https://example.test"));
    view.resize(800, 600).unwrap();
    assert_eq!(engine.count(|c| *c == EngineCall::Resize(0, 800, 600)), 1);
}
