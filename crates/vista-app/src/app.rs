//! `ApplicationHandler` implementation for the winit event loop.

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoopProxy};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{Window, WindowId};

use vista_config::VistaConfig;
use vista_webview::backend::WryBackend;
use vista_webview::{AssetDirectory, EngineRuntime, LoadingState, WebContent, WebView, WebViewState};

/// Posted by the web view's inbox waker from engine threads.
#[derive(Debug, Clone, Copy)]
pub enum AppEvent {
    Wake,
}

pub struct VistaApp {
    config: VistaConfig,
    content: Option<WebContent>,
    proxy: EventLoopProxy<AppEvent>,
    window: Option<Rc<Window>>,
    runtime: Option<Rc<EngineRuntime>>,
    view: Option<WebView>,
    modifiers: ModifiersState,
}

impl VistaApp {
    pub fn new(config: VistaConfig, content: WebContent, proxy: EventLoopProxy<AppEvent>) -> Self {
        Self {
            config,
            content: Some(content),
            proxy,
            window: None,
            runtime: None,
            view: None,
            modifiers: ModifiersState::empty(),
        }
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> bool {
        let attributes = Window::default_attributes()
            .with_title("Vista")
            .with_transparent(self.config.web.desktop.transparent)
            .with_inner_size(LogicalSize::new(1280.0, 800.0));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Rc::new(window),
            Err(e) => {
                error!("Failed to create window: {e}");
                return false;
            }
        };

        let assets_dir = PathBuf::from(&self.config.assets.dir);
        let size = window.inner_size();
        let backend = WryBackend::new(Rc::clone(&window), (size.width, size.height))
            .with_assets(Arc::new(AssetDirectory::new(&assets_dir)));
        let runtime = match EngineRuntime::init(Box::new(backend)) {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Engine runtime init failed: {e}");
                return false;
            }
        };

        let proxy = Mutex::new(self.proxy.clone());
        let state = WebViewState::with_settings(
            self.content.take().unwrap_or_default(),
            self.config.web.clone(),
        );
        let mut view = WebView::builder(Rc::clone(&runtime))
            .state(state)
            .assets(Rc::new(AssetDirectory::new(assets_dir)))
            .engine_config(self.config.engine.clone())
            .waker(move || {
                if let Ok(proxy) = proxy.lock() {
                    let _ = proxy.send_event(AppEvent::Wake);
                }
            })
            .on_created(|| info!("Web view created"))
            .on_dispose(|| info!("Web view disposed"))
            .mount();

        view.bridge_mut().register("log", |payload| {
            info!(?payload, "page log");
        });

        if let LoadingState::Error { kind, message } = view.state().loading_state() {
            warn!(?kind, "Web view unavailable: {message}");
        }

        self.window = Some(window);
        self.runtime = Some(runtime);
        self.view = Some(view);
        true
    }

    fn pump(&mut self) {
        let Some(view) = self.view.as_mut() else {
            return;
        };
        if view.pump() == 0 {
            return;
        }

        let state = view.state();
        if let Some(window) = &self.window {
            let title = match state.title() {
                Some(title) if !title.is_empty() => format!("{title} - Vista"),
                _ => "Vista".to_string(),
            };
            window.set_title(&title);
        }
        match state.loading_state() {
            LoadingState::Finished => {
                info!(url = state.current_url().unwrap_or_default(), "Page loaded")
            }
            LoadingState::Error { kind, message } => warn!(?kind, "Page failed: {message}"),
            LoadingState::Loading(p) => debug!(progress = p, "Page loading"),
            LoadingState::Initializing => {}
        }
    }

    fn handle_keyboard_input(&mut self, event: KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let Some(view) = self.view.as_ref() else {
            return;
        };
        let navigator = view.navigator();
        let alt = self.modifiers.alt_key();

        match event.logical_key {
            Key::Named(NamedKey::ArrowLeft) if alt => navigator.back(),
            Key::Named(NamedKey::ArrowRight) if alt => navigator.forward(),
            Key::Named(NamedKey::F5) => navigator.reload(),
            Key::Named(NamedKey::Escape) => navigator.stop_loading(),
            _ => {}
        }
    }

    /// Unmount the view before shutting the runtime down.
    fn shutdown(&mut self) {
        info!("Initiating shutdown");
        if let Some(mut view) = self.view.take() {
            view.unmount();
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown();
        }
        self.window = None;
        info!("Shutdown complete");
    }
}

impl ApplicationHandler<AppEvent> for VistaApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if !self.initialize(event_loop) {
            event_loop.exit();
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Wake => self.pump(),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Window close requested");
                self.shutdown();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    if let Some(view) = &self.view {
                        if let Err(e) = view.resize(size.width, size.height) {
                            warn!("Web view resize failed: {e}");
                        }
                    }
                }
            }

            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_keyboard_input(event);
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Script timeouts expire even when the engine stays quiet.
        self.pump();
    }
}
