//! Engine backend over `wry`, the platform's system web view.
//!
//! Instances are built as children of one host window. wry renders into
//! native child windows only, so off-screen rendering is reported as
//! unsupported.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use vista_common::EngineError;
use wry::http::header::{HeaderName, HeaderValue};
use wry::http::HeaderMap;
use wry::raw_window_handle::HasWindowHandle;
use wry::WebViewBuilder;

use crate::content::{AssetDirectory, Headers, BLANK_URL};
use crate::engine::{
    EngineBackend, EngineCallbacks, EngineInstance, InstanceSource, InstanceSpec, PopupDecision,
    PopupHandler, ReleaseAck, RenderMode, ScriptReply,
};

/// Scheme under which the asset directory is served: `vista://localhost/app/index.html`.
pub const CUSTOM_PROTOCOL: &str = "vista";

type PopupSlot = Arc<Mutex<Option<Arc<dyn PopupHandler>>>>;

pub struct WryBackend<W: HasWindowHandle> {
    window: Rc<W>,
    size: Cell<(u32, u32)>,
    assets: Option<Arc<AssetDirectory>>,
}

impl<W: HasWindowHandle> WryBackend<W> {
    /// `size` is the initial physical size of the web view inside `window`.
    pub fn new(window: Rc<W>, size: (u32, u32)) -> Self {
        Self {
            window,
            size: Cell::new(size),
            assets: None,
        }
    }

    /// Serve `assets` under `vista://`.
    pub fn with_assets(mut self, assets: Arc<AssetDirectory>) -> Self {
        self.assets = Some(assets);
        self
    }

    fn attach_ipc_handler<'a>(
        builder: WebViewBuilder<'a>,
        callbacks: Arc<dyn EngineCallbacks>,
    ) -> WebViewBuilder<'a> {
        builder.with_ipc_handler(move |request| {
            let body = request.body();
            if serde_json::from_str::<serde_json::Value>(body).is_err() {
                warn!(body_len = body.len(), "IPC message rejected: invalid JSON");
                return;
            }
            callbacks.on_ipc_message(body);
        })
    }

    fn attach_page_load_handler<'a>(
        builder: WebViewBuilder<'a>,
        callbacks: Arc<dyn EngineCallbacks>,
        title: Arc<Mutex<String>>,
    ) -> WebViewBuilder<'a> {
        builder.with_on_page_load_handler(move |event, url| match event {
            wry::PageLoadEvent::Started => {
                debug!(url = %url, "page load started");
                callbacks.on_load_start(&url);
            }
            wry::PageLoadEvent::Finished => {
                let title = title.lock().map(|t| t.clone()).unwrap_or_default();
                debug!(url = %url, "page load finished");
                callbacks.on_load_progress(1.0);
                callbacks.on_load_finish(&url, &title);
            }
        })
    }

    fn attach_title_handler<'a>(
        builder: WebViewBuilder<'a>,
        callbacks: Arc<dyn EngineCallbacks>,
        last_title: Arc<Mutex<String>>,
    ) -> WebViewBuilder<'a> {
        builder.with_document_title_changed_handler(move |title| {
            if let Ok(mut last) = last_title.lock() {
                last.clone_from(&title);
            }
            callbacks.on_display_change(&title);
        })
    }

    fn attach_popup_handler<'a>(builder: WebViewBuilder<'a>, slot: PopupSlot) -> WebViewBuilder<'a> {
        builder.with_new_window_req_handler(move |url| {
            let handler = slot.lock().ok().and_then(|s| s.clone());
            match handler {
                Some(handler) => handler.on_popup_request(&url) == PopupDecision::Allow,
                None => true,
            }
        })
    }

    fn attach_custom_protocol<'a>(&self, builder: WebViewBuilder<'a>) -> WebViewBuilder<'a> {
        let Some(assets) = &self.assets else {
            return builder;
        };
        let assets = Arc::clone(assets);
        builder.with_custom_protocol(CUSTOM_PROTOCOL.to_string(), move |_id, request| {
            let uri = request.uri().to_string();
            let path = uri
                .strip_prefix("vista://localhost/")
                .or_else(|| uri.strip_prefix("vista://localhost"))
                .or_else(|| uri.strip_prefix("vista://"))
                .unwrap_or("");

            let (status, mime, body) = match assets.resolve(path) {
                Some((mime, data)) => (200, mime.into_owned(), data.into_owned()),
                None => {
                    warn!(path = %path, "custom protocol: asset not found");
                    (404, "text/plain".to_string(), b"Not Found".to_vec())
                }
            };
            wry::http::Response::builder()
                .status(status)
                .header("Content-Type", mime)
                .body(Cow::Owned(body))
                .unwrap_or_else(|_| wry::http::Response::new(Cow::Borrowed(&[][..])))
        })
    }

    fn bounds(&self) -> wry::Rect {
        let (width, height) = self.size.get();
        bounds(width, height)
    }
}

impl<W: HasWindowHandle> EngineBackend for WryBackend<W> {
    fn name(&self) -> &str {
        "wry"
    }

    fn create_instance(
        &self,
        spec: &InstanceSpec,
        callbacks: Arc<dyn EngineCallbacks>,
        popup_handler: Option<Arc<dyn PopupHandler>>,
    ) -> Result<Box<dyn EngineInstance>, EngineError> {
        let options = &spec.options;
        if options.render_mode == RenderMode::OffScreen {
            return Err(EngineError::Unsupported("off-screen rendering".into()));
        }
        if !options.javascript_enabled {
            warn!("wry cannot disable JavaScript; ignoring javascript_enabled = false");
        }

        let popup: PopupSlot = Arc::new(Mutex::new(popup_handler));
        let title = Arc::new(Mutex::new(String::new()));

        let mut builder = WebViewBuilder::new()
            .with_bounds(self.bounds())
            .with_transparent(options.transparent)
            .with_devtools(options.devtools)
            .with_focused(true);

        for script in &spec.init_scripts {
            builder = builder.with_initialization_script(script);
        }
        if let Some(ua) = &options.user_agent {
            builder = builder.with_user_agent(ua);
        }

        builder = Self::attach_ipc_handler(builder, Arc::clone(&callbacks));
        builder = Self::attach_page_load_handler(builder, Arc::clone(&callbacks), Arc::clone(&title));
        builder = Self::attach_title_handler(builder, Arc::clone(&callbacks), title);
        builder = Self::attach_popup_handler(builder, Arc::clone(&popup));
        builder = self.attach_custom_protocol(builder);

        builder = match &spec.source {
            InstanceSource::Url { url, headers } => {
                builder.with_url(url).with_headers(header_map(headers))
            }
            InstanceSource::Html { html, base_url } => builder.with_html(with_base(html, base_url)),
        };

        let webview = builder
            .build_as_child(self.window.as_ref())
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        debug!(source = ?spec.source, "wry web view created");

        Ok(Box::new(WryInstance {
            webview: RefCell::new(Some(webview)),
            popup,
        }))
    }
}

struct WryInstance {
    webview: RefCell<Option<wry::WebView>>,
    popup: PopupSlot,
}

impl WryInstance {
    fn with_view(
        &self,
        f: impl FnOnce(&wry::WebView) -> Result<(), wry::Error>,
    ) -> Result<(), EngineError> {
        let view = self.webview.borrow();
        let view = view.as_ref().ok_or(EngineError::InstanceDisposed)?;
        f(view).map_err(|e| EngineError::Call(e.to_string()))
    }
}

impl EngineInstance for WryInstance {
    fn load_url(&self, url: &str, headers: &Headers) -> Result<(), EngineError> {
        if headers.is_empty() {
            self.with_view(|v| v.load_url(url))
        } else {
            let headers = header_map(headers);
            self.with_view(|v| v.load_url_with_headers(url, headers))
        }
    }

    fn load_html(&self, html: &str, base_url: &str) -> Result<(), EngineError> {
        let html = with_base(html, base_url);
        self.with_view(|v| v.load_html(&html))
    }

    fn evaluate_script(&self, code: &str, reply: ScriptReply) -> Result<(), EngineError> {
        let reply = Mutex::new(Some(reply));
        self.with_view(|v| {
            v.evaluate_script_with_callback(code, move |result| {
                if let Some(reply) = reply.lock().ok().and_then(|mut r| r.take()) {
                    reply(Ok(result));
                }
            })
        })
    }

    fn stop(&self) -> Result<(), EngineError> {
        self.with_view(|v| v.evaluate_script("window.stop();"))
    }

    fn reload(&self) -> Result<(), EngineError> {
        self.with_view(|v| v.evaluate_script("window.location.reload();"))
    }

    fn go_back(&self) -> Result<(), EngineError> {
        self.with_view(|v| v.evaluate_script("window.history.back();"))
    }

    fn go_forward(&self) -> Result<(), EngineError> {
        self.with_view(|v| v.evaluate_script("window.history.forward();"))
    }

    // wry exposes no history flags.
    fn can_go_back(&self) -> bool {
        false
    }

    fn can_go_forward(&self) -> bool {
        false
    }

    fn set_zoom(&self, factor: f64) -> Result<(), EngineError> {
        self.with_view(|v| v.zoom(factor))
    }

    fn resize(&self, width: u32, height: u32) -> Result<(), EngineError> {
        self.with_view(|v| v.set_bounds(bounds(width, height)))
    }

    fn add_popup_handler(&self, handler: Arc<dyn PopupHandler>) {
        if let Ok(mut slot) = self.popup.lock() {
            *slot = Some(handler);
        }
    }

    fn remove_popup_handler(&self) {
        if let Ok(mut slot) = self.popup.lock() {
            slot.take();
        }
    }

    fn release(&self, ack: ReleaseAck) {
        // Dropping the wry WebView destroys the native view synchronously.
        drop(self.webview.borrow_mut().take());
        ack.acknowledge();
    }
}

fn bounds(width: u32, height: u32) -> wry::Rect {
    wry::Rect {
        position: wry::dpi::Position::Logical(wry::dpi::LogicalPosition::new(0.0, 0.0)),
        size: wry::dpi::Size::Physical(wry::dpi::PhysicalSize::new(width, height)),
    }
}

fn header_map(headers: &Headers) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!(header = %name, "invalid request header skipped"),
        }
    }
    map
}

/// wry has no base URL parameter for inline HTML; a `<base>` element gives
/// relative links the same resolution.
fn with_base(html: &str, base_url: &str) -> String {
    if base_url.is_empty() || base_url == BLANK_URL {
        return html.to_string();
    }
    let escaped = base_url.replace('"', "&quot;");
    format!("<base href=\"{escaped}\">{html}")
}
