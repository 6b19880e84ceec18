//! Web content descriptions and local asset loading.
//!
//! `WebContent::File` names are resolved through an [`AssetLoader`]; the
//! bytes are decoded as UTF-8, trimmed, and handed to the engine as inline
//! HTML. [`AssetDirectory`] is the filesystem loader, and also serves the
//! `vista://` custom protocol in the wry backend.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use vista_common::AssetError;

/// Extra request headers sent with a URL load.
pub type Headers = BTreeMap<String, String>;

/// Address loaded when there is nothing to show.
pub const BLANK_URL: &str = "about:blank";

/// What a web view should display. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WebContent {
    Url {
        url: String,
        additional_headers: Headers,
    },
    Data {
        data: String,
        base_url: Option<String>,
    },
    File {
        file_name: String,
    },
    #[default]
    Empty,
}

impl WebContent {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url {
            url: url.into(),
            additional_headers: Headers::new(),
        }
    }

    pub fn url_with_headers(url: impl Into<String>, headers: Headers) -> Self {
        Self::Url {
            url: url.into(),
            additional_headers: headers,
        }
    }

    pub fn data(html: impl Into<String>) -> Self {
        Self::Data {
            data: html.into(),
            base_url: None,
        }
    }

    pub fn data_with_base(html: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::Data {
            data: html.into(),
            base_url: Some(base_url.into()),
        }
    }

    pub fn file(file_name: impl Into<String>) -> Self {
        Self::File {
            file_name: file_name.into(),
        }
    }
}

/// Looks up bundled assets by name.
pub trait AssetLoader {
    fn load(&self, name: &str) -> Result<Vec<u8>, AssetError>;
}

/// Read a named asset and prepare it as inline HTML.
pub fn load_file_html(loader: &dyn AssetLoader, name: &str) -> Result<String, AssetError> {
    let bytes = loader.load(name)?;
    Ok(String::from_utf8_lossy(&bytes).trim().to_string())
}

/// Serves files from a base directory, with in-memory overrides.
///
/// `AssetDirectory::new("assets").resolve("app/index.html")` reads
/// `assets/app/index.html`. Paths escaping the base directory never resolve.
pub struct AssetDirectory {
    base_dir: PathBuf,
    overrides: HashMap<String, (String, Vec<u8>)>, // path -> (mime, data)
}

impl AssetDirectory {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            overrides: HashMap::new(),
        }
    }

    /// Register an in-memory asset override.
    pub fn add_override(
        &mut self,
        path: impl Into<String>,
        mime: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) {
        self.overrides
            .insert(path.into(), (mime.into(), data.into()));
    }

    /// Resolve a request path to content bytes and MIME type.
    pub fn resolve(&self, path: &str) -> Option<(Cow<'_, str>, Cow<'_, [u8]>)> {
        let clean = path.trim_start_matches('/');

        if let Some((mime, data)) = self.overrides.get(clean) {
            return Some((Cow::Borrowed(mime.as_str()), Cow::Borrowed(data.as_slice())));
        }

        let file = self.locate(clean)?;
        let data = std::fs::read(&file).ok()?;
        Some((Cow::Borrowed(mime_from_extension(&file)), Cow::Owned(data)))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Canonical path of `clean` if it exists inside the base directory.
    /// Canonicalizing both sides rejects `..` and symlink escapes.
    fn locate(&self, clean: &str) -> Option<PathBuf> {
        let canonical_base = std::fs::canonicalize(&self.base_dir).ok()?;
        let canonical_file = std::fs::canonicalize(self.base_dir.join(clean)).ok()?;
        canonical_file
            .starts_with(&canonical_base)
            .then_some(canonical_file)
    }
}

impl AssetLoader for AssetDirectory {
    fn load(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        let clean = name.trim_start_matches('/');
        if let Some((_, data)) = self.overrides.get(clean) {
            return Ok(data.clone());
        }

        let file = self
            .locate(clean)
            .ok_or_else(|| AssetError::NotFound(name.to_string()))?;
        std::fs::read(&file).map_err(|source| AssetError::Io {
            name: name.to_string(),
            source,
        })
    }
}

/// Guess MIME type from file extension.
pub fn mime_from_extension(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") | Some("mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("wasm") => "application/wasm",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        Some("webp") => "image/webp",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
