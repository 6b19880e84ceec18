//! Turning command-line arguments into config and initial content.

use std::path::Path;

use tracing::{info, warn, Subscriber};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter, Registry};
use vista_config::{validation, VistaConfig};
use vista_webview::WebContent;

use crate::cli::Args;

/// Load the config named by `--config`, or the platform default. Any
/// failure falls back to defaults.
pub fn load_config(args: &Args) -> VistaConfig {
    let loaded = match &args.config {
        Some(path) => {
            info!("Using config override: {path}");
            vista_config::toml_loader::load_from_path(Path::new(path)).and_then(|config| {
                validation::validate(&config)?;
                Ok(config)
            })
        }
        None => vista_config::load_config(),
    };
    loaded.unwrap_or_else(|e| {
        warn!("Config load failed, using defaults: {e}");
        VistaConfig::default()
    })
}

/// Flags win over the config file.
pub fn apply_overrides(config: &mut VistaConfig, args: &Args) {
    let desktop = &mut config.web.desktop;
    if args.offscreen {
        desktop.off_screen_rendering = true;
    }
    if args.opaque {
        desktop.transparent = false;
    }
    if args.no_popups {
        desktop.disable_popup_windows = true;
    }
}

pub fn initial_content(args: &Args) -> WebContent {
    if let Some(name) = &args.file {
        return WebContent::file(name.clone());
    }
    if let Some(html) = &args.html {
        return WebContent::data(html.clone());
    }
    match &args.target {
        Some(url) => WebContent::url(url.clone()),
        None => WebContent::Empty,
    }
}

/// Swaps the log filter once the config is known.
pub type LogHandle = reload::Handle<EnvFilter, Registry>;

/// The directive used before any config is read.
pub fn startup_log_directive(args: &Args) -> String {
    match &args.log_level {
        Some(level) => format!("vista={level}"),
        None => "vista=info".to_string(),
    }
}

/// The `EnvFilter` directive for this run.
pub fn log_directive(args: &Args, config: &VistaConfig) -> String {
    match &args.log_level {
        Some(level) => format!("vista={level}"),
        None => format!("vista={}", config.logging.level.as_directive()),
    }
}

pub fn env_filter(directive: &str) -> EnvFilter {
    let directive: Directive = directive
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    EnvFilter::from_default_env().add_directive(directive)
}

/// Formatting subscriber with a reloadable filter, seeded from the flags so
/// config loading is already logged.
pub fn log_subscriber<W>(
    args: &Args,
    writer: W,
) -> (impl Subscriber + Send + Sync + 'static, LogHandle)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(env_filter(&startup_log_directive(args)));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer));
    (subscriber, handle)
}

/// Move the filter to the level the config asks for.
pub fn apply_log_level(handle: &LogHandle, args: &Args, config: &VistaConfig) {
    if let Err(e) = handle.reload(env_filter(&log_directive(args, config))) {
        warn!("Failed to apply configured log level: {e}");
    }
}
