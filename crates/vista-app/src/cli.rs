use clap::Parser;

/// Vista: a single web view over the system browser engine.
#[derive(Parser, Debug, Default)]
#[command(name = "vista", version, about)]
pub struct Args {
    /// URL to open.
    pub target: Option<String>,

    /// Open an HTML file from the assets directory instead of a URL.
    #[arg(long, conflicts_with_all = ["target", "html"])]
    pub file: Option<String>,

    /// Open an inline HTML string.
    #[arg(long, conflicts_with = "target")]
    pub html: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Request off-screen rendering.
    #[arg(long)]
    pub offscreen: bool,

    /// Disable the transparent background.
    #[arg(long)]
    pub opaque: bool,

    /// Block popup windows.
    #[arg(long)]
    pub no_popups: bool,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
