use std::fmt;

use vista_common::EngineError;

use crate::content::Headers;

/// Receives the result of `evaluate_script` on the host thread.
pub type ScriptCallback = Box<dyn FnOnce(Result<String, EngineError>)>;

/// A navigation request. Consumed exactly once.
pub enum NavigationCommand {
    Back,
    Forward,
    Reload,
    Stop,
    LoadUrl {
        url: String,
        headers: Headers,
    },
    LoadHtml {
        html: String,
        base_url: Option<String>,
    },
    EvaluateScript {
        code: String,
        on_result: Option<ScriptCallback>,
    },
}

impl NavigationCommand {
    pub fn name(&self) -> &'static str {
        match self {
            NavigationCommand::Back => "back",
            NavigationCommand::Forward => "forward",
            NavigationCommand::Reload => "reload",
            NavigationCommand::Stop => "stop",
            NavigationCommand::LoadUrl { .. } => "load_url",
            NavigationCommand::LoadHtml { .. } => "load_html",
            NavigationCommand::EvaluateScript { .. } => "evaluate_script",
        }
    }
}

impl fmt::Debug for NavigationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationCommand::LoadUrl { url, headers } => f
                .debug_struct("LoadUrl")
                .field("url", url)
                .field("headers", &headers.len())
                .finish(),
            NavigationCommand::LoadHtml { html, base_url } => f
                .debug_struct("LoadHtml")
                .field("html_len", &html.len())
                .field("base_url", base_url)
                .finish(),
            NavigationCommand::EvaluateScript { code, on_result } => f
                .debug_struct("EvaluateScript")
                .field("code_len", &code.len())
                .field("callback", &on_result.is_some())
                .finish(),
            other => f.write_str(match other {
                NavigationCommand::Back => "Back",
                NavigationCommand::Forward => "Forward",
                NavigationCommand::Reload => "Reload",
                _ => "Stop",
            }),
        }
    }
}
