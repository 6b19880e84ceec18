use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures reported by an engine runtime or one of its instances.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The engine runtime is missing, failed to boot, or refused to build
    /// an instance.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// An operation reached an instance that was already torn down.
    #[error("engine instance already disposed")]
    InstanceDisposed,

    #[error("load error {code}: {description} ({url})")]
    Load {
        code: i32,
        description: String,
        url: String,
    },

    #[error("script evaluation failed: {0}")]
    ScriptEvaluation(String),

    #[error("engine runtime already initialized")]
    AlreadyInitialized,

    #[error("not supported by this engine: {0}")]
    Unsupported(String),

    #[error("engine call failed: {0}")]
    Call(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("asset read error for {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum VistaError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
