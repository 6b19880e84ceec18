//! Shared error taxonomy for the vista crates.

pub mod errors;

pub use errors::{AssetError, ConfigError, EngineError, VistaError};

pub type Result<T> = std::result::Result<T, VistaError>;
