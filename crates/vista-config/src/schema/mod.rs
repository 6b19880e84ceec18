//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod system;
mod web;

pub use system::*;
pub use web::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VistaConfig {
    pub web: WebSettings,
    pub engine: EngineConfig,
    pub assets: AssetsConfig,
    pub logging: LoggingConfig,
}
