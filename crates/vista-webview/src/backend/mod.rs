//! Concrete engine backends.

mod wry_engine;

pub use wry_engine::{WryBackend, CUSTOM_PROTOCOL};
