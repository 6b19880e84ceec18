//! Launch logic of the `vista` demo binary.

pub mod cli;
pub mod launch;
