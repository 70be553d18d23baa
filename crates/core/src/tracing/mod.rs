//! Logging setup for native hosts
//!
//! Browser hosts install their console subscriber from `pitstop-web`.

pub mod config;
#[cfg(all(feature = "tracing-init", not(target_arch = "wasm32")))]
pub mod init;

pub use config::{InstrumentationConfig, LogFormat};
