//! Pitstop admin API client in the browser
//!
//! Persists the session in `localStorage`, redirects through
//! `window.location` and logs to the browser console. UI code reaches the
//! client through [`install_client`] and [`authenticated_client`].

pub mod client;
#[cfg(target_arch = "wasm32")]
pub mod logging;
#[cfg(target_arch = "wasm32")]
pub mod navigator;
#[cfg(target_arch = "wasm32")]
pub mod storage;

pub use client::{authenticated_client, install_client, uninstall_client};
#[cfg(target_arch = "wasm32")]
pub use logging::init_logging;
#[cfg(target_arch = "wasm32")]
pub use navigator::BrowserNavigator;
#[cfg(target_arch = "wasm32")]
pub use storage::BrowserStorage;
