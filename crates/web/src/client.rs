//! Process-wide client for UI code

use once_cell::sync::Lazy;
use pitstop_core::ClientSettings;
use pitstop_http::{AuthenticatedClient, AuthenticatedClientBuilder, ClientError};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Global client instance
static CLIENT: Lazy<Mutex<Option<AuthenticatedClient>>> = Lazy::new(|| Mutex::new(None));

fn slot() -> MutexGuard<'static, Option<AuthenticatedClient>> {
    CLIENT.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Base URL for API calls: the configured one, else the page origin
fn base_url(settings: &ClientSettings) -> String {
    if !settings.base_url.is_empty() {
        return settings.base_url.clone();
    }
    page_origin().unwrap_or_default()
}

#[cfg(target_arch = "wasm32")]
fn page_origin() -> Option<String> {
    web_sys::window()?.location().origin().ok()
}

#[cfg(not(target_arch = "wasm32"))]
fn page_origin() -> Option<String> {
    None
}

#[cfg(target_arch = "wasm32")]
fn host_builder() -> AuthenticatedClientBuilder {
    use crate::{BrowserNavigator, BrowserStorage};
    use std::sync::Arc;

    AuthenticatedClient::builder()
        .store(Arc::new(BrowserStorage::new()))
        .navigator(Arc::new(BrowserNavigator::new()))
}

#[cfg(not(target_arch = "wasm32"))]
fn host_builder() -> AuthenticatedClientBuilder {
    AuthenticatedClient::builder()
}

/// Build the client from `settings` and make it the global instance
///
/// Replaces any previously installed client.
pub fn install_client(mut settings: ClientSettings) -> Result<AuthenticatedClient, ClientError> {
    settings.base_url = base_url(&settings);
    let client = host_builder().settings(settings).build()?;

    *slot() = Some(client.clone());
    tracing::info!(base_url = %client.settings().base_url, "API client installed");
    Ok(client)
}

/// The installed client, if any
pub fn authenticated_client() -> Option<AuthenticatedClient> {
    slot().clone()
}

/// Remove the global client
pub fn uninstall_client() {
    slot().take();
}
