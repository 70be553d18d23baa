//! `window.localStorage` session persistence

use pitstop_core::{CoreError, CoreResult, KeyValueStore};
use web_sys::Storage;

/// [`KeyValueStore`] over the browser's `localStorage`
///
/// The storage object is looked up on every call; `web_sys` handles are not
/// `Send`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    pub fn new() -> Self {
        Self
    }

    fn storage(key: &str) -> CoreResult<Storage> {
        web_sys::window()
            .and_then(|window| window.local_storage().ok().flatten())
            .ok_or_else(|| CoreError::storage(key, "localStorage is not available"))
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Self::storage(key)?
            .get_item(key)
            .map_err(|e| CoreError::storage(key, format!("read failed: {e:?}")))
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        Self::storage(key)?
            .set_item(key, value)
            .map_err(|e| CoreError::storage(key, format!("write failed: {e:?}")))
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        Self::storage(key)?
            .remove_item(key)
            .map_err(|e| CoreError::storage(key, format!("remove failed: {e:?}")))
    }
}
