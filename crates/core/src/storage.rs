//! Persisted session state
//!
//! The bearer token, the credentials kept for silent refresh and the
//! post-login return path all live in a flat string key/value store. In the
//! browser that is `localStorage`; natively and in tests it is [`MemoryStore`].

use crate::{CoreError, CoreResult, Credentials};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Flat string key/value persistence backend
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> CoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> CoreResult<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> CoreResult<()>;
}

/// In-process [`KeyValueStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given entries
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self, key: &str) -> CoreResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| CoreError::storage(key, "memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.lock(key)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.lock(key)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        self.lock(key)?.remove(key);
        Ok(())
    }
}

/// Names of the keys the session state is persisted under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    /// Bearer token
    pub token: String,
    /// Email used for silent refresh
    pub email: String,
    /// Password used for silent refresh
    pub password: String,
    /// Location to restore after login
    pub return_path: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            token: "auth_token".to_string(),
            email: "saved_email".to_string(),
            password: "saved_password".to_string(),
            return_path: "return_path".to_string(),
        }
    }
}

/// Typed view of the persisted session state
///
/// There is exactly one current token. Older builds of the dashboard stored
/// it JSON-wrapped; [`SessionStore::open`] rewrites such values once so every
/// later read is a plain string.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Open the session store, migrating a legacy token if one is present
    pub fn open(backend: Arc<dyn KeyValueStore>, keys: StorageKeys) -> CoreResult<Self> {
        let store = Self { backend, keys };
        if store.migrate_legacy_token()? {
            tracing::info!("Migrated legacy JSON-wrapped token to plain storage format");
        }
        Ok(store)
    }

    /// Key names in use
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Current bearer token, if any
    pub fn token(&self) -> CoreResult<Option<String>> {
        Ok(self
            .backend
            .get(&self.keys.token)?
            .filter(|token| !token.is_empty()))
    }

    /// Replace the current bearer token
    pub fn set_token(&self, token: &str) -> CoreResult<()> {
        self.backend.set(&self.keys.token, token)
    }

    pub fn clear_token(&self) -> CoreResult<()> {
        self.backend.remove(&self.keys.token)
    }

    /// Stored refresh credentials; present only when both halves are stored
    pub fn credentials(&self) -> CoreResult<Option<Credentials>> {
        let email = self.backend.get(&self.keys.email)?;
        let password = self.backend.get(&self.keys.password)?;
        Ok(match (email, password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(Credentials { email, password })
            }
            _ => None,
        })
    }

    pub fn set_credentials(&self, credentials: &Credentials) -> CoreResult<()> {
        self.backend.set(&self.keys.email, &credentials.email)?;
        self.backend.set(&self.keys.password, &credentials.password)
    }

    pub fn clear_credentials(&self) -> CoreResult<()> {
        self.backend.remove(&self.keys.email)?;
        self.backend.remove(&self.keys.password)
    }

    /// Location saved before the last redirect to the login view
    pub fn return_path(&self) -> CoreResult<Option<String>> {
        self.backend.get(&self.keys.return_path)
    }

    pub fn set_return_path(&self, location: &str) -> CoreResult<()> {
        self.backend.set(&self.keys.return_path, location)
    }

    /// Read and remove the saved return path
    pub fn take_return_path(&self) -> CoreResult<Option<String>> {
        let path = self.return_path()?;
        if path.is_some() {
            self.backend.remove(&self.keys.return_path)?;
        }
        Ok(path)
    }

    /// Forget the token and the refresh credentials; the return path survives
    pub fn clear_all(&self) -> CoreResult<()> {
        self.clear_token()?;
        self.clear_credentials()
    }

    /// Rewrite a JSON-wrapped token as a plain string.
    ///
    /// Returns whether a rewrite happened.
    pub fn migrate_legacy_token(&self) -> CoreResult<bool> {
        let Some(raw) = self.backend.get(&self.keys.token)? else {
            return Ok(false);
        };
        match unwrap_legacy_token(&raw) {
            Some(token) if token != raw => {
                self.backend.set(&self.keys.token, &token)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Extract the token from a legacy JSON-wrapped value.
///
/// Accepts a JSON string (`"abc"`) or an object carrying a string `token`,
/// `auth_token` or `access_token` field, tried in that order. Returns `None`
/// for plain tokens.
fn unwrap_legacy_token(raw: &str) -> Option<String> {
    const FIELDS: [&str; 3] = ["token", "auth_token", "access_token"];

    match serde_json::from_str::<serde_json::Value>(raw.trim()).ok()? {
        serde_json::Value::String(token) => Some(token),
        serde_json::Value::Object(fields) => FIELDS
            .iter()
            .find_map(|name| fields.get(*name)?.as_str().map(str::to_string)),
        _ => None,
    }
}
