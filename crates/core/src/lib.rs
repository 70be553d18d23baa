//! Pitstop core types and utilities
//!
//! Shared by the authenticated HTTP client and its browser embedding: error
//! types, client settings, the persisted session store and the navigation
//! seam used for unauthenticated redirects.

pub mod error;
pub mod navigation;
pub mod settings;
pub mod storage;
pub mod tracing;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use navigation::{MemoryNavigator, Navigator, is_at_route};
pub use settings::{
    ClientSettings, EndpointSettings, RefreshSettings, TimeoutSettings, ValidateConfig,
};
pub use storage::{KeyValueStore, MemoryStore, SessionStore, StorageKeys};
pub use types::{AuthToken, Credentials};
