//! Navigation seam used by the unauthenticated redirect

use std::sync::Mutex;

/// Access to the host's current location
pub trait Navigator: Send + Sync {
    /// Current location as `path[?query][#fragment]`, if known
    fn current_location(&self) -> Option<String>;

    /// Move to `location`
    fn navigate(&self, location: &str);
}

/// Check whether `location` points at `route`, ignoring query, fragment and
/// a trailing slash
pub fn is_at_route(location: &str, route: &str) -> bool {
    let path = location
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    normalize(path) == normalize(route)
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// In-process [`Navigator`] that records every navigation
#[derive(Debug)]
pub struct MemoryNavigator {
    location: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    /// Create a navigator positioned at `location`
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(location.into()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Locations navigated to, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    /// Move without recording a navigation, as a user clicking around would
    pub fn set_location(&self, location: impl Into<String>) {
        if let Ok(mut current) = self.location.lock() {
            *current = location.into();
        }
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_location(&self) -> Option<String> {
        self.location.lock().ok().map(|location| location.clone())
    }

    fn navigate(&self, location: &str) {
        if let Ok(mut current) = self.location.lock() {
            *current = location.to_string();
        }
        if let Ok(mut history) = self.history.lock() {
            history.push(location.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_at_route_ignores_query_and_fragment() {
        assert!(is_at_route("/login", "/login"));
        assert!(is_at_route("/login?next=%2Fbookings", "/login"));
        assert!(is_at_route("/login#form", "/login"));
        assert!(is_at_route("/login/", "/login"));
        assert!(!is_at_route("/login-help", "/login"));
        assert!(!is_at_route("/bookings", "/login"));
    }

    #[test]
    fn test_root_route() {
        assert!(is_at_route("/", "/"));
        assert!(is_at_route("", "/"));
        assert!(is_at_route("/?tab=1", "/"));
    }

    #[test]
    fn test_memory_navigator_records_history() {
        let navigator = MemoryNavigator::new("/clients");
        navigator.set_location("/clients/12");
        navigator.navigate("/login");

        assert_eq!(navigator.current_location().as_deref(), Some("/login"));
        assert_eq!(navigator.history(), vec!["/login".to_string()]);
    }
}
