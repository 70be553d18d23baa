//! Redirect to the login view once the session is lost

use pitstop_core::{CoreResult, Navigator, SessionStore, is_at_route};
use std::sync::Arc;

/// Sends the user to the login view, remembering where they were
#[derive(Clone)]
pub struct UnauthenticatedRedirect {
    navigator: Arc<dyn Navigator>,
    session: SessionStore,
    login_route: String,
}

impl UnauthenticatedRedirect {
    pub fn new(
        navigator: Arc<dyn Navigator>,
        session: SessionStore,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            navigator,
            session,
            login_route: login_route.into(),
        }
    }

    /// Navigate to the login view unless already there.
    ///
    /// The current location is saved as the return path first. Returns
    /// whether a navigation happened.
    pub fn trigger(&self) -> CoreResult<bool> {
        let current = self.navigator.current_location();
        if current
            .as_deref()
            .is_some_and(|location| is_at_route(location, &self.login_route))
        {
            return Ok(false);
        }

        if let Some(location) = current.as_deref() {
            self.session.set_return_path(location)?;
        }
        tracing::info!(login_route = %self.login_route, "Session lost; redirecting to login");
        self.navigator.navigate(&self.login_route);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use pitstop_core::{MemoryStore, StorageKeys};

    mock! {
        pub Nav {}

        impl Navigator for Nav {
            fn current_location(&self) -> Option<String>;
            fn navigate(&self, location: &str);
        }
    }

    fn session() -> SessionStore {
        SessionStore::open(Arc::new(MemoryStore::new()), StorageKeys::default()).unwrap()
    }

    #[test]
    fn test_redirect_saves_return_path() {
        let mut navigator = MockNav::new();
        navigator
            .expect_current_location()
            .returning(|| Some("/bookings?status=new".to_string()));
        navigator
            .expect_navigate()
            .withf(|location| location.to_string() == "/login")
            .times(1)
            .return_const(());

        let session = session();
        let redirect = UnauthenticatedRedirect::new(Arc::new(navigator), session.clone(), "/login");

        assert!(redirect.trigger().unwrap());
        assert_eq!(
            session.return_path().unwrap().as_deref(),
            Some("/bookings?status=new")
        );
    }

    #[test]
    fn test_redirect_is_noop_on_login_view() {
        let mut navigator = MockNav::new();
        navigator
            .expect_current_location()
            .returning(|| Some("/login?expired=1".to_string()));
        navigator.expect_navigate().never();

        let session = session();
        let redirect = UnauthenticatedRedirect::new(Arc::new(navigator), session.clone(), "/login");

        assert!(!redirect.trigger().unwrap());
        assert!(!redirect.trigger().unwrap());
        assert!(session.return_path().unwrap().is_none());
    }

    #[test]
    fn test_redirect_without_known_location() {
        let mut navigator = MockNav::new();
        navigator.expect_current_location().returning(|| None);
        navigator.expect_navigate().times(1).return_const(());

        let session = session();
        let redirect = UnauthenticatedRedirect::new(Arc::new(navigator), session.clone(), "/login");

        assert!(redirect.trigger().unwrap());
        assert!(session.return_path().unwrap().is_none());
    }
}
