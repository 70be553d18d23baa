use serde::{Deserialize, Serialize};
use std::fmt;

/// Email/password pair used for login and silent token refresh
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token envelope returned by the authenticate endpoint.
///
/// Only the `auth_token` field is read; the rest of the body (user profile,
/// roles) belongs to the callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub auth_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials::new("admin@pitstop.test", "hunter2");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("admin@pitstop.test"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_auth_token_ignores_extra_fields() {
        let body = json!({
            "auth_token": "T2",
            "user": { "id": 7, "role": "admin" }
        });
        let token: AuthToken = serde_json::from_value(body).unwrap();
        assert_eq!(token.auth_token, "T2");
    }
}
