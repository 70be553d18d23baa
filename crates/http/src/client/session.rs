//! Login, logout and reachability checks

use super::{AuthenticatedClient, ClientError, RequestDescriptor};
use pitstop_core::{AuthToken, Credentials};

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub token: String,
    /// Where the user was when the previous session ended, if anywhere
    pub return_path: Option<String>,
}

impl AuthenticatedClient {
    /// Authenticate and remember the credentials for silent refresh
    ///
    /// A rejected login is reported as the server's error (`Http { status: 401 }`)
    /// and never triggers a refresh.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, ClientError> {
        let settings = self.settings();
        let descriptor =
            RequestDescriptor::post(settings.endpoints.authenticate.clone()).json(credentials)?;
        let response = self.request(descriptor).await?;

        let AuthToken { auth_token } = response.json().map_err(|_| {
            ClientError::InvalidResponse("authenticate response carried no auth_token".into())
        })?;
        if auth_token.is_empty() {
            return Err(ClientError::InvalidResponse(
                "authenticate response carried an empty auth_token".into(),
            ));
        }

        // The token itself was persisted by the response interceptor
        let session = self.session();
        session.set_credentials(credentials)?;
        let return_path = session.take_return_path()?;

        tracing::info!("Logged in");
        Ok(LoginOutcome {
            token: auth_token,
            return_path,
        })
    }

    /// Forget the token and the stored credentials
    pub fn logout(&self) -> Result<(), ClientError> {
        self.session().clear_all()?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Whether a token is currently stored
    pub fn is_authenticated(&self) -> bool {
        match self.session().token() {
            Ok(token) => token.is_some(),
            Err(e) => {
                tracing::warn!("Failed to read auth token: {}", e);
                false
            }
        }
    }

    /// Whether the API answers its health endpoint with a 2xx
    ///
    /// Bypasses the interceptors: no token is sent and a 401 is just
    /// "unhealthy".
    pub async fn health_check(&self) -> bool {
        let settings = self.settings();
        let url = settings.api_url(&settings.endpoints.health);
        let request = self.http().get(url);

        #[cfg(not(target_arch = "wasm32"))]
        let request = request.timeout(settings.timeouts.health());

        match request.send().await {
            Ok(response) => {
                let healthy = response.status().is_success();
                if !healthy {
                    tracing::debug!(status = response.status().as_u16(), "Health check failed");
                }
                healthy
            }
            Err(e) => {
                tracing::debug!("Health check unreachable: {}", e);
                false
            }
        }
    }
}
