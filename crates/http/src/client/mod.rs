//! Pitstop admin API client
//!
//! Every call goes through the same pipeline: the stored bearer token is
//! injected on the way out, a renewed token is captured on the way back, and
//! a 401 from a non-authentication endpoint triggers one shared token refresh
//! after which the rejected requests are replayed.

pub mod error;
mod interceptor;
pub mod redirect;
mod refresh;
pub mod request;
pub mod response;
mod session;

pub use error::{ClientError, UnrecoverableAuth};
pub use redirect::UnauthenticatedRedirect;
pub use refresh::RefreshSnapshot;
pub use request::{MultipartForm, RequestBody, RequestDescriptor};
pub use response::ApiResponse;
pub use session::LoginOutcome;

use pitstop_core::{
    ClientSettings, KeyValueStore, MemoryNavigator, MemoryStore, Navigator, SessionStore,
    ValidateConfig,
};
use refresh::{Admission, RefreshCoordinator, RefreshGuard, ReplayTurn};
use reqwest::{ClientBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
type Replay<'a> = futures::future::BoxFuture<'a, Result<ApiResponse, ClientError>>;
#[cfg(target_arch = "wasm32")]
type Replay<'a> = futures::future::LocalBoxFuture<'a, Result<ApiResponse, ClientError>>;

/// Authenticated API client
///
/// Cheap to clone; clones share the session store, the navigator and the
/// refresh state.
#[derive(Clone)]
pub struct AuthenticatedClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    settings: ClientSettings,
    session: SessionStore,
    redirect: UnauthenticatedRedirect,
    refresh: RefreshCoordinator,
}

impl AuthenticatedClient {
    /// Create a client with default settings, in-memory storage and navigation
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> AuthenticatedClientBuilder {
        AuthenticatedClientBuilder::default()
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    /// Persisted session state (token, refresh credentials, return path)
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Current refresh coordination state
    pub fn refresh_state(&self) -> RefreshSnapshot {
        self.inner.refresh.snapshot()
    }

    /// Send a request through the full interceptor pipeline
    ///
    /// Resolves with the first successful response, replaying the request
    /// after a token refresh when needed. Non-401 failures and network
    /// errors are returned unchanged.
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<ApiResponse, ClientError> {
        let response = self.send(&descriptor).await?;
        self.intercept(descriptor, response).await
    }

    /// Send a request and deserialize the JSON response
    pub async fn execute<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<T, ClientError> {
        self.request(descriptor).await?.json()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(RequestDescriptor::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(RequestDescriptor::post(path).json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(RequestDescriptor::put(path).json(body)?).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(RequestDescriptor::patch(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.request(RequestDescriptor::delete(path)).await?;
        Ok(())
    }

    /// Issue one HTTP call with the currently stored token
    async fn send(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse, ClientError> {
        let token = self.inner.session.token()?;
        let headers = interceptor::outgoing_headers(descriptor, token.as_deref())?;
        let url = self.inner.settings.api_url(&descriptor.path);

        let mut request = self
            .inner
            .http
            .request(descriptor.method.clone(), url)
            .headers(headers);

        if !descriptor.query.is_empty() {
            request = request.query(&descriptor.query);
        }

        request = match &descriptor.body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.body(serde_json::to_vec(value)?),
            RequestBody::Multipart(form) => request.multipart(form.to_form()?),
        };

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = descriptor.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let response = ApiResponse::read(response).await?;
        tracing::debug!(
            method = %descriptor.method,
            path = %descriptor.path,
            status = response.status().as_u16(),
            "API call completed"
        );
        Ok(response)
    }

    /// Response interceptor
    async fn intercept(
        &self,
        mut descriptor: RequestDescriptor,
        response: ApiResponse,
    ) -> Result<ApiResponse, ClientError> {
        let status = response.status();
        if status.is_success() {
            interceptor::capture_token(&self.inner.session, &response)?;
            return Ok(response);
        }
        if status != StatusCode::UNAUTHORIZED {
            return Err(response.into_error());
        }

        let settings = &self.inner.settings;
        if settings.is_auth_endpoint(&descriptor.path) {
            tracing::debug!(path = %descriptor.path, "Authentication endpoint answered 401");
            self.end_session(false);
            return Err(response.into_error());
        }

        if !settings.refresh.enabled {
            self.end_session(false);
            return Err(ClientError::AuthExpired);
        }

        if descriptor.refresh_attempts >= settings.refresh.max_attempts {
            tracing::warn!(
                path = %descriptor.path,
                attempts = descriptor.refresh_attempts,
                "Still unauthorized after token refresh; giving up"
            );
            self.end_session(true);
            return Err(ClientError::AuthUnrecoverable(
                UnrecoverableAuth::RetryLimitExceeded {
                    attempts: descriptor.refresh_attempts,
                },
            ));
        }

        // Mark before refreshing so a second 401 on the replay cannot recurse
        descriptor.refresh_attempts += 1;

        match self.inner.refresh.admit() {
            Admission::Leader(guard) => self.lead_refresh(descriptor, guard).await,
            Admission::Queued(receiver) => match receiver.await {
                Ok(Ok(turn)) => self.replay_in_turn(descriptor, turn).await,
                Ok(Err(reason)) => Err(ClientError::AuthUnrecoverable(reason)),
                Err(_) => Err(ClientError::AuthUnrecoverable(
                    UnrecoverableAuth::RefreshAbandoned,
                )),
            },
        }
    }

    /// Run one refresh call and hand the verdict to every request parked
    /// behind it
    async fn lead_refresh(
        &self,
        descriptor: RequestDescriptor,
        guard: RefreshGuard<'_>,
    ) -> Result<ApiResponse, ClientError> {
        tracing::info!(path = %descriptor.path, "Access token rejected; refreshing");

        match self.refresh_token().await {
            Ok(()) => {
                let turn = guard.succeed();
                self.replay_in_turn(descriptor, turn).await
            }
            Err(reason) => {
                tracing::warn!(%reason, "Token refresh failed");
                self.end_session(true);
                guard.fail(&reason);
                Err(ClientError::AuthUnrecoverable(reason))
            }
        }
    }

    /// Replay once every request ahead in the chain has replayed
    async fn replay_in_turn(
        &self,
        descriptor: RequestDescriptor,
        mut turn: ReplayTurn,
    ) -> Result<ApiResponse, ClientError> {
        turn.wait().await;
        let outcome = self.replay(descriptor).await;
        turn.release();
        outcome
    }

    /// Send a request again with whatever token is now stored
    fn replay(&self, descriptor: RequestDescriptor) -> Replay<'_> {
        Box::pin(async move {
            tracing::debug!(
                method = %descriptor.method,
                path = %descriptor.path,
                "Replaying request with refreshed token"
            );
            let response = self.send(&descriptor).await?;
            self.intercept(descriptor, response).await
        })
    }

    /// Exchange the stored credentials for a new token and persist it
    async fn refresh_token(&self) -> Result<(), UnrecoverableAuth> {
        let settings = &self.inner.settings;
        let credentials = match self.inner.session.credentials() {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return Err(UnrecoverableAuth::MissingCredentials),
            Err(e) => return Err(UnrecoverableAuth::Storage(e.to_string())),
        };

        let url = settings.api_url(&settings.endpoints.authenticate);
        let request = self.inner.http.post(url).json(&credentials);

        #[cfg(not(target_arch = "wasm32"))]
        let request = request.timeout(settings.timeouts.refresh());

        let response = match request.send().await {
            Ok(response) => ApiResponse::read(response).await,
            Err(e) => Err(e.into()),
        }
        .map_err(|e| UnrecoverableAuth::RefreshUnreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UnrecoverableAuth::RefreshRejected {
                status: response.status().as_u16(),
                message: response.text(),
            });
        }

        match interceptor::capture_token(&self.inner.session, &response) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(UnrecoverableAuth::MissingToken),
            Err(e) => Err(UnrecoverableAuth::Storage(e.to_string())),
        }
    }

    /// Drop the session and send the user to the login view
    ///
    /// Storage failures are logged, not returned: the caller is already
    /// reporting the authentication failure that got us here.
    fn end_session(&self, forget_credentials: bool) {
        let session = &self.inner.session;
        let cleared = if forget_credentials {
            session.clear_all()
        } else {
            session.clear_token()
        };
        if let Err(e) = cleared {
            tracing::warn!("Failed to clear session state: {}", e);
        }
        if let Err(e) = self.inner.redirect.trigger() {
            tracing::warn!("Failed to save return path: {}", e);
        }
    }
}

/// Builder for [`AuthenticatedClient`]
#[derive(Default)]
pub struct AuthenticatedClientBuilder {
    settings: Option<ClientSettings>,
    base_url: Option<String>,
    user_agent: Option<String>,
    store: Option<Arc<dyn KeyValueStore>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl AuthenticatedClientBuilder {
    /// Start from loaded settings instead of the defaults
    pub fn settings(mut self, settings: ClientSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Persistence backend for the session state
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Navigation used for the unauthenticated redirect
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<AuthenticatedClient, ClientError> {
        let mut settings = self.settings.unwrap_or_default();
        if let Some(base_url) = self.base_url {
            settings.base_url = base_url;
        }
        if let Some(user_agent) = self.user_agent {
            settings.user_agent = user_agent;
        }

        // Ensure base_url ends without a trailing slash
        settings.base_url = settings.base_url.trim_end_matches('/').to_string();
        settings
            .validate()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(MemoryNavigator::default()));

        let session = SessionStore::open(store, settings.storage.clone())?;
        let redirect =
            UnauthenticatedRedirect::new(navigator, session.clone(), settings.login_route.clone());

        let client_builder = ClientBuilder::new().user_agent(settings.user_agent.clone());

        #[cfg(not(target_arch = "wasm32"))]
        let client_builder = client_builder.timeout(settings.timeouts.request());

        let http = client_builder.build()?;

        Ok(AuthenticatedClient {
            inner: Arc::new(ClientInner {
                http,
                settings,
                session,
                redirect,
                refresh: RefreshCoordinator::new(),
            }),
        })
    }
}
