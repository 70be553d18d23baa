//! Pitstop HTTP client
//!
//! The authenticated client used by the admin dashboard to reach the Pitstop
//! API: bearer token injection, transparent single-flight token refresh on
//! 401, and the redirect to the login view once a session cannot be
//! recovered.

pub mod client;

pub use client::{
    ApiResponse, AuthenticatedClient, AuthenticatedClientBuilder, ClientError, LoginOutcome,
    MultipartForm, RefreshSnapshot, RequestBody, RequestDescriptor, UnauthenticatedRedirect,
    UnrecoverableAuth,
};
