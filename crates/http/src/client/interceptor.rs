//! Request and response interceptors applied to every call

use super::request::RequestBody;
use super::{ApiResponse, ClientError, RequestDescriptor};
use pitstop_core::{AuthToken, SessionStore};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};

/// Headers to send for `descriptor`
///
/// Any caller-supplied `Authorization` is dropped and replaced by the stored
/// bearer token. JSON content type is set unless the body is multipart, in
/// which case `reqwest` supplies the boundary-carrying content type.
pub(crate) fn outgoing_headers(
    descriptor: &RequestDescriptor,
    token: Option<&str>,
) -> Result<HeaderMap, ClientError> {
    let mut headers = descriptor.headers.clone();
    headers.remove(AUTHORIZATION);

    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ClientError::InvalidRequest("stored token is not a valid header value".into()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    match descriptor.body {
        RequestBody::Multipart(_) => {
            headers.remove(CONTENT_TYPE);
        }
        RequestBody::Empty | RequestBody::Json(_) => {
            headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static("application/json"));
        }
    }

    Ok(headers)
}

/// Persist a renewed token found in a successful response body
///
/// Returns the captured token.
pub(crate) fn capture_token(
    session: &SessionStore,
    response: &ApiResponse,
) -> Result<Option<String>, ClientError> {
    if !response.status().is_success() || response.bytes().is_empty() {
        return Ok(None);
    }
    let Ok(AuthToken { auth_token }) = serde_json::from_slice::<AuthToken>(response.bytes()) else {
        return Ok(None);
    };
    if auth_token.is_empty() {
        return Ok(None);
    }
    session.set_token(&auth_token)?;
    tracing::debug!("Stored renewed auth token from response");
    Ok(Some(auth_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MultipartForm;
    use pitstop_core::{MemoryStore, StorageKeys};
    use reqwest::StatusCode;
    use std::sync::Arc;

    fn session() -> SessionStore {
        SessionStore::open(Arc::new(MemoryStore::new()), StorageKeys::default()).unwrap()
    }

    #[test]
    fn test_caller_authorization_is_replaced() {
        let descriptor = RequestDescriptor::get("/partners")
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer bogus"))
            .header(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));

        let headers = outgoing_headers(&descriptor, Some("T1")).unwrap();
        let values: Vec<_> = headers.get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values, vec![&HeaderValue::from_static("Bearer T1")]);
    }

    #[test]
    fn test_no_token_means_no_authorization() {
        let descriptor = RequestDescriptor::get("/partners")
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer bogus"));
        let headers = outgoing_headers(&descriptor, None).unwrap();
        assert!(!headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_content_type_json_unless_multipart() {
        let headers = outgoing_headers(&RequestDescriptor::get("/regions"), None).unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/json");

        let upload = RequestDescriptor::post("/car_brands")
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .multipart(MultipartForm::new().text("name", "Audi"));
        let headers = outgoing_headers(&upload, None).unwrap();
        assert!(!headers.contains_key(CONTENT_TYPE));
    }

    #[test]
    fn test_caller_content_type_kept_for_json() {
        let descriptor = RequestDescriptor::post("/bookings").header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/merge-patch+json"),
        );
        let headers = outgoing_headers(&descriptor, None).unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/merge-patch+json");
    }

    #[test]
    fn test_capture_token_from_login_body() {
        let session = session();
        let response = ApiResponse::from_parts(
            StatusCode::OK,
            r#"{"auth_token":"T2","user":{"id":1}}"#,
        );
        let captured = capture_token(&session, &response).unwrap();
        assert_eq!(captured.as_deref(), Some("T2"));
        assert_eq!(session.token().unwrap().as_deref(), Some("T2"));
    }

    #[test]
    fn test_capture_ignores_bodies_without_token() {
        let session = session();
        session.set_token("T1").unwrap();

        for body in [r#"{"data":[]}"#, "[1,2,3]", "plain text", r#"{"auth_token":""}"#] {
            let response = ApiResponse::from_parts(StatusCode::OK, body);
            assert!(capture_token(&session, &response).unwrap().is_none());
        }
        let failed = ApiResponse::from_parts(StatusCode::UNAUTHORIZED, r#"{"auth_token":"X"}"#);
        assert!(capture_token(&session, &failed).unwrap().is_none());

        assert_eq!(session.token().unwrap().as_deref(), Some("T1"));
    }
}
