//! Buffered API responses

use super::ClientError;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// A fully-read response
///
/// The body is buffered so the response interceptor can look for a renewed
/// token before handing the response to the caller.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, ClientError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text, lossily decoded
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body; an empty body reads as JSON `null`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        if self.body.is_empty() {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-success response into the matching error
    pub(crate) fn into_error(self) -> ClientError {
        let message = if self.body.is_empty() {
            self.status.to_string()
        } else {
            self.text()
        };
        ClientError::from_status(self.status, message)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_json_body() {
        #[derive(Deserialize)]
        struct ServicePoint {
            id: u32,
            name: String,
        }

        let response = ApiResponse::from_parts(StatusCode::OK, r#"{"id":3,"name":"Kyiv #3"}"#);
        let point: ServicePoint = response.json().unwrap();
        assert_eq!(point.id, 3);
        assert_eq!(point.name, "Kyiv #3");
    }

    #[test]
    fn test_empty_body_reads_as_unit() {
        let response = ApiResponse::from_parts(StatusCode::NO_CONTENT, Bytes::new());
        let value: Option<serde_json::Value> = response.json().unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_into_error_uses_status_when_body_empty() {
        let err = ApiResponse::from_parts(StatusCode::BAD_GATEWAY, Bytes::new()).into_error();
        match err {
            ClientError::Http { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "502 Bad Gateway");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
