//! Replayable request descriptors

use super::ClientError;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use std::time::Duration;

/// Request body kept in owned form so the request can be sent again after a
/// token refresh
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

/// Owned multipart form, rebuilt into a `reqwest` form on every send
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

#[derive(Debug, Clone)]
struct FormPart {
    name: String,
    content: FormContent,
}

#[derive(Debug, Clone)]
enum FormContent {
    Text(String),
    File {
        bytes: Bytes,
        file_name: Option<String>,
        mime: Option<String>,
    },
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            content: FormContent::Text(value.into()),
        });
        self
    }

    /// Add a file field, e.g. a brand logo upload
    pub fn file(
        mut self,
        name: impl Into<String>,
        bytes: impl Into<Bytes>,
        file_name: Option<String>,
        mime: Option<String>,
    ) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            content: FormContent::File {
                bytes: bytes.into(),
                file_name,
                mime,
            },
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub(crate) fn to_form(&self) -> Result<reqwest::multipart::Form, ClientError> {
        let mut form = reqwest::multipart::Form::new();
        for part in &self.parts {
            form = match &part.content {
                FormContent::Text(value) => form.text(part.name.clone(), value.clone()),
                FormContent::File {
                    bytes,
                    file_name,
                    mime,
                } => {
                    let mut file = reqwest::multipart::Part::bytes(bytes.to_vec());
                    if let Some(file_name) = file_name {
                        file = file.file_name(file_name.clone());
                    }
                    if let Some(mime) = mime {
                        file = file.mime_str(mime).map_err(|e| {
                            ClientError::InvalidRequest(format!(
                                "invalid mime type for part '{}': {e}",
                                part.name
                            ))
                        })?;
                    }
                    form.part(part.name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// Everything needed to (re)issue one API call
///
/// Paths are relative to the configured `base_url + api_prefix`.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: RequestBody,
    pub(crate) timeout: Option<Duration>,
    /// Refreshes already spent on this request chain
    pub(crate) refresh_attempts: u32,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            timeout: None,
            refresh_attempts: 0,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a header; an `Authorization` header is always replaced by the
    /// client's own bearer token
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Serialize `body` as the JSON payload
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Override the client-wide timeout for this call (native targets only)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Whether a refresh has already been spent on this request
    pub fn is_retried(&self) -> bool {
        self.refresh_attempts > 0
    }
}
