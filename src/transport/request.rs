//! Request and response values exchanged with a [`Transport`](super::Transport)

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::types::identifiers::RequestId;

/// HTTP method subset used by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

/// Upload progress callback, called with `(bytes_sent, bytes_total)`
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Multipart file upload body
#[derive(Debug, Clone)]
pub struct UploadForm {
    /// Form field carrying the file
    pub file_field: String,
    /// File name
    pub file_name: String,
    /// MIME type
    pub mime: String,
    /// File content (cheap to clone for a replay)
    pub data: Bytes,
    /// Extra text fields
    pub fields: Vec<(String, String)>,
}

/// Request body
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// JSON body
    Json(serde_json::Value),
    /// Multipart file upload
    Multipart(UploadForm),
}

/// One backend call; cloned to replay it after a session refresh
#[derive(Clone)]
pub struct ApiRequest {
    /// Correlation id, sent as `X-Request-ID`
    pub id: RequestId,
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL, starting with `/`
    pub path: String,
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// Body
    pub body: RequestBody,
    /// Upload progress observer
    pub progress: Option<ProgressCallback>,
}

impl ApiRequest {
    /// Create a request with a fresh correlation id
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: RequestId::generate(),
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            progress: None,
        }
    }

    /// Create a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Create a POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Attach a JSON body
    ///
    /// # Errors
    /// Returns error if the body cannot be serialized
    pub fn json(mut self, body: &impl Serialize) -> Result<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach a multipart upload body
    #[must_use]
    pub fn multipart(mut self, form: UploadForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Observe upload progress
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl std::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = match &self.body {
            RequestBody::Empty => "empty".to_string(),
            RequestBody::Json(_) => "json".to_string(),
            RequestBody::Multipart(form) => format!("multipart({} bytes)", form.data.len()),
        };
        f.debug_struct("ApiRequest")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body", &body)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Successful (2xx) response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Status code
    pub status: u16,
    /// Raw body
    pub body: Bytes,
}

impl ApiResponse {
    /// Build a response from a JSON value
    #[must_use]
    pub fn from_json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            body: Bytes::from(value.to_string()),
        }
    }

    /// Decode the body as JSON
    ///
    /// # Errors
    /// Returns `Parse` if the body does not match `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}
