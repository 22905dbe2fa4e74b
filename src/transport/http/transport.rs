//! `reqwest`-backed transport implementation

use bytes::Bytes;
use reqwest::StatusCode;

use crate::error::{GatewayError, Result};
use crate::transport::{ApiRequest, ApiResponse, RequestBody, Transport};
use crate::types::options::ClientOptions;

use super::body::multipart_form;

/// Header carrying the request correlation id
const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Longest raw error body copied into an error message
const MAX_ERROR_BODY: usize = 512;

/// HTTP transport for the gateway backend
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpTransport {
    /// Create a new HTTP transport
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be built
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(format!("gateway-client/{}", crate::VERSION));
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            bearer_token: options.bearer_token.clone(),
        })
    }

    /// Absolute URL for a backend path
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let ApiRequest {
            id,
            method,
            path,
            query,
            body,
            progress,
        } = request;

        let url = self.url(&path);
        log::debug!("{} {path} [{id}]", method.as_str());

        let mut builder = self
            .client
            .request(method.into(), &url)
            .header(REQUEST_ID_HEADER, id.as_str());
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(ref token) = self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(multipart_form(form, progress)?),
        };

        let response = builder
            .send()
            .await
            .inspect_err(|e| log::warn!("{} {url} [{id}] failed: {e}", method.as_str()))?;

        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return Ok(ApiResponse {
                status: status.as_u16(),
                body,
            });
        }

        log::debug!("{} {path} [{id}] -> {status}", method.as_str());
        Err(GatewayError::http(status.as_u16(), error_detail(status, &body)))
    }
}

fn join_url(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Best human-readable message for an error response
///
/// The backend answers `{"detail": "..."}`; validation errors carry a list.
fn error_detail(status: StatusCode, body: &Bytes) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body)
        && let Some(detail) = value.get("detail")
    {
        return match detail.as_str() {
            Some(text) => text.to_string(),
            None => detail.to_string(),
        };
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string();
    }
    text.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h:8000", "/files/1"), "http://h:8000/files/1");
        assert_eq!(join_url("http://h:8000", "files/1"), "http://h:8000/files/1");
    }

    #[test]
    fn test_trailing_slash_trimmed_from_base() {
        let options = ClientOptions::builder().base_url("http://h:8000/api/").build();
        let transport = HttpTransport::new(&options).unwrap();
        assert_eq!(transport.url("/auth/me"), "http://h:8000/api/auth/me");
    }

    #[test]
    fn test_error_detail_prefers_backend_detail() {
        let body = Bytes::from_static(br#"{"detail":"Document not found"}"#);
        assert_eq!(error_detail(StatusCode::NOT_FOUND, &body), "Document not found");

        let validation = Bytes::from_static(br#"{"detail":[{"loc":["body","email"]}]}"#);
        assert!(error_detail(StatusCode::UNPROCESSABLE_ENTITY, &validation).contains("email"));
    }

    #[test]
    fn test_error_detail_falls_back_to_reason() {
        assert_eq!(
            error_detail(StatusCode::BAD_GATEWAY, &Bytes::new()),
            "Bad Gateway"
        );
        assert_eq!(
            error_detail(StatusCode::INTERNAL_SERVER_ERROR, &Bytes::from_static(b"boom")),
            "boom"
        );
    }
}
