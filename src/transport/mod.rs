//! Transport layer for talking to the gateway backend
//!
//! A transport issues exactly one HTTP request and classifies the outcome:
//! a 2xx [`ApiResponse`], or a [`GatewayError`](crate::GatewayError) that is
//! `Network`, `Http { status, .. }` or `Parse`. It never retries; session
//! refresh and replay live in [`session`](crate::session).

mod http;
mod request;

use crate::error::Result;

/// Transport trait for issuing backend requests
///
/// Implementations must be shareable across tasks; the refresh coordinator
/// and upload drivers hold them behind an `Arc`.
pub trait Transport: Send + Sync {
    /// Issue one request
    ///
    /// # Errors
    /// Returns `Network` for connection failures, `Http` for any non-2xx
    /// status (401 included) and `Parse` for unreadable bodies
    fn execute(
        &self,
        request: ApiRequest,
    ) -> impl std::future::Future<Output = Result<ApiResponse>> + Send;
}

pub use http::HttpTransport;
pub use request::{
    ApiRequest, ApiResponse, Method, ProgressCallback, RequestBody, UploadForm,
};
