//! HTTP transport built on `reqwest`
//!
//! Keeps a cookie store so backend session cookies (access + refresh) travel
//! with every request, and streams multipart uploads in chunks so progress
//! can be observed.

mod body;
mod transport;

pub use transport::HttpTransport;
