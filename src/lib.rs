//! # Gateway Client for Rust
//!
//! Client-side coordination layer for the document/chat gateway backend. It
//! keeps authenticated sessions alive, keeps slow responses for an old
//! conversation out of the current one, and drives uploads through
//! processing.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gateway_client::{ClientOptions, GatewayClient, UploadFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GatewayClient::new(ClientOptions::from_env()?)?;
//!     let me = client.login("ada@example.com", "correct horse").await?;
//!
//!     let file = UploadFile::from_path("paper.pdf").await?;
//!     let mut session = client.upload(file, me.id)?;
//!     let document = session.wait().await?.into_ready()?;
//!     log::info!("document {} is ready", document.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Core Mechanisms
//!
//! ### 1. Single-flight session refresh
//!
//! Every authenticated call goes through a [`SessionRefreshCoordinator`].
//! A 401 parks the call until one shared `POST /auth/refresh` settles, then
//! replays it once. However many calls expire together, the refresh endpoint
//! is hit once; a 401 on the replay is final ([`GatewayError::AuthRejected`]).
//!
//! ### 2. Active-context guard
//!
//! [`ActiveContextGuard`] stamps conversation calls with the active
//! conversation and a switch generation. Results that come back after the
//! user switched away are dropped as [`Guarded::Stale`], errors included.
//!
//! ### 3. Upload and poll
//!
//! [`UploadPollSession`] uploads with progress, then polls
//! `GET /files/{id}` on a fixed interval until the document is `ready` or
//! `failed`, the timeout elapses, or the caller cancels.
//!
//! ## Architecture
//!
//! - [`types`]: ids, options, documents, messages, auth payloads
//! - [`transport`]: one request in, one classified result out
//! - [`session`]: refresh coordinator
//! - [`context`]: stale-result guard
//! - [`upload`]: upload-and-poll state machine
//! - [`client`]: [`GatewayClient`] facade
//! - [`error`]: error types and [`FailureCause`]
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, GatewayError>`](Result).
//! [`GatewayError::failure_cause`] tells apart what needs different
//! guidance:
//!
//! ```no_run
//! # use gateway_client::{FailureCause, GatewayError};
//! # fn report(err: &GatewayError) {
//! match err.failure_cause() {
//!     FailureCause::Timeout => log::warn!("Still processing, check back later"),
//!     FailureCause::Processing => log::error!("The file could not be processed: {err}"),
//!     FailureCause::Auth => log::error!("Please sign in again"),
//!     _ => log::error!("Request failed, try again: {err}"),
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod context;
pub mod error;
pub mod session;
pub mod transport;
pub mod types;
pub mod upload;

// Re-export commonly used types for external API
pub use client::GatewayClient;
pub use context::{ActiveContextGuard, ContextToken, Guarded};
pub use error::{FailureCause, GatewayError, Result};
pub use session::{RefreshSnapshot, RequestContext, SessionRefreshCoordinator};
pub use transport::{HttpTransport, Transport};
pub use upload::{UploadPollSession, UploadState};

// Re-export type submodules for flat public API
pub use types::auth::{RegisterRequest, UserProfile};
pub use types::document::{Document, DocumentStatus, UploadFile};
pub use types::identifiers::{ContextId, DocumentId, MessageId, RequestId, UserId};
pub use types::messages::{CompletionOptions, Message, Role};
pub use types::options::{ClientOptions, ClientOptionsBuilder, PollOptions};

/// Version of the client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
