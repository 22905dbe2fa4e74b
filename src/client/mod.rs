//! `GatewayClient` facade
//!
//! Bundles the pieces a front end needs for one signed-in user:
//!
//! ```text
//!   GatewayClient
//!     ├── auth          login / register / logout / me   (user cache)
//!     ├── conversation  messages, completion             (ActiveContextGuard)
//!     └── documents     fetch, upload + poll             (UploadPollSession)
//!            │
//!            ▼
//!   SessionRefreshCoordinator  ── single-flight refresh, one replay
//!            │
//!            ▼
//!        Transport (HttpTransport by default)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gateway_client::{ClientOptions, ContextId, GatewayClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GatewayClient::new(ClientOptions::from_env()?)?;
//! let me = client.login("ada@example.com", "correct horse").await?;
//! log::info!("signed in as {}", me.email);
//!
//! let chat = ContextId::new(7);
//! client.switch_context(chat);
//! client.load_messages(chat).await?;
//! client.send_message(chat, "Summarise the uploaded paper").await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod conversation;
mod documents;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::ActiveContextGuard;
use crate::error::Result;
use crate::session::SessionRefreshCoordinator;
use crate::transport::{HttpTransport, Transport};
use crate::types::auth::UserProfile;
use crate::types::options::ClientOptions;

/// Client for the gateway backend
///
/// Must be created inside a Tokio runtime: the refresh coordinator spawns
/// its actor task on construction.
pub struct GatewayClient<T: Transport + 'static = HttpTransport> {
    options: ClientOptions,
    coordinator: Arc<SessionRefreshCoordinator<T>>,
    context: ActiveContextGuard,
    user: RwLock<Option<UserProfile>>,
}

impl GatewayClient<HttpTransport> {
    /// Create a client talking HTTP to `options.base_url`
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the options are invalid or the HTTP client
    /// cannot be built
    pub fn new(options: ClientOptions) -> Result<Self> {
        options.validate()?;
        let transport = HttpTransport::new(&options)?;
        Self::with_transport(options, transport)
    }
}

impl<T: Transport + 'static> GatewayClient<T> {
    /// Create a client over a custom transport
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the options are invalid
    pub fn with_transport(options: ClientOptions, transport: T) -> Result<Self> {
        options.validate()?;
        let coordinator = Arc::new(SessionRefreshCoordinator::new(
            Arc::new(transport),
            options.refresh_path.clone(),
        ));
        log::debug!("Gateway client ready for {}", options.base_url);

        Ok(Self {
            options,
            coordinator,
            context: ActiveContextGuard::new(),
            user: RwLock::new(None),
        })
    }

    /// Options the client was built with
    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Refresh coordinator every authenticated call goes through
    #[must_use]
    pub const fn coordinator(&self) -> &Arc<SessionRefreshCoordinator<T>> {
        &self.coordinator
    }

    /// Active conversation guard
    #[must_use]
    pub const fn context(&self) -> &ActiveContextGuard {
        &self.context
    }

    fn transport(&self) -> &T {
        self.coordinator.transport()
    }
}
