//! `SessionRefreshCoordinator` public handle

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot, watch};

use super::actor::{RefreshActor, RefreshSnapshot};
use super::commands::RefreshCommand;
use crate::error::{GatewayError, Result};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// A request plus its replay bookkeeping
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The request to issue
    pub request: ApiRequest,
    retried: bool,
}

impl RequestContext {
    /// Wrap a request that has not been replayed yet
    #[must_use]
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            retried: false,
        }
    }

    /// Whether this request already used its single post-refresh replay
    #[must_use]
    pub const fn already_retried(&self) -> bool {
        self.retried
    }
}

/// Wraps a [`Transport`] with single-flight session refresh
///
/// When a request fails with 401, the coordinator parks it until a session
/// refresh settles, starting one only if none is running, then replays it
/// exactly once. Any number of concurrent 401s inside the same refresh window
/// share one call to the refresh endpoint.
///
/// Must be created inside a Tokio runtime; it spawns its actor task.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use gateway_client::session::SessionRefreshCoordinator;
/// use gateway_client::transport::{ApiRequest, HttpTransport};
/// use gateway_client::ClientOptions;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = ClientOptions::default();
/// let transport = Arc::new(HttpTransport::new(&options)?);
/// let coordinator = SessionRefreshCoordinator::new(transport, "/auth/refresh");
///
/// let response = coordinator.execute(ApiRequest::get("/auth/me")).await?;
/// log::info!("status {}", response.status);
/// # Ok(())
/// # }
/// ```
pub struct SessionRefreshCoordinator<T> {
    transport: Arc<T>,
    command_tx: mpsc::UnboundedSender<RefreshCommand>,
    snapshot_rx: watch::Receiver<RefreshSnapshot>,
}

impl<T: Transport + 'static> SessionRefreshCoordinator<T> {
    /// Create a coordinator and spawn its refresh actor
    pub fn new(transport: Arc<T>, refresh_path: impl Into<String>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(RefreshSnapshot::default());

        RefreshActor::new(Arc::clone(&transport), refresh_path.into(), snapshot_tx).spawn(command_rx);

        Self {
            transport,
            command_tx,
            snapshot_rx,
        }
    }

    /// Underlying transport, for calls that must bypass refresh (login)
    #[must_use]
    pub const fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Current refresh state
    #[must_use]
    pub fn snapshot(&self) -> RefreshSnapshot {
        *self.snapshot_rx.borrow()
    }

    /// Watch refresh state changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RefreshSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Issue a request, refreshing the session and replaying once on 401
    ///
    /// # Errors
    /// - `RefreshFailed` if the shared refresh failed
    /// - `AuthRejected` if the replay was rejected again
    /// - any non-auth transport failure, unchanged
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.execute_with(RequestContext::new(request)).await
    }

    /// Issue a request and decode its JSON body
    ///
    /// # Errors
    /// Same as [`execute`](Self::execute), plus `Parse` for a bad body
    pub async fn execute_json<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        self.execute(request).await?.json()
    }

    /// Issue a request carrying explicit replay bookkeeping
    ///
    /// The `retried` flag caps replays at one: a 401 on an already replayed
    /// request is final and never parks for another refresh.
    ///
    /// # Errors
    /// Same as [`execute`](Self::execute)
    pub async fn execute_with(&self, mut ctx: RequestContext) -> Result<ApiResponse> {
        loop {
            let err = match self.transport.execute(ctx.request.clone()).await {
                Err(err) if err.is_auth_failure() => err,
                other => return other,
            };

            if ctx.retried {
                log::warn!(
                    "{} {} [{}] rejected again after session refresh",
                    ctx.request.method.as_str(),
                    ctx.request.path,
                    ctx.request.id
                );
                return Err(GatewayError::auth_rejected(err.to_string()));
            }

            self.await_refresh(ctx.request.id.as_str()).await?;
            ctx.retried = true;
            log::debug!(
                "Replaying {} {} [{}] after session refresh",
                ctx.request.method.as_str(),
                ctx.request.path,
                ctx.request.id
            );
        }
    }

    /// Refresh the session now, joining a refresh already in flight
    ///
    /// # Errors
    /// Returns `RefreshFailed` if the refresh endpoint rejected the session
    pub async fn refresh_session(&self) -> Result<()> {
        self.await_refresh("explicit").await
    }

    async fn await_refresh(&self, request_id: &str) -> Result<()> {
        let (waiter, resumed) = oneshot::channel();
        self.command_tx
            .send(RefreshCommand::AwaitRefresh {
                request_id: request_id.to_string(),
                waiter,
            })
            .map_err(|_| GatewayError::closed("Refresh coordinator stopped"))?;

        match resumed.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(cause)) => Err(GatewayError::RefreshFailed(cause)),
            Err(_) => Err(GatewayError::closed("Refresh coordinator dropped the waiter")),
        }
    }
}
