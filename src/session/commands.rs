//! Command protocol for the refresh actor
//!
//! Callers never touch the refresh state directly; they send commands over a
//! channel and the actor task applies them one at a time.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::GatewayError;

/// Shared outcome of one refresh cycle, handed to every waiter
pub(super) type RefreshOutcome = std::result::Result<(), Arc<GatewayError>>;

/// Commands that can be sent to the refresh actor
pub(super) enum RefreshCommand {
    /// Wait for a session refresh, starting one if none is in flight
    AwaitRefresh {
        /// Correlation id of the request that hit the auth failure
        request_id: String,
        /// Channel resumed once the refresh settles
        waiter: oneshot::Sender<RefreshOutcome>,
    },
}
