//! Single-flight session refresh
//!
//! [`SessionRefreshCoordinator`] wraps a [`Transport`](crate::transport::Transport)
//! and turns "401 on any request" into exactly one call to the refresh
//! endpoint, no matter how many requests fail inside the same window.
//!
//! # Module Structure
//!
//! - `coordinator` - Public handle, request replay
//! - `actor` - Background task owning the refresh state
//! - `commands` - Command protocol between handle and actor

mod actor;
mod commands;
mod coordinator;

pub use actor::RefreshSnapshot;
pub use coordinator::{RequestContext, SessionRefreshCoordinator};
