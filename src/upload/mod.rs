//! Upload-then-poll workflow
//!
//! An [`UploadPollSession`] uploads one file with progress reporting, then
//! polls the document status until the backend reports `ready` or `failed`,
//! the timeout elapses, or the caller cancels. The work runs on a spawned
//! driver task; the session is the handle to it.
//!
//! # Module Structure
//!
//! - `session` - Public handle (state, progress, snapshots, cancel, wait)
//! - `driver` - Background task running the state machine
//! - `state` - `UploadState` lifecycle

mod driver;
mod session;
mod state;

pub use crate::types::options::PollOptions;
pub use session::UploadPollSession;
pub use state::UploadState;

/// Multipart upload endpoint
pub const UPLOAD_PATH: &str = "/files/upload";

/// Path of a document's status endpoint
#[must_use]
pub fn document_path(id: crate::types::identifiers::DocumentId) -> String {
    format!("/files/{id}")
}
