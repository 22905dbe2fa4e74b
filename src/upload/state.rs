//! Upload session lifecycle

use crate::types::identifiers::DocumentId;

/// State of an [`UploadPollSession`](super::UploadPollSession)
///
/// `Uploading → Polling → {Ready | Failed | TimedOut | Cancelled}`; the last
/// four are terminal. An upload whose response is already terminal skips
/// `Polling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// File body is being sent
    Uploading,
    /// Upload accepted; waiting for processing to finish
    Polling {
        /// Document created by the upload
        document_id: DocumentId,
    },
    /// Backend finished processing successfully
    Ready,
    /// Upload, a status fetch, or processing failed
    Failed,
    /// Processing did not finish before the timeout
    TimedOut,
    /// Cancelled by the caller
    Cancelled,
}

impl UploadState {
    /// Whether the session has finished
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Ready | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }
}

impl std::fmt::Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uploading => f.write_str("uploading"),
            Self::Polling { document_id } => write!(f, "polling document {document_id}"),
            Self::Ready => f.write_str("ready"),
            Self::Failed => f.write_str("failed"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}
