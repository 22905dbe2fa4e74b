//! Uploaded document types
//!
//! Mirrors the gateway's document payloads. A document moves
//! `queued → processing → {ready | failed}` and never leaves a terminal state.

use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::{DocumentId, UserId};
use crate::error::{GatewayError, Result};

/// Backend processing status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Accepted, waiting for a worker
    Queued,
    /// Being parsed and chunked
    Processing,
    /// Processing finished successfully
    Ready,
    /// Processing finished with an error
    Failed,
}

impl DocumentStatus {
    /// Whether no further transition can happen
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    /// Position in the lifecycle; both terminal states share the last rank
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Processing => 1,
            Self::Ready | Self::Failed => 2,
        }
    }

    /// Whether moving from `self` to `next` respects the lifecycle
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return self == next;
        }
        next.rank() >= self.rank()
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Parsed text chunk of a ready document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Chunk id
    pub id: u64,
    /// Position within the document
    pub seq: u32,
    /// Chunk text
    pub text: String,
    /// First page covered, when known
    #[serde(default)]
    pub page_from: Option<u32>,
    /// Last page covered, when known
    #[serde(default)]
    pub page_to: Option<u32>,
}

/// Document as returned by `/files/upload` and `/files/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id
    pub id: DocumentId,
    /// Owner
    pub user_id: UserId,
    /// File name as uploaded
    pub original_name: String,
    /// File name on the backend
    #[serde(default)]
    pub stored_name: String,
    /// MIME type
    pub mime: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Hex SHA-256 of the content
    pub sha256: String,
    /// Backend storage path
    #[serde(default)]
    pub path: String,
    /// Processing status
    pub status: DocumentStatus,
    /// Error message when `status` is `failed`
    #[serde(default)]
    pub error: Option<String>,
    /// Page count, once parsed
    #[serde(default)]
    pub page_count: Option<u32>,
    /// Extracted title
    #[serde(default)]
    pub title: Option<String>,
    /// Extracted author
    #[serde(default)]
    pub author: Option<String>,
    /// Detected language
    #[serde(default)]
    pub language: Option<String>,
    /// When processing finished
    #[serde(default, deserialize_with = "super::timestamp::utc_opt")]
    pub ingested_at: Option<DateTime<Utc>>,
    /// Worker that processed it
    #[serde(default)]
    pub processed_by: Option<String>,
    /// Backend-side processing progress
    #[serde(default)]
    pub progress_percent: Option<u8>,
    /// Chunks (only on `/files/{id}`)
    #[serde(default)]
    pub chunks: Vec<DocumentChunk>,
}

impl Document {
    /// Turn a `failed` document into a [`GatewayError::ProcessingFailed`]
    ///
    /// # Errors
    /// Returns `ProcessingFailed` when the status is `failed`
    pub fn into_ready(self) -> Result<Self> {
        if self.status == DocumentStatus::Failed {
            return Err(GatewayError::ProcessingFailed {
                document_id: self.id,
                reason: self
                    .error
                    .unwrap_or_else(|| "no error reported".to_string()),
            });
        }
        Ok(self)
    }
}

// ============================================================================
// Upload Input
// ============================================================================

/// File content queued for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// File name sent to the backend
    pub file_name: String,
    /// MIME type sent to the backend
    pub mime: String,
    /// File content
    pub data: Bytes,
}

impl UploadFile {
    /// Create an upload from in-memory content
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, inferring the MIME type from its extension
    ///
    /// # Errors
    /// Returns error if the file cannot be read
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        Ok(Self {
            mime: mime_for(path).to_string(),
            file_name,
            data: Bytes::from(data),
        })
    }

    /// Size of the content in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the content is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// MIME type for the formats the backend parses
fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        _ => "application/octet-stream",
    }
}
