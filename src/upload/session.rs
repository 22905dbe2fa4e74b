//! `UploadPollSession` handle

use std::sync::{Arc, OnceLock};

use futures::Stream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::driver::{DriverContext, spawn_upload_driver};
use super::state::UploadState;
use crate::error::{GatewayError, Result};
use crate::session::SessionRefreshCoordinator;
use crate::transport::{Transport, UploadForm};
use crate::types::document::{Document, UploadFile};
use crate::types::identifiers::{DocumentId, UserId};
use crate::types::options::PollOptions;

/// Multipart field carrying the file
const FILE_FIELD: &str = "f";

/// One upload followed by status polling
///
/// Created by [`GatewayClient::upload`](crate::GatewayClient::upload). The
/// work runs on its own task; this handle observes and controls it. Dropping
/// the handle cancels the session.
///
/// # Examples
///
/// ```no_run
/// use futures::StreamExt;
/// use gateway_client::{ClientOptions, GatewayClient, UploadFile, UserId};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GatewayClient::new(ClientOptions::from_env()?)?;
/// let file = UploadFile::from_path("paper.pdf").await?;
/// let mut session = client.upload(file, UserId::new(1))?;
///
/// let mut progress = Box::pin(session.progress_stream());
/// while let Some(pct) = progress.next().await {
///     println!("uploaded {pct}%");
/// }
///
/// let document = session.wait().await?.into_ready()?;
/// println!("{} has {} chunks", document.original_name, document.chunks.len());
/// # Ok(())
/// # }
/// ```
pub struct UploadPollSession {
    file_name: String,
    options: PollOptions,
    started_at: Instant,
    cancel: CancellationToken,
    state_rx: watch::Receiver<UploadState>,
    progress_rx: watch::Receiver<u8>,
    snapshot_rx: Option<mpsc::UnboundedReceiver<Document>>,
    result_rx: Option<oneshot::Receiver<Result<Document>>>,
    document_id: Arc<OnceLock<DocumentId>>,
}

impl UploadPollSession {
    /// Start uploading `file` for `user_id` and spawn the driver task
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if `options` cannot make progress
    pub fn start<T: Transport + 'static>(
        coordinator: Arc<SessionRefreshCoordinator<T>>,
        file: UploadFile,
        user_id: UserId,
        options: PollOptions,
    ) -> Result<Self> {
        options.validate()?;

        let started_at = Instant::now();
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(UploadState::Uploading);
        let (progress_tx, progress_rx) = watch::channel(0u8);
        let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = oneshot::channel();
        let document_id = Arc::new(OnceLock::new());

        let file_name = file.file_name.clone();
        let form = UploadForm {
            file_field: FILE_FIELD.to_string(),
            file_name: file.file_name,
            mime: file.mime,
            data: file.data,
            fields: vec![("user_id".to_string(), user_id.to_string())],
        };

        spawn_upload_driver(
            coordinator,
            form,
            DriverContext {
                options,
                started_at,
                cancel: cancel.clone(),
                state_tx,
                progress_tx: Arc::new(progress_tx),
                snapshot_tx,
                document_id: Arc::clone(&document_id),
                result_tx,
            },
        );

        Ok(Self {
            file_name,
            options,
            started_at,
            cancel,
            state_rx,
            progress_rx,
            snapshot_rx: Some(snapshot_rx),
            result_rx: Some(result_rx),
            document_id,
        })
    }

    /// Name of the uploaded file
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Poll settings in effect
    #[must_use]
    pub const fn options(&self) -> PollOptions {
        self.options
    }

    /// When the upload started; the timeout is measured from here
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Document created by the upload, once the backend accepted it
    #[must_use]
    pub fn document_id(&self) -> Option<DocumentId> {
        self.document_id.get().copied()
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> UploadState {
        *self.state_rx.borrow()
    }

    /// Watch state transitions
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<UploadState> {
        self.state_rx.clone()
    }

    /// Current upload percentage (0 to 100)
    #[must_use]
    pub fn progress(&self) -> u8 {
        *self.progress_rx.borrow()
    }

    /// Watch the upload percentage
    #[must_use]
    pub fn watch_progress(&self) -> watch::Receiver<u8> {
        self.progress_rx.clone()
    }

    /// Upload percentages as they change
    ///
    /// Starts with the current value and ends after yielding 100, or when the
    /// session finishes without completing the upload.
    pub fn progress_stream(&self) -> impl Stream<Item = u8> + Send + use<> {
        let mut progress_rx = self.progress_rx.clone();
        async_stream::stream! {
            loop {
                let pct = *progress_rx.borrow_and_update();
                yield pct;
                if pct >= 100 || progress_rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    /// Documents observed by the session, in order, without regressions
    ///
    /// The first item is the upload response, then one per accepted poll.
    /// The stream ends when the session reaches a terminal state. Returns
    /// `None` if the snapshots were already taken.
    pub fn take_snapshots(&mut self) -> Option<impl Stream<Item = Document> + Send + use<>> {
        let mut snapshot_rx = self.snapshot_rx.take()?;
        Some(async_stream::stream! {
            while let Some(doc) = snapshot_rx.recv().await {
                yield doc;
            }
        })
    }

    /// Stop the session
    ///
    /// Pending work resolves with `Cancelled` and no further request is
    /// issued. A session that already finished is left untouched.
    pub fn cancel(&self) {
        if self.state().is_terminal() {
            return;
        }
        log::debug!("Cancelling upload of {}", self.file_name);
        self.cancel.cancel();
    }

    /// Whether [`cancel`](Self::cancel) took effect or the handle was dropped
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the session to finish
    ///
    /// Resolves with the final document, whose status is `ready` or `failed`;
    /// use [`Document::into_ready`] to turn a processing failure into an
    /// error.
    ///
    /// # Errors
    /// - the upload or status fetch error (`Network`, `Http`, `Parse`, auth)
    /// - `PollTimeout` if processing outlived the timeout
    /// - `Cancelled` if the session was cancelled
    /// - `Closed` if called twice
    pub async fn wait(&mut self) -> Result<Document> {
        let result_rx = self
            .result_rx
            .take()
            .ok_or_else(|| GatewayError::closed("Upload result already taken"))?;
        result_rx
            .await
            .map_err(|_| GatewayError::closed("Upload driver stopped without a result"))?
    }
}

impl std::fmt::Debug for UploadPollSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadPollSession")
            .field("file_name", &self.file_name)
            .field("document_id", &self.document_id())
            .field("state", &self.state())
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}

impl Drop for UploadPollSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
