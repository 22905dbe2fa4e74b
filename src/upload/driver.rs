//! Background task driving one upload session
//!
//! The task owns every state transition: it uploads, then ticks a single
//! interval timer and issues one status fetch per tick. A tick is only
//! awaited after the previous fetch returned, so fetches never overlap.

use std::sync::{Arc, OnceLock};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::state::UploadState;
use super::{UPLOAD_PATH, document_path};
use crate::error::{GatewayError, Result};
use crate::session::SessionRefreshCoordinator;
use crate::transport::{ApiRequest, ProgressCallback, Transport, UploadForm};
use crate::types::document::{Document, DocumentStatus};
use crate::types::identifiers::DocumentId;
use crate::types::options::PollOptions;

/// Channels and settings shared between the driver and its session handle
pub(super) struct DriverContext {
    pub options: PollOptions,
    pub started_at: Instant,
    pub cancel: CancellationToken,
    pub state_tx: watch::Sender<UploadState>,
    pub progress_tx: Arc<watch::Sender<u8>>,
    pub snapshot_tx: mpsc::UnboundedSender<Document>,
    pub document_id: Arc<OnceLock<DocumentId>>,
    pub result_tx: oneshot::Sender<Result<Document>>,
}

/// Spawn the driver task for one upload
///
/// The task ends once a terminal state is published; the result is sent
/// after the state so a caller woken by it always sees the final state.
pub(super) fn spawn_upload_driver<T: Transport + 'static>(
    coordinator: Arc<SessionRefreshCoordinator<T>>,
    form: UploadForm,
    ctx: DriverContext,
) {
    tokio::spawn(async move {
        let DriverContext {
            options,
            started_at,
            cancel,
            state_tx,
            progress_tx,
            snapshot_tx,
            document_id,
            result_tx,
        } = ctx;

        let mut driver = UploadDriver {
            coordinator,
            options,
            started_at,
            cancel,
            state_tx,
            progress_tx,
            snapshot_tx,
            document_id,
            last_status: None,
        };

        let outcome = driver.drive(form).await;
        let terminal = terminal_state(&outcome);
        log::info!("Upload session finished: {terminal}");
        driver.state_tx.send_replace(terminal);

        // Closing the snapshot channel ends the snapshot stream
        drop(driver);
        let _ = result_tx.send(outcome);
    });
}

struct UploadDriver<T> {
    coordinator: Arc<SessionRefreshCoordinator<T>>,
    options: PollOptions,
    started_at: Instant,
    cancel: CancellationToken,
    state_tx: watch::Sender<UploadState>,
    progress_tx: Arc<watch::Sender<u8>>,
    snapshot_tx: mpsc::UnboundedSender<Document>,
    document_id: Arc<OnceLock<DocumentId>>,
    last_status: Option<DocumentStatus>,
}

impl<T: Transport + 'static> UploadDriver<T> {
    async fn drive(&mut self, form: UploadForm) -> Result<Document> {
        log::debug!("Uploading {} ({} bytes)", form.file_name, form.data.len());
        let request = ApiRequest::post(UPLOAD_PATH)
            .multipart(form)
            .with_progress(self.progress_callback());

        let uploaded: Document = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(GatewayError::cancelled("upload cancelled")),
            result = self.coordinator.execute_json::<Document>(request) => result?,
        };
        publish_progress(&self.progress_tx, 100);

        let id = uploaded.id;
        let _ = self.document_id.set(id);
        log::info!("Upload accepted as document {id} ({})", uploaded.status);

        let already_terminal = uploaded.status.is_terminal();
        self.observe(uploaded.clone());
        if already_terminal {
            return Ok(uploaded);
        }
        self.state_tx.send_replace(UploadState::Polling { document_id: id });

        self.poll(id).await
    }

    async fn poll(&mut self, id: DocumentId) -> Result<Document> {
        let interval = self.options.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls: u32 = 0;

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(GatewayError::cancelled("upload cancelled")),
                _ = ticker.tick() => {}
            }

            polls += 1;
            let request = ApiRequest::get(document_path(id));
            let fetched: Document = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(GatewayError::cancelled("upload cancelled")),
                result = self.coordinator.execute_json::<Document>(request) => match result {
                    Ok(doc) => doc,
                    Err(e) => {
                        log::warn!("Status fetch {polls} for document {id} failed: {e}");
                        return Err(e);
                    }
                },
            };
            log::debug!("Poll {polls} for document {id}: {}", fetched.status);

            if let Some(doc) = self.observe(fetched)
                && doc.status.is_terminal()
            {
                return Ok(doc);
            }

            let elapsed = self.started_at.elapsed();
            if elapsed >= self.options.timeout {
                return Err(GatewayError::PollTimeout {
                    document_id: id,
                    elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                });
            }
        }
    }

    /// Record a fetched document, ignoring status regressions
    ///
    /// Returns the document if it was accepted.
    fn observe(&mut self, doc: Document) -> Option<Document> {
        if let Some(last) = self.last_status
            && !last.can_advance_to(doc.status)
        {
            log::warn!(
                "Ignoring status regression for document {}: {last} -> {}",
                doc.id,
                doc.status
            );
            return None;
        }
        self.last_status = Some(doc.status);
        let _ = self.snapshot_tx.send(doc.clone());
        Some(doc)
    }

    fn progress_callback(&self) -> ProgressCallback {
        let progress_tx = Arc::clone(&self.progress_tx);
        Arc::new(move |sent: u64, total: u64| publish_progress(&progress_tx, percent(sent, total)))
    }
}

/// Publish a percentage, never moving backwards (a replayed upload restarts at 0)
fn publish_progress(progress_tx: &watch::Sender<u8>, pct: u8) {
    progress_tx.send_if_modified(|current| {
        if pct > *current {
            *current = pct;
            true
        } else {
            false
        }
    });
}

/// Rounded upload percentage
fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (u128::from(sent) * 100 + u128::from(total) / 2) / u128::from(total);
    u8::try_from(pct.min(100)).unwrap_or(100)
}

fn terminal_state(outcome: &Result<Document>) -> UploadState {
    match outcome {
        Ok(doc) if doc.status == DocumentStatus::Ready => UploadState::Ready,
        Ok(_) => UploadState::Failed,
        Err(GatewayError::PollTimeout { .. }) => UploadState::TimedOut,
        Err(GatewayError::Cancelled(_)) => UploadState::Cancelled,
        Err(_) => UploadState::Failed,
    }
}
