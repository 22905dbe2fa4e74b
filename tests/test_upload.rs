//! Tests for the upload-and-poll session
//!
//! Time is paused, so poll intervals and the two-minute timeout run
//! instantly and elapsed times are exact.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio::time::Instant;

use common::{
    CallLog, MockTransport, ack, document_json, init_logger, ok, status, unauthorized,
};
use gateway_client::transport::ApiRequest;
use gateway_client::{
    ClientOptions, DocumentId, DocumentStatus, FailureCause, GatewayClient, GatewayError,
    PollOptions, UploadFile, UploadState, UserId,
};

const UPLOAD: &str = "/files/upload";
const DOC: &str = "/files/42";

fn pdf() -> UploadFile {
    UploadFile::new("paper.pdf", "application/pdf", vec![0x25u8; 2048])
}

/// Backend whose upload answers `upload` and whose status endpoint walks
/// through `polls`, repeating the last entry; `Err(code)` answers that status
fn backend(
    upload: Result<Value, GatewayError>,
    polls: Vec<Result<Value, u16>>,
) -> (GatewayClient<MockTransport>, CallLog) {
    let upload = Arc::new(parking_lot::Mutex::new(Some(upload)));
    let polls = Arc::new(polls);
    let next = Arc::new(AtomicUsize::new(0));

    let (transport, log) = MockTransport::new(move |request: ApiRequest| {
        let upload = Arc::clone(&upload);
        let polls = Arc::clone(&polls);
        let next = Arc::clone(&next);
        async move {
            match request.path.as_str() {
                UPLOAD => {
                    if let Some(progress) = &request.progress {
                        progress(0, 2048);
                        progress(1024, 2048);
                        progress(2048, 2048);
                    }
                    match upload.lock().take() {
                        Some(Ok(doc)) => ok(doc),
                        Some(Err(e)) => Err(e),
                        None => status(409, "already uploaded"),
                    }
                }
                DOC if !polls.is_empty() => {
                    let i = next.fetch_add(1, Ordering::SeqCst).min(polls.len() - 1);
                    match &polls[i] {
                        Ok(doc) => ok(doc.clone()),
                        Err(code) => status(*code, "status fetch failed"),
                    }
                }
                _ => status(404, "Not Found"),
            }
        }
    });

    let client = GatewayClient::with_transport(ClientOptions::default(), transport).unwrap();
    (client, log)
}

#[tokio::test(start_paused = true)]
async fn test_upload_then_poll_until_ready() {
    init_logger();
    let (client, log) = backend(
        Ok(document_json(42, "queued")),
        vec![Ok(document_json(42, "processing")), Ok(document_json(42, "ready"))],
    );

    let started = Instant::now();
    let mut session = client.upload(pdf(), UserId::new(1)).unwrap();
    let doc = session.wait().await.unwrap();

    assert_eq!(doc.id, DocumentId::new(42));
    assert_eq!(doc.status, DocumentStatus::Ready);
    assert_eq!(session.state(), UploadState::Ready);
    assert_eq!(session.document_id(), Some(DocumentId::new(42)));
    assert_eq!(log.count(DOC), 2);
    assert_eq!(started.elapsed(), Duration::from_millis(3000));

    let polls = log.for_path(DOC);
    assert_eq!(polls[0].at - started, Duration::from_millis(1500));
    assert_eq!(polls[1].at - polls[0].at, Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn test_upload_sends_file_field_and_owner() {
    init_logger();
    let (client, log) = backend(Ok(document_json(42, "ready")), vec![]);

    let mut session = client.upload(pdf(), UserId::new(7)).unwrap();
    session.wait().await.unwrap();

    let upload = &log.for_path(UPLOAD)[0];
    assert_eq!(upload.file_field.as_deref(), Some("f"));
    assert_eq!(upload.form_fields, vec![("user_id".to_string(), "7".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn test_poll_timeout_stops_at_first_tick_past_deadline() {
    init_logger();
    let (client, log) = backend(
        Ok(document_json(42, "queued")),
        vec![Ok(document_json(42, "processing"))],
    );

    let mut session = client.upload(pdf(), UserId::new(1)).unwrap();
    let err = session.wait().await.unwrap_err();

    assert!(matches!(
        err,
        GatewayError::PollTimeout { document_id, elapsed_ms: 120_000 } if document_id == DocumentId::new(42)
    ));
    assert_eq!(err.failure_cause(), FailureCause::Timeout);
    assert_eq!(session.state(), UploadState::TimedOut);
    assert_eq!(log.count(DOC), 80);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(log.count(DOC), 80, "no tick after timeout");
}

#[tokio::test(start_paused = true)]
async fn test_custom_poll_options_override_defaults() {
    init_logger();
    let (client, log) = backend(
        Ok(document_json(42, "queued")),
        vec![Ok(document_json(42, "processing"))],
    );

    let options = PollOptions::default()
        .with_interval(Duration::from_millis(500))
        .with_timeout(Duration::from_secs(2));
    let mut session = client.upload_with(pdf(), UserId::new(1), options).unwrap();

    assert!(matches!(session.wait().await, Err(GatewayError::PollTimeout { .. })));
    assert_eq!(log.count(DOC), 4);
}

#[tokio::test(start_paused = true)]
async fn test_status_fetch_error_fails_without_retry() {
    init_logger();
    let (client, log) = backend(
        Ok(document_json(42, "queued")),
        vec![Err(500)],
    );

    let mut session = client.upload(pdf(), UserId::new(1)).unwrap();
    let err = session.wait().await.unwrap_err();

    assert!(matches!(err, GatewayError::Http { status: 500, .. }));
    assert_eq!(err.failure_cause(), FailureCause::Transport);
    assert_eq!(session.state(), UploadState::Failed);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(log.count(DOC), 1);
}

#[tokio::test(start_paused = true)]
async fn test_upload_failure_never_polls() {
    init_logger();
    let (client, log) = backend(Err(GatewayError::network("connection reset")), vec![]);

    let mut session = client.upload(pdf(), UserId::new(1)).unwrap();
    let result = session.wait().await;

    assert!(matches!(result, Err(GatewayError::Network(_))));
    assert_eq!(session.state(), UploadState::Failed);
    assert_eq!(session.document_id(), None);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(log.count(DOC), 0);
}

#[tokio::test(start_paused = true)]
async fn test_processing_failure_resolves_with_failed_document() {
    init_logger();
    let (client, _log) = backend(
        Ok(document_json(42, "queued")),
        vec![Ok(document_json(42, "failed"))],
    );

    let mut session = client.upload(pdf(), UserId::new(1)).unwrap();
    let doc = session.wait().await.unwrap();

    assert_eq!(doc.status, DocumentStatus::Failed);
    assert_eq!(session.state(), UploadState::Failed);
    match doc.into_ready() {
        Err(err @ GatewayError::ProcessingFailed { .. }) => {
            assert_eq!(err.failure_cause(), FailureCause::Processing);
        }
        other => panic!("expected ProcessingFailed, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_terminal_upload_response_skips_polling() {
    init_logger();
    let (client, log) = backend(Ok(document_json(42, "ready")), vec![]);

    let mut session = client.upload(pdf(), UserId::new(1)).unwrap();
    let doc = session.wait().await.unwrap();

    assert_eq!(doc.status, DocumentStatus::Ready);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(log.count(DOC), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_further_requests() {
    init_logger();
    let (client, log) = backend(
        Ok(document_json(42, "queued")),
        vec![Ok(document_json(42, "processing"))],
    );

    let mut session = client.upload(pdf(), UserId::new(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert_eq!(log.count(DOC), 2);
    assert_eq!(
        session.state(),
        UploadState::Polling {
            document_id: DocumentId::new(42)
        }
    );

    session.cancel();
    let result = session.wait().await;

    assert!(matches!(result, Err(GatewayError::Cancelled(_))));
    assert_eq!(session.state(), UploadState::Cancelled);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(log.count(DOC), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_ready_has_no_effect() {
    init_logger();
    let (client, log) = backend(
        Ok(document_json(42, "queued")),
        vec![Ok(document_json(42, "ready"))],
    );

    let mut session = client.upload(pdf(), UserId::new(1)).unwrap();
    let doc = session.wait().await.unwrap();
    let calls = log.total();

    session.cancel();
    session.cancel();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(doc.status, DocumentStatus::Ready);
    assert_eq!(session.state(), UploadState::Ready);
    assert!(!session.is_cancelled());
    assert_eq!(log.total(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_session_cancels_it() {
    init_logger();
    let (client, log) = backend(
        Ok(document_json(42, "queued")),
        vec![Ok(document_json(42, "processing"))],
    );

    let session = client.upload(pdf(), UserId::new(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(log.count(DOC), 1);

    drop(session);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(log.count(DOC), 1);
}

#[tokio::test(start_paused = true)]
async fn test_snapshots_never_regress() {
    init_logger();
    let (client, log) = backend(
        Ok(document_json(42, "queued")),
        vec![
            Ok(document_json(42, "processing")),
            Ok(document_json(42, "queued")),
            Ok(document_json(42, "processing")),
            Ok(document_json(42, "ready")),
        ],
    );

    let mut session = client.upload(pdf(), UserId::new(1)).unwrap();
    let snapshots = session.take_snapshots().unwrap();
    assert!(session.take_snapshots().is_none());

    session.wait().await.unwrap();
    let statuses: Vec<DocumentStatus> = snapshots.map(|doc| doc.status).collect().await;

    assert_eq!(
        statuses,
        vec![
            DocumentStatus::Queued,
            DocumentStatus::Processing,
            DocumentStatus::Processing,
            DocumentStatus::Ready,
        ]
    );
    assert_eq!(log.count(DOC), 4);
}

#[tokio::test(start_paused = true)]
async fn test_progress_reaches_100_and_stream_ends() {
    init_logger();
    let (client, _log) = backend(
        Ok(document_json(42, "queued")),
        vec![Ok(document_json(42, "ready"))],
    );

    let mut session = client.upload(pdf(), UserId::new(1)).unwrap();
    let progress = session.progress_stream();
    let collector = tokio::spawn(progress.collect::<Vec<u8>>());

    session.wait().await.unwrap();
    let seen = collector.await.unwrap();

    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(session.progress(), 100);
}

#[tokio::test(start_paused = true)]
async fn test_upload_replayed_once_after_session_refresh() {
    init_logger();
    let uploads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&uploads);
    let (transport, log) = MockTransport::new(move |request: ApiRequest| {
        let counter = Arc::clone(&counter);
        async move {
            match request.path.as_str() {
                "/auth/refresh" => ack(),
                UPLOAD if counter.fetch_add(1, Ordering::SeqCst) == 0 => unauthorized(),
                UPLOAD => ok(document_json(42, "queued")),
                DOC => ok(document_json(42, "ready")),
                _ => status(404, "Not Found"),
            }
        }
    });
    let client = GatewayClient::with_transport(ClientOptions::default(), transport).unwrap();

    let mut session = client.upload(pdf(), UserId::new(1)).unwrap();
    let doc = session.wait().await.unwrap();

    assert_eq!(doc.status, DocumentStatus::Ready);
    assert_eq!(log.paths(), vec![UPLOAD, "/auth/refresh", UPLOAD, DOC]);
}

#[tokio::test]
async fn test_invalid_poll_options_are_rejected() {
    let (client, log) = backend(Ok(document_json(42, "queued")), vec![]);

    let options = PollOptions::default().with_interval(Duration::ZERO);
    let result = client.upload_with(pdf(), UserId::new(1), options);

    assert!(matches!(result, Err(GatewayError::InvalidConfig(_))));
    assert_eq!(log.total(), 0);
}
