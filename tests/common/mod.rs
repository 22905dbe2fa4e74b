//! Shared test helpers: a scripted in-memory transport
#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::time::Instant;

use gateway_client::transport::{ApiRequest, ApiResponse, Method, RequestBody, Transport};
use gateway_client::{GatewayError, RequestId, Result};

type Handler = Arc<dyn Fn(ApiRequest) -> BoxFuture<'static, Result<ApiResponse>> + Send + Sync>;

/// One request seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub request_id: RequestId,
    pub json: Option<Value>,
    pub file_field: Option<String>,
    pub form_fields: Vec<(String, String)>,
    pub at: Instant,
}

/// Shared view of every call a [`MockTransport`] received
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<RecordedCall>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.0.lock().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.0.lock().iter().filter(|c| c.path == path).count()
    }

    pub fn total(&self) -> usize {
        self.0.lock().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.0.lock().iter().map(|c| c.path.clone()).collect()
    }

    pub fn for_path(&self, path: &str) -> Vec<RecordedCall> {
        self.0
            .lock()
            .iter()
            .filter(|c| c.path == path)
            .cloned()
            .collect()
    }
}

/// Transport answering from a closure and recording every request
pub struct MockTransport {
    handler: Handler,
    log: CallLog,
}

impl MockTransport {
    pub fn new<F, Fut>(handler: F) -> (Self, CallLog)
    where
        F: Fn(ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ApiResponse>> + Send + 'static,
    {
        let log = CallLog::default();
        let transport = Self {
            handler: Arc::new(move |request| Box::pin(handler(request))),
            log: log.clone(),
        };
        (transport, log)
    }
}

impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let (json, file_field, form_fields) = match &request.body {
            RequestBody::Empty => (None, None, Vec::new()),
            RequestBody::Json(value) => (Some(value.clone()), None, Vec::new()),
            RequestBody::Multipart(form) => (None, Some(form.file_field.clone()), form.fields.clone()),
        };
        self.log.0.lock().push(RecordedCall {
            method: request.method,
            path: request.path.clone(),
            request_id: request.id.clone(),
            json,
            file_field,
            form_fields,
            at: Instant::now(),
        });
        (self.handler)(request).await
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn ok(value: Value) -> Result<ApiResponse> {
    Ok(ApiResponse::from_json(200, &value))
}

pub fn ack() -> Result<ApiResponse> {
    ok(json!({"ok": true}))
}

pub fn status(code: u16, detail: &str) -> Result<ApiResponse> {
    Err(GatewayError::http(code, detail))
}

pub fn unauthorized() -> Result<ApiResponse> {
    status(401, "Not authenticated")
}

pub fn document_json(id: u64, status: &str) -> Value {
    json!({
        "id": id,
        "user_id": 1,
        "original_name": "paper.pdf",
        "stored_name": "3f2a_paper.pdf",
        "mime": "application/pdf",
        "size_bytes": 2048,
        "sha256": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
        "path": "./data/uploads/3f2a_paper.pdf",
        "status": status,
        "error": if status == "failed" { json!("encrypted pdf") } else { Value::Null },
        "page_count": if status == "ready" { json!(12) } else { Value::Null },
        "chunks": []
    })
}

pub fn message_json(id: u64, chat_id: u64, role: &str, content: &str) -> Value {
    json!({
        "id": id,
        "chat_id": chat_id,
        "role": role,
        "content": content,
        "meta_json": null,
        "created_at": "2025-05-04T12:00:00.000000"
    })
}

pub fn profile_json() -> Value {
    json!({
        "id": 1,
        "email": "ada@example.com",
        "full_name": "Ada Lovelace",
        "role": "user"
    })
}
