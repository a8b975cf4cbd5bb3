//! Test utilities for docsight-core
//!
//! A mock Gemini HTTP server with scripted replies, plus fixture builders
//! for documents.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::ai::DEFAULT_MOCK_REPLY;
use crate::ingest::content_hash;
use crate::models::{DocumentType, NewDocument};

#[derive(Clone, Default)]
struct ServerState {
    replies: Arc<Mutex<VecDeque<(u16, Value)>>>,
    requests: Arc<AtomicUsize>,
}

/// Mock Gemini server for integration tests
///
/// Replies are served in the order they were queued. Once the queue is
/// empty every request gets a 200 carrying `DEFAULT_MOCK_REPLY`.
pub struct MockGeminiServer {
    addr: SocketAddr,
    state: ServerState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockGeminiServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = ServerState::default();
        let app = Router::new()
            .route("/models/:call", post(handle_generate).get(handle_model))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL to pass as `GEMINI_BASE_URL`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue a successful reply whose candidate text is `text`
    pub fn reply_text(&self, text: &str) {
        self.reply_raw(200, candidates_body(text));
    }

    /// Queue an error status with a Gemini-style error body
    pub fn reply_error(&self, status: u16, message: &str) {
        let body = json!({
            "error": { "code": status, "message": message, "status": "UNAVAILABLE" }
        });
        self.reply_raw(status, body);
    }

    pub fn reply_raw(&self, status: u16, body: Value) {
        self.state.replies.lock().unwrap().push_back((status, body));
    }

    /// Number of generate requests received so far
    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn candidates_body(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

async fn handle_generate(State(state): State<ServerState>) -> (StatusCode, Json<Value>) {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let next = state.replies.lock().unwrap().pop_front();
    let (status, body) = next.unwrap_or_else(|| (200, candidates_body(DEFAULT_MOCK_REPLY)));
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body))
}

/// Model metadata endpoint (health check)
async fn handle_model() -> Json<Value> {
    Json(json!({ "name": "models/gemini-1.5-flash", "displayName": "Gemini 1.5 Flash" }))
}

/// Build a `NewDocument` fixture
pub fn new_document(
    filename: &str,
    doc_type: DocumentType,
    content: &str,
    uploaded_at: DateTime<Utc>,
) -> NewDocument {
    NewDocument {
        filename: filename.to_string(),
        content: content.to_string(),
        doc_type,
        size_bytes: content.len() as i64,
        content_hash: content_hash(format!("{}:{}", filename, content).as_bytes()),
        uploaded_at: Some(uploaded_at),
    }
}

/// A bill with a labelled total
pub fn bill(total: &str, uploaded_at: DateTime<Utc>) -> NewDocument {
    new_document(
        &format!("bill-{}.txt", total),
        DocumentType::Bill,
        &format!("Coffee beans x2\nMilk x1\nTOTAL: {}", total),
        uploaded_at,
    )
}

pub fn feedback(text: &str, uploaded_at: DateTime<Utc>) -> NewDocument {
    new_document("feedback.txt", DocumentType::Feedback, text, uploaded_at)
}

/// A revenue entry holding a bare figure
pub fn revenue(amount: &str, uploaded_at: DateTime<Utc>) -> NewDocument {
    new_document(
        &format!("revenue-{}.txt", amount),
        DocumentType::Revenue,
        amount,
        uploaded_at,
    )
}
