//! Pluggable text-completion backend abstraction
//!
//! The analytics and chat pipelines only ever need one capability from a
//! generative model: send a prompt, get text back. Everything here is built
//! around that single call.
//!
//! # Architecture
//!
//! - `CompletionBackend` trait: the one operation every backend implements
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `OpenAICompatibleBackend`, `MockBackend`
//! - `RetryPolicy` + `call_with_retry`: bounded retry on transient overload
//! - `ResilientCompletion`: retry + fence stripping + degrade-to-`None`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (gemini, openai_compatible, mock). Default: gemini
//! - `GEMINI_API_KEY`: API key (required for gemini backend)
//! - `GEMINI_MODEL`: Model name (default: gemini-1.5-flash)
//! - `GEMINI_BASE_URL`: API base URL override
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required for openai_compatible backend)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-3.5-turbo)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)

pub mod gemini;
mod mock;
mod openai_compatible;
pub mod parsing;
pub mod resilient;
pub mod retry;

pub use gemini::GeminiBackend;
pub use mock::{MockBackend, DEFAULT_MOCK_REPLY};
pub use openai_compatible::OpenAICompatibleBackend;
pub use resilient::ResilientCompletion;
pub use retry::{call_with_retry, RetryPolicy};

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single completion call
///
/// Only `Overloaded` is transient; every other variant means retrying the
/// same request would fail the same way.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The service signalled temporary unavailability (429/503/529, "overloaded")
    #[error("model overloaded: {0}")]
    Overloaded(String),

    /// The service refused the request (bad request, auth, malformed prompt)
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never produced an HTTP response
    #[error("transport error: {0}")]
    Transport(String),

    /// A successful response carried no text
    #[error("empty response from model")]
    EmptyResponse,
}

impl CompletionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Overloaded(_))
    }

    /// Classify a non-success HTTP response
    pub fn from_status(status: u16, body: &str) -> Self {
        let lowered = body.to_lowercase();
        let overload_signal = lowered.contains("overloaded")
            || lowered.contains("\"unavailable\"")
            || lowered.contains("resource_exhausted")
            || lowered.contains("try again later");

        match status {
            429 | 503 | 529 => Self::Overloaded(format!("HTTP {}", status)),
            500..=599 if overload_signal => Self::Overloaded(format!("HTTP {}", status)),
            _ => Self::Rejected {
                status,
                message: parsing::truncate_for_log(body, 300),
            },
        }
    }
}

/// Trait implemented by every completion backend
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send a prompt and return the model's raw text
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Google Gemini `generateContent` API
    Gemini(GeminiBackend),
    /// OpenAI-compatible backend (vLLM, LocalAI, llama-server, etc.)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `gemini` (default): Uses GEMINI_API_KEY and GEMINI_MODEL
    /// - `openai_compatible`: Uses OPENAI_COMPATIBLE_HOST and OPENAI_COMPATIBLE_MODEL
    /// - `mock`: Creates a mock backend for testing
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "gemini".to_string());

        match backend.to_lowercase().as_str() {
            "gemini" | "google" => GeminiBackend::from_env().map(AIClient::Gemini),
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to gemini");
                GeminiBackend::from_env().map(AIClient::Gemini)
            }
        }
    }

    /// Create a Gemini backend directly
    pub fn gemini(api_key: &str, model: &str) -> Self {
        AIClient::Gemini(GeminiBackend::new(api_key, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Short backend name for status output
    pub fn kind(&self) -> &'static str {
        match self {
            AIClient::Gemini(_) => "gemini",
            AIClient::OpenAICompatible(_) => "openai_compatible",
            AIClient::Mock(_) => "mock",
        }
    }
}

#[async_trait]
impl CompletionBackend for AIClient {
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        match self {
            AIClient::Gemini(b) => b.generate(prompt).await,
            AIClient::OpenAICompatible(b) => b.generate(prompt).await,
            AIClient::Mock(b) => b.generate(prompt).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Gemini(b) => b.health_check().await,
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.model(),
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.host(),
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_client_mock() {
        let client = AIClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
        assert_eq!(client.kind(), "mock");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = AIClient::mock();
        assert!(client.health_check().await);
    }

    #[test]
    fn test_classify_overload_statuses() {
        assert!(CompletionError::from_status(503, "").is_retryable());
        assert!(CompletionError::from_status(429, "quota").is_retryable());
        assert!(CompletionError::from_status(529, "").is_retryable());
    }

    #[test]
    fn test_classify_overload_body_on_500() {
        let err = CompletionError::from_status(500, r#"{"error":{"message":"The model is overloaded."}}"#);
        assert!(err.is_retryable());

        let err = CompletionError::from_status(500, "internal failure");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_client_errors_not_retryable() {
        for status in [400, 401, 403, 404] {
            let err = CompletionError::from_status(status, "bad");
            assert!(!err.is_retryable(), "status {} should not retry", status);
            assert!(matches!(err, CompletionError::Rejected { .. }));
        }
    }

    #[test]
    fn test_rejected_body_truncated() {
        let body = "x".repeat(1000);
        match CompletionError::from_status(400, &body) {
            CompletionError::Rejected { message, .. } => assert!(message.len() < 400),
            other => panic!("unexpected {:?}", other),
        }
    }
}
