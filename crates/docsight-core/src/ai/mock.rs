//! Mock backend for testing
//!
//! Replies from a script of queued outcomes; with an empty script it returns
//! a fixed analytics payload. Clones share the script and the attempt counter, so a
//! test can hand a clone to the code under test and inspect the original.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{CompletionBackend, CompletionError};

/// Reply used when nothing is scripted
pub const DEFAULT_MOCK_REPLY: &str = r#"{
  "sentiment": {"positive": 2, "neutral": 1, "negative": 1},
  "topItems": [{"item": "Coffee", "count": 3}],
  "negativeKeywords": [{"text": "slow", "value": 2}],
  "businessSummary": "Sales are steady and customers like the coffee."
}"#;

#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    script: Arc<Mutex<VecDeque<Result<String, CompletionError>>>>,
    attempts: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            script: Arc::new(Mutex::new(VecDeque::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Create a mock that replays the given outcomes in order
    pub fn scripted(outcomes: Vec<Result<String, CompletionError>>) -> Self {
        let backend = Self::new();
        for outcome in outcomes {
            backend.push(outcome);
        }
        backend
    }

    /// Create a mock that always answers with `reply`
    pub fn replying(reply: &str) -> Self {
        let backend = Self::new();
        backend.push(Ok(reply.to_string()));
        backend
    }

    /// Create a mock that is permanently overloaded
    pub fn overloaded() -> Self {
        let backend = Self::new();
        backend.push(Err(CompletionError::Overloaded("HTTP 503".into())));
        backend
    }

    /// Queue one more outcome
    pub fn push(&self, outcome: Result<String, CompletionError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }

    /// Number of `generate` calls made so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    // The final queued outcome repeats forever instead of being consumed
    fn next_outcome(&self) -> Result<String, CompletionError> {
        let Ok(mut script) = self.script.lock() else {
            return Ok(DEFAULT_MOCK_REPLY.to_string());
        };
        match script.len() {
            0 => Ok(DEFAULT_MOCK_REPLY.to_string()),
            1 => script.front().cloned().unwrap_or(Err(CompletionError::EmptyResponse)),
            _ => script.pop_front().unwrap_or(Err(CompletionError::EmptyResponse)),
        }
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.next_outcome()
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_reply() {
        let mock = MockBackend::new();
        let reply = mock.generate("anything").await.unwrap();
        assert!(reply.contains("businessSummary"));
        assert_eq!(mock.attempts(), 1);
    }

    #[tokio::test]
    async fn test_script_consumed_in_order_last_entry_sticks() {
        let mock = MockBackend::scripted(vec![
            Err(CompletionError::Overloaded("busy".into())),
            Ok("first".into()),
            Ok("second".into()),
        ]);
        assert!(mock.generate("p").await.is_err());
        assert_eq!(mock.generate("p").await.unwrap(), "first");
        assert_eq!(mock.generate("p").await.unwrap(), "second");
        assert_eq!(mock.generate("p").await.unwrap(), "second");
        assert_eq!(mock.attempts(), 4);
    }

    #[tokio::test]
    async fn test_clones_share_counter() {
        let mock = MockBackend::overloaded();
        let clone = mock.clone();
        let _ = clone.generate("p").await;
        let _ = clone.generate("p").await;
        assert_eq!(mock.attempts(), 2);
        assert_eq!(mock.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_unhealthy() {
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}
