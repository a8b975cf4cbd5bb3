//! Completion calls that degrade instead of failing
//!
//! Transient overload is retried under a `RetryPolicy`. Anything that still
//! fails comes back as `None` so callers can fall back to local results.

use tracing::{info, warn};

use super::parsing::strip_code_fences;
use super::retry::{call_with_retry, RetryPolicy};
use super::{CompletionBackend, CompletionError};

pub struct ResilientCompletion<'a, B: CompletionBackend + ?Sized> {
    backend: &'a B,
    policy: RetryPolicy,
}

impl<'a, B: CompletionBackend + ?Sized> ResilientCompletion<'a, B> {
    pub fn new(backend: &'a B, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `prompt`, returning fence-stripped text or `None` if the service
    /// could not produce an answer
    pub async fn complete(&self, prompt: &str) -> Option<String> {
        let result = call_with_retry(&self.policy, CompletionError::is_retryable, |_| {
            self.backend.generate(prompt)
        })
        .await;

        match result {
            Ok(raw) => {
                let text = strip_code_fences(&raw);
                if text.is_empty() {
                    warn!(model = %self.backend.model(), "AI service returned only whitespace");
                    return None;
                }
                info!(
                    model = %self.backend.model(),
                    chars = text.len(),
                    "AI completion received"
                );
                Some(text)
            }
            Err(e) if e.is_retryable() => {
                warn!(
                    model = %self.backend.model(),
                    attempts = self.policy.max_attempts,
                    error = %e,
                    "AI service unavailable after retries"
                );
                None
            }
            Err(e) => {
                warn!(
                    model = %self.backend.model(),
                    error = %e,
                    "AI completion failed"
                );
                None
            }
        }
    }
}
