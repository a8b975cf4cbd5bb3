//! Question answering over an owner's documents

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai::{CompletionBackend, ResilientCompletion, RetryPolicy};
use crate::db::DocumentStore;
use crate::error::{Error, Result};
use crate::models::Document;

/// Reply used when the AI could not be reached
pub const CHAT_UNAVAILABLE_REPLY: &str =
    "Sorry, the assistant is temporarily unavailable. Please try again in a few minutes.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatAnswer {
    pub reply: String,
    /// True when `reply` is the fixed unavailability message
    pub degraded: bool,
}

/// Build the chat prompt from documents and a question
///
/// Document text is capped at `max_context_chars` characters in total. The
/// question is always included in full.
pub fn build_chat_prompt(documents: &[Document], question: &str, max_context_chars: usize) -> String {
    let mut context = String::new();
    let mut remaining = max_context_chars;

    for doc in documents {
        if remaining == 0 {
            break;
        }
        let doc_type = doc.doc_type.map(|t| t.as_str()).unwrap_or("unknown");
        let entry = format!("[{}] ({})\n{}\n\n", doc.filename, doc_type, doc.content.trim());
        let taken = take_chars(&entry, remaining);
        remaining -= taken.chars().count();
        context.push_str(taken);
    }

    if context.is_empty() {
        context.push_str("(no documents uploaded)\n");
    }

    format!(
        "You are an assistant answering questions about a small business using its documents.\n\
         Answer only from the documents below. If they do not contain the answer, say so.\n\
         \n\
         ## Documents\n{}\n\
         ## Question\n{}\n",
        context.trim_end(),
        question.trim()
    )
}

/// Longest prefix of `text` with at most `max` characters
fn take_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Answer `question` using the owner's documents as context
pub async fn answer_question<B: CompletionBackend + ?Sized>(
    store: &dyn DocumentStore,
    ai: Option<&B>,
    owner: &str,
    question: &str,
    policy: RetryPolicy,
    max_context_chars: usize,
) -> Result<ChatAnswer> {
    if question.trim().is_empty() {
        return Err(Error::InvalidData("Message must not be empty".into()));
    }
    let ai = ai.ok_or_else(|| Error::ConfigurationMissing("No AI backend configured".into()))?;

    let documents = store.find_by_owner(owner)?;
    let prompt = build_chat_prompt(&documents, question, max_context_chars);
    debug!(owner = %owner, documents = documents.len(), prompt_chars = prompt.len(), "Built chat prompt");

    match ResilientCompletion::new(ai, policy).complete(&prompt).await {
        Some(reply) => {
            info!(owner = %owner, "Chat answered");
            Ok(ChatAnswer {
                reply,
                degraded: false,
            })
        }
        None => {
            warn!(owner = %owner, "AI unavailable, returning fallback chat reply");
            Ok(ChatAnswer {
                reply: CHAT_UNAVAILABLE_REPLY.to_string(),
                degraded: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::models::DocumentType;
    use chrono::Utc;
    use std::time::Duration;

    fn doc(filename: &str, doc_type: Option<DocumentType>, content: &str) -> Document {
        Document {
            id: 0,
            owner: "me".into(),
            filename: filename.into(),
            content: content.into(),
            doc_type,
            size_bytes: content.len() as i64,
            content_hash: String::new(),
            uploaded_at: Utc::now(),
        }
    }

    struct Docs(Vec<Document>);

    impl DocumentStore for Docs {
        fn find_by_owner(&self, _owner: &str) -> Result<Vec<Document>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_prompt_prefixes_documents() {
        let docs = vec![
            doc("jan.txt", Some(DocumentType::Bill), "TOTAL: 5.00"),
            doc("odd.txt", None, "??"),
        ];
        let prompt = build_chat_prompt(&docs, " What did I spend? ", 1000);
        assert!(prompt.contains("[jan.txt] (bill)\nTOTAL: 5.00"));
        assert!(prompt.contains("[odd.txt] (unknown)"));
        assert!(prompt.ends_with("## Question\nWhat did I spend?\n"));
    }

    #[test]
    fn test_context_capped_on_char_boundary() {
        let docs = vec![doc("a.txt", Some(DocumentType::General), &"é".repeat(500))];
        let prompt = build_chat_prompt(&docs, "q", 40);
        let context = prompt
            .split("## Documents\n")
            .nth(1)
            .and_then(|rest| rest.split("\n## Question").next())
            .unwrap();
        assert!(context.chars().count() <= 40);
        assert!(context.starts_with("[a.txt] (general)"));
    }

    #[test]
    fn test_no_documents_noted() {
        let prompt = build_chat_prompt(&[], "hello", 100);
        assert!(prompt.contains("(no documents uploaded)"));
    }

    #[tokio::test]
    async fn test_answer_question() {
        let store = Docs(vec![doc("r.txt", Some(DocumentType::Revenue), "300.00")]);
        let mock = MockBackend::replying("Revenue was 300.00.");
        let answer = answer_question(&store, Some(&mock), "me", "Revenue?", RetryPolicy::no_retry(), 500)
            .await
            .unwrap();
        assert_eq!(answer.reply, "Revenue was 300.00.");
        assert!(!answer.degraded);
        assert!(mock.prompts()[0].contains("300.00"));
    }

    #[tokio::test]
    async fn test_unavailable_ai_degrades() {
        let store = Docs(vec![]);
        let mock = MockBackend::overloaded();
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let answer = answer_question(&store, Some(&mock), "me", "hi", policy, 500)
            .await
            .unwrap();
        assert!(answer.degraded);
        assert_eq!(answer.reply, CHAT_UNAVAILABLE_REPLY);
        assert_eq!(mock.attempts(), 2);
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let mock = MockBackend::new();
        let err = answer_question(&Docs(vec![]), Some(&mock), "me", "   ", RetryPolicy::no_retry(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_ai() {
        let err = answer_question::<MockBackend>(&Docs(vec![]), None, "me", "hi", RetryPolicy::no_retry(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing(_)));
    }
}
