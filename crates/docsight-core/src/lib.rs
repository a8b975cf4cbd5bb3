//! DocSight Core Library
//!
//! Shared functionality for the DocSight document analytics backend:
//! - Database access and migrations
//! - Text ingestion and document type tagging
//! - Local KPI calculation over bills, feedback, and revenue entries
//! - Pluggable completion backends (Gemini, OpenAI-compatible, mock)
//! - Retry with backoff for overloaded AI services
//! - Summary assembly with a degraded mode when the AI is unavailable
//! - Accounts, sessions, and document-grounded chat

pub mod ai;
pub mod analytics;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;

/// Test utilities including mock Gemini server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIClient, CompletionBackend, CompletionError, GeminiBackend, MockBackend,
    OpenAICompatibleBackend, ResilientCompletion, RetryPolicy,
};
pub use analytics::{
    KpiSet, SummaryAssembler, SummaryOutcome, SummaryResponse, AI_UNAVAILABLE_SUMMARY,
};
pub use chat::{answer_question, ChatAnswer};
pub use config::Config;
pub use db::{Database, DocumentStore};
pub use error::{Error, Result};
pub use ingest::ingest_bytes;
