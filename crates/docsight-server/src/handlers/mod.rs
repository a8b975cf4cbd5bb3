//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod analytics;
pub mod auth;
pub mod chat;
pub mod documents;
pub mod search;

// Re-export all handlers for use in router
pub use analytics::*;
pub use auth::*;
pub use chat::*;
pub use documents::*;
pub use search::*;
