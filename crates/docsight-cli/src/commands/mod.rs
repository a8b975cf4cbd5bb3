//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db, load_config)
//! - `documents` - Document import and listing
//! - `serve` - Web server command
//! - `status` - Database and AI backend status
//! - `summary` - Analytics summary

pub mod core;
pub mod documents;
pub mod serve;
pub mod status;
pub mod summary;

// Re-export command functions for main.rs
pub use core::*;
pub use documents::*;
pub use serve::*;
pub use status::*;
pub use summary::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
