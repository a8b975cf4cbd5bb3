//! Error types for DocSight

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Credentials were presented but rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No caller identity was supplied
    #[error("Authentication required")]
    AuthRequired,

    /// The AI integration is not configured for this deployment
    #[error("AI integration not configured: {0}")]
    ConfigurationMissing(String),

    /// The model answered, but the answer could not be parsed
    #[error("AI response was unusable: {message}")]
    AiParse { message: String, raw: String },
}

impl Error {
    /// True for failures of the document store (the pool or SQLite itself)
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Pool(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
