//! Domain models for DocSight

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type tag assigned to a document at ingestion time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Bill,
    Feedback,
    Revenue,
    Review,
    #[default]
    General,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bill => "bill",
            Self::Feedback => "feedback",
            Self::Revenue => "revenue",
            Self::Review => "review",
            Self::General => "general",
        }
    }

    pub fn all() -> &'static [DocumentType] {
        &[
            Self::Bill,
            Self::Feedback,
            Self::Revenue,
            Self::Review,
            Self::General,
        ]
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bill" | "invoice" | "receipt" => Ok(Self::Bill),
            "feedback" => Ok(Self::Feedback),
            "revenue" | "sales" => Ok(Self::Revenue),
            "review" => Ok(Self::Review),
            "general" => Ok(Self::General),
            _ => Err(format!("Unknown document type: {}", s)),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored unit of extracted text
///
/// `doc_type` is `None` when the stored tag is not one we recognise; such
/// documents are kept but never classified into an analytics bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub owner: String,
    pub filename: String,
    pub content: String,
    #[serde(rename = "type")]
    pub doc_type: Option<DocumentType>,
    pub size_bytes: i64,
    pub content_hash: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Document listing entry (no content)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: i64,
    pub filename: String,
    #[serde(rename = "type")]
    pub doc_type: Option<DocumentType>,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Document> for DocumentInfo {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename.clone(),
            doc_type: doc.doc_type,
            size_bytes: doc.size_bytes,
            uploaded_at: doc.uploaded_at,
        }
    }
}

/// A document ready to be stored
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub content: String,
    pub doc_type: DocumentType,
    pub size_bytes: i64,
    pub content_hash: String,
    /// Defaults to the insertion time when not set
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// A document matching a text search, with the text around the first hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub document: DocumentInfo,
    pub snippet: String,
}

/// Per-type storage usage for one owner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypeUsage {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub count: i64,
    pub total_bytes: i64,
}

/// Storage usage summary for one owner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUsage {
    pub document_count: i64,
    pub total_bytes: i64,
    pub by_type: Vec<TypeUsage>,
}

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Who sent a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" | "bot" => Ok(Self::Assistant),
            _ => Err(format!("Unknown chat role: {}", s)),
        }
    }
}

/// A chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: i64,
    pub owner: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// One message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: i64,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Activity log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub owner: String,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<i64>,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_roundtrip() {
        for t in DocumentType::all() {
            assert_eq!(t.as_str().parse::<DocumentType>().unwrap(), *t);
        }
    }

    #[test]
    fn test_document_type_aliases() {
        assert_eq!("Invoice".parse::<DocumentType>().unwrap(), DocumentType::Bill);
        assert_eq!(" SALES ".parse::<DocumentType>().unwrap(), DocumentType::Revenue);
        assert!("memo".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_document_type_serializes_lowercase() {
        let json = serde_json::to_string(&DocumentType::Feedback).unwrap();
        assert_eq!(json, "\"feedback\"");
    }
}
