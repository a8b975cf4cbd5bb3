//! Document storage operations

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Document, DocumentInfo, DocumentUsage, NewDocument, SearchHit, TypeUsage};

/// Read access to an owner's documents
///
/// The analytics pipeline depends on this rather than on `Database` so it
/// can run against any store.
pub trait DocumentStore: Send + Sync {
    /// All documents belonging to `owner`, oldest first
    fn find_by_owner(&self, owner: &str) -> Result<Vec<Document>>;
}

impl DocumentStore for Database {
    fn find_by_owner(&self, owner: &str) -> Result<Vec<Document>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents WHERE owner = ? ORDER BY uploaded_at ASC, id ASC",
            DOCUMENT_COLUMNS
        ))?;
        let docs = stmt
            .query_map(params![owner], row_to_document)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(docs)
    }
}

const DOCUMENT_COLUMNS: &str =
    "id, owner, filename, content, doc_type, size_bytes, content_hash, uploaded_at";

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let doc_type: String = row.get(4)?;
    let uploaded_at: String = row.get(7)?;
    Ok(Document {
        id: row.get(0)?,
        owner: row.get(1)?,
        filename: row.get(2)?,
        content: row.get(3)?,
        doc_type: doc_type.parse().ok(),
        size_bytes: row.get(5)?,
        content_hash: row.get(6)?,
        uploaded_at: parse_datetime(&uploaded_at),
    })
}

fn row_to_info(row: &rusqlite::Row) -> rusqlite::Result<DocumentInfo> {
    let doc_type: String = row.get(2)?;
    let uploaded_at: String = row.get(4)?;
    Ok(DocumentInfo {
        id: row.get(0)?,
        filename: row.get(1)?,
        doc_type: doc_type.parse().ok(),
        size_bytes: row.get(3)?,
        uploaded_at: parse_datetime(&uploaded_at),
    })
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Up to `radius` characters either side of the first case-insensitive match
fn snippet_around(content: &str, query: &str, radius: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    let lowered: Vec<char> = content.chars().flat_map(char::to_lowercase).collect();
    let needle: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();

    // Lowercasing can change length for a few scripts; fall back to the head
    let position = if lowered.len() == chars.len() && !needle.is_empty() {
        lowered
            .windows(needle.len())
            .position(|w| w == needle.as_slice())
    } else {
        None
    };

    let (start, end) = match position {
        Some(p) => (p.saturating_sub(radius), (p + needle.len() + radius).min(chars.len())),
        None => (0, (radius * 2).min(chars.len())),
    };

    let mut snippet: String = chars[start..end].iter().collect();
    snippet = snippet.split_whitespace().collect::<Vec<_>>().join(" ");
    if start > 0 {
        snippet.insert_str(0, "...");
    }
    if end < chars.len() {
        snippet.push_str("...");
    }
    snippet
}

impl Database {
    /// Store a document for `owner`
    ///
    /// Returns `Error::Conflict` if the owner already has a document with the
    /// same content hash.
    pub fn insert_document(&self, owner: &str, doc: &NewDocument) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM documents WHERE owner = ? AND content_hash = ?",
                params![owner, doc.content_hash],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Err(Error::Conflict(format!(
                "Document already uploaded (id {})",
                id
            )));
        }

        let uploaded_at = doc.uploaded_at.unwrap_or_else(Utc::now);
        conn.execute(
            r#"
            INSERT INTO documents (owner, filename, content, doc_type, size_bytes, content_hash, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                owner,
                doc.filename,
                doc.content,
                doc.doc_type.as_str(),
                doc.size_bytes,
                doc.content_hash,
                format_datetime(&uploaded_at),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let conn = self.conn()?;
        let doc = conn
            .query_row(
                &format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS),
                params![id],
                row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    /// List an owner's documents, newest first
    pub fn list_documents(&self, owner: &str) -> Result<Vec<DocumentInfo>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, filename, doc_type, size_bytes, uploaded_at
            FROM documents
            WHERE owner = ?
            ORDER BY uploaded_at DESC, id DESC
            "#,
        )?;
        let docs = stmt
            .query_map(params![owner], row_to_info)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    /// Delete a document; returns false if it did not exist
    pub fn delete_document(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute("DELETE FROM documents WHERE id = ?", params![id])?;
        Ok(affected > 0)
    }

    /// Case-insensitive substring search over an owner's filenames and text
    pub fn search_documents(&self, owner: &str, query: &str, limit: i64) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.conn()?;
        let pattern = format!("%{}%", escape_like(query));
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM documents
            WHERE owner = ?1
              AND (content LIKE ?2 ESCAPE '\' OR filename LIKE ?2 ESCAPE '\')
            ORDER BY uploaded_at DESC, id DESC
            LIMIT ?3
            "#,
            DOCUMENT_COLUMNS
        ))?;

        let hits = stmt
            .query_map(params![owner, pattern, limit], row_to_document)?
            .map(|row| {
                row.map(|doc| SearchHit {
                    snippet: snippet_around(&doc.content, query, 80),
                    document: DocumentInfo::from(&doc),
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(hits)
    }

    /// Number of stored documents across all owners
    pub fn count_documents(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?)
    }

    /// Count and total size of an owner's documents, overall and per type
    pub fn document_usage(&self, owner: &str) -> Result<DocumentUsage> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT doc_type, COUNT(*), COALESCE(SUM(size_bytes), 0)
            FROM documents
            WHERE owner = ?
            GROUP BY doc_type
            ORDER BY doc_type
            "#,
        )?;

        let by_type = stmt
            .query_map(params![owner], |row| {
                Ok(TypeUsage {
                    doc_type: row.get(0)?,
                    count: row.get(1)?,
                    total_bytes: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(DocumentUsage {
            document_count: by_type.iter().map(|t| t.count).sum(),
            total_bytes: by_type.iter().map(|t| t.total_bytes).sum(),
            by_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_snippet_centers_on_match() {
        let content = format!("{} delivery was late {}", "a".repeat(200), "b".repeat(200));
        let snippet = snippet_around(&content, "DELIVERY", 10);
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("delivery"));
    }

    #[test]
    fn test_snippet_short_content_no_ellipsis() {
        assert_eq!(snippet_around("great coffee", "coffee", 80), "great coffee");
    }
}
