//! Turning uploaded bytes into a storable document
//!
//! Format extraction (PDF, DOCX, OCR) happens upstream; this only accepts
//! text payloads. The type tag is decided here, once, and never changed.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{DocumentType, NewDocument};

/// Build a `NewDocument` from an uploaded file
///
/// `declared_type` wins when present; otherwise the type is inferred from
/// the filename.
pub fn ingest_bytes(filename: &str, bytes: &[u8], declared_type: Option<&str>) -> Result<NewDocument> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(Error::InvalidData("Filename is required".into()));
    }

    let doc_type = match declared_type.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.parse::<DocumentType>().map_err(Error::InvalidData)?,
        None => infer_type(filename),
    };

    let text = String::from_utf8_lossy(bytes);
    let content = text
        .trim_start_matches('\u{feff}')
        .replace('\0', "")
        .trim()
        .to_string();
    if content.is_empty() {
        return Err(Error::InvalidData(format!(
            "No text could be extracted from {}",
            filename
        )));
    }

    debug!(filename, doc_type = %doc_type, bytes = bytes.len(), "Ingested document");

    Ok(NewDocument {
        filename: filename.to_string(),
        content_hash: content_hash(bytes),
        content,
        doc_type,
        size_bytes: bytes.len() as i64,
        uploaded_at: None,
    })
}

/// Guess a document type from keywords in its filename
pub fn infer_type(filename: &str) -> DocumentType {
    let name = filename.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| name.contains(w));

    if has(&["bill", "invoice", "receipt"]) {
        DocumentType::Bill
    } else if has(&["feedback"]) {
        DocumentType::Feedback
    } else if has(&["review"]) {
        DocumentType::Review
    } else if has(&["revenue", "sales"]) {
        DocumentType::Revenue
    } else {
        DocumentType::General
    }
}

/// SHA-256 of the raw upload, hex encoded
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_type_from_filename() {
        assert_eq!(infer_type("March_Invoice.txt"), DocumentType::Bill);
        assert_eq!(infer_type("receipt-0042.txt"), DocumentType::Bill);
        assert_eq!(infer_type("customer_feedback.txt"), DocumentType::Feedback);
        assert_eq!(infer_type("google-reviews.txt"), DocumentType::Review);
        assert_eq!(infer_type("weekly_sales.csv"), DocumentType::Revenue);
        assert_eq!(infer_type("notes.txt"), DocumentType::General);
    }

    #[test]
    fn test_declared_type_wins() {
        let doc = ingest_bytes("notes.txt", b"TOTAL: 5.00", Some("bill")).unwrap();
        assert_eq!(doc.doc_type, DocumentType::Bill);
    }

    #[test]
    fn test_unknown_declared_type_rejected() {
        let err = ingest_bytes("notes.txt", b"text", Some("memo")).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(ingest_bytes("empty.txt", b"  \n\t ", None).is_err());
        assert!(ingest_bytes("nul.txt", b"\0\0", None).is_err());
    }

    #[test]
    fn test_content_cleaned_and_hashed() {
        let bytes = "\u{feff}  Great service!\0 \n".as_bytes();
        let doc = ingest_bytes("feedback.txt", bytes, None).unwrap();
        assert_eq!(doc.content, "Great service!");
        assert_eq!(doc.size_bytes, bytes.len() as i64);
        assert_eq!(doc.content_hash.len(), 64);
        assert_eq!(doc.content_hash, content_hash(bytes));
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let doc = ingest_bytes("bill.txt", b"TOTAL \xff 3.00", None).unwrap();
        assert!(doc.content.contains("TOTAL"));
    }
}
