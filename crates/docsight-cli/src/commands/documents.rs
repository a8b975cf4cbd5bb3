//! Document import and listing

use std::path::Path;

use anyhow::{Context, Result};
use docsight_core::{db::Database, ingest_bytes, Error};
use tracing::debug;

use super::truncate;

/// Import one text file for `owner`, returning the new document id
///
/// Re-importing identical content is reported and skipped.
pub fn cmd_import(
    db: &Database,
    file: &Path,
    doc_type: Option<&str>,
    owner: &str,
) -> Result<Option<i64>> {
    debug!(path = %file.display(), owner, "Reading document for import");
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read file: {}", file.display()))?;

    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let doc = ingest_bytes(&filename, &bytes, doc_type)?;
    println!("📥 Importing {} as {}...", filename, doc.doc_type);

    match db.insert_document(owner, &doc) {
        Ok(id) => {
            println!("✅ Stored document #{} ({} bytes)", id, doc.size_bytes);
            Ok(Some(id))
        }
        Err(Error::Conflict(msg)) => {
            println!("⏭️  Skipped: {}", msg);
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to store document"),
    }
}

pub fn cmd_documents(db: &Database, owner: &str) -> Result<()> {
    let docs = db.list_documents(owner)?;

    if docs.is_empty() {
        println!("No documents for {}. Import one with:", owner);
        println!("  docsight import --file bill.txt --owner {}", owner);
        return Ok(());
    }

    println!();
    println!("📄 Documents for {}", owner);
    println!("   ─────────────────────────────────────────────────────────────");

    for doc in &docs {
        let doc_type = doc
            .doc_type
            .map(|t| t.as_str())
            .unwrap_or("unknown");
        println!(
            "   {:>5}  {:<10} {:<32} {:>8} B  {}",
            doc.id,
            doc_type,
            truncate(&doc.filename, 32),
            doc.size_bytes,
            doc.uploaded_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!("   {} documents", docs.len());
    Ok(())
}
