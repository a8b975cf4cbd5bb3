//! Status command implementation

use std::path::Path;

use anyhow::Result;
use docsight_core::ai::{AIClient, CompletionBackend};
use docsight_core::db::DB_KEY_ENV;

use super::open_db;

pub async fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    use std::fs;

    println!();
    println!("📊 DocSight Status");
    println!("   ─────────────────────────────────────────────────────────────");

    println!("   Database: {}", db_path.display());

    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                println!();
                if let Ok(users) = db.count_users() {
                    println!("   Users: {}", users);
                }
                if let Ok(documents) = db.count_documents() {
                    println!("   Documents: {}", documents);
                }
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    match AIClient::from_env() {
        Some(client) => {
            let reachable = client.health_check().await;
            let marker = if reachable { "✅" } else { "❌" };
            println!(
                "   {} AI backend: {} ({} at {})",
                marker,
                client.kind(),
                client.model(),
                client.host()
            );
        }
        None => println!("   💡 AI backend: not configured (set GEMINI_API_KEY or AI_BACKEND)"),
    }

    println!();
    Ok(())
}
