//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use docsight_core::Config;

use super::open_db;

/// Environment variable holding comma-separated API keys
pub const API_KEYS_ENV: &str = "DOCSIGHT_API_KEYS";

/// Environment variable holding the session token signing secret
pub const JWT_SECRET_ENV: &str = "DOCSIGHT_JWT_SECRET";

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    static_dir: Option<&Path>,
    config: Config,
) -> Result<()> {
    println!("🚀 Starting DocSight API server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    let api_keys =
        docsight_server::parse_api_keys(&std::env::var(API_KEYS_ENV).unwrap_or_default());
    let jwt_secret = std::env::var(JWT_SECRET_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty());

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        if jwt_secret.is_some() {
            println!("   🔐 Accounts: enabled (session tokens signed with {})", JWT_SECRET_ENV);
        } else {
            println!("   🔒 Accounts: disabled (set {} to enable)", JWT_SECRET_ENV);
        }
        if !api_keys.is_empty() {
            println!("   🔑 API keys: {} configured ({})", api_keys.len(), API_KEYS_ENV);
        }
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!(
        "   🔁 AI retries: {} attempts, {} ms apart",
        config.analytics.max_retries,
        config.analytics.backoff.as_millis()
    );
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let server_config = docsight_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins: config.server.allowed_origins,
        api_keys,
        jwt_secret,
        max_upload_bytes: config.server.max_upload_bytes,
    };

    let static_dir_str = static_dir
        .map(|p| {
            p.to_str()
                .with_context(|| format!("Static dir is not valid UTF-8: {}", p.display()))
        })
        .transpose()?;

    docsight_server::serve(db, host, port, static_dir_str, server_config, config.analytics).await?;

    Ok(())
}
