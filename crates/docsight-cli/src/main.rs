//! DocSight CLI - Business document analytics
//!
//! Usage:
//!   docsight init                                Initialize database
//!   docsight import --file bill.txt --owner ME   Import a text document
//!   docsight summary --owner ME                  Print the analytics summary
//!   docsight serve --port 5000                   Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use docsight_core::ai::AIClient;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
                config,
            )
            .await
        }
        Commands::Import {
            file,
            doc_type,
            owner,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &file, doc_type.as_deref(), &owner).map(|_| ())
        }
        Commands::Documents { owner } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_documents(&db, &owner)
        }
        Commands::Summary { owner } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let ai = AIClient::from_env();
            commands::cmd_summary(&db, ai.as_ref(), &owner, config.analytics.retry_policy())
                .await
                .map(|_| ())
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt).await,
    }
}
