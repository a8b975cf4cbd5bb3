//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// DocSight - Business insights from your bills, feedback, and revenue
#[derive(Parser)]
#[command(name = "docsight")]
#[command(about = "Small-business document analytics backend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "docsight.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set DOCSIGHT_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Config file (defaults to DOCSIGHT_CONFIG, then the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "5000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires a session token or API key.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Import a text document
    Import {
        /// Text file holding the extracted document text
        #[arg(short, long)]
        file: PathBuf,

        /// Document type: bill, feedback, revenue, review, general
        /// (inferred from the filename if not specified)
        #[arg(short = 't', long = "type")]
        doc_type: Option<String>,

        /// Owner the document is stored under
        #[arg(short, long)]
        owner: String,
    },

    /// List an owner's documents
    Documents {
        /// Owner whose documents to list
        #[arg(short, long)]
        owner: String,
    },

    /// Run the analytics summary and print it as JSON
    Summary {
        /// Owner whose documents to summarize
        #[arg(short, long)]
        owner: String,
    },

    /// Show database and AI backend status
    Status,
}
