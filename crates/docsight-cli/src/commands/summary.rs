//! Analytics summary command

use anyhow::{Context, Result};
use chrono::Utc;
use docsight_core::ai::{AIClient, CompletionBackend, RetryPolicy};
use docsight_core::analytics::{SummaryAssembler, SummaryOutcome};
use docsight_core::{db::Database, Error};
use tracing::debug;

/// Compute the summary for `owner` and print it as JSON
///
/// A degraded summary is still printed; an unusable AI answer is shown
/// verbatim and returned as an error.
pub async fn cmd_summary(
    db: &Database,
    ai: Option<&AIClient>,
    owner: &str,
    policy: RetryPolicy,
) -> Result<SummaryOutcome> {
    match ai {
        Some(client) => eprintln!("🤖 Asking {} ({})...", client.kind(), client.model()),
        None => eprintln!("💡 Tip: Set GEMINI_API_KEY or AI_BACKEND to enable AI insights"),
    }

    let outcome = match SummaryAssembler::new(db, ai)
        .with_policy(policy)
        .summarize(Some(owner), Utc::now())
        .await
    {
        Ok(outcome) => outcome,
        Err(Error::AiParse { message, raw }) => {
            eprintln!("❌ The AI answer could not be parsed: {}", message);
            eprintln!("   Raw response:");
            eprintln!("{}", raw);
            anyhow::bail!("AI response was unusable");
        }
        Err(e) => return Err(e).context("Failed to build summary"),
    };

    debug!(owner, degraded = outcome.is_degraded(), "Summary assembled");
    if outcome.is_degraded() {
        eprintln!("⚠️  AI unavailable; showing calculated figures only");
    }

    println!("{}", serde_json::to_string_pretty(outcome.response())?);
    Ok(outcome)
}
