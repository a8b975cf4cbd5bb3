//! Analytics summary pipeline
//!
//! Produces one summary per request by blending locally computed KPIs with
//! insights from a single completion call:
//!
//! - **Classification** - partition documents into bills, feedback, revenue
//! - **KPI calculator** - deterministic figures that never depend on the AI
//! - **Prompt builder** - one self-describing prompt per summary
//! - **Normalizer** - untrusted model JSON coerced into typed values
//! - **Summary assembler** - runs the above and decides the response variant
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docsight_core::analytics::SummaryAssembler;
//!
//! let assembler = SummaryAssembler::new(&db, ai.as_ref())
//!     .with_policy(config.analytics.retry_policy());
//! let outcome = assembler.summarize(Some("owner@shop.test"), Utc::now()).await?;
//! ```

pub mod classify;
pub mod kpi;
pub mod normalize;
pub mod prompt;
pub mod summary;

pub use classify::ClassifiedDocuments;
pub use kpi::{
    compute_kpis, revenue_by_day, AmountExtractor, Cents, KpiSet, LabeledAmountExtractor,
    PatternAmountExtractor, RevenuePoint,
};
pub use normalize::{parse_analytics, AiAnalytics, KeywordFrequency, Sentiment, TopItem};
pub use prompt::{build_prompt, PROMPT_SCHEMA_VERSION};
pub use summary::{SummaryAssembler, SummaryOutcome, SummaryResponse, AI_UNAVAILABLE_SUMMARY};
