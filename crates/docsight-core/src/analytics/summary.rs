//! Summary assembly
//!
//! Runs the pipeline for one owner: fetch, classify, compute KPIs, build the
//! prompt, make one resilient completion call, then either merge the parsed
//! insights or fall back to the degraded payload. Local KPIs are present in
//! every successful response.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::classify::ClassifiedDocuments;
use super::kpi::{compute_kpis, revenue_by_day, AmountExtractor, KpiSet, LabeledAmountExtractor, RevenuePoint};
use super::normalize::{parse_analytics, AiAnalytics, KeywordFrequency, Sentiment, TopItem};
use super::prompt::build_prompt;
use crate::ai::parsing::truncate_for_log;
use crate::ai::{CompletionBackend, ResilientCompletion, RetryPolicy};
use crate::db::DocumentStore;
use crate::error::{Error, Result};

/// Business summary shown when no AI insight could be obtained
pub const AI_UNAVAILABLE_SUMMARY: &str =
    "AI insights are temporarily unavailable. The figures above were calculated from your documents.";

/// The summary returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub kpis: KpiSet,
    pub revenue_over_time: Vec<RevenuePoint>,
    pub sentiment: Sentiment,
    pub top_items: Vec<TopItem>,
    pub negative_keywords: Vec<KeywordFrequency>,
    pub business_summary: String,
}

impl SummaryResponse {
    /// Local figures merged with parsed AI insights
    pub fn merged(kpis: KpiSet, revenue_over_time: Vec<RevenuePoint>, ai: AiAnalytics) -> Self {
        Self {
            kpis,
            revenue_over_time,
            sentiment: ai.sentiment,
            top_items: ai.top_items,
            negative_keywords: ai.negative_keywords,
            business_summary: ai.business_summary,
        }
    }

    /// Local KPIs only; every AI-derived field zeroed or empty
    pub fn degraded(kpis: KpiSet) -> Self {
        Self {
            kpis,
            revenue_over_time: vec![],
            sentiment: Sentiment::default(),
            top_items: vec![],
            negative_keywords: vec![],
            business_summary: AI_UNAVAILABLE_SUMMARY.to_string(),
        }
    }
}

/// Result of a summary run that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    /// AI insights were obtained and merged
    Complete(SummaryResponse),
    /// The AI could not be reached; local KPIs only
    Degraded(SummaryResponse),
}

impl SummaryOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    pub fn response(&self) -> &SummaryResponse {
        match self {
            Self::Complete(r) | Self::Degraded(r) => r,
        }
    }

    pub fn into_response(self) -> SummaryResponse {
        match self {
            Self::Complete(r) | Self::Degraded(r) => r,
        }
    }
}

/// Orchestrates one summary request
///
/// The completion backend is injected; `None` means the deployment has no
/// AI configured, which is reported before any documents are read.
pub struct SummaryAssembler<'a, B: CompletionBackend + ?Sized> {
    store: &'a dyn DocumentStore,
    ai: Option<&'a B>,
    policy: RetryPolicy,
    extractor: &'a dyn AmountExtractor,
}

impl<'a, B: CompletionBackend + ?Sized> SummaryAssembler<'a, B> {
    pub fn new(store: &'a dyn DocumentStore, ai: Option<&'a B>) -> Self {
        Self {
            store,
            ai,
            policy: RetryPolicy::default(),
            extractor: &LabeledAmountExtractor,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_extractor(mut self, extractor: &'a dyn AmountExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Produce the summary for `owner` as of `now`
    ///
    /// Errors:
    /// - `ConfigurationMissing` when no backend is configured
    /// - `AuthRequired` when `owner` is `None`
    /// - storage errors from the document store, unchanged
    /// - `AiParse` when the model answered with unusable text
    pub async fn summarize(&self, owner: Option<&str>, now: DateTime<Utc>) -> Result<SummaryOutcome> {
        let ai = self.ai.ok_or_else(|| {
            Error::ConfigurationMissing(
                "No AI backend configured. Set GEMINI_API_KEY or AI_BACKEND.".into(),
            )
        })?;
        let owner = owner.ok_or(Error::AuthRequired)?;

        let documents = self.store.find_by_owner(owner).map_err(|e| {
            error!(owner = %owner, error = %e, "Failed to fetch documents for summary");
            e
        })?;

        let classified = ClassifiedDocuments::classify(&documents);
        debug!(
            owner = %owner,
            bills = classified.bills.len(),
            feedbacks = classified.feedbacks.len(),
            revenues = classified.revenues.len(),
            "Classified documents"
        );

        let kpis = compute_kpis(&documents, now, self.extractor);
        let revenue_over_time = revenue_by_day(&documents, self.extractor);

        let prompt = build_prompt(
            &classified.bills,
            &classified.feedbacks,
            &classified.revenues,
            now.date_naive(),
        );

        let client = ResilientCompletion::new(ai, self.policy);
        let Some(raw) = client.complete(&prompt).await else {
            warn!(owner = %owner, "AI unavailable, returning degraded summary");
            return Ok(SummaryOutcome::Degraded(SummaryResponse::degraded(kpis)));
        };

        match parse_analytics(&raw) {
            Ok(insights) => {
                info!(owner = %owner, documents = documents.len(), "Summary assembled");
                Ok(SummaryOutcome::Complete(SummaryResponse::merged(
                    kpis,
                    revenue_over_time,
                    insights,
                )))
            }
            Err(e) => {
                warn!(
                    owner = %owner,
                    error = %e,
                    raw = %truncate_for_log(&raw, 200),
                    "AI responded but the response was unusable"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{CompletionError, MockBackend};
    use crate::models::{Document, DocumentType};
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    struct FixedStore {
        docs: Vec<Document>,
        calls: AtomicUsize,
    }

    impl FixedStore {
        fn new(docs: Vec<Document>) -> Self {
            Self {
                docs,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl DocumentStore for FixedStore {
        fn find_by_owner(&self, owner: &str) -> Result<Vec<Document>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.docs.iter().filter(|d| d.owner == owner).cloned().collect())
        }
    }

    struct BrokenStore;

    impl DocumentStore for BrokenStore {
        fn find_by_owner(&self, _owner: &str) -> Result<Vec<Document>> {
            Err(Error::Database(rusqlite::Error::InvalidQuery))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 15, 12, 0, 0).unwrap()
    }

    fn doc(doc_type: DocumentType, content: &str, days_ago: i64) -> Document {
        Document {
            id: 0,
            owner: "owner@shop.test".into(),
            filename: format!("{}.txt", doc_type),
            content: content.into(),
            doc_type: Some(doc_type),
            size_bytes: content.len() as i64,
            content_hash: String::new(),
            uploaded_at: now() - Duration::days(days_ago),
        }
    }

    fn sample_docs() -> Vec<Document> {
        vec![
            doc(DocumentType::Bill, "Coffee beans TOTAL: 30.00", 3),
            doc(DocumentType::Bill, "Milk TOTAL: 10.00", 2),
            doc(DocumentType::Feedback, "Great coffee, slow service", 1),
            doc(DocumentType::Revenue, "200.00", 2),
            doc(DocumentType::Revenue, "100.00", 1),
        ]
    }

    fn fast() -> RetryPolicy {
        RetryPolicy::new(3, StdDuration::ZERO)
    }

    const GOOD_REPLY: &str = r#"```json
{"sentiment": {"positive": 1, "neutral": 0, "negative": 1},
 "topItems": [{"item": "Coffee", "count": 2}],
 "negativeKeywords": [{"text": "slow service", "value": 1}],
 "businessSummary": "Coffee sells well; service speed needs work."}
```"#;

    #[tokio::test]
    async fn test_complete_summary_merges_ai_and_local() {
        let store = FixedStore::new(sample_docs());
        let mock = MockBackend::replying(GOOD_REPLY);
        let outcome = SummaryAssembler::new(&store, Some(&mock))
            .with_policy(fast())
            .summarize(Some("owner@shop.test"), now())
            .await
            .unwrap();

        assert!(!outcome.is_degraded());
        let response = outcome.into_response();
        assert_eq!(response.kpis.average_bill_size.to_string(), "20.00");
        assert_eq!(response.kpis.total_revenue_this_week.to_string(), "300.00");
        assert_eq!(response.kpis.feedback_count, 1);
        assert_eq!(response.revenue_over_time.len(), 2);
        assert_eq!(response.sentiment.negative, 1);
        assert_eq!(response.top_items[0].item, "Coffee");
        assert!(response.business_summary.starts_with("Coffee sells well"));

        // One call, and the prompt carried the documents
        assert_eq!(mock.attempts(), 1);
        assert!(mock.prompts()[0].contains("Great coffee, slow service"));
    }

    #[tokio::test]
    async fn test_ai_unavailable_degrades_with_local_kpis() {
        let store = FixedStore::new(sample_docs());
        let mock = MockBackend::overloaded();
        let outcome = SummaryAssembler::new(&store, Some(&mock))
            .with_policy(fast())
            .summarize(Some("owner@shop.test"), now())
            .await
            .unwrap();

        assert!(outcome.is_degraded());
        let response = outcome.response();
        assert_eq!(response.sentiment, Sentiment::default());
        assert!(response.top_items.is_empty());
        assert!(response.negative_keywords.is_empty());
        assert!(response.revenue_over_time.is_empty());
        assert_eq!(response.business_summary, AI_UNAVAILABLE_SUMMARY);
        assert_eq!(response.kpis.average_bill_size.to_string(), "20.00");
        assert_eq!(mock.attempts(), 3);
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_ai_parse_error() {
        let store = FixedStore::new(sample_docs());
        let mock = MockBackend::replying("not json");
        let err = SummaryAssembler::new(&store, Some(&mock))
            .with_policy(fast())
            .summarize(Some("owner@shop.test"), now())
            .await
            .unwrap_err();

        match err {
            Error::AiParse { raw, .. } => assert_eq!(raw, "not json"),
            other => panic!("expected AiParse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_backend_short_circuits_before_fetch() {
        let store = FixedStore::new(sample_docs());
        let err = SummaryAssembler::<MockBackend>::new(&store, None)
            .summarize(Some("owner@shop.test"), now())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ConfigurationMissing(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_owner_is_auth_required() {
        let store = FixedStore::new(sample_docs());
        let mock = MockBackend::new();
        let err = SummaryAssembler::new(&store, Some(&mock))
            .summarize(None, now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthRequired));
        assert_eq!(mock.attempts(), 0);
    }

    #[tokio::test]
    async fn test_storage_error_propagates() {
        let mock = MockBackend::new();
        let err = SummaryAssembler::new(&BrokenStore, Some(&mock))
            .summarize(Some("owner@shop.test"), now())
            .await
            .unwrap_err();
        assert!(err.is_storage());
        assert_eq!(mock.attempts(), 0);
    }

    #[tokio::test]
    async fn test_no_documents_is_not_an_error() {
        let store = FixedStore::new(vec![]);
        let mock = MockBackend::replying("{}");
        let response = SummaryAssembler::new(&store, Some(&mock))
            .summarize(Some("owner@shop.test"), now())
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.kpis, KpiSet::default());
        assert!(response.revenue_over_time.is_empty());
    }

    #[tokio::test]
    async fn test_recovers_from_transient_overload() {
        let store = FixedStore::new(sample_docs());
        let mock = MockBackend::scripted(vec![
            Err(CompletionError::Overloaded("HTTP 503".into())),
            Ok(GOOD_REPLY.into()),
        ]);
        let outcome = SummaryAssembler::new(&store, Some(&mock))
            .with_policy(fast())
            .summarize(Some("owner@shop.test"), now())
            .await
            .unwrap();
        assert!(!outcome.is_degraded());
        assert_eq!(mock.attempts(), 2);
    }

    #[tokio::test]
    async fn test_response_json_shape() {
        let store = FixedStore::new(sample_docs());
        let mock = MockBackend::replying(GOOD_REPLY);
        let response = SummaryAssembler::new(&store, Some(&mock))
            .summarize(Some("owner@shop.test"), now())
            .await
            .unwrap()
            .into_response();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["kpis"]["averageBillSize"], "20.00");
        assert!(json["revenueOverTime"].is_array());
        assert_eq!(json["revenueOverTime"][0]["date"], "2024-08-13");
        assert_eq!(json["negativeKeywords"][0]["text"], "slow service");
        assert!(json["businessSummary"].is_string());
    }
}
