//! Integration tests for docsight-core
//!
//! These tests exercise the full ingest → store → summarize workflow.

use chrono::{Duration, TimeZone, Utc};
use docsight_core::{
    ai::{CompletionError, MockBackend, RetryPolicy},
    analytics::{SummaryAssembler, AI_UNAVAILABLE_SUMMARY},
    db::Database,
    ingest::ingest_bytes,
    Error,
};

const OWNER: &str = "owner@bakery.test";

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, std::time::Duration::ZERO)
}

/// Loads one week of a small bakery's documents
fn seed(db: &Database) {
    let now = Utc::now();
    let uploads: [(&str, &[u8], Option<&str>, i64); 6] = [
        ("invoice-flour.txt", b"Flour 25kg\nTOTAL: 40.00", None, 5),
        ("receipt-butter.txt", b"Butter\nAmount Due: $20.00", None, 4),
        ("feedback-1.txt", b"The croissants were amazing", None, 3),
        ("feedback-2.txt", b"Queue was slow, bread was stale", None, 2),
        ("sales-monday.txt", b"150.00", None, 2),
        ("notes.txt", b"1000.00 from the catering order", Some("revenue"), 1),
    ];

    for (filename, bytes, declared, days_ago) in uploads {
        let mut doc = ingest_bytes(filename, bytes, declared).expect("ingest");
        doc.uploaded_at = Some(now - Duration::days(days_ago));
        db.insert_document(OWNER, &doc).expect("insert");
    }
}

// =============================================================================
// Summary Pipeline
// =============================================================================

#[tokio::test]
async fn test_full_summary_workflow() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    seed(&db);

    let ai = MockBackend::new();
    let outcome = SummaryAssembler::new(&db, Some(&ai))
        .with_policy(fast_retry())
        .summarize(Some(OWNER), Utc::now())
        .await
        .expect("summary");

    assert!(!outcome.is_degraded());
    let summary = outcome.into_response();

    // Bills: 40.00 and 20.00
    assert_eq!(summary.kpis.average_bill_size.to_string(), "30.00");
    // Revenue: 150.00 plus the declared revenue note's leading figure
    assert_eq!(summary.kpis.total_revenue_this_week.to_string(), "1150.00");
    assert_eq!(summary.kpis.feedback_count, 2);
    assert_eq!(summary.revenue_over_time.len(), 2);

    // Insights come from the mock's default reply
    assert_eq!(summary.sentiment.positive, 2);
    assert_eq!(summary.top_items[0].item, "Coffee");
    assert!(!summary.business_summary.is_empty());

    let prompt = &ai.prompts()[0];
    assert!(prompt.contains("Queue was slow"));
    assert!(prompt.contains("## Bills (2)"));
}

#[tokio::test]
async fn test_summary_degrades_when_ai_overloaded() {
    let db = Database::in_memory().unwrap();
    seed(&db);

    let ai = MockBackend::overloaded();
    let outcome = SummaryAssembler::new(&db, Some(&ai))
        .with_policy(fast_retry())
        .summarize(Some(OWNER), Utc::now())
        .await
        .unwrap();

    assert!(outcome.is_degraded());
    assert_eq!(ai.attempts(), 3);

    let summary = outcome.response();
    assert_eq!(summary.business_summary, AI_UNAVAILABLE_SUMMARY);
    assert_eq!(summary.kpis.average_bill_size.to_string(), "30.00");
    assert_eq!(summary.kpis.feedback_count, 2);
    assert!(summary.top_items.is_empty());
}

#[tokio::test]
async fn test_non_retryable_failure_is_single_attempt() {
    let db = Database::in_memory().unwrap();
    seed(&db);

    let ai = MockBackend::scripted(vec![Err(CompletionError::Rejected {
        status: 401,
        message: "bad key".into(),
    })]);
    let outcome = SummaryAssembler::new(&db, Some(&ai))
        .with_policy(fast_retry())
        .summarize(Some(OWNER), Utc::now())
        .await
        .unwrap();

    assert!(outcome.is_degraded());
    assert_eq!(ai.attempts(), 1);
}

#[tokio::test]
async fn test_summary_is_scoped_to_owner() {
    let db = Database::in_memory().unwrap();
    seed(&db);

    let ai = MockBackend::new();
    let summary = SummaryAssembler::new(&db, Some(&ai))
        .summarize(Some("someone-else@bakery.test"), Utc::now())
        .await
        .unwrap()
        .into_response();

    assert_eq!(summary.kpis.feedback_count, 0);
    assert_eq!(summary.kpis.average_bill_size.to_string(), "0.00");
    assert!(summary.revenue_over_time.is_empty());
    assert!(ai.prompts()[0].contains("## Bills (0)"));
}

#[tokio::test]
async fn test_old_revenue_outside_weekly_window() {
    let db = Database::in_memory().unwrap();
    let now = Utc.with_ymd_and_hms(2024, 8, 15, 12, 0, 0).unwrap();

    for (name, amount, days_ago) in [("sales-a.txt", "100.00", 1), ("sales-b.txt", "900.00", 8)] {
        let mut doc = ingest_bytes(name, amount.as_bytes(), None).unwrap();
        doc.uploaded_at = Some(now - Duration::days(days_ago));
        db.insert_document(OWNER, &doc).unwrap();
    }

    let ai = MockBackend::new();
    let summary = SummaryAssembler::new(&db, Some(&ai))
        .summarize(Some(OWNER), now)
        .await
        .unwrap()
        .into_response();

    assert_eq!(summary.kpis.total_revenue_this_week.to_string(), "100.00");
    // The series still covers every revenue entry
    let dates: Vec<_> = summary.revenue_over_time.iter().map(|p| p.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-08-07", "2024-08-14"]);
}

#[tokio::test]
async fn test_unusable_ai_reply_surfaces_raw_text() {
    let db = Database::in_memory().unwrap();
    seed(&db);

    let ai = MockBackend::replying("I'm sorry, I can't help with that.");
    let err = SummaryAssembler::new(&db, Some(&ai))
        .summarize(Some(OWNER), Utc::now())
        .await
        .unwrap_err();

    match err {
        Error::AiParse { raw, .. } => assert!(raw.contains("can't help")),
        other => panic!("expected AiParse, got {:?}", other),
    }
}

// =============================================================================
// Ingestion
// =============================================================================

#[test]
fn test_duplicate_upload_conflicts() {
    let db = Database::in_memory().unwrap();
    let doc = ingest_bytes("bill.txt", b"TOTAL: 5.00", None).unwrap();

    db.insert_document(OWNER, &doc).unwrap();
    let err = db.insert_document(OWNER, &doc).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // A different owner may upload the same content
    db.insert_document("other@bakery.test", &doc).unwrap();
}
