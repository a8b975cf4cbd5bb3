//! Summary prompt construction
//!
//! One prompt per summary request. The expected output schema is written
//! into the prompt itself, tagged with `PROMPT_SCHEMA_VERSION`, so the
//! normalizer and the model agree on field names.

use chrono::NaiveDate;

use crate::models::Document;

/// Version tag of the output schema described in the prompt
pub const PROMPT_SCHEMA_VERSION: &str = "analytics-summary/v1";

/// Separator placed between documents of the same kind
pub const DOCUMENT_DELIMITER: &str = "\n---\n";

const EMPTY_SECTION: &str = "(none provided)";

const OUTPUT_SCHEMA: &str = r#"{
  "sentiment": { "positive": <integer>, "neutral": <integer>, "negative": <integer> },
  "topItems": [ { "item": "<product or service name>", "count": <integer> } ],
  "negativeKeywords": [ { "text": "<complaint phrase>", "value": <integer frequency> } ],
  "businessSummary": "<two or three sentence summary for the business owner>"
}"#;

/// Build the analytics prompt
///
/// Deterministic for a given input and `today`.
pub fn build_prompt(
    bills: &[&Document],
    feedbacks: &[&Document],
    revenues: &[&Document],
    today: NaiveDate,
) -> String {
    let bill_text = join_contents(bills);
    let feedback_text = join_contents(feedbacks);
    let revenue_text = revenue_lines(revenues);

    format!(
        "You are a business analyst for a small business. Today's date is {today}.\n\
         Analyze the documents below and respond with a single JSON object.\n\
         \n\
         ## Bills ({bill_count})\n{bill_text}\n\
         \n\
         ## Customer feedback ({feedback_count})\n{feedback_text}\n\
         \n\
         ## Revenue entries ({revenue_count})\n{revenue_text}\n\
         \n\
         ## Instructions\n\
         1. Classify each feedback entry as positive, neutral, or negative and count them.\n\
         2. List up to 5 products or services mentioned most often across bills and feedback, most frequent first.\n\
         3. List recurring complaint phrases from negative feedback with how often each occurs.\n\
         4. Write a short summary of how the business is doing.\n\
         \n\
         ## Output format ({version})\n\
         Respond with JSON only, no markdown and no commentary, matching exactly:\n\
         {schema}\n",
        today = today.format("%Y-%m-%d"),
        bill_count = bills.len(),
        feedback_count = feedbacks.len(),
        revenue_count = revenues.len(),
        version = PROMPT_SCHEMA_VERSION,
        schema = OUTPUT_SCHEMA,
    )
}

fn join_contents(docs: &[&Document]) -> String {
    if docs.is_empty() {
        return EMPTY_SECTION.to_string();
    }
    docs.iter()
        .map(|doc| doc.content.trim())
        .collect::<Vec<_>>()
        .join(DOCUMENT_DELIMITER)
}

fn revenue_lines(docs: &[&Document]) -> String {
    if docs.is_empty() {
        return EMPTY_SECTION.to_string();
    }
    docs.iter()
        .map(|doc| {
            let figure = doc.content.split_whitespace().collect::<Vec<_>>().join(" ");
            format!("- {}: {}", doc.uploaded_at.format("%Y-%m-%d"), figure)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
