//! Coercing model output into typed analytics
//!
//! The model's JSON is untrusted. Parsing only fails when the text is not a
//! JSON object at all; inside the object every field falls back to a
//! default (zero, empty, or blank) when missing or mistyped.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ai::parsing::{extract_json_object, strip_code_fences};
use crate::error::{Error, Result};

/// Most items kept from `topItems`
pub const MAX_TOP_ITEMS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sentiment {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopItem {
    pub item: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordFrequency {
    pub text: String,
    pub value: u64,
}

/// Validated AI-derived portion of a summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalytics {
    pub sentiment: Sentiment,
    pub top_items: Vec<TopItem>,
    pub negative_keywords: Vec<KeywordFrequency>,
    pub business_summary: String,
}

/// Parse raw model text into `AiAnalytics`
///
/// Fails with `Error::AiParse` (carrying the raw text) when no JSON object
/// can be read.
pub fn parse_analytics(raw: &str) -> Result<AiAnalytics> {
    let cleaned = strip_code_fences(raw);

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(first_err) => extract_json_object(&cleaned)
            .and_then(|json| serde_json::from_str::<Value>(json).ok())
            .ok_or_else(|| Error::AiParse {
                message: format!("Response is not valid JSON: {}", first_err),
                raw: raw.to_string(),
            })?,
    };

    let Value::Object(obj) = value else {
        return Err(Error::AiParse {
            message: "Response JSON is not an object".into(),
            raw: raw.to_string(),
        });
    };

    Ok(AiAnalytics {
        sentiment: sentiment_from(obj.get("sentiment")),
        top_items: top_items_from(obj.get("topItems")),
        negative_keywords: keywords_from(obj.get("negativeKeywords")),
        business_summary: obj
            .get("businessSummary")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    })
}

/// Non-negative integer from a number or numeric string; anything else is 0
fn coerce_count(value: Option<&Value>) -> u64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() && n > 0.0 => n.round() as u64,
        _ => 0,
    }
}

fn coerce_label(value: Option<&Value>) -> Option<String> {
    let label = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!label.is_empty()).then_some(label)
}

/// First key present among `keys`
fn first_of<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn sentiment_from(value: Option<&Value>) -> Sentiment {
    let Some(Value::Object(obj)) = value else {
        return Sentiment::default();
    };
    Sentiment {
        positive: coerce_count(obj.get("positive")),
        neutral: coerce_count(obj.get("neutral")),
        negative: coerce_count(obj.get("negative")),
    }
}

fn top_items_from(value: Option<&Value>) -> Vec<TopItem> {
    let Some(Value::Array(entries)) = value else {
        return vec![];
    };
    entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            Some(TopItem {
                item: coerce_label(first_of(obj, &["item", "name"]))?,
                count: coerce_count(first_of(obj, &["count", "value"])),
            })
        })
        .take(MAX_TOP_ITEMS)
        .collect()
}

fn keywords_from(value: Option<&Value>) -> Vec<KeywordFrequency> {
    let Some(Value::Array(entries)) = value else {
        return vec![];
    };
    entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            Some(KeywordFrequency {
                text: coerce_label(first_of(obj, &["text", "keyword"]))?,
                value: coerce_count(first_of(obj, &["value", "count", "frequency"])),
            })
        })
        .collect()
}
