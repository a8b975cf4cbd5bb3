//! Deterministic KPI calculation
//!
//! Everything here is a pure function of the documents and the supplied
//! clock. Amounts are held as integer cents so sums are exact; the only
//! rounding is in the average bill size, which rounds half up.

use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;
use serde::{Serialize, Serializer};

use super::classify::ClassifiedDocuments;
use crate::error::Result;
use crate::models::Document;

/// Length of the trailing revenue window
pub const REVENUE_WINDOW_DAYS: i64 = 7;

/// A currency amount in hundredths
///
/// Serializes as a two-decimal string (`"12.34"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Build from the digits either side of a decimal point
    ///
    /// Commas in the integer part are ignored. Fractions longer than two
    /// digits round half up on the third digit.
    pub fn from_parts(integer: &str, fraction: &str) -> Option<Cents> {
        let integer: String = integer.chars().filter(|c| *c != ',').collect();
        if integer.is_empty() || !integer.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let whole: i64 = integer.parse().ok()?;
        let mut digits = fraction.chars().map(|c| i64::from(c as u8 - b'0'));
        let tenths = digits.next().unwrap_or(0);
        let hundredths = digits.next().unwrap_or(0);
        let round_up = digits.next().is_some_and(|d| d >= 5);

        whole
            .checked_mul(100)?
            .checked_add(tenths * 10 + hundredths + i64::from(round_up))
            .map(Cents)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, Add::add)
    }
}

/// Strategy for pulling a currency amount out of document text
pub trait AmountExtractor: Send + Sync {
    /// The amount found in `text`, or `None` if there is no usable amount
    fn extract(&self, text: &str) -> Option<Cents>;
}

/// Finds the first `TOTAL PAID`, `TOTAL`, or `AMOUNT` label followed by an
/// optional currency marker and a number with exactly two decimals
///
/// Labels are matched case-insensitively on word boundaries, so `SUBTOTAL`
/// does not count. Negative amounts never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabeledAmountExtractor;

fn labeled_amount_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:total\s+paid|total|amount)\b(?:\s+(?:due|paid))?\s*[:=]?\s*(?:[$€£₹]|rs\.?|usd|eur|gbp|inr)?\s*(\d{1,3}(?:,\d{3})+|\d+)\.(\d{2})(?:[^\d]|$)",
        )
        .expect("valid regex")
    })
}

impl AmountExtractor for LabeledAmountExtractor {
    fn extract(&self, text: &str) -> Option<Cents> {
        let caps = labeled_amount_regex().captures(text)?;
        Cents::from_parts(caps.get(1)?.as_str(), caps.get(2)?.as_str())
    }
}

/// Extractor driven by a caller-supplied pattern
///
/// The pattern must have two capture groups: integer digits and fraction
/// digits.
#[derive(Debug, Clone)]
pub struct PatternAmountExtractor {
    regex: Regex,
}

impl PatternAmountExtractor {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl AmountExtractor for PatternAmountExtractor {
    fn extract(&self, text: &str) -> Option<Cents> {
        let caps = self.regex.captures(text)?;
        let fraction = caps.get(2).map_or("", |m| m.as_str());
        Cents::from_parts(caps.get(1)?.as_str(), fraction)
    }
}

/// A leading number such as `"1250.5"` or `"$300"`, the way a revenue
/// figure is usually entered
fn leading_amount(text: &str) -> Option<Cents> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[$€£₹]\s*)?(\d+)(?:\.(\d+))?").expect("valid regex")
    });
    let caps = re.captures(text)?;
    let fraction = caps.get(2).map_or("", |m| m.as_str());
    Cents::from_parts(caps.get(1)?.as_str(), fraction)
}

/// Amount carried by a revenue document: a labeled total if there is one,
/// otherwise a leading number; zero when neither parses
pub fn revenue_amount(doc: &Document, extractor: &dyn AmountExtractor) -> Cents {
    extractor
        .extract(&doc.content)
        .or_else(|| leading_amount(&doc.content))
        .filter(|c| c.0 >= 0)
        .unwrap_or_default()
}

/// Amount on a bill; zero when no amount is found
pub fn bill_amount(doc: &Document, extractor: &dyn AmountExtractor) -> Cents {
    extractor
        .extract(&doc.content)
        .filter(|c| c.0 >= 0)
        .unwrap_or_default()
}

/// Locally computed key figures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSet {
    /// Revenue uploaded in the trailing seven days
    pub total_revenue_this_week: Cents,
    /// Mean of bill amounts; bills without an amount count as zero
    pub average_bill_size: Cents,
    pub feedback_count: usize,
}

/// Compute the KPI set for a document collection as of `now`
pub fn compute_kpis(
    documents: &[Document],
    now: DateTime<Utc>,
    extractor: &dyn AmountExtractor,
) -> KpiSet {
    let classified = ClassifiedDocuments::classify(documents);
    let window_start = now - Duration::days(REVENUE_WINDOW_DAYS);

    let total_revenue_this_week = classified
        .revenues
        .iter()
        .filter(|doc| doc.uploaded_at > window_start)
        .map(|doc| revenue_amount(doc, extractor))
        .sum();

    let bill_total: Cents = classified
        .bills
        .iter()
        .map(|doc| bill_amount(doc, extractor))
        .sum();

    KpiSet {
        total_revenue_this_week,
        average_bill_size: average_half_up(bill_total, classified.bills.len()),
        feedback_count: classified.feedbacks.len(),
    }
}

fn average_half_up(total: Cents, count: usize) -> Cents {
    if count == 0 {
        return Cents::ZERO;
    }
    let n = count as i64;
    Cents((total.0.saturating_mul(2).saturating_add(n)) / (2 * n))
}

/// One point of the revenue time series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenuePoint {
    /// Calendar day, `YYYY-MM-DD` (UTC)
    pub date: String,
    pub total: f64,
}

/// Revenue grouped by upload day, oldest first
///
/// Only days with at least one revenue document appear.
pub fn revenue_by_day(documents: &[Document], extractor: &dyn AmountExtractor) -> Vec<RevenuePoint> {
    let classified = ClassifiedDocuments::classify(documents);

    let mut by_day: BTreeMap<NaiveDate, Cents> = BTreeMap::new();
    for doc in &classified.revenues {
        let day = doc.uploaded_at.date_naive();
        let entry = by_day.entry(day).or_default();
        *entry = *entry + revenue_amount(doc, extractor);
    }

    by_day
        .into_iter()
        .map(|(day, total)| RevenuePoint {
            date: day.format("%Y-%m-%d").to_string(),
            total: total.as_f64(),
        })
        .collect()
}
