//! Campaign progress toward the funding target.
//!
//! The total is always the plain sum of every stored contribution's
//! `amount`: no deduplication, no filtering, no time window. Stored data is
//! read defensively, so a document with a missing or unreadable amount
//! counts toward `count` but adds nothing to `total`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;
use crate::schema::Contribution;
use crate::store::{get_documents, Document, DocumentStore, Filter, Limit};

/// Funding goal used when `TARGET_AMOUNT` is not configured.
pub const DEFAULT_TARGET: f64 = 125_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub target: f64,
    pub total: f64,
    pub percent: f64,
    pub remaining: f64,
    pub count: usize,
}

/// Load every contribution and summarize it against `target`.
pub async fn compute_progress(store: &dyn DocumentStore, target: f64) -> Result<ProgressSummary> {
    let contributions =
        get_documents::<Contribution>(store, &Filter::new(), Limit::Unbounded).await?;
    Ok(summarize(target, &contributions))
}

/// Pure aggregation over already-fetched contribution documents.
///
/// Sums unrounded amounts; only the reported figures are rounded to cents.
pub fn summarize(target: f64, contributions: &[Document]) -> ProgressSummary {
    let total: f64 = contributions.iter().map(amount_of).sum();

    let percent = if target > 0.0 {
        (total / target * 100.0).min(100.0)
    } else {
        0.0
    };
    let remaining = (target - total).max(0.0);

    ProgressSummary {
        target,
        total: round_cents(total),
        percent: round_cents(percent),
        remaining: round_cents(remaining),
        count: contributions.len(),
    }
}

/// Numeric amount of a stored contribution, or `0.0` when it has none.
fn amount_of(doc: &Document) -> f64 {
    let amount = match doc.fields.get("amount") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    amount.filter(|a| a.is_finite()).unwrap_or(0.0)
}

/// Values too large to scale by 100 already carry no cents and are returned as is.
fn round_cents(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 100.0
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
