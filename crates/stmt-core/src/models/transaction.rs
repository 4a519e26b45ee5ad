//! Transaction records produced by the assembler.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single purchase line extracted from a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Posting date.
    pub date: NaiveDate,

    /// Normalized merchant description.
    pub description: String,

    /// Transaction amount (always positive).
    pub amount: Decimal,

    /// Matched source text, kept for audit.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,

    /// Byte span of the match in the normalized text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<(usize, usize)>,

    /// Confidence score (0.0 - 1.0).
    #[serde(default = "full_confidence")]
    pub confidence: f32,
}

fn full_confidence() -> f32 {
    1.0
}

impl Transaction {
    /// Create a transaction with full confidence and no source span.
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            date,
            description: description.into(),
            amount,
            source: String::new(),
            position: None,
            confidence: 1.0,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Check the record invariants against a plausibility window.
    pub fn is_valid(&self, earliest: NaiveDate, latest: NaiveDate) -> bool {
        self.amount > Decimal::ZERO
            && !self.description.trim().is_empty()
            && self.date >= earliest
            && self.date <= latest
    }
}

/// Field text captured by a pattern matcher, tagged by role but not yet parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCapture {
    /// Date components in capture order.
    pub date_parts: Vec<String>,

    /// Description fragments in capture order.
    pub description_parts: Vec<String>,

    /// Amount text.
    pub amount: Option<String>,

    /// Full matched text.
    pub matched: String,

    /// Byte span of the match.
    pub span: (usize, usize),
}

impl RawCapture {
    /// Joined date components, space separated.
    pub fn date_text(&self) -> String {
        self.date_parts.join(" ")
    }

    /// Joined description fragments, space separated.
    pub fn description_text(&self) -> String {
        self.description_parts.join(" ")
    }
}

/// Sum of amounts, clamped to the decimal range instead of overflowing.
pub fn saturating_total(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts
        .into_iter()
        .fold(Decimal::ZERO, |total, amount| total.saturating_add(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_transaction_validity_window() {
        let txn = Transaction::new(date(2025, 2, 15), "NETFLIX", Decimal::from_str("44900.00").unwrap());

        assert!(txn.is_valid(date(2020, 1, 1), date(2026, 1, 1)));
        assert!(!txn.is_valid(date(2025, 3, 1), date(2026, 1, 1)));
        assert!(!txn.is_valid(date(2020, 1, 1), date(2025, 2, 14)));
    }

    #[test]
    fn test_transaction_rejects_non_positive_amount() {
        let txn = Transaction::new(date(2025, 2, 15), "NETFLIX", Decimal::ZERO);
        assert!(!txn.is_valid(date(2020, 1, 1), date(2026, 1, 1)));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let txn = Transaction::new(date(2025, 2, 15), "X", Decimal::ONE).with_confidence(1.7);
        assert_eq!(txn.confidence, 1.0);
    }

    #[test]
    fn test_deserialize_without_confidence() {
        let txn: Transaction = serde_json::from_str(
            r#"{"date": "2025-02-15", "description": "NETFLIX", "amount": "44900.00"}"#,
        )
        .unwrap();
        assert_eq!(txn.confidence, 1.0);
        assert_eq!(txn.source, "");
    }

    #[test]
    fn test_raw_capture_joins_parts() {
        let capture = RawCapture {
            date_parts: vec!["15".into(), "02".into(), "25".into()],
            description_parts: vec!["PAYU*NETFLIX".into(), "BOGOTA".into()],
            ..Default::default()
        };
        assert_eq!(capture.date_text(), "15 02 25");
        assert_eq!(capture.description_text(), "PAYU*NETFLIX BOGOTA");
    }

    #[test]
    fn test_saturating_total() {
        let amounts = ["44900.00", "120000.00", "80080.00"].map(|a| Decimal::from_str(a).unwrap());
        assert_eq!(saturating_total(amounts), Decimal::from_str("244980.00").unwrap());
        assert_eq!(saturating_total([]), Decimal::ZERO);
        assert_eq!(saturating_total([Decimal::MAX, Decimal::MAX]), Decimal::MAX);
        assert_eq!(saturating_total([Decimal::MAX, Decimal::ONE, Decimal::NEGATIVE_ONE]), Decimal::MAX - Decimal::ONE);
    }
}
