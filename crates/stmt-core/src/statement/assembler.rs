//! Transaction assembly and filtering.

use chrono::{Duration, Local, Months, NaiveDate};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::models::config::ExtractionConfig;
use crate::models::pattern::Pattern;
use crate::models::transaction::{RawCapture, Transaction};

use super::rules::dates::parse_date_with_hint;
use super::rules::{clean_description_with, extract_date_from_text, parse_amount};

/// Why a raw capture did not become a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no amount captured")]
    MissingAmount,

    #[error("unparseable amount: {0}")]
    InvalidAmount(String),

    #[error("amount is not positive: {0}")]
    NonPositiveAmount(Decimal),

    #[error("no date found in: {0}")]
    UnparseableDate(String),

    #[error("date outside accepted window: {0}")]
    OutOfRange(NaiveDate),
}

/// A capture the assembler refused, kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCapture {
    pub matched: String,
    pub reason: Rejection,
}

/// Result of assembling a batch of captures.
#[derive(Debug, Clone, Default)]
pub struct AssemblyOutcome {
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedCapture>,
}

/// Turns raw captures into transactions and drops non-purchase lines.
#[derive(Debug, Clone)]
pub struct Assembler {
    reference_date: Option<NaiveDate>,
    max_future_days: i64,
    max_past_years: i64,
    excluded: Vec<String>,
    synthetic_prefix: String,
}

impl Assembler {
    /// Create an assembler with the default window and exclusion list.
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    /// Create an assembler from extraction settings.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            reference_date: None,
            max_future_days: config.max_future_days,
            max_past_years: config.max_past_years,
            excluded: config
                .excluded_descriptions
                .iter()
                .map(|s| s.to_uppercase())
                .collect(),
            synthetic_prefix: config.synthetic_description_prefix.clone(),
        }
    }

    /// Anchor the plausibility window on a fixed date instead of today.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Replace the exclusion vocabulary.
    pub fn with_excluded_descriptions(mut self, excluded: Vec<String>) -> Self {
        self.excluded = excluded.into_iter().map(|s| s.to_uppercase()).collect();
        self
    }

    pub fn excluded_descriptions(&self) -> &[String] {
        &self.excluded
    }

    /// Earliest and latest accepted transaction dates.
    pub fn window(&self) -> (NaiveDate, NaiveDate) {
        let today = self
            .reference_date
            .unwrap_or_else(|| Local::now().date_naive());

        let past_months = u32::try_from(self.max_past_years.max(0) * 12).unwrap_or(u32::MAX);
        let earliest = today
            .checked_sub_months(Months::new(past_months))
            .unwrap_or(NaiveDate::MIN);
        let latest = today
            .checked_add_signed(Duration::days(self.max_future_days.max(0)))
            .unwrap_or(NaiveDate::MAX);

        (earliest, latest)
    }

    /// Build a transaction from one capture.
    pub fn assemble(&self, capture: &RawCapture, pattern: &Pattern) -> Result<Transaction, Rejection> {
        let amount_text = capture.amount.as_deref().ok_or(Rejection::MissingAmount)?;
        let amount =
            parse_amount(amount_text).ok_or_else(|| Rejection::InvalidAmount(amount_text.to_string()))?;
        if amount <= Decimal::ZERO {
            return Err(Rejection::NonPositiveAmount(amount));
        }

        let mut confidence = 1.0_f32;

        let date_text = capture.date_text();
        let date = match parse_date_with_hint(&date_text, Some(&pattern.date_format)) {
            Some(date) => date,
            None => {
                // Fall back to scanning the captured date text, then the whole match
                confidence -= 0.15;
                extract_date_from_text(&date_text)
                    .or_else(|| extract_date_from_text(&capture.matched))
                    .ok_or_else(|| Rejection::UnparseableDate(date_text.clone()))?
            }
        };

        let mut description = clean_description_with(&capture.description_text(), &pattern.cleanup_rules);
        if description.is_empty() {
            confidence -= 0.2;
            description = format!("{} {}", self.synthetic_prefix, date.format("%Y-%m-%d"));
        }

        let (earliest, latest) = self.window();
        let transaction = Transaction::new(date, description, amount)
            .with_source(capture.matched.clone())
            .with_position(capture.span.0, capture.span.1)
            .with_confidence(confidence);

        if !transaction.is_valid(earliest, latest) {
            return Err(Rejection::OutOfRange(date));
        }

        Ok(transaction)
    }

    /// Assemble every capture, collecting refusals instead of failing.
    pub fn assemble_all(&self, captures: &[RawCapture], pattern: &Pattern) -> AssemblyOutcome {
        let mut outcome = AssemblyOutcome::default();

        for capture in captures {
            match self.assemble(capture, pattern) {
                Ok(transaction) => outcome.transactions.push(transaction),
                Err(reason) => {
                    debug!("Rejected capture {:?}: {}", capture.matched, reason);
                    outcome.rejected.push(RejectedCapture {
                        matched: capture.matched.clone(),
                        reason,
                    });
                }
            }
        }

        outcome
    }

    /// Whether a description contains an excluded phrase (case-insensitive substring).
    pub fn is_excluded(&self, description: &str) -> bool {
        let upper = description.to_uppercase();
        self.excluded.iter().any(|phrase| upper.contains(phrase.as_str()))
    }

    /// Drop non-purchase line items.
    pub fn filter(&self, transactions: Vec<Transaction>) -> Vec<Transaction> {
        self.partition_excluded(transactions).0
    }

    /// Split transactions into kept purchases and excluded line items.
    pub fn partition_excluded(&self, transactions: Vec<Transaction>) -> (Vec<Transaction>, Vec<Transaction>) {
        let (excluded, kept): (Vec<_>, Vec<_>) = transactions
            .into_iter()
            .partition(|t| self.is_excluded(&t.description));

        for t in &excluded {
            debug!("Filtered excluded line item: {}", t.description);
        }

        (kept, excluded)
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pattern::CleanupRule;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assembler() -> Assembler {
        Assembler::new().with_reference_date(date(2025, 6, 1))
    }

    fn pattern() -> Pattern {
        Pattern::new("test", "avianca", "mastercard", r"(\d{2}) (\d{2}) (\d{2}) (.+) ([\d,.]+)")
            .with_cleanup_rules(vec![CleanupRule::RemoveTrailingNumbers])
    }

    fn capture(date: &[&str], description: &str, amount: Option<&str>) -> RawCapture {
        RawCapture {
            date_parts: date.iter().map(|s| s.to_string()).collect(),
            description_parts: if description.is_empty() {
                Vec::new()
            } else {
                vec![description.to_string()]
            },
            amount: amount.map(str::to_string),
            matched: format!("{} {} {}", date.join(" "), description, amount.unwrap_or("")),
            span: (10, 40),
        }
    }

    #[test]
    fn test_assemble_valid_capture() {
        let txn = assembler()
            .assemble(&capture(&["15", "02", "25"], "PAYU*NETFLIX 110111BOGOTA", Some("$44,900.00")), &pattern())
            .unwrap();

        assert_eq!(txn.date, date(2025, 2, 15));
        assert_eq!(txn.description, "PAYU*NETFLIX");
        assert_eq!(txn.amount, Decimal::from_str("44900.00").unwrap());
        assert_eq!(txn.position, Some((10, 40)));
        assert_eq!(txn.confidence, 1.0);
    }

    #[test]
    fn test_rejects_bad_amounts() {
        let a = assembler();
        let p = pattern();

        assert_eq!(
            a.assemble(&capture(&["15", "02", "25"], "X", None), &p),
            Err(Rejection::MissingAmount)
        );
        assert_eq!(
            a.assemble(&capture(&["15", "02", "25"], "X", Some("abc")), &p),
            Err(Rejection::InvalidAmount("abc".to_string()))
        );
        assert_eq!(
            a.assemble(&capture(&["15", "02", "25"], "X", Some("0.00")), &p),
            Err(Rejection::NonPositiveAmount(Decimal::from_str("0.00").unwrap()))
        );
    }

    #[test]
    fn test_rejects_unparseable_date() {
        let mut c = capture(&["31", "02", "25"], "X", Some("10.00"));
        c.matched = "31 02 25 X 10.00".to_string();
        assert!(matches!(
            assembler().assemble(&c, &pattern()),
            Err(Rejection::UnparseableDate(_))
        ));
    }

    #[test]
    fn test_rejects_dates_outside_window() {
        let result = assembler().assemble(&capture(&["15", "02", "99"], "X", Some("10.00")), &pattern());
        assert_eq!(result, Err(Rejection::OutOfRange(date(1999, 2, 15))));

        let result = assembler().assemble(&capture(&["15", "02", "28"], "X", Some("10.00")), &pattern());
        assert_eq!(result, Err(Rejection::OutOfRange(date(2028, 2, 15))));
    }

    #[test]
    fn test_date_falls_back_to_matched_text() {
        let mut c = capture(&[], "ALMACEN", Some("10.00"));
        c.matched = "compra 03/04/2025 ALMACEN 10.00".to_string();

        let txn = assembler().assemble(&c, &pattern()).unwrap();
        assert_eq!(txn.date, date(2025, 4, 3));
        assert!(txn.confidence < 1.0);
    }

    #[test]
    fn test_synthetic_description() {
        let txn = assembler()
            .assemble(&capture(&["15", "02", "25"], "", Some("10.00")), &pattern())
            .unwrap();
        assert_eq!(txn.description, "TRANSACTION 2025-02-15");
    }

    #[test]
    fn test_filter_uses_case_insensitive_substrings() {
        let amount = Decimal::from_str("10.00").unwrap();
        let transactions = vec![
            Transaction::new(date(2025, 2, 1), "NETFLIX", amount),
            Transaction::new(date(2025, 2, 2), "intereses facturados mes", amount),
            Transaction::new(date(2025, 2, 3), "PAGO ATH CANALES ELECTRONICOS BOGOTA", amount),
        ];

        let (kept, excluded) = assembler().partition_excluded(transactions);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].description, "NETFLIX");
        assert_eq!(excluded.len(), 2);
    }

    #[test]
    fn test_assemble_all_collects_rejections() {
        let captures = vec![
            capture(&["15", "02", "25"], "NETFLIX", Some("10.00")),
            capture(&["15", "02", "25"], "RAPPI", None),
        ];
        let outcome = assembler().assemble_all(&captures, &pattern());

        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].reason, Rejection::MissingAmount);
    }

    #[test]
    fn test_custom_exclusions() {
        let a = assembler().with_excluded_descriptions(vec!["netflix".to_string()]);
        assert!(a.is_excluded("PAYU*NETFLIX"));
        assert!(!a.is_excluded("INTERESES FACTURADOS"));
    }
}
