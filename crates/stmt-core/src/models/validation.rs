//! Ground-truth and validation result models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::{saturating_total, Transaction};

/// Expected count and total for one bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthEntry {
    /// Bill identifier, usually the statement file stem.
    #[serde(alias = "bill_id")]
    pub bill_name: String,

    /// Expected number of purchase transactions.
    pub expected_count: usize,

    /// Expected sum of transaction amounts.
    pub expected_total: Decimal,
}

impl GroundTruthEntry {
    pub fn new(bill_name: impl Into<String>, expected_count: usize, expected_total: Decimal) -> Self {
        Self {
            bill_name: bill_name.into(),
            expected_count,
            expected_total,
        }
    }

    /// Average amount per expected transaction.
    pub fn average_amount(&self) -> Decimal {
        if self.expected_count == 0 {
            return Decimal::ZERO;
        }
        (self.expected_total / Decimal::from(self.expected_count)).round_dp(2)
    }
}

/// Allowed deviation between the extracted and expected totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TolerancePolicy {
    /// Fixed monetary amount.
    Absolute { amount: Decimal },
    /// Fraction of the expected total (0.01 = 1%).
    Relative { percentage: Decimal },
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        TolerancePolicy::Absolute {
            amount: Decimal::ONE,
        }
    }
}

impl TolerancePolicy {
    /// Largest accepted absolute difference for a given expected total.
    pub fn limit(&self, expected_total: Decimal) -> Decimal {
        match self {
            TolerancePolicy::Absolute { amount } => amount.abs(),
            TolerancePolicy::Relative { percentage } => expected_total.saturating_mul(*percentage).abs(),
        }
    }

    /// Whether `actual` is within tolerance of `expected`.
    pub fn allows(&self, expected: Decimal, actual: Decimal) -> bool {
        actual.saturating_sub(expected).abs() <= self.limit(expected)
    }
}

/// Whether ground truth was available for a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Compared against a ground-truth entry.
    Validated,
    /// No entry exists for the bill.
    NoGroundTruth,
}

/// Placeholder for a transaction the extraction is assumed to have missed.
///
/// These are synthesized from the ground truth's average amount. They do not identify
/// which real transaction was missed; the ground truth carries no line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingTransaction {
    /// 1-based position among the placeholders.
    pub index: usize,

    /// Average expected amount, for display.
    pub estimated_amount: Decimal,

    /// Label marking the record as an estimate.
    pub note: String,
}

/// Comparison of one bill's transactions against its ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub bill_id: String,
    pub status: ValidationStatus,

    pub expected_count: usize,
    pub actual_count: usize,
    pub expected_total: Decimal,
    pub actual_total: Decimal,

    /// `actual_total - expected_total`.
    pub amount_difference: Decimal,

    /// Absolute tolerance that was applied.
    pub tolerance: Decimal,

    /// 0.7 × amount accuracy + 0.3 × count accuracy.
    pub accuracy: f64,
    pub amount_accuracy: f64,
    pub count_accuracy: f64,

    pub count_valid: bool,
    pub amount_valid: bool,
    pub overall_valid: bool,

    /// Heuristic placeholders when fewer transactions than expected were found.
    pub missing_transactions: Vec<MissingTransaction>,

    /// Trailing transactions beyond the expected count, in extraction order.
    pub extra_transactions: Vec<Transaction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationResult {
    /// Result for a bill that has no ground-truth entry.
    pub fn no_ground_truth(bill_id: impl Into<String>, transactions: &[Transaction]) -> Self {
        let bill_id = bill_id.into();
        let actual_total = saturating_total(transactions.iter().map(|t| t.amount));
        Self {
            message: Some(format!("no ground truth found for bill '{}'", bill_id)),
            bill_id,
            status: ValidationStatus::NoGroundTruth,
            expected_count: 0,
            actual_count: transactions.len(),
            expected_total: Decimal::ZERO,
            actual_total,
            amount_difference: actual_total,
            tolerance: Decimal::ZERO,
            accuracy: 0.0,
            amount_accuracy: 0.0,
            count_accuracy: 0.0,
            count_valid: false,
            amount_valid: false,
            overall_valid: false,
            missing_transactions: Vec::new(),
            extra_transactions: Vec::new(),
        }
    }

    pub fn has_ground_truth(&self) -> bool {
        self.status == ValidationStatus::Validated
    }
}

/// Aggregate over several bills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Per-bill results in input order.
    pub results: Vec<ValidationResult>,
    pub total_bills: usize,
    pub passed: usize,
    pub failed: usize,
    pub no_ground_truth: usize,
    /// Accuracy weighted by expected total.
    pub overall_accuracy: f64,
    /// `passed / total_bills`.
    pub pass_rate: f64,
}

impl ValidationReport {
    /// Failed results only.
    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.overall_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_absolute_tolerance() {
        let policy = TolerancePolicy::Absolute { amount: dec("1.00") };
        assert!(policy.allows(dec("100.00"), dec("101.00")));
        assert!(!policy.allows(dec("100.00"), dec("101.01")));
    }

    #[test]
    fn test_relative_tolerance() {
        let policy = TolerancePolicy::Relative { percentage: dec("0.01") };
        assert_eq!(policy.limit(dec("434980.00")), dec("4349.80"));
        assert!(policy.allows(dec("1000"), dec("990")));
        assert!(!policy.allows(dec("1000"), dec("989.99")));
    }

    #[test]
    fn test_ground_truth_entry_accepts_numeric_total() {
        let entry: GroundTruthEntry = serde_json::from_str(
            r#"{"bill_name": "AV - MC - 03 - MAR-2025", "expected_total": 44900, "expected_count": 2}"#,
        )
        .unwrap();
        assert_eq!(entry.expected_total, dec("44900"));
        assert_eq!(entry.average_amount(), dec("22450"));
    }

    #[test]
    fn test_tolerance_policy_json_shape() {
        let policy: TolerancePolicy =
            serde_json::from_str(r#"{"kind": "relative", "percentage": "0.05"}"#).unwrap();
        assert_eq!(policy, TolerancePolicy::Relative { percentage: dec("0.05") });
    }
}
