//! Comparison of extracted transactions against ground truth.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::models::config::ValidationConfig;
use crate::models::transaction::{saturating_total, Transaction};
use crate::models::validation::{
    GroundTruthEntry, MissingTransaction, TolerancePolicy, ValidationReport, ValidationResult,
    ValidationStatus,
};

use super::ground_truth::GroundTruthTable;

const AMOUNT_WEIGHT: f64 = 0.7;
const COUNT_WEIGHT: f64 = 0.3;

const ESTIMATE_NOTE: &str = "estimated from the average expected amount; not a real transaction";

/// Scores transaction lists against a ground-truth table.
pub struct Validator {
    ground_truth: GroundTruthTable,
    tolerance: TolerancePolicy,
    min_accuracy: f64,
    require_min_accuracy: bool,
}

impl Validator {
    /// Create a validator with an absolute tolerance of one unit.
    pub fn new(ground_truth: GroundTruthTable) -> Self {
        Self::from_config(ground_truth, &ValidationConfig::default())
    }

    pub fn from_config(ground_truth: GroundTruthTable, config: &ValidationConfig) -> Self {
        Self {
            ground_truth,
            tolerance: config.tolerance,
            min_accuracy: config.min_accuracy,
            require_min_accuracy: config.require_min_accuracy,
        }
    }

    pub fn with_tolerance(mut self, tolerance: TolerancePolicy) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Also require a weighted accuracy of at least `min_accuracy` to pass.
    pub fn with_min_accuracy(mut self, min_accuracy: f64) -> Self {
        self.min_accuracy = min_accuracy;
        self.require_min_accuracy = true;
        self
    }

    pub fn ground_truth(&self) -> &GroundTruthTable {
        &self.ground_truth
    }

    /// Validate one bill. A bill without ground truth yields a flagged zero-accuracy result.
    pub fn validate(&self, bill_id: &str, transactions: &[Transaction]) -> ValidationResult {
        let Some(entry) = self.ground_truth.get(bill_id) else {
            warn!("No ground truth for bill {}", bill_id);
            return ValidationResult::no_ground_truth(bill_id, transactions);
        };

        let actual_count = transactions.len();
        let actual_total = saturating_total(transactions.iter().map(|t| t.amount));
        let amount_difference = actual_total.saturating_sub(entry.expected_total);
        let tolerance = self.tolerance.limit(entry.expected_total);

        let count_valid = actual_count == entry.expected_count;
        let amount_valid = amount_difference.abs() <= tolerance;

        let amount_accuracy = amount_accuracy(entry.expected_total, actual_total);
        let count_accuracy = if count_valid { 1.0 } else { 0.0 };
        let accuracy = AMOUNT_WEIGHT * amount_accuracy + COUNT_WEIGHT * count_accuracy;

        let mut overall_valid = count_valid && amount_valid;
        if self.require_min_accuracy {
            overall_valid = overall_valid && accuracy >= self.min_accuracy;
        }

        let message = if overall_valid {
            None
        } else {
            Some(describe_failure(entry, actual_count, amount_difference, count_valid, amount_valid))
        };

        debug!(
            "Bill {}: {}/{} transactions, total {} vs {}, accuracy {:.3}",
            bill_id, actual_count, entry.expected_count, actual_total, entry.expected_total, accuracy
        );

        ValidationResult {
            bill_id: bill_id.to_string(),
            status: ValidationStatus::Validated,
            expected_count: entry.expected_count,
            actual_count,
            expected_total: entry.expected_total,
            actual_total,
            amount_difference,
            tolerance,
            accuracy,
            amount_accuracy,
            count_accuracy,
            count_valid,
            amount_valid,
            overall_valid,
            missing_transactions: missing_placeholders(entry, actual_count),
            extra_transactions: transactions
                .get(entry.expected_count..)
                .map(<[Transaction]>::to_vec)
                .unwrap_or_default(),
            message,
        }
    }

    /// Aggregate per-bill results.
    ///
    /// Overall accuracy is weighted by each bill's expected total, or a plain mean when
    /// every expected total is zero.
    pub fn generate_report(&self, results: Vec<ValidationResult>) -> ValidationReport {
        let total_bills = results.len();
        let passed = results.iter().filter(|r| r.overall_valid).count();
        let no_ground_truth = results.iter().filter(|r| !r.has_ground_truth()).count();

        let weight: f64 = results
            .iter()
            .filter_map(|r| r.expected_total.to_f64())
            .sum();
        let overall_accuracy = if weight > 0.0 {
            results
                .iter()
                .map(|r| r.accuracy * r.expected_total.to_f64().unwrap_or(0.0))
                .sum::<f64>()
                / weight
        } else if total_bills > 0 {
            results.iter().map(|r| r.accuracy).sum::<f64>() / total_bills as f64
        } else {
            0.0
        };

        let pass_rate = if total_bills > 0 {
            passed as f64 / total_bills as f64
        } else {
            0.0
        };

        info!(
            "Validated {} bills: {} passed, {} failed, accuracy {:.1}%",
            total_bills,
            passed,
            total_bills - passed,
            overall_accuracy * 100.0
        );

        ValidationReport {
            results,
            total_bills,
            passed,
            failed: total_bills - passed,
            no_ground_truth,
            overall_accuracy,
            pass_rate,
        }
    }

    /// Validate several bills and aggregate, keeping input order.
    pub fn validate_batch(&self, bills: &[(String, Vec<Transaction>)]) -> ValidationReport {
        let results = bills
            .iter()
            .map(|(bill_id, transactions)| self.validate(bill_id, transactions))
            .collect();
        self.generate_report(results)
    }
}

fn amount_accuracy(expected: Decimal, actual: Decimal) -> f64 {
    if expected.is_zero() {
        return if actual.is_zero() { 1.0 } else { 0.0 };
    }
    let relative_error = actual
        .saturating_sub(expected)
        .abs()
        .checked_div(expected.abs())
        .and_then(|e| e.to_f64())
        .unwrap_or(1.0);
    (1.0 - relative_error).max(0.0)
}

/// One placeholder per transaction short of the expected count.
fn missing_placeholders(entry: &GroundTruthEntry, actual_count: usize) -> Vec<MissingTransaction> {
    let estimated_amount = entry.average_amount();
    (1..=entry.expected_count.saturating_sub(actual_count))
        .map(|index| MissingTransaction {
            index,
            estimated_amount,
            note: ESTIMATE_NOTE.to_string(),
        })
        .collect()
}

fn describe_failure(
    entry: &GroundTruthEntry,
    actual_count: usize,
    amount_difference: Decimal,
    count_valid: bool,
    amount_valid: bool,
) -> String {
    let mut problems = Vec::new();
    if !count_valid {
        problems.push(format!(
            "expected {} transactions, found {}",
            entry.expected_count, actual_count
        ));
    }
    if !amount_valid {
        problems.push(format!("total differs by {}", amount_difference));
    }
    if problems.is_empty() {
        problems.push("accuracy below minimum".to_string());
    }
    problems.join("; ")
}
