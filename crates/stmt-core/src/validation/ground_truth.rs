//! Expected per-bill counts and totals.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::error::{GroundTruthError, Result};
use crate::models::transaction::saturating_total;
use crate::models::validation::GroundTruthEntry;

/// Known statements used for regression checks: (bill, expected total, expected count).
const SAMPLE_BILLS: [(&str, &str, usize); 6] = [
    ("AV - MC - 02 - FEB-2025", "434980.00", 5),
    ("AV - MC - 03 - MAR-2025", "44900.00", 2),
    ("AV - MC - 04 - ABR-2025", "1068097.00", 9),
    ("AV - VS - 02 - FEB-2025", "1702961.00", 18),
    ("AV - VS - 03 - MAR-2025", "810460.00", 14),
    ("AV - VS - 04 - ABR-2025", "1058980.00", 20),
];

/// Totals across the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundTruthSummary {
    pub total_bills: usize,
    pub total_expected_transactions: usize,
    pub total_expected_amount: Decimal,
    pub bills: Vec<String>,
}

/// Which processed bills have ground truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    /// Processed bills with an entry.
    pub covered: Vec<String>,
    /// Processed bills without an entry.
    pub missing: Vec<String>,
    /// Entries no processed bill refers to.
    pub extra: Vec<String>,
    pub coverage_rate: f64,
}

/// Bill id → ground-truth entry.
#[derive(Debug, Clone, Default)]
pub struct GroundTruthTable {
    entries: BTreeMap<String, GroundTruthEntry>,
}

impl GroundTruthTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The six reference statements.
    pub fn sample() -> Self {
        let mut table = Self::new();
        for (bill, total, count) in SAMPLE_BILLS {
            if let Ok(total) = Decimal::from_str(total) {
                table.insert(GroundTruthEntry::new(bill, count, total));
            }
        }
        table
    }

    /// Build a table, rejecting blank bill names and negative totals.
    pub fn from_entries(entries: Vec<GroundTruthEntry>) -> std::result::Result<Self, GroundTruthError> {
        let mut table = Self::new();
        for entry in entries {
            check_entry(&entry)?;
            table.insert(entry);
        }
        Ok(table)
    }

    /// Parse a JSON array of `{bill_name, expected_total, expected_count}`.
    pub fn from_json(content: &str) -> std::result::Result<Self, GroundTruthError> {
        let entries: Vec<GroundTruthEntry> =
            serde_json::from_str(content).map_err(|e| GroundTruthError::Parse(e.to_string()))?;
        Self::from_entries(entries)
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table = Self::from_json(&content)?;
        info!("Loaded {} ground truth entries from {}", table.len(), path.display());
        Ok(table)
    }

    /// Write the table as a JSON array.
    pub fn save(&self, path: &Path) -> Result<()> {
        let entries: Vec<&GroundTruthEntry> = self.entries.values().collect();
        let content = serde_json::to_string_pretty(&entries)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, bill_id: &str) -> Option<&GroundTruthEntry> {
        self.entries.get(bill_id)
    }

    /// Add an entry, replacing any entry for the same bill.
    pub fn insert(&mut self, entry: GroundTruthEntry) {
        self.entries.insert(entry.bill_name.clone(), entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &GroundTruthEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> GroundTruthSummary {
        GroundTruthSummary {
            total_bills: self.entries.len(),
            total_expected_transactions: self.entries.values().map(|e| e.expected_count).sum(),
            total_expected_amount: saturating_total(self.entries.values().map(|e| e.expected_total)),
            bills: self.entries.keys().cloned().collect(),
        }
    }

    /// Compare a set of processed bill ids against the table.
    pub fn coverage<S: AsRef<str>>(&self, bill_ids: &[S]) -> CoverageReport {
        let mut covered = Vec::new();
        let mut missing = Vec::new();
        for id in bill_ids {
            let id = id.as_ref();
            if self.entries.contains_key(id) {
                covered.push(id.to_string());
            } else {
                missing.push(id.to_string());
            }
        }

        let extra = self
            .entries
            .keys()
            .filter(|k| !bill_ids.iter().any(|id| id.as_ref() == k.as_str()))
            .cloned()
            .collect();

        let coverage_rate = if bill_ids.is_empty() {
            0.0
        } else {
            covered.len() as f64 / bill_ids.len() as f64
        };

        CoverageReport {
            covered,
            missing,
            extra,
            coverage_rate,
        }
    }
}

fn check_entry(entry: &GroundTruthEntry) -> std::result::Result<(), GroundTruthError> {
    if entry.bill_name.trim().is_empty() {
        return Err(GroundTruthError::InvalidEntry {
            bill: entry.bill_name.clone(),
            reason: "bill name is empty".to_string(),
        });
    }
    if entry.expected_total.is_sign_negative() {
        return Err(GroundTruthError::InvalidEntry {
            bill: entry.bill_name.clone(),
            reason: format!("expected total {} is negative", entry.expected_total),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_sample_table() {
        let table = GroundTruthTable::sample();
        assert_eq!(table.len(), 6);

        let feb = table.get("AV - MC - 02 - FEB-2025").unwrap();
        assert_eq!(feb.expected_count, 5);
        assert_eq!(feb.expected_total, dec("434980.00"));

        let summary = table.summary();
        assert_eq!(summary.total_expected_transactions, 68);
        assert_eq!(summary.total_expected_amount, dec("5120378.00"));
    }

    #[test]
    fn test_from_json_accepts_bill_id_alias() {
        let table = GroundTruthTable::from_json(
            r#"[
                {"bill_name": "A", "expected_total": "100.50", "expected_count": 2},
                {"bill_id": "B", "expected_total": 20, "expected_count": 1}
            ]"#,
        )
        .unwrap();

        assert_eq!(table.get("A").unwrap().expected_total, dec("100.50"));
        assert_eq!(table.get("B").unwrap().expected_count, 1);
    }

    #[test]
    fn test_rejects_invalid_entries() {
        let err = GroundTruthTable::from_entries(vec![GroundTruthEntry::new(" ", 1, dec("1"))]).unwrap_err();
        assert!(matches!(err, GroundTruthError::InvalidEntry { .. }));

        let err = GroundTruthTable::from_entries(vec![GroundTruthEntry::new("A", 1, dec("-1"))]).unwrap_err();
        assert!(matches!(err, GroundTruthError::InvalidEntry { .. }));

        let err = GroundTruthTable::from_json("{not json").unwrap_err();
        assert!(matches!(err, GroundTruthError::Parse(_)));
    }

    #[test]
    fn test_insert_replaces() {
        let mut table = GroundTruthTable::new();
        table.insert(GroundTruthEntry::new("A", 1, dec("10")));
        table.insert(GroundTruthEntry::new("A", 3, dec("30")));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("A").unwrap().expected_count, 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ground_truth.json");

        GroundTruthTable::sample().save(&path).unwrap();
        let loaded = GroundTruthTable::load(&path).unwrap();
        assert_eq!(loaded.summary(), GroundTruthTable::sample().summary());
    }

    #[test]
    fn test_coverage() {
        let table = GroundTruthTable::sample();
        let report = table.coverage(&["AV - MC - 02 - FEB-2025", "unknown"]);

        assert_eq!(report.covered, vec!["AV - MC - 02 - FEB-2025"]);
        assert_eq!(report.missing, vec!["unknown"]);
        assert_eq!(report.extra.len(), 5);
        assert_eq!(report.coverage_rate, 0.5);
    }
}
