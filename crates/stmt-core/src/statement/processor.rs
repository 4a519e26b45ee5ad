//! Per-document orchestration: text → transactions → validation.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PatternError, Result};
use crate::models::config::StmtConfig;
use crate::models::transaction::{saturating_total, Transaction};
use crate::models::validation::{ValidationReport, ValidationResult};
use crate::pdf::BackendSelector;
use crate::validation::Validator;

use super::assembler::Assembler;
use super::engine::PatternEngine;
use super::repository::PatternRepository;
use super::rules::{clean_text, format_amount};

/// Outcome of processing one document.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    /// File path or caller-supplied label.
    pub source: String,
    pub transactions: Vec<Transaction>,
    pub pattern_used: Option<String>,
    /// Text extraction backend, when the input was a file.
    pub backend: Option<String>,
    pub processing_time_ms: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Captures that could not be assembled into transactions.
    pub rejected_captures: usize,
    /// Transactions dropped as non-purchase line items.
    pub filtered_out: usize,
    pub success: bool,
}

impl ProcessingResult {
    fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            transactions: Vec::new(),
            pattern_used: None,
            backend: None,
            processing_time_ms: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            rejected_captures: 0,
            filtered_out: 0,
            success: true,
        }
    }

    /// A result for a source that could not be processed at all.
    pub fn failed(source: impl Into<String>, error: impl ToString) -> Self {
        let mut result = Self::new(source);
        result.success = false;
        result.errors.push(error.to_string());
        result
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn total_amount(&self) -> Decimal {
        saturating_total(self.transactions.iter().map(|t| t.amount))
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub results: Vec<ProcessingResult>,
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_transactions: usize,
    pub total_amount: Decimal,
    pub success_rate: f64,
    pub processing_time_ms: u64,
}

impl BatchResult {
    /// Aggregate per-file results.
    pub fn from_results(results: Vec<ProcessingResult>, processing_time_ms: u64) -> Self {
        let total_files = results.len();
        let successful = results.iter().filter(|r| r.success).count();
        let total_transactions = results.iter().map(|r| r.transaction_count()).sum();
        let total_amount = saturating_total(results.iter().map(|r| r.total_amount()));
        let success_rate = if total_files == 0 {
            0.0
        } else {
            successful as f64 / total_files as f64
        };

        Self {
            results,
            total_files,
            successful,
            failed: total_files - successful,
            total_transactions,
            total_amount,
            success_rate,
            processing_time_ms,
        }
    }
}

/// Runs the extraction pipeline over statements.
pub struct StatementProcessor {
    engine: PatternEngine,
    assembler: Assembler,
    selector: BackendSelector,
    validator: Option<Validator>,
    config: StmtConfig,
}

impl StatementProcessor {
    /// Build a processor with the built-in patterns plus the configured pattern file.
    pub fn new(config: StmtConfig) -> Result<Self> {
        let mut repository = PatternRepository::with_builtin()?;
        if let Some(path) = &config.patterns_file {
            repository.load_from_file(path)?;
        }

        Ok(Self {
            engine: PatternEngine::new(repository).with_min_matches(config.extraction.min_matches),
            assembler: Assembler::from_config(&config.extraction),
            selector: BackendSelector::from_config(&config.pdf),
            validator: None,
            config,
        })
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_assembler(mut self, assembler: Assembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_selector(mut self, selector: BackendSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn engine(&self) -> &PatternEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PatternEngine {
        &mut self.engine
    }

    pub fn assembler(&self) -> &Assembler {
        &self.assembler
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    pub fn config(&self) -> &StmtConfig {
        &self.config
    }

    /// Extract transactions from already extracted text.
    ///
    /// Uses `pattern_name` when given, otherwise auto-detects. A document no pattern
    /// applies to yields no transactions, which is not a failure.
    pub fn process_text(&self, source: &str, text: &str, pattern_name: Option<&str>) -> ProcessingResult {
        let start = Instant::now();
        let mut result = ProcessingResult::new(source);

        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            result.warnings.push("no text to process".to_string());
            result.processing_time_ms = start.elapsed().as_millis() as u64;
            return result;
        }

        let name = match pattern_name {
            Some(name) => name.to_string(),
            None => match self.engine.detect(&cleaned) {
                Some(detection) => detection.pattern,
                None => {
                    result.warnings.push("no matching pattern detected".to_string());
                    result.processing_time_ms = start.elapsed().as_millis() as u64;
                    return result;
                }
            },
        };

        let Some(pattern) = self.engine.repository().get(&name) else {
            let mut failed = ProcessingResult::failed(source, PatternError::NotFound(name));
            failed.processing_time_ms = start.elapsed().as_millis() as u64;
            return failed;
        };

        let captures = match self.engine.extract(&cleaned, &name) {
            Ok(captures) => captures,
            Err(e) => {
                let mut failed = ProcessingResult::failed(source, e);
                failed.processing_time_ms = start.elapsed().as_millis() as u64;
                return failed;
            }
        };
        debug!("Pattern {} produced {} raw captures", name, captures.len());

        let outcome = self.assembler.assemble_all(&captures, pattern);
        let (transactions, excluded) = self.assembler.partition_excluded(outcome.transactions);

        if captures.is_empty() {
            result.warnings.push(format!("pattern {} matched nothing", name));
        }
        if !outcome.rejected.is_empty() {
            result
                .warnings
                .push(format!("{} captures could not be assembled", outcome.rejected.len()));
        }

        result.rejected_captures = outcome.rejected.len();
        result.filtered_out = excluded.len();
        result.transactions = transactions;
        result.pattern_used = Some(name);
        result.processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "{}: {} transactions ({} rejected, {} filtered)",
            source,
            result.transactions.len(),
            result.rejected_captures,
            result.filtered_out
        );
        result
    }

    /// Extract transactions from a statement file. Errors become a failed result.
    pub fn process_file(&self, path: &Path, pattern_name: Option<&str>) -> ProcessingResult {
        let start = Instant::now();
        let source = path.display().to_string();

        let extracted = match self.selector.extract_file(path) {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Failed to read {}: {}", source, e);
                let mut failed = ProcessingResult::failed(source, e);
                failed.processing_time_ms = start.elapsed().as_millis() as u64;
                return failed;
            }
        };

        let mut result = self.process_text(&source, &extracted.text, pattern_name);
        result.backend = Some(extracted.backend);
        result.processing_time_ms = start.elapsed().as_millis() as u64;
        result
    }

    /// Process a file and validate it against ground truth.
    ///
    /// The bill id defaults to the file stem. Without a configured validator the
    /// validation result is `None`.
    pub fn process_with_validation(
        &self,
        path: &Path,
        bill_id: Option<&str>,
        pattern_name: Option<&str>,
    ) -> (ProcessingResult, Option<ValidationResult>) {
        let result = self.process_file(path, pattern_name);
        let bill_id = bill_id
            .map(str::to_string)
            .unwrap_or_else(|| bill_id_for(path));

        let validation = self
            .validator
            .as_ref()
            .map(|v| v.validate(&bill_id, &result.transactions));
        (result, validation)
    }

    /// Process files one after another. Always completes.
    pub fn process_batch(&self, paths: &[PathBuf], pattern_name: Option<&str>) -> BatchResult {
        let start = Instant::now();
        let results = paths
            .iter()
            .map(|path| self.process_file(path, pattern_name))
            .collect();
        BatchResult::from_results(results, start.elapsed().as_millis() as u64)
    }

    /// Validate every successful result of a batch, keyed by file stem.
    pub fn validate_batch(&self, batch: &BatchResult) -> Option<ValidationReport> {
        let validator = self.validator.as_ref()?;
        let bills: Vec<(String, Vec<Transaction>)> = batch
            .results
            .iter()
            .filter(|r| r.success)
            .map(|r| (bill_id_for(Path::new(&r.source)), r.transactions.clone()))
            .collect();
        Some(validator.validate_batch(&bills))
    }
}

/// Bill identifier for a statement file: its stem.
pub fn bill_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Plain-text summary of a batch run.
pub fn text_report(batch: &BatchResult, validation: Option<&ValidationReport>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Statement processing report");
    let _ = writeln!(out, "===========================");
    let _ = writeln!(out, "Files processed:    {}", batch.total_files);
    let _ = writeln!(out, "Successful:         {}", batch.successful);
    let _ = writeln!(out, "Failed:             {}", batch.failed);
    let _ = writeln!(out, "Success rate:       {:.1}%", batch.success_rate * 100.0);
    let _ = writeln!(out, "Total transactions: {}", batch.total_transactions);
    let _ = writeln!(out, "Total amount:       ${}", format_amount(batch.total_amount));
    let _ = writeln!(out, "Processing time:    {} ms", batch.processing_time_ms);
    let _ = writeln!(out);

    let _ = writeln!(out, "Files");
    let _ = writeln!(out, "-----");
    for result in &batch.results {
        if result.success {
            let _ = writeln!(
                out,
                "[OK]     {}: {} transactions, ${} ({})",
                result.source,
                result.transaction_count(),
                format_amount(result.total_amount()),
                result.pattern_used.as_deref().unwrap_or("no pattern")
            );
        } else {
            let _ = writeln!(out, "[FAILED] {}: {}", result.source, result.errors.join("; "));
        }
    }

    if let Some(report) = validation {
        let _ = writeln!(out);
        let _ = writeln!(out, "Validation");
        let _ = writeln!(out, "----------");
        let _ = writeln!(
            out,
            "Bills: {}  Passed: {}  Failed: {}  No ground truth: {}",
            report.total_bills, report.passed, report.failed, report.no_ground_truth
        );
        let _ = writeln!(out, "Overall accuracy: {:.1}%", report.overall_accuracy * 100.0);
        for r in &report.results {
            let status = if r.overall_valid { "[PASS]" } else { "[FAIL]" };
            let _ = writeln!(
                out,
                "{} {}: {}/{} transactions, ${} / ${}",
                status,
                r.bill_id,
                r.actual_count,
                r.expected_count,
                format_amount(r.actual_total),
                format_amount(r.expected_total)
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::fixtures::BLOCK_STATEMENT;
    use crate::validation::GroundTruthTable;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn processor() -> StatementProcessor {
        let config = StmtConfig::default();
        let assembler = Assembler::from_config(&config.extraction)
            .with_reference_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        StatementProcessor::new(config)
            .unwrap()
            .with_assembler(assembler)
            .with_validator(Validator::new(GroundTruthTable::sample()))
    }

    #[test]
    fn test_processor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StatementProcessor>();
    }

    #[test]
    fn test_block_statement_end_to_end() {
        let result = processor().process_text("feb", BLOCK_STATEMENT, None);

        assert!(result.success);
        assert_eq!(result.pattern_used.as_deref(), Some("avianca_block"));
        assert_eq!(result.transaction_count(), 5);
        assert_eq!(result.filtered_out, 1);
        assert_eq!(result.rejected_captures, 0);
        assert_eq!(result.total_amount(), Decimal::from_str("434980.00").unwrap());
        assert_eq!(result.transactions[0].description, "PAYU*NETFLIX");
        assert!(
            result
                .transactions
                .iter()
                .all(|t| !t.description.contains("INTERESES"))
        );
    }

    #[test]
    fn test_end_to_end_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AV - MC - 02 - FEB-2025.txt");
        std::fs::write(&path, BLOCK_STATEMENT).unwrap();

        let (result, validation) = processor().process_with_validation(&path, None, None);
        assert_eq!(result.backend.as_deref(), Some("plain_text"));

        let validation = validation.unwrap();
        assert_eq!(validation.bill_id, "AV - MC - 02 - FEB-2025");
        assert!(validation.count_valid);
        assert!(validation.amount_valid);
        assert!(validation.overall_valid);
    }

    #[test]
    fn test_empty_text_is_a_warning() {
        let result = processor().process_text("empty", " \n ", None);
        assert!(result.success);
        assert!(result.transactions.is_empty());
        assert_eq!(result.warnings, vec!["no text to process"]);
    }

    #[test]
    fn test_undetected_document_yields_no_transactions() {
        let result = processor().process_text("unknown", "hello world", None);
        assert!(result.success);
        assert_eq!(result.pattern_used, None);
        assert!(result.transactions.is_empty());
    }

    #[test]
    fn test_unknown_pattern_fails() {
        let result = processor().process_text("x", BLOCK_STATEMENT, Some("missing"));
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_explicit_pattern_skips_detection() {
        let result = processor().process_text("x", BLOCK_STATEMENT, Some("avianca_standard"));
        assert!(result.success);
        assert_eq!(result.pattern_used.as_deref(), Some("avianca_standard"));
        assert!(result.transactions.is_empty());
    }

    #[test]
    fn test_batch_always_completes() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        let other = dir.path().join("other.txt");
        std::fs::write(&good, BLOCK_STATEMENT).unwrap();
        std::fs::write(&other, "nothing to see").unwrap();
        let missing = dir.path().join("missing.pdf");

        let batch = processor().process_batch(&[good, other, missing], None);

        assert_eq!(batch.total_files, 3);
        assert_eq!(batch.successful, 2);
        assert_eq!(batch.failed, 1);
        assert_eq!(batch.total_transactions, 5);
        assert_eq!(batch.total_amount, Decimal::from_str("434980.00").unwrap());

        let report = text_report(&batch, None);
        assert!(report.contains("Files processed:    3"));
        assert!(report.contains("[FAILED]"));
        assert!(report.contains("$434,980.00"));
    }

    #[test]
    fn test_validate_batch_uses_file_stems() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AV - MC - 02 - FEB-2025.txt");
        std::fs::write(&path, BLOCK_STATEMENT).unwrap();

        let p = processor();
        let batch = p.process_batch(&[path], None);
        let report = p.validate_batch(&batch).unwrap();

        assert_eq!(report.passed, 1);
        let text = text_report(&batch, Some(&report));
        assert!(text.contains("[PASS] AV - MC - 02 - FEB-2025"));
    }

    #[test]
    fn test_validate_batch_skips_failed_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("AV - MC - 02 - FEB-2025.txt");
        std::fs::write(&good, BLOCK_STATEMENT).unwrap();
        let unreadable = dir.path().join("AV - MC - 03 - MAR-2025.pdf");

        let p = processor();
        let batch = p.process_batch(&[good, unreadable], None);
        assert_eq!(batch.failed, 1);

        let report = p.validate_batch(&batch).unwrap();
        assert_eq!(report.total_bills, 1);
        assert_eq!(report.results[0].bill_id, "AV - MC - 02 - FEB-2025");
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 15).unwrap();
        let mut huge = ProcessingResult::new("huge");
        huge.transactions = vec![
            Transaction::new(date, "A", Decimal::MAX),
            Transaction::new(date, "B", Decimal::MAX),
        ];
        assert_eq!(huge.total_amount(), Decimal::MAX);

        let batch = BatchResult::from_results(vec![huge.clone(), huge], 0);
        assert_eq!(batch.total_amount, Decimal::MAX);
        assert_eq!(batch.total_transactions, 4);
    }
}
