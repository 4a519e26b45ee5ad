//! Core library for credit-card statement parsing.
//!
//! This crate provides:
//! - Text extraction from statement PDFs with several backends
//! - Issuer and pattern detection over normalized statement text
//! - Transaction field parsing (dates, amounts, merchant descriptions)
//! - Ground-truth validation of extracted transactions
//! - Approximate pattern learning from known transactions

pub mod error;
pub mod models;
pub mod pdf;
pub mod statement;
pub mod validation;

pub use error::{GroundTruthError, PatternError, PdfError, Result, StmtError};
pub use models::{
    CleanupRule, FieldLayout, FieldRole, GroundTruthEntry, Pattern, RawCapture, StmtConfig,
    TolerancePolicy, Transaction, ValidationReport, ValidationResult,
};
pub use pdf::{BackendSelector, DocumentInfo, PdfType, TextExtractor};
pub use statement::{
    Assembler, BatchResult, PatternEngine, PatternLearner, PatternRepository, ProcessingResult,
    StatementProcessor,
};
pub use validation::{GroundTruthTable, Validator};
