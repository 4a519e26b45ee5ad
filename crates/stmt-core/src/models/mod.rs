//! Data models shared across the extraction and validation pipeline.

pub mod config;
pub mod pattern;
pub mod transaction;
pub mod validation;

pub use config::StmtConfig;
pub use pattern::{CleanupRule, FieldLayout, FieldRole, Pattern};
pub use transaction::{saturating_total, RawCapture, Transaction};
pub use validation::{
    GroundTruthEntry, MissingTransaction, TolerancePolicy, ValidationReport, ValidationResult,
    ValidationStatus,
};
