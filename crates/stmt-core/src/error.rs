//! Error types for the stmt-core library.

use thiserror::Error;

/// Main error type for the stmt library.
#[derive(Error, Debug)]
pub enum StmtError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Pattern registration or lookup error.
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// Ground-truth loading error.
    #[error("ground truth error: {0}")]
    GroundTruth(#[from] GroundTruthError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF text extraction.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Every configured backend failed.
    #[error("no text extraction backend succeeded")]
    NoBackend,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors raised when a pattern is registered or looked up.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    /// A required descriptor field is empty.
    #[error("pattern field '{field}' must not be empty")]
    EmptyField { field: String },

    /// The matcher expression does not compile.
    #[error("invalid matcher for pattern '{name}': {reason}")]
    InvalidRegex { name: String, reason: String },

    /// Confidence threshold outside [0, 1].
    #[error("confidence threshold {value} for pattern '{name}' is outside [0, 1]")]
    InvalidThreshold { name: String, value: f32 },

    /// Field-role descriptor does not fit the matcher.
    #[error("invalid field layout for pattern '{name}': {reason}")]
    InvalidLayout { name: String, reason: String },

    /// No pattern registered under that name.
    #[error("pattern not found: {0}")]
    NotFound(String),
}

/// Errors related to ground-truth data.
#[derive(Error, Debug)]
pub enum GroundTruthError {
    /// The ground-truth document could not be parsed.
    #[error("failed to parse ground truth: {0}")]
    Parse(String),

    /// An entry carries values that cannot be used.
    #[error("invalid ground truth entry for {bill}: {reason}")]
    InvalidEntry { bill: String, reason: String },
}

/// Result type for the stmt library.
pub type Result<T> = std::result::Result<T, StmtError>;
