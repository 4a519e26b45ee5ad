//! Text extraction from statement documents.
//!
//! Several interchangeable backends turn document bytes into text. The
//! [`BackendSelector`] runs them all and keeps the output that looks most like a
//! statement.

mod extractor;
mod selector;

pub use extractor::{LopdfExtractor, PdfExtractExtractor, PlainTextExtractor};
pub use selector::{score_text, BackendScore, BackendSelector, ExtractedText};

use serde::Serialize;

use crate::error::PdfError;
use crate::statement::rules::text::join_pages;

/// Type of document content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfType {
    /// Contains extractable text.
    Text,
    /// Empty, scanned or unreadable.
    Empty,
}

/// Summary of a document's extractable text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub char_count: usize,
    pub pdf_type: PdfType,
    /// Backend whose output was measured.
    pub backend: String,
    /// Scores of every backend tried.
    pub scores: Vec<BackendScore>,
    /// Leading text, for display.
    pub preview: String,
}

/// Result type for text extraction.
pub type Result<T> = std::result::Result<T, PdfError>;

/// A text extraction backend.
pub trait TextExtractor: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &str;

    /// Extract text page by page, in reading order.
    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>>;

    /// Extract the whole document as one string.
    fn extract_text(&self, data: &[u8]) -> Result<String> {
        Ok(join_pages(&self.extract_pages(data)?))
    }
}
