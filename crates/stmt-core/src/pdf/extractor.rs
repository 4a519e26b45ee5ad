//! Text extraction backends built on lopdf and pdf-extract.

use std::borrow::Cow;

use lopdf::Document;
use tracing::{debug, trace};

use super::{Result, TextExtractor};
use crate::error::PdfError;

/// Load a PDF, decrypting documents protected by an empty password.
fn load_document(data: &[u8]) -> Result<Document> {
    let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

    if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(PdfError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");
    }

    if doc.get_pages().is_empty() {
        return Err(PdfError::NoPages);
    }

    Ok(doc)
}

/// Page-by-page extraction through lopdf.
pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Number of pages in a PDF.
    pub fn page_count(&self, data: &[u8]) -> Result<usize> {
        Ok(load_document(data)?.get_pages().len())
    }
}

impl Default for LopdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for LopdfExtractor {
    fn name(&self) -> &str {
        "lopdf"
    }

    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>> {
        let doc = load_document(data)?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        let mut pages = Vec::with_capacity(page_numbers.len());
        for number in page_numbers {
            match doc.extract_text(&[number]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    // One unreadable page should not discard the rest
                    trace!("lopdf failed on page {}: {}", number, e);
                    pages.push(String::new());
                }
            }
        }

        if pages.iter().all(|p| p.trim().is_empty()) {
            return Err(PdfError::TextExtraction("no text on any page".to_string()));
        }

        debug!("lopdf extracted {} pages", pages.len());
        Ok(pages)
    }
}

/// Whole-document extraction through pdf-extract.
pub struct PdfExtractExtractor;

impl PdfExtractExtractor {
    pub fn new() -> Self {
        Self
    }

    /// pdf-extract cannot open encrypted files, so decrypt them through lopdf first.
    fn readable_bytes<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        let doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;
        if !doc.is_encrypted() {
            return Ok(Cow::Borrowed(data));
        }

        let mut doc = load_document(data)?;
        let mut decrypted = Vec::new();
        doc.save_to(&mut decrypted)
            .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
        Ok(Cow::Owned(decrypted))
    }
}

impl Default for PdfExtractExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for PdfExtractExtractor {
    fn name(&self) -> &str {
        "pdf_extract"
    }

    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>> {
        let bytes = self.readable_bytes(data)?;
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;
        debug!("pdf-extract produced {} chars", text.len());
        Ok(vec![text])
    }
}

/// Treats the input as UTF-8 text. Used for `.txt` exports.
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "plain_text"
    }

    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>> {
        let text = String::from_utf8_lossy(data);
        // Form feeds separate pages in text exports
        Ok(text.split('\u{000C}').map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_pages() {
        let extractor = PlainTextExtractor::new();
        let pages = extractor.extract_pages(b"page one\x0cpage two").unwrap();
        assert_eq!(pages, vec!["page one", "page two"]);
        assert_eq!(extractor.extract_text(b"a\x0c \x0cb").unwrap(), "a\nb");
    }

    #[test]
    fn test_invalid_pdf_bytes() {
        let result = LopdfExtractor::new().extract_pages(b"not a pdf");
        assert!(matches!(result, Err(PdfError::Parse(_))));

        let result = PdfExtractExtractor::new().extract_pages(b"not a pdf");
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(LopdfExtractor::new().name(), "lopdf");
        assert_eq!(PdfExtractExtractor::new().name(), "pdf_extract");
        assert_eq!(PlainTextExtractor::new().name(), "plain_text");
    }
}
