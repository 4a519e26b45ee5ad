//! Best-of-N backend selection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::extractor::{LopdfExtractor, PdfExtractExtractor, PlainTextExtractor};
use super::{DocumentInfo, PdfType, Result, TextExtractor};
use crate::error::PdfError;
use crate::models::config::{BackendKind, PdfConfig};
use crate::statement::rules::clean_text;
use crate::statement::rules::patterns::{DATE_TOKEN, MONEY, TRANSACTION_MARKER};
use crate::statement::rules::text::join_pages;

const PREVIEW_CHARS: usize = 500;

/// Score one backend's output by how statement-like it looks.
pub fn score_text(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }

    let mut score = 1.0 + (text.len() as f64 / 10_000.0).min(1.0);
    if TRANSACTION_MARKER.is_match(text) {
        score += 2.0;
    }
    if MONEY.is_match(text) {
        score += 1.0;
    }
    if DATE_TOKEN.is_match(text) {
        score += 1.0;
    }
    score
}

/// How one backend fared on a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendScore {
    pub backend: String,
    pub score: f64,
    pub char_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Text chosen from the best backend.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub backend: String,
    pub score: f64,
    pub page_count: usize,
    pub scores: Vec<BackendScore>,
}

/// Runs every configured backend and keeps the best output.
pub struct BackendSelector {
    backends: Vec<Box<dyn TextExtractor>>,
    min_text_length: usize,
    // path → backend that won last time
    cache: Mutex<HashMap<PathBuf, String>>,
}

impl BackendSelector {
    /// Create a selector over backends in tie-break order.
    pub fn new(backends: Vec<Box<dyn TextExtractor>>) -> Self {
        Self {
            backends,
            min_text_length: PdfConfig::default().min_text_length,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Create a selector with the configured PDF backends.
    pub fn from_config(config: &PdfConfig) -> Self {
        let backends = config
            .backends
            .iter()
            .map(|kind| -> Box<dyn TextExtractor> {
                match kind {
                    BackendKind::Lopdf => Box::new(LopdfExtractor::new()),
                    BackendKind::PdfExtract => Box::new(PdfExtractExtractor::new()),
                }
            })
            .collect();
        Self::new(backends).with_min_text_length(config.min_text_length)
    }

    pub fn with_min_text_length(mut self, min_text_length: usize) -> Self {
        self.min_text_length = min_text_length;
        self
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Run every backend and return the highest scoring text. Ties keep the earlier backend.
    pub fn extract_best(&self, data: &[u8]) -> Result<ExtractedText> {
        let mut scores = Vec::with_capacity(self.backends.len());
        let mut best: Option<(usize, String, f64, usize)> = None;

        for (index, backend) in self.backends.iter().enumerate() {
            match backend.extract_pages(data) {
                Ok(pages) => {
                    let text = join_pages(&pages);
                    let score = score_text(&text);
                    debug!("Backend {} scored {:.2} ({} chars)", backend.name(), score, text.len());
                    scores.push(BackendScore {
                        backend: backend.name().to_string(),
                        score,
                        char_count: text.chars().count(),
                        error: None,
                    });
                    if score > 0.0 && best.as_ref().is_none_or(|(_, _, s, _)| score > *s) {
                        best = Some((index, text, score, pages.len()));
                    }
                }
                Err(e) => {
                    warn!("Backend {} failed: {}", backend.name(), e);
                    scores.push(BackendScore {
                        backend: backend.name().to_string(),
                        score: 0.0,
                        char_count: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let (index, text, score, page_count) = best.ok_or(PdfError::NoBackend)?;
        Ok(ExtractedText {
            text,
            backend: self.backends[index].name().to_string(),
            score,
            page_count,
            scores,
        })
    }

    /// Extract text from a file. `.txt` files are read as plain text.
    ///
    /// The backend that wins for a path is remembered and tried alone next time.
    pub fn extract_file(&self, path: &Path) -> crate::Result<ExtractedText> {
        let data = std::fs::read(path)?;

        if is_plain_text(path) {
            let pages = PlainTextExtractor::new().extract_pages(&data)?;
            let text = join_pages(&pages);
            let score = score_text(&text);
            return Ok(ExtractedText {
                backend: "plain_text".to_string(),
                score,
                page_count: pages.len(),
                scores: vec![BackendScore {
                    backend: "plain_text".to_string(),
                    score,
                    char_count: text.chars().count(),
                    error: None,
                }],
                text,
            });
        }

        if let Some(cached) = self.cached_backend(path) {
            if let Some(extracted) = self.extract_with_cached(&cached, &data) {
                debug!("Reused backend {} for {}", cached, path.display());
                return Ok(extracted);
            }
        }

        let extracted = self.extract_best(&data)?;
        info!(
            "Selected backend {} for {} (score {:.2})",
            extracted.backend,
            path.display(),
            extracted.score
        );
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.to_path_buf(), extracted.backend.clone());
        Ok(extracted)
    }

    fn extract_with_cached(&self, name: &str, data: &[u8]) -> Option<ExtractedText> {
        let backend = self.backends.iter().find(|b| b.name() == name)?;
        let pages = backend.extract_pages(data).ok()?;
        let text = join_pages(&pages);
        let score = score_text(&text);
        (score > 0.0).then(|| ExtractedText {
            backend: name.to_string(),
            score,
            page_count: pages.len(),
            scores: vec![BackendScore {
                backend: name.to_string(),
                score,
                char_count: text.chars().count(),
                error: None,
            }],
            text,
        })
    }

    /// Backend remembered for a path.
    pub fn cached_backend(&self, path: &Path) -> Option<String> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .cloned()
    }

    /// Describe a document's extractable text.
    pub fn analyze(&self, data: &[u8]) -> Result<DocumentInfo> {
        Ok(self.describe(self.extract_best(data)?))
    }

    /// Describe a file's extractable text.
    pub fn analyze_file(&self, path: &Path) -> crate::Result<DocumentInfo> {
        Ok(self.describe(self.extract_file(path)?))
    }

    fn describe(&self, extracted: ExtractedText) -> DocumentInfo {
        let cleaned = clean_text(&extracted.text);
        let char_count = cleaned.chars().count();
        let pdf_type = if char_count >= self.min_text_length {
            PdfType::Text
        } else {
            PdfType::Empty
        };

        DocumentInfo {
            page_count: extracted.page_count,
            char_count,
            pdf_type,
            backend: extracted.backend,
            scores: extracted.scores,
            preview: cleaned.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

impl Default for BackendSelector {
    fn default() -> Self {
        Self::from_config(&PdfConfig::default())
    }
}

fn is_plain_text(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns fixed text, or fails when none is set.
    struct FixedExtractor {
        name: &'static str,
        text: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl FixedExtractor {
        fn boxed(name: &'static str, text: Option<&'static str>) -> Box<dyn TextExtractor> {
            Box::new(Self {
                name,
                text,
                calls: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    impl TextExtractor for FixedExtractor {
        fn name(&self) -> &str {
            self.name
        }

        fn extract_pages(&self, _data: &[u8]) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.text
                .map(|t| vec![t.to_string()])
                .ok_or_else(|| PdfError::TextExtraction("broken".to_string()))
        }
    }

    const STATEMENT_TEXT: &str = "15 02 25 PAYU*NETFLIX $44,900.00";

    #[test]
    fn test_score_text() {
        assert_eq!(score_text("   "), 0.0);
        assert!((score_text("hello") - 1.0005).abs() < 1e-9);
        // markers + money + date
        assert!(score_text(STATEMENT_TEXT) > 5.0);
    }

    #[test]
    fn test_best_backend_wins() {
        let selector = BackendSelector::new(vec![
            FixedExtractor::boxed("plain", Some("some words")),
            FixedExtractor::boxed("rich", Some(STATEMENT_TEXT)),
        ]);

        let extracted = selector.extract_best(b"").unwrap();
        assert_eq!(extracted.backend, "rich");
        assert_eq!(extracted.text, STATEMENT_TEXT);
        assert_eq!(extracted.scores.len(), 2);
    }

    #[test]
    fn test_tie_keeps_earlier_backend() {
        let selector = BackendSelector::new(vec![
            FixedExtractor::boxed("first", Some(STATEMENT_TEXT)),
            FixedExtractor::boxed("second", Some(STATEMENT_TEXT)),
        ]);
        assert_eq!(selector.extract_best(b"").unwrap().backend, "first");
    }

    #[test]
    fn test_failing_backend_is_skipped() {
        let selector = BackendSelector::new(vec![
            FixedExtractor::boxed("broken", None),
            FixedExtractor::boxed("working", Some(STATEMENT_TEXT)),
        ]);

        let extracted = selector.extract_best(b"").unwrap();
        assert_eq!(extracted.backend, "working");
        assert!(extracted.scores[0].error.is_some());
    }

    #[test]
    fn test_no_usable_backend() {
        let selector = BackendSelector::new(vec![
            FixedExtractor::boxed("broken", None),
            FixedExtractor::boxed("empty", Some("  ")),
        ]);
        assert!(matches!(selector.extract_best(b""), Err(PdfError::NoBackend)));
    }

    #[test]
    fn test_cache_reuses_winning_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statement.pdf");
        std::fs::write(&path, b"%PDF-fake").unwrap();

        let loser_calls = Arc::new(AtomicUsize::new(0));
        let selector = BackendSelector::new(vec![
            Box::new(FixedExtractor {
                name: "loser",
                text: Some("words"),
                calls: Arc::clone(&loser_calls),
            }),
            FixedExtractor::boxed("winner", Some(STATEMENT_TEXT)),
        ]);

        assert_eq!(selector.extract_file(&path).unwrap().backend, "winner");
        assert_eq!(selector.cached_backend(&path).as_deref(), Some("winner"));

        assert_eq!(selector.extract_file(&path).unwrap().backend, "winner");
        assert_eq!(loser_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_plain_text_files_bypass_backends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statement.txt");
        std::fs::write(&path, STATEMENT_TEXT).unwrap();

        let selector = BackendSelector::new(Vec::new());
        let extracted = selector.extract_file(&path).unwrap();
        assert_eq!(extracted.backend, "plain_text");
        assert_eq!(extracted.text, STATEMENT_TEXT);
    }

    #[test]
    fn test_analyze() {
        let selector = BackendSelector::new(vec![FixedExtractor::boxed("rich", Some(STATEMENT_TEXT))]);

        let info = selector.analyze(b"").unwrap();
        assert_eq!(info.page_count, 1);
        assert_eq!(info.char_count, STATEMENT_TEXT.len());
        assert_eq!(info.pdf_type, PdfType::Empty);

        let info = selector.with_min_text_length(10).analyze(b"").unwrap();
        assert_eq!(info.pdf_type, PdfType::Text);
        assert_eq!(info.preview, STATEMENT_TEXT);
    }
}
