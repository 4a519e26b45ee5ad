//! Configuration structures for the statement pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::validation::TolerancePolicy;

/// Line items that are not purchases. Matched as case-insensitive substrings.
pub const DEFAULT_EXCLUDED_DESCRIPTIONS: &[&str] = &[
    "PAGO ATH CANALES ELECTRONICOS",
    "SEGURO DE VIDA DEUDOR",
    "INTERESES FACTURADOS",
    "ABONO SUCURSAL VIRTUAL",
    "AJUSTE MANUAL A FAVOR",
    "APLICACION SALDO A FAVO",
];

/// Main configuration for the stmt pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StmtConfig {
    /// Transaction extraction configuration.
    pub extraction: ExtractionConfig,

    /// Ground-truth validation configuration.
    pub validation: ValidationConfig,

    /// PDF text extraction configuration.
    pub pdf: PdfConfig,

    /// Learning-mode configuration.
    pub learning: LearningConfig,

    /// External pattern document merged into the built-in set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns_file: Option<PathBuf>,

    /// Default ground-truth document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_truth_file: Option<PathBuf>,
}

/// Transaction extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum matcher hits before a detected pattern is accepted.
    pub min_matches: usize,

    /// Latest accepted date, in days after today.
    pub max_future_days: i64,

    /// Earliest accepted date, in years before today.
    pub max_past_years: i64,

    /// Description substrings that mark non-purchase lines.
    pub excluded_descriptions: Vec<String>,

    /// Prefix for the synthetic description used when none was captured.
    pub synthetic_description_prefix: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_matches: 2,
            max_future_days: 365,
            max_past_years: 5,
            excluded_descriptions: DEFAULT_EXCLUDED_DESCRIPTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            synthetic_description_prefix: "TRANSACTION".to_string(),
        }
    }
}

/// Ground-truth validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Tolerance applied to the total amount.
    pub tolerance: TolerancePolicy,

    /// Minimum weighted accuracy (0.0 - 1.0).
    pub min_accuracy: f64,

    /// Also require `min_accuracy` for a bill to pass.
    pub require_min_accuracy: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tolerance: TolerancePolicy::Absolute {
                amount: Decimal::ONE,
            },
            min_accuracy: 0.95,
            require_min_accuracy: false,
        }
    }
}

/// Text extraction backend identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Page-by-page extraction through lopdf.
    Lopdf,
    /// Whole-document extraction through pdf-extract.
    PdfExtract,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum text length to consider a PDF text-based.
    pub min_text_length: usize,

    /// Backends to try, in tie-break order.
    pub backends: Vec<BackendKind>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            min_text_length: 50,
            backends: vec![BackendKind::Lopdf, BackendKind::PdfExtract],
        }
    }
}

/// Learning-mode configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Minimum candidate score to register a learned pattern.
    pub acceptance_score: f64,

    /// Issuer recorded on learned patterns.
    pub learned_issuer: String,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            acceptance_score: 0.7,
            learned_issuer: "learned".to_string(),
        }
    }
}

impl StmtConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let config: StmtConfig =
            serde_json::from_str(r#"{"validation": {"min_accuracy": 0.8}}"#).unwrap();

        assert_eq!(config.validation.min_accuracy, 0.8);
        assert_eq!(config.validation.tolerance, TolerancePolicy::default());
        assert_eq!(config.extraction.min_matches, 2);
        assert_eq!(config.extraction.excluded_descriptions.len(), 6);
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = StmtConfig::default();
        config.pdf.backends = vec![BackendKind::PdfExtract];
        config.save(&path).unwrap();

        let loaded = StmtConfig::from_file(&path).unwrap();
        assert_eq!(loaded.pdf.backends, vec![BackendKind::PdfExtract]);
        assert_eq!(loaded.learning.learned_issuer, "learned");
    }
}
