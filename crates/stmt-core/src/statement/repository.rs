//! Named store of statement patterns.

use std::collections::BTreeMap;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PatternError, Result};
use crate::models::pattern::{CleanupRule, FieldRole, Pattern};

/// Built-in patterns, in registration order.
pub fn builtin_patterns() -> Vec<Pattern> {
    use FieldRole::*;

    vec![
        Pattern::new(
            "avianca_standard",
            "avianca",
            "mastercard",
            r"\b(\d{4})[ \t]+(\d{2})[ \t]+(\d{2})[ \t]+(\d{2})[ \t]+(.+?)[ \t]+[\d,]+\.\d{2}[ \t]+\$?([\d,]+\.\d{2})",
        )
        .with_layout(vec![Skip, Date, Date, Date, Description, Amount])
        .with_date_format("%d %m %y")
        .with_cleanup_rules(vec![
            CleanupRule::RemoveTrailingNumbers,
            CleanupRule::CleanLocationCodes,
        ])
        .with_confidence_threshold(0.8)
        .with_description("Single-line rows: reference, day, month, year, merchant, rate, amount"),
        Pattern::new(
            "avianca_alternative",
            "avianca",
            "visa",
            r"\b(\d{2})[ \t]+(\d{2})[ \t]+(\d{2})[ \t]+(.+?)[ \t]+\$?([\d,]+\.\d{2})",
        )
        .with_date_format("%d %m %y")
        .with_cleanup_rules(vec![
            CleanupRule::RemoveTrailingNumbers,
            CleanupRule::CleanLocationCodes,
        ])
        .with_confidence_threshold(0.7)
        .with_description("Single-line rows: day, month, year, merchant, amount"),
        Pattern::new(
            "avianca_block",
            "avianca",
            "mastercard",
            r"^(\d{4})\n(\d{1,2})\n(\d{1,2})\n(\d{2})\n[\d.,]+\n\$?([\d,]+(?:\.\d{1,2})?)\n\$?[\d,]+(?:\.\d{1,2})?\n\$?[\d,]+(?:\.\d{1,2})?\n\d+\n\d+\n\d+\n([A-Za-z][^\n]*)$",
        )
        .with_layout(vec![Skip, Date, Date, Date, Amount, Description])
        .with_date_format("%d %m %y")
        .with_cleanup_rules(vec![CleanupRule::RemoveTrailingNumbers])
        .with_confidence_threshold(0.8)
        .with_description(
            "One field per line: reference, day, month, year, rate, amount, two money \
             columns, three installment counters, merchant",
        ),
    ]
}

/// Result of checking a pattern descriptor without registering it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatternValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Pattern counts by issuer and card type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepositoryStats {
    pub total: usize,
    pub by_issuer: BTreeMap<String, usize>,
    pub by_card_type: BTreeMap<String, usize>,
}

/// How well one registered pattern fits a text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternMatchSummary {
    pub name: String,
    pub issuer: String,
    pub match_count: usize,
    /// `min(1, match_count / 10)`.
    pub confidence: f64,
    pub recommended: bool,
}

/// Interchange document: `{ "patterns": { "<name>": { ... } } }`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PatternDocument {
    #[serde(default)]
    patterns: serde_json::Map<String, serde_json::Value>,
}

struct RegisteredPattern {
    pattern: Pattern,
    matcher: Regex,
}

/// Name → pattern store. Matchers are compiled once, at registration.
pub struct PatternRepository {
    entries: Vec<RegisteredPattern>,
}

impl PatternRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create a repository holding the built-in patterns.
    pub fn with_builtin() -> Result<Self> {
        let mut repository = Self::new();
        for pattern in builtin_patterns() {
            repository.add(pattern)?;
        }
        Ok(repository)
    }

    /// Register a pattern, replacing any pattern with the same name in place.
    ///
    /// Fails if the matcher, threshold or field layout is invalid.
    pub fn add(&mut self, pattern: Pattern) -> std::result::Result<(), PatternError> {
        let matcher = pattern.compile()?;

        match self.position(&pattern.name) {
            Some(index) => {
                debug!("Replacing pattern {}", pattern.name);
                self.entries[index] = RegisteredPattern { pattern, matcher };
            }
            None => {
                debug!("Registered pattern {}", pattern.name);
                self.entries.push(RegisteredPattern { pattern, matcher });
            }
        }
        Ok(())
    }

    /// Remove a pattern by name.
    pub fn remove(&mut self, name: &str) -> Option<Pattern> {
        let index = self.position(name)?;
        Some(self.entries.remove(index).pattern)
    }

    /// Look up a pattern by name.
    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.entries
            .iter()
            .find(|e| e.pattern.name == name)
            .map(|e| &e.pattern)
    }

    /// Look up a pattern and its compiled matcher.
    pub fn get_compiled(&self, name: &str) -> Option<(&Pattern, &Regex)> {
        self.entries
            .iter()
            .find(|e| e.pattern.name == name)
            .map(|e| (&e.pattern, &e.matcher))
    }

    /// All patterns in registration order.
    pub fn list(&self) -> Vec<&Pattern> {
        self.entries.iter().map(|e| &e.pattern).collect()
    }

    /// Pattern names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.pattern.name.clone()).collect()
    }

    /// Patterns of one issuer (case-insensitive), in registration order.
    pub fn list_by_issuer(&self, issuer: &str) -> Vec<&Pattern> {
        self.compiled_by_issuer(issuer)
            .into_iter()
            .map(|(p, _)| p)
            .collect()
    }

    pub(crate) fn compiled_by_issuer(&self, issuer: &str) -> Vec<(&Pattern, &Regex)> {
        self.entries
            .iter()
            .filter(|e| e.pattern.issuer.eq_ignore_ascii_case(issuer))
            .map(|e| (&e.pattern, &e.matcher))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check a descriptor and collect every problem instead of stopping at the first.
    pub fn validate_pattern(pattern: &Pattern) -> PatternValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for (field, value) in [
            ("name", &pattern.name),
            ("issuer", &pattern.issuer),
            ("transaction_regex", &pattern.regex),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{} must not be empty", field));
            }
        }

        if !pattern.regex.trim().is_empty() {
            match RegexBuilder::new(&pattern.regex).multi_line(true).build() {
                Ok(regex) => {
                    if let Err(reason) = pattern.layout.check(regex.captures_len() - 1) {
                        errors.push(format!("invalid field layout: {}", reason));
                    }
                }
                Err(e) => errors.push(format!("invalid regex: {}", e)),
            }
        }

        if !(0.0..=1.0).contains(&pattern.confidence_threshold) {
            errors.push(format!(
                "confidence threshold {} must be between 0 and 1",
                pattern.confidence_threshold
            ));
        } else if pattern.confidence_threshold < 0.5 {
            warnings.push(format!(
                "low confidence threshold {} may accept poor matches",
                pattern.confidence_threshold
            ));
        }

        if pattern.cleanup_rules.is_empty() {
            warnings.push("no cleanup rules defined".to_string());
        }

        PatternValidation {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Pattern counts by issuer and card type.
    pub fn stats(&self) -> RepositoryStats {
        let mut stats = RepositoryStats {
            total: self.entries.len(),
            ..Default::default()
        };
        for entry in &self.entries {
            *stats.by_issuer.entry(entry.pattern.issuer.clone()).or_default() += 1;
            *stats
                .by_card_type
                .entry(entry.pattern.card_type.clone())
                .or_default() += 1;
        }
        stats
    }

    /// Count matches of every pattern over `text`, most matches first.
    pub fn find_for_text(&self, text: &str) -> Vec<PatternMatchSummary> {
        let mut summaries: Vec<PatternMatchSummary> = self
            .entries
            .iter()
            .map(|e| {
                let match_count = e.matcher.find_iter(text).count();
                let confidence = (match_count as f64 / 10.0).min(1.0);
                PatternMatchSummary {
                    name: e.pattern.name.clone(),
                    issuer: e.pattern.issuer.clone(),
                    match_count,
                    confidence,
                    recommended: match_count >= 2 && confidence >= 0.3,
                }
            })
            .collect();

        // stable: equal counts keep registration order
        summaries.sort_by(|a, b| b.match_count.cmp(&a.match_count));
        summaries
    }

    /// Merge patterns from a JSON pattern document. Returns the number loaded.
    ///
    /// Every pattern is checked before any is registered, so a bad document leaves the
    /// repository unchanged.
    pub fn load_from_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let count = self.load_from_str(&content)?;
        info!("Loaded {} patterns from {}", count, path.display());
        Ok(count)
    }

    /// Merge patterns from a JSON pattern document held in memory.
    pub fn load_from_str(&mut self, content: &str) -> Result<usize> {
        let document: PatternDocument = serde_json::from_str(content)?;

        let mut patterns = Vec::with_capacity(document.patterns.len());
        for (name, value) in document.patterns {
            let mut pattern: Pattern = serde_json::from_value(value)?;
            pattern.name = name;
            pattern.compile()?;
            patterns.push(pattern);
        }

        let count = patterns.len();
        for pattern in patterns {
            self.add(pattern)?;
        }
        Ok(count)
    }

    /// Serialize every pattern to a JSON pattern document.
    pub fn to_json(&self) -> Result<String> {
        let mut document = PatternDocument::default();
        for entry in &self.entries {
            document.patterns.insert(
                entry.pattern.name.clone(),
                serde_json::to_value(&entry.pattern)?,
            );
        }
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Write every pattern to a JSON pattern document.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        info!("Saved {} patterns to {}", self.entries.len(), path.display());
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.pattern.name == name)
    }
}

impl Default for PatternRepository {
    fn default() -> Self {
        Self::new()
    }
}
