//! Pattern detection and execution.

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::PatternError;
use crate::models::pattern::{FieldLayout, FieldRole, Pattern};
use crate::models::transaction::RawCapture;

use super::assembler::Assembler;
use super::repository::PatternRepository;
use super::rules::patterns::{ISSUER_AVIANCA, ISSUER_AV_CARD, ISSUER_CREDIT_CARD, ISSUER_LIFEMILES};

/// Issuer indicator vocabulary: matcher and the issuer it points to.
fn issuer_indicators() -> [(&'static Regex, &'static str); 4] {
    [
        (&*ISSUER_AVIANCA, "avianca"),
        (&*ISSUER_LIFEMILES, "avianca"),
        (&*ISSUER_AV_CARD, "avianca"),
        (&*ISSUER_CREDIT_CARD, "avianca"),
    ]
}

/// Outcome of pattern auto-detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub issuer: String,
    pub pattern: String,
    pub match_count: usize,
}

/// How a pattern performs on a text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternTestReport {
    pub pattern: String,
    pub raw_matches: usize,
    pub valid_transactions: usize,
    /// `valid_transactions / raw_matches`.
    pub success_rate: f64,
    pub confidence_threshold: f32,
    /// First five matched snippets.
    pub samples: Vec<String>,
    pub recommended: bool,
}

/// Selects and runs patterns over normalized statement text.
pub struct PatternEngine {
    repository: PatternRepository,
    min_matches: usize,
}

impl PatternEngine {
    /// Create an engine over a repository.
    pub fn new(repository: PatternRepository) -> Self {
        Self {
            repository,
            min_matches: 2,
        }
    }

    /// Set the minimum match count for detection.
    pub fn with_min_matches(mut self, min_matches: usize) -> Self {
        self.min_matches = min_matches;
        self
    }

    pub fn repository(&self) -> &PatternRepository {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut PatternRepository {
        &mut self.repository
    }

    /// Recognize the card issuer from indicator tokens.
    ///
    /// Any single indicator hit recognizes its issuer. When several issuers are hit, the
    /// one with the most hits wins.
    pub fn detect_issuer(&self, text: &str) -> Option<(String, usize)> {
        let mut hits: Vec<(&str, usize)> = Vec::new();

        for (indicator, issuer) in issuer_indicators() {
            let count = indicator.find_iter(text).count();
            if count == 0 {
                continue;
            }
            match hits.iter_mut().find(|(name, _)| *name == issuer) {
                Some((_, total)) => *total += count,
                None => hits.push((issuer, count)),
            }
        }

        let mut best: Option<(&str, usize)> = None;
        for (issuer, count) in hits {
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((issuer, count));
            }
        }

        best.map(|(issuer, count)| (issuer.to_string(), count))
    }

    /// Select the pattern that applies to a document.
    ///
    /// Every pattern of the recognized issuer is scored by its non-overlapping match
    /// count. The highest count wins if it reaches the minimum; ties go to the pattern
    /// registered first.
    pub fn detect(&self, text: &str) -> Option<Detection> {
        let Some((issuer, hits)) = self.detect_issuer(text) else {
            debug!("No issuer indicators found");
            return None;
        };
        debug!("Detected issuer {} ({} indicator hits)", issuer, hits);

        let mut best: Option<(&Pattern, usize)> = None;
        for (pattern, matcher) in self.repository.compiled_by_issuer(&issuer) {
            let count = matcher.find_iter(text).count();
            debug!("Pattern {} matched {} times", pattern.name, count);
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((pattern, count));
            }
        }

        match best {
            Some((pattern, count)) if count >= self.min_matches => {
                info!("Selected pattern {} with {} matches", pattern.name, count);
                Some(Detection {
                    issuer,
                    pattern: pattern.name.clone(),
                    match_count: count,
                })
            }
            _ => {
                debug!("No pattern for issuer {} reached {} matches", issuer, self.min_matches);
                None
            }
        }
    }

    /// Run a registered pattern over the whole text.
    pub fn extract(&self, text: &str, pattern_name: &str) -> Result<Vec<RawCapture>, PatternError> {
        let (pattern, matcher) = self
            .repository
            .get_compiled(pattern_name)
            .ok_or_else(|| PatternError::NotFound(pattern_name.to_string()))?;
        Ok(extract_with(matcher, &pattern.layout, text))
    }

    /// Measure how many matches of a pattern assemble into valid transactions.
    pub fn test_pattern(
        &self,
        text: &str,
        pattern_name: &str,
        assembler: &Assembler,
    ) -> Result<PatternTestReport, PatternError> {
        let (pattern, matcher) = self
            .repository
            .get_compiled(pattern_name)
            .ok_or_else(|| PatternError::NotFound(pattern_name.to_string()))?;

        let captures = extract_with(matcher, &pattern.layout, text);
        let raw_matches = captures.len();
        let samples = captures.iter().take(5).map(|c| c.matched.clone()).collect();
        let valid_transactions = captures
            .iter()
            .filter(|c| assembler.assemble(c, pattern).is_ok())
            .count();

        let success_rate = if raw_matches == 0 {
            0.0
        } else {
            valid_transactions as f64 / raw_matches as f64
        };

        Ok(PatternTestReport {
            pattern: pattern.name.clone(),
            raw_matches,
            valid_transactions,
            success_rate,
            confidence_threshold: pattern.confidence_threshold,
            samples,
            recommended: success_rate >= 0.8 && raw_matches >= 2,
        })
    }
}

/// Scan `text` with a compiled matcher and tag each capture group by role.
pub fn extract_with(matcher: &Regex, layout: &FieldLayout, text: &str) -> Vec<RawCapture> {
    let mut captures = Vec::new();

    for caps in matcher.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let groups: Vec<&str> = caps
            .iter()
            .skip(1)
            .map(|g| g.map(|m| m.as_str()).unwrap_or(""))
            .collect();

        let mut capture = RawCapture {
            matched: whole.as_str().to_string(),
            span: (whole.start(), whole.end()),
            ..Default::default()
        };

        match layout {
            FieldLayout::Explicit(roles) => {
                for (role, value) in roles.iter().zip(&groups) {
                    assign(&mut capture, *role, value);
                }
            }
            FieldLayout::Positional => {
                if let Some((amount, leading)) = groups.split_last() {
                    for value in leading {
                        assign(&mut capture, infer_role(value), value);
                    }
                    assign(&mut capture, FieldRole::Amount, amount);
                }
            }
        }

        captures.push(capture);
    }

    debug!("Extracted {} raw captures", captures.len());
    captures
}

/// Positional convention: short all-digit groups are date components.
fn infer_role(value: &str) -> FieldRole {
    let value = value.trim();
    if !value.is_empty() && value.len() <= 4 && value.chars().all(|c| c.is_ascii_digit()) {
        FieldRole::Date
    } else {
        FieldRole::Description
    }
}

fn assign(capture: &mut RawCapture, role: FieldRole, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    match role {
        FieldRole::Date => capture.date_parts.push(value.to_string()),
        FieldRole::Description => capture.description_parts.push(value.to_string()),
        FieldRole::Amount => capture.amount = Some(value.to_string()),
        FieldRole::Skip => {}
    }
}
