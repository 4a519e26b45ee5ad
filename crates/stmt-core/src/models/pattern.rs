//! Pattern descriptors for statement formats.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::PatternError;

/// Role of a single capture group in a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    /// One date component (day, month or year, in capture order).
    Date,
    /// A description fragment.
    Description,
    /// The transaction amount.
    Amount,
    /// Captured but unused (reference numbers, secondary money columns).
    Skip,
}

/// How capture groups map to transaction fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "roles", rename_all = "snake_case")]
pub enum FieldLayout {
    /// Last group is the amount; leading all-digit groups are date components and the
    /// remaining leading groups are description fragments.
    #[default]
    Positional,
    /// One role per capture group, in group order.
    Explicit(Vec<FieldRole>),
}

impl FieldLayout {
    /// Check the layout against the number of capture groups in the matcher.
    pub fn check(&self, group_count: usize) -> Result<(), String> {
        match self {
            FieldLayout::Positional => {
                if group_count < 2 {
                    return Err(format!(
                        "positional layout needs at least 2 capture groups, matcher has {}",
                        group_count
                    ));
                }
                Ok(())
            }
            FieldLayout::Explicit(roles) => {
                if roles.len() != group_count {
                    return Err(format!(
                        "{} roles declared for {} capture groups",
                        roles.len(),
                        group_count
                    ));
                }
                let amounts = roles.iter().filter(|r| **r == FieldRole::Amount).count();
                if amounts != 1 {
                    return Err(format!("expected exactly one amount role, found {}", amounts));
                }
                if !roles.contains(&FieldRole::Date) {
                    return Err("at least one date role is required".to_string());
                }
                Ok(())
            }
        }
    }
}

/// Named description cleanup passes applied on top of the base cleaner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupRule {
    /// Drop trailing standalone reference numbers (four or more digits).
    RemoveTrailingNumbers,
    /// Drop a trailing two-letter country code.
    CleanLocationCodes,
}

/// How to recognize and decompose transaction lines for one card format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Unique pattern name. Taken from the map key when loaded from a document.
    #[serde(default)]
    pub name: String,

    /// Card issuer the pattern belongs to.
    pub issuer: String,

    /// Card network or product.
    pub card_type: String,

    /// Matcher expression.
    #[serde(rename = "transaction_regex")]
    pub regex: String,

    /// Capture-group role descriptor.
    #[serde(default)]
    pub layout: FieldLayout,

    /// Date-format hint, e.g. `%d %m %y`.
    pub date_format: String,

    /// Amount-format hint, informational.
    pub amount_format: String,

    /// Extra description cleanup passes.
    #[serde(default)]
    pub cleanup_rules: Vec<CleanupRule>,

    /// Minimum match-quality score (0.0 - 1.0).
    pub confidence_threshold: f32,

    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Pattern {
    /// Create a pattern with a positional layout and no cleanup rules.
    pub fn new(
        name: impl Into<String>,
        issuer: impl Into<String>,
        card_type: impl Into<String>,
        regex: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            issuer: issuer.into(),
            card_type: card_type.into(),
            regex: regex.into(),
            layout: FieldLayout::Positional,
            date_format: "%d %m %y".to_string(),
            amount_format: "$X,XXX.XX".to_string(),
            cleanup_rules: Vec::new(),
            confidence_threshold: 0.7,
            description: None,
        }
    }

    pub fn with_layout(mut self, roles: Vec<FieldRole>) -> Self {
        self.layout = FieldLayout::Explicit(roles);
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn with_amount_format(mut self, format: impl Into<String>) -> Self {
        self.amount_format = format.into();
        self
    }

    pub fn with_cleanup_rules(mut self, rules: Vec<CleanupRule>) -> Self {
        self.cleanup_rules = rules;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Compile the matcher and check every descriptor field that can fail at registration.
    pub fn compile(&self) -> Result<Regex, PatternError> {
        for (field, value) in [
            ("name", &self.name),
            ("issuer", &self.issuer),
            ("transaction_regex", &self.regex),
        ] {
            if value.trim().is_empty() {
                return Err(PatternError::EmptyField {
                    field: field.to_string(),
                });
            }
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(PatternError::InvalidThreshold {
                name: self.name.clone(),
                value: self.confidence_threshold,
            });
        }

        let regex = RegexBuilder::new(&self.regex)
            .multi_line(true)
            .build()
            .map_err(|e| PatternError::InvalidRegex {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;

        // captures_len includes the implicit whole-match group
        self.layout
            .check(regex.captures_len() - 1)
            .map_err(|reason| PatternError::InvalidLayout {
                name: self.name.clone(),
                reason,
            })?;

        Ok(regex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_rejects_bad_regex() {
        let pattern = Pattern::new("broken", "bank", "visa", r"(\d+");
        assert!(matches!(
            pattern.compile(),
            Err(PatternError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_compile_rejects_threshold_out_of_range() {
        let pattern = Pattern::new("p", "bank", "visa", r"(\d+) (\d+\.\d{2})")
            .with_confidence_threshold(1.5);
        assert!(matches!(
            pattern.compile(),
            Err(PatternError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_compile_rejects_empty_issuer() {
        let pattern = Pattern::new("p", " ", "visa", r"(\d+) (\d+)");
        assert_eq!(
            pattern.compile().unwrap_err(),
            PatternError::EmptyField {
                field: "issuer".to_string()
            }
        );
    }

    #[test]
    fn test_explicit_layout_must_cover_every_group() {
        let pattern = Pattern::new("p", "bank", "visa", r"(\d{2}) (\d{2}) (\d{2}) (.+) (\d+\.\d{2})")
            .with_layout(vec![FieldRole::Date, FieldRole::Amount]);
        assert!(matches!(
            pattern.compile(),
            Err(PatternError::InvalidLayout { .. })
        ));
    }

    #[test]
    fn test_explicit_layout_needs_single_amount() {
        let layout = FieldLayout::Explicit(vec![
            FieldRole::Date,
            FieldRole::Amount,
            FieldRole::Amount,
        ]);
        assert!(layout.check(3).is_err());
    }

    #[test]
    fn test_layout_serializes_with_kind_tag() {
        let layout = FieldLayout::Explicit(vec![FieldRole::Skip, FieldRole::Date, FieldRole::Amount]);
        let json = serde_json::to_string(&layout).unwrap();
        assert_eq!(json, r#"{"kind":"explicit","roles":["skip","date","amount"]}"#);

        let positional: FieldLayout = serde_json::from_str(r#"{"kind":"positional"}"#).unwrap();
        assert_eq!(positional, FieldLayout::Positional);
    }
}
