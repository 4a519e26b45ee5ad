//! Learning mode: approximate pattern discovery from known transactions.
//!
//! A handful of generic line matchers are tried against the text and scored by how
//! closely their output reproduces the expected transaction count and total. The winner
//! is only a best guess; callers should review a learned pattern before relying on it.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::PatternError;
use crate::models::config::LearningConfig;
use crate::models::pattern::Pattern;
use crate::models::transaction::{saturating_total, Transaction};

use super::assembler::Assembler;
use super::engine::extract_with;
use super::repository::PatternRepository;

const COUNT_WEIGHT: f64 = 0.6;
const AMOUNT_WEIGHT: f64 = 0.4;
const MAX_SUGGESTIONS: usize = 5;
const MIN_SUGGESTION_MATCHES: usize = 2;

/// Generic line shapes tried in learning mode, in order.
fn candidate_patterns() -> Vec<Pattern> {
    vec![
        Pattern::new(
            "candidate_dmy",
            "generic",
            "unknown",
            r"^[ \t]*(?:\d{4}[ \t]+)?(\d{1,2})[ \t]+(\d{1,2})[ \t]+(\d{2})[ \t]+(.+?)[ \t]+\$?([\d.,]+[.,]\d{2})[ \t]*$",
        )
        .with_description("day month yy, description, amount"),
        Pattern::new(
            "candidate_ymd",
            "generic",
            "unknown",
            r"^[ \t]*(\d{4})[ \t]+(\d{1,2})[ \t]+(\d{1,2})[ \t]+(.+?)[ \t]+\$?([\d.,]+[.,]\d{2})[ \t]*$",
        )
        .with_date_format("%Y %m %d")
        .with_description("yyyy mm dd, description, amount"),
        Pattern::new(
            "candidate_slash_date",
            "generic",
            "unknown",
            r"^[ \t]*(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})[ \t]+(.+?)[ \t]+\$?([\d.,]+[.,]\d{2})[ \t]*$",
        )
        .with_description("d/m/y date, description, amount"),
        Pattern::new(
            "candidate_description_first",
            "generic",
            "unknown",
            r"^[ \t]*([A-Za-z][^\n]*?)[ \t]+(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})[ \t]+\$?([\d.,]+[.,]\d{2})[ \t]*$",
        )
        .with_description("description, d/m/y date, amount"),
        Pattern::new(
            "candidate_trailing_amount",
            "generic",
            "unknown",
            r"^[ \t]*([A-Za-z][^\n]*?)[ \t]+\$?([\d,]+\.\d{2})[ \t]*$",
        )
        .with_description("description with a trailing amount"),
    ]
}

/// A generic matcher that fits a text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSuggestion {
    pub name: String,
    pub regex: String,
    pub description: String,
    pub match_count: usize,
    /// `min(0.9, match_count / 10)`.
    pub confidence: f64,
}

/// Score of one candidate against the expected transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub name: String,
    pub regex: String,
    pub extracted_count: usize,
    pub extracted_total: Decimal,
    pub score: f64,
}

/// Result of a learning run.
#[derive(Debug, Clone, Serialize)]
pub struct LearningOutcome {
    /// Every candidate tried, in trial order.
    pub candidates: Vec<CandidateScore>,
    /// The pattern that was registered, if any candidate scored high enough.
    pub learned: Option<Pattern>,
    /// Always true: learned patterns are a heuristic guess.
    pub approximate: bool,
}

impl LearningOutcome {
    pub fn best(&self) -> Option<&CandidateScore> {
        self.candidates
            .iter()
            .fold(None, |best: Option<&CandidateScore>, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(c),
            })
    }
}

/// Proposes and scores generic patterns.
pub struct PatternLearner {
    assembler: Assembler,
    acceptance_score: f64,
    learned_issuer: String,
}

impl PatternLearner {
    pub fn new() -> Self {
        Self::from_config(&LearningConfig::default())
    }

    pub fn from_config(config: &LearningConfig) -> Self {
        Self {
            assembler: Assembler::new(),
            acceptance_score: config.acceptance_score,
            learned_issuer: config.learned_issuer.clone(),
        }
    }

    /// Use this assembler to build candidate transactions.
    pub fn with_assembler(mut self, assembler: Assembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_acceptance_score(mut self, score: f64) -> Self {
        self.acceptance_score = score;
        self
    }

    /// Generic matchers with at least two hits, most hits first, at most five.
    pub fn suggest_patterns(&self, text: &str) -> Vec<PatternSuggestion> {
        let mut suggestions: Vec<PatternSuggestion> = candidate_patterns()
            .into_iter()
            .filter_map(|candidate| {
                let matcher = candidate.compile().ok()?;
                let match_count = matcher.find_iter(text).count();
                (match_count >= MIN_SUGGESTION_MATCHES).then(|| PatternSuggestion {
                    confidence: (match_count as f64 / 10.0).min(0.9),
                    description: candidate.description.clone().unwrap_or_default(),
                    name: candidate.name,
                    regex: candidate.regex,
                    match_count,
                })
            })
            .collect();

        suggestions.sort_by(|a, b| b.match_count.cmp(&a.match_count));
        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }

    /// Score one candidate: `0.6 * count ratio + 0.4 * amount closeness`.
    pub fn score(&self, text: &str, candidate: &Pattern, expected: &[Transaction]) -> Result<CandidateScore, PatternError> {
        let matcher = candidate.compile()?;
        let captures = extract_with(&matcher, &candidate.layout, text);
        // No exclusion filter here: expected sets may include any line type
        let outcome = self.assembler.assemble_all(&captures, candidate);

        let extracted_count = outcome.transactions.len();
        let extracted_total = saturating_total(outcome.transactions.iter().map(|t| t.amount));
        let expected_total = saturating_total(expected.iter().map(|t| t.amount));

        let count_ratio = if expected.is_empty() {
            0.0
        } else {
            (extracted_count as f64 / expected.len() as f64).min(1.0)
        };
        let amount_closeness = if expected_total.is_zero() {
            0.0
        } else {
            let error = ((extracted_total - expected_total).abs() / expected_total)
                .to_f64()
                .unwrap_or(1.0);
            (1.0 - error).max(0.0)
        };

        let score = COUNT_WEIGHT * count_ratio + AMOUNT_WEIGHT * amount_closeness;
        debug!(
            "Candidate {} extracted {} transactions totalling {}, score {:.3}",
            candidate.name, extracted_count, extracted_total, score
        );

        Ok(CandidateScore {
            name: candidate.name.clone(),
            regex: candidate.regex.clone(),
            extracted_count,
            extracted_total,
            score,
        })
    }

    /// Try every candidate and register the best one if it scores high enough.
    ///
    /// The learned pattern is named `learned_<n>` with the first free `n`.
    pub fn learn(
        &self,
        text: &str,
        expected: &[Transaction],
        repository: &mut PatternRepository,
    ) -> Result<LearningOutcome, PatternError> {
        let candidates = candidate_patterns();
        let mut scores = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            scores.push(self.score(text, candidate, expected)?);
        }

        let mut outcome = LearningOutcome {
            candidates: scores,
            learned: None,
            approximate: true,
        };

        let Some(best) = outcome.best().cloned() else {
            return Ok(outcome);
        };
        if best.score < self.acceptance_score {
            info!(
                "Best candidate {} scored {:.3}, below {:.2}; nothing learned",
                best.name, best.score, self.acceptance_score
            );
            return Ok(outcome);
        }

        let Some(template) = candidates.into_iter().find(|c| c.name == best.name) else {
            return Ok(outcome);
        };

        let mut n = 1;
        while repository.get(&format!("learned_{}", n)).is_some() {
            n += 1;
        }

        let learned = Pattern {
            name: format!("learned_{}", n),
            issuer: self.learned_issuer.clone(),
            card_type: "unknown".to_string(),
            confidence_threshold: best.score.clamp(0.0, 1.0) as f32,
            description: Some(format!(
                "Learned from {} (approximate, score {:.2})",
                best.name, best.score
            )),
            ..template
        };

        repository.add(learned.clone())?;
        info!("Registered learned pattern {} (score {:.3})", learned.name, best.score);
        outcome.learned = Some(learned);
        Ok(outcome)
    }
}

impl Default for PatternLearner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    const SLASH_STATEMENT: &str = "\
MOVIMIENTOS DEL PERIODO
15/02/2025 NETFLIX 44,900.00
16/02/2025 ALMACEN EXITO 120,000.00
18/02/2025 RAPPI COLOMBIA 80,080.00
";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn learner() -> PatternLearner {
        PatternLearner::new().with_assembler(Assembler::new().with_reference_date(date(2025, 6, 1)))
    }

    fn expected() -> Vec<Transaction> {
        vec![
            Transaction::new(date(2025, 2, 15), "NETFLIX", Decimal::from_str("44900.00").unwrap()),
            Transaction::new(date(2025, 2, 16), "ALMACEN EXITO", Decimal::from_str("120000.00").unwrap()),
            Transaction::new(date(2025, 2, 18), "RAPPI COLOMBIA", Decimal::from_str("80080.00").unwrap()),
        ]
    }

    #[test]
    fn test_candidates_compile() {
        for candidate in candidate_patterns() {
            assert!(candidate.compile().is_ok(), "{}", candidate.name);
        }
    }

    #[test]
    fn test_suggest_patterns() {
        let suggestions = learner().suggest_patterns(SLASH_STATEMENT);
        assert_eq!(suggestions[0].name, "candidate_slash_date");
        assert_eq!(suggestions[0].match_count, 3);
        assert!((suggestions[0].confidence - 0.3).abs() < 1e-9);
        assert!(suggestions.len() <= MAX_SUGGESTIONS);
    }

    #[test]
    fn test_suggest_patterns_needs_two_matches() {
        assert!(learner().suggest_patterns("15/02/2025 NETFLIX 44,900.00").is_empty());
    }

    #[test]
    fn test_learn_registers_best_candidate() {
        let mut repository = PatternRepository::new();
        let outcome = learner()
            .learn(SLASH_STATEMENT, &expected(), &mut repository)
            .unwrap();

        assert!(outcome.approximate);
        assert_eq!(outcome.candidates.len(), 5);

        let learned = outcome.learned.unwrap();
        assert_eq!(learned.name, "learned_1");
        assert_eq!(learned.issuer, "learned");
        assert_eq!(learned.card_type, "unknown");
        assert!((learned.confidence_threshold - 1.0).abs() < 1e-6);
        assert!(repository.get("learned_1").is_some());
    }

    #[test]
    fn test_learn_picks_next_free_name() {
        let mut repository = PatternRepository::new();
        learner().learn(SLASH_STATEMENT, &expected(), &mut repository).unwrap();
        let outcome = learner().learn(SLASH_STATEMENT, &expected(), &mut repository).unwrap();
        assert_eq!(outcome.learned.unwrap().name, "learned_2");
    }

    #[test]
    fn test_low_score_learns_nothing() {
        let mut repository = PatternRepository::new();
        let outcome = learner()
            .learn("nothing useful here", &expected(), &mut repository)
            .unwrap();

        assert!(outcome.learned.is_none());
        assert!(repository.is_empty());
        assert!(outcome.candidates.iter().all(|c| c.score == 0.0));
    }

    #[test]
    fn test_partial_match_scores_proportionally() {
        let text = "15/02/2025 NETFLIX 44,900.00\n";
        let candidate = &candidate_patterns()[2];
        let score = learner().score(text, candidate, &expected()).unwrap();

        assert_eq!(score.extracted_count, 1);
        // 0.6 * 1/3 + 0.4 * (44900 / 244980)
        let expected_score = 0.6 / 3.0 + 0.4 * (44900.0 / 244980.0);
        assert!((score.score - expected_score).abs() < 1e-6);
    }
}
