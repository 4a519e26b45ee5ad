//! Patterns command - inspect and manage the pattern repository.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use stmt_core::models::config::PdfConfig;
use stmt_core::models::pattern::{FieldLayout, Pattern};
use stmt_core::pdf::BackendSelector;
use stmt_core::statement::rules::clean_text;
use stmt_core::{Assembler, PatternEngine, PatternLearner, PatternRepository};

use super::{load_config, require_file};

/// Arguments for the patterns command.
#[derive(Args)]
pub struct PatternsArgs {
    #[command(subcommand)]
    command: Option<PatternsCommand>,

    /// Show matcher, layout and hints for each pattern
    #[arg(short, long)]
    detailed: bool,

    /// Only list patterns of this issuer
    #[arg(long)]
    issuer: Option<String>,

    /// Merge patterns from this JSON file before listing
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum PatternsCommand {
    /// Check a pattern document without registering it
    Check {
        /// Pattern JSON file
        file: PathBuf,
    },

    /// Save the repository to a pattern document
    Export {
        /// Output file
        file: PathBuf,
    },

    /// Measure how a pattern performs on a statement
    Test {
        /// Statement file
        input: PathBuf,
        /// Pattern name
        name: String,
    },

    /// Show which patterns match a statement
    Detect {
        /// Statement file
        input: PathBuf,
    },

    /// Suggest generic patterns for an unknown statement
    Suggest {
        /// Statement file
        input: PathBuf,
    },
}

pub async fn run(args: PatternsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let mut repository = PatternRepository::with_builtin()?;
    for path in config.patterns_file.iter().chain(args.file.iter()) {
        repository.load_from_file(path)?;
    }

    match args.command {
        None => list_patterns(&repository, args.issuer.as_deref(), args.detailed),
        Some(PatternsCommand::Check { file }) => check_document(&file),
        Some(PatternsCommand::Export { file }) => {
            repository.save_to_file(&file)?;
            println!(
                "{} Exported {} patterns to {}",
                style("✓").green(),
                repository.len(),
                file.display()
            );
            Ok(())
        }
        Some(PatternsCommand::Test { input, name }) => {
            let text = read_text(&input, &config.pdf)?;
            let engine = PatternEngine::new(repository);
            let assembler = Assembler::from_config(&config.extraction);
            let report = engine.test_pattern(&text, &name, &assembler)?;

            println!("Pattern:            {}", report.pattern);
            println!("Raw matches:        {}", report.raw_matches);
            println!("Valid transactions: {}", report.valid_transactions);
            println!("Success rate:       {:.1}%", report.success_rate * 100.0);
            println!("Threshold:          {:.2}", report.confidence_threshold);
            println!(
                "Recommended:        {}",
                if report.recommended {
                    style("yes").green()
                } else {
                    style("no").yellow()
                }
            );
            for (i, sample) in report.samples.iter().enumerate() {
                println!("  {}. {}", i + 1, sample.replace('\n', " | "));
            }
            Ok(())
        }
        Some(PatternsCommand::Detect { input }) => {
            let text = read_text(&input, &config.pdf)?;
            for summary in repository.find_for_text(&text) {
                println!(
                    "{:<24} {:<10} {:>4} matches  confidence {:.2}{}",
                    summary.name,
                    summary.issuer,
                    summary.match_count,
                    summary.confidence,
                    if summary.recommended { "  (recommended)" } else { "" }
                );
            }

            let engine = PatternEngine::new(repository).with_min_matches(config.extraction.min_matches);
            match engine.detect(&text) {
                Some(detection) => println!(
                    "\n{} Detected issuer {} using {} ({} matches)",
                    style("✓").green(),
                    detection.issuer,
                    detection.pattern,
                    detection.match_count
                ),
                None => println!("\n{} No pattern detected", style("⚠").yellow()),
            }
            Ok(())
        }
        Some(PatternsCommand::Suggest { input }) => {
            let text = read_text(&input, &config.pdf)?;
            let suggestions = PatternLearner::from_config(&config.learning).suggest_patterns(&text);
            if suggestions.is_empty() {
                println!("{} No generic pattern matched at least twice", style("⚠").yellow());
            }
            for s in suggestions {
                println!(
                    "{} ({} matches, confidence {:.2})\n  {}\n  {}",
                    style(&s.name).bold(),
                    s.match_count,
                    s.confidence,
                    s.description,
                    s.regex
                );
            }
            Ok(())
        }
    }
}

fn list_patterns(repository: &PatternRepository, issuer: Option<&str>, detailed: bool) -> anyhow::Result<()> {
    let patterns: Vec<&Pattern> = match issuer {
        Some(issuer) => repository.list_by_issuer(issuer),
        None => repository.list(),
    };

    if patterns.is_empty() {
        println!("{} No patterns registered", style("⚠").yellow());
        return Ok(());
    }

    for pattern in patterns {
        println!(
            "{} [{} / {}] threshold {:.2}",
            style(&pattern.name).bold(),
            pattern.issuer,
            pattern.card_type,
            pattern.confidence_threshold
        );
        if detailed {
            if let Some(description) = &pattern.description {
                println!("  {}", description);
            }
            println!("  matcher:     {}", pattern.regex);
            let layout = match &pattern.layout {
                FieldLayout::Positional => "positional".to_string(),
                FieldLayout::Explicit(roles) => format!("{:?}", roles),
            };
            println!("  layout:      {}", layout);
            println!("  date format: {}", pattern.date_format);
            println!("  amount:      {}", pattern.amount_format);
            println!("  cleanup:     {:?}", pattern.cleanup_rules);
        }
    }

    let stats = repository.stats();
    println!();
    println!("{} patterns", stats.total);
    for (issuer, count) in &stats.by_issuer {
        println!("  issuer {}: {}", issuer, count);
    }
    for (card_type, count) in &stats.by_card_type {
        println!("  card {}: {}", card_type, count);
    }
    Ok(())
}

/// Validate every pattern of a document and report problems.
fn check_document(file: &Path) -> anyhow::Result<()> {
    require_file(file)?;
    let content = fs::read_to_string(file)?;

    let mut scratch = PatternRepository::new();
    let loaded = scratch.load_from_str(&content);

    let document: serde_json::Value = serde_json::from_str(&content)?;
    let entries = document
        .get("patterns")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let mut invalid = 0;
    for (name, value) in entries {
        let mut pattern: Pattern = match serde_json::from_value(value) {
            Ok(pattern) => pattern,
            Err(e) => {
                invalid += 1;
                println!("{} {}: {}", style("✗").red(), name, e);
                continue;
            }
        };
        pattern.name = name;

        let check = PatternRepository::validate_pattern(&pattern);
        if check.valid {
            println!("{} {}", style("✓").green(), pattern.name);
        } else {
            invalid += 1;
            println!("{} {}", style("✗").red(), pattern.name);
        }
        for error in &check.errors {
            println!("    error: {}", error);
        }
        for warning in &check.warnings {
            println!("    warning: {}", warning);
        }
    }

    if let Err(e) = loaded {
        anyhow::bail!("Pattern document is invalid: {}", e);
    }
    if invalid > 0 {
        anyhow::bail!("{} invalid patterns", invalid);
    }
    Ok(())
}

fn read_text(input: &Path, pdf: &PdfConfig) -> anyhow::Result<String> {
    require_file(input)?;
    let extracted = BackendSelector::from_config(pdf).extract_file(input)?;
    Ok(clean_text(&extracted.text))
}
