//! Learn command - derive a pattern from a statement and its known transactions.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Deserialize;
use tracing::info;

use stmt_core::pdf::BackendSelector;
use stmt_core::statement::rules::{clean_text, format_amount};
use stmt_core::{Assembler, PatternLearner, PatternRepository, Transaction};

use super::{load_config, require_file};

/// Arguments for the learn command.
#[derive(Args)]
pub struct LearnArgs {
    /// Input statement (PDF or text export)
    #[arg(required = true)]
    input: PathBuf,

    /// JSON file with the expected transactions
    #[arg(required = true)]
    expected: PathBuf,

    /// Write the learned pattern to this pattern document
    #[arg(long)]
    save: Option<PathBuf>,
}

/// Expected transactions, as a bare list or wrapped in an extraction result.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExpectedDocument {
    List(Vec<Transaction>),
    Wrapped { transactions: Vec<Transaction> },
}

impl ExpectedDocument {
    fn into_transactions(self) -> Vec<Transaction> {
        match self {
            ExpectedDocument::List(transactions) => transactions,
            ExpectedDocument::Wrapped { transactions } => transactions,
        }
    }
}

pub async fn run(args: LearnArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    require_file(&args.input)?;
    require_file(&args.expected)?;

    let expected: ExpectedDocument = serde_json::from_str(&fs::read_to_string(&args.expected)?)?;
    let expected = expected.into_transactions();
    if expected.is_empty() {
        anyhow::bail!("No expected transactions in {}", args.expected.display());
    }

    let extracted = BackendSelector::from_config(&config.pdf).extract_file(&args.input)?;
    let text = clean_text(&extracted.text);

    // Names already taken in the configured library or the save target are skipped
    let mut repository = PatternRepository::with_builtin()?;
    if let Some(path) = &config.patterns_file {
        repository.load_from_file(path)?;
    }
    if let Some(save_path) = args.save.as_deref().filter(|p| p.exists()) {
        repository.load_from_file(save_path)?;
    }
    let learner = PatternLearner::from_config(&config.learning)
        .with_assembler(Assembler::from_config(&config.extraction));
    let outcome = learner.learn(&text, &expected, &mut repository)?;

    println!(
        "{:<24} {:>8} {:>16} {:>7}",
        "Candidate", "Found", "Total", "Score"
    );
    for candidate in &outcome.candidates {
        println!(
            "{:<24} {:>8} {:>16} {:>7.3}",
            candidate.name,
            candidate.extracted_count,
            format_amount(candidate.extracted_total),
            candidate.score
        );
    }

    eprintln!(
        "{} Learned patterns are approximate; review them before relying on them.",
        style("⚠").yellow()
    );

    let Some(learned) = outcome.learned else {
        println!(
            "{} No candidate scored at least {:.2}",
            style("✗").red(),
            config.learning.acceptance_score
        );
        return Ok(());
    };

    println!(
        "{} Learned pattern {} (score {:.3})",
        style("✓").green(),
        style(&learned.name).bold(),
        learned.confidence_threshold
    );
    println!("  {}", learned.regex);

    if let Some(save_path) = args.save {
        let mut document = PatternRepository::new();
        if save_path.exists() {
            document.load_from_file(&save_path)?;
        }
        document.add(learned)?;
        document.save_to_file(&save_path)?;
        info!("Saved learned pattern to {}", save_path.display());
        println!(
            "{} Pattern saved to {}",
            style("✓").green(),
            save_path.display()
        );
    }

    Ok(())
}
