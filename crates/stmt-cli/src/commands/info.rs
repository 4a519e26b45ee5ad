//! Info command - text extraction details for one file.

use std::path::PathBuf;

use clap::Args;
use console::style;

use stmt_core::pdf::{BackendSelector, PdfType};
use stmt_core::statement::rules::clean_text;
use stmt_core::{PatternEngine, PatternRepository};

use super::{load_config, require_file};

/// Arguments for the info command.
#[derive(Args)]
pub struct InfoArgs {
    /// Input statement (PDF or text export)
    #[arg(required = true)]
    input: PathBuf,
}

pub async fn run(args: InfoArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    require_file(&args.input)?;

    let selector = BackendSelector::from_config(&config.pdf);
    let info = selector.analyze_file(&args.input)?;

    println!("File:       {}", args.input.display());
    println!("Pages:      {}", info.page_count);
    println!("Characters: {}", info.char_count);
    println!(
        "Type:       {}",
        match info.pdf_type {
            PdfType::Text => style("text").green(),
            PdfType::Empty => style("empty").yellow(),
        }
    );
    println!("Backend:    {}", info.backend);

    println!();
    println!("{:<14} {:>7} {:>10}", "Backend", "Score", "Chars");
    for score in &info.scores {
        match &score.error {
            Some(error) => println!("{:<14} {:>7} {:>10}  {}", score.backend, "-", "-", style(error).red()),
            None => println!("{:<14} {:>7.3} {:>10}", score.backend, score.score, score.char_count),
        }
    }

    if info.pdf_type == PdfType::Text {
        let extracted = selector.extract_file(&args.input)?;
        let text = clean_text(&extracted.text);

        let mut repository = PatternRepository::with_builtin()?;
        if let Some(path) = &config.patterns_file {
            repository.load_from_file(path)?;
        }
        let engine = PatternEngine::new(repository).with_min_matches(config.extraction.min_matches);

        println!();
        match engine.detect(&text) {
            Some(detection) => println!(
                "Detected:   {} via {} ({} matches)",
                detection.issuer, detection.pattern, detection.match_count
            ),
            None => println!("Detected:   {}", style("no known pattern").yellow()),
        }
    }

    println!();
    println!("{}", style("Preview:").bold());
    println!("{}", info.preview);

    Ok(())
}
