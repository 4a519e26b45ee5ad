//! Batch processing command for multiple statement files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, warn};

use stmt_core::models::validation::ValidationReport;
use stmt_core::statement::processor::{bill_id_for, text_report};
use stmt_core::statement::rules::format_amount;
use stmt_core::{BatchResult, ProcessingResult, StatementProcessor};

use super::extract::{format_result, OutputFormat};
use super::{build_processor, load_config};

const SUPPORTED_EXTENSIONS: [&str; 2] = ["pdf", "txt"];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input directory or glob pattern
    #[arg(required = true)]
    input: String,

    /// Use this pattern instead of auto-detection
    #[arg(short, long)]
    pattern: Option<String>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Output directory for per-file results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Validate every file against ground truth
    #[arg(long)]
    validate: bool,

    /// Ground truth JSON file (implies --validate)
    #[arg(short, long)]
    ground_truth: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Print a plain-text report
    #[arg(long)]
    report: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files = collect_files(&args.input)?;
    if files.is_empty() {
        anyhow::bail!("No matching files found for: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let validate = args.validate || args.ground_truth.is_some();
    let processor = Arc::new(build_processor(config, validate, args.ground_truth.as_deref())?);

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    let results = process_concurrently(&processor, files, args.pattern.clone(), args.jobs, &progress).await;
    progress.finish_with_message("complete");

    let batch = BatchResult::from_results(results, start.elapsed().as_millis() as u64);
    let validation = processor.validate_batch(&batch);

    if let Some(ref output_dir) = args.output_dir {
        write_outputs(output_dir, &batch, validation.as_ref(), args.format)?;
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &batch, validation.as_ref())?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    print_summary(&batch, validation.as_ref());

    if args.report {
        let report = text_report(&batch, validation.as_ref());
        match args.output_dir {
            Some(ref output_dir) => {
                let report_path = output_dir.join("report.txt");
                fs::write(&report_path, report)?;
                println!(
                    "{} Report written to {}",
                    style("✓").green(),
                    report_path.display()
                );
            }
            None => {
                println!();
                print!("{}", report);
            }
        }
    }

    Ok(())
}

/// Statement files in a directory, or matching a glob pattern, in path order.
fn collect_files(input: &str) -> anyhow::Result<Vec<PathBuf>> {
    let path = Path::new(input);
    let mut files: Vec<PathBuf> = if path.is_dir() {
        fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect()
    } else {
        glob(input)?.filter_map(|r| r.ok()).collect()
    };

    files.retain(|p| {
        p.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
    });
    files.sort();
    Ok(files)
}

/// Files in flight, keyed by task, with their position in the input.
type Pending = HashMap<Id, (usize, PathBuf)>;

/// Process files on the blocking pool, at most `jobs` at a time, keeping input order.
async fn process_concurrently(
    processor: &Arc<StatementProcessor>,
    files: Vec<PathBuf>,
    pattern: Option<String>,
    jobs: usize,
    progress: &ProgressBar,
) -> Vec<ProcessingResult> {
    let jobs = jobs.max(1);
    let mut results: Vec<Option<ProcessingResult>> = vec![None; files.len()];
    let mut pending = Pending::new();
    let mut tasks = JoinSet::new();

    for (index, path) in files.into_iter().enumerate() {
        while tasks.len() >= jobs {
            if let Some(joined) = tasks.join_next_with_id().await {
                if let Some((i, result)) = settle(joined, &mut pending) {
                    record(&mut results, i, result, progress);
                }
            }
        }

        let processor = Arc::clone(processor);
        let pattern = pattern.clone();
        let task_path = path.clone();
        let handle = tasks.spawn_blocking(move || processor.process_file(&task_path, pattern.as_deref()));
        pending.insert(handle.id(), (index, path));
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        if let Some((i, result)) = settle(joined, &mut pending) {
            record(&mut results, i, result, progress);
        }
    }

    results.into_iter().flatten().collect()
}

/// Pair a finished task with its input slot. A task that panicked becomes a
/// failed result for its file instead of ending the batch.
fn settle(
    joined: Result<(Id, ProcessingResult), JoinError>,
    pending: &mut Pending,
) -> Option<(usize, ProcessingResult)> {
    match joined {
        Ok((id, result)) => pending.remove(&id).map(|(index, _)| (index, result)),
        Err(e) => {
            let (index, path) = pending.remove(&e.id())?;
            let reason = if e.is_panic() {
                "processing panicked"
            } else {
                "processing was cancelled"
            };
            Some((index, ProcessingResult::failed(path.display().to_string(), reason)))
        }
    }
}

fn record(
    results: &mut [Option<ProcessingResult>],
    index: usize,
    result: ProcessingResult,
    progress: &ProgressBar,
) {
    if !result.success {
        warn!("Failed to process {}: {}", result.source, result.errors.join("; "));
    }
    progress.set_message(result.source.clone());
    progress.inc(1);
    results[index] = Some(result);
}

fn write_outputs(
    output_dir: &Path,
    batch: &BatchResult,
    validation: Option<&ValidationReport>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    for result in batch.results.iter().filter(|r| r.success) {
        let stem = bill_id_for(Path::new(&result.source));
        let bill_validation =
            validation.and_then(|report| report.results.iter().find(|v| v.bill_id == stem));

        let output_path = output_dir.join(format!("{}.{}", stem, format.extension()));
        fs::write(&output_path, format_result(result, bill_validation, format)?)?;
        debug!("Wrote output to {}", output_path.display());
    }
    Ok(())
}

fn write_summary(
    path: &Path,
    batch: &BatchResult,
    validation: Option<&ValidationReport>,
) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "transactions",
        "total_amount",
        "pattern",
        "backend",
        "processing_time_ms",
        "validation",
        "error",
    ])?;

    for result in &batch.results {
        let filename = Path::new(&result.source)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let stem = bill_id_for(Path::new(&result.source));
        let validation_status = validation
            .and_then(|report| report.results.iter().find(|v| v.bill_id == stem))
            .map(|v| {
                if !v.has_ground_truth() {
                    "no_ground_truth"
                } else if v.overall_valid {
                    "pass"
                } else {
                    "fail"
                }
            })
            .unwrap_or("");

        wtr.write_record([
            filename,
            if result.success { "success" } else { "error" },
            &result.transaction_count().to_string(),
            &result.total_amount().to_string(),
            result.pattern_used.as_deref().unwrap_or(""),
            result.backend.as_deref().unwrap_or(""),
            &result.processing_time_ms.to_string(),
            validation_status,
            &result.errors.join("; "),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn print_summary(batch: &BatchResult, validation: Option<&ValidationReport>) {
    println!();
    println!(
        "{} Processed {} files in {}ms",
        style("✓").green(),
        batch.total_files,
        batch.processing_time_ms
    );
    println!(
        "   {} successful, {} failed",
        style(batch.successful).green(),
        style(batch.failed).red()
    );
    println!(
        "   {} transactions, total ${}",
        batch.total_transactions,
        format_amount(batch.total_amount)
    );

    if let Some(report) = validation {
        println!(
            "   Validation: {} passed, {} failed, accuracy {:.1}%",
            style(report.passed).green(),
            style(report.failed).red(),
            report.overall_accuracy * 100.0
        );
    }

    let failed: Vec<_> = batch.results.iter().filter(|r| !r.success).collect();
    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in failed {
            println!("  - {}: {}", result.source, result.errors.join("; "));
        }
    }
}
