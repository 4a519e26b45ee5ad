//! Extract command - transactions from a single statement.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::{debug, info};

use stmt_core::models::validation::ValidationResult;
use stmt_core::statement::rules::format_amount;
use stmt_core::ProcessingResult;

use super::{build_processor, load_config, require_file};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input statement (PDF or text export)
    #[arg(required = true)]
    input: PathBuf,

    /// Use this pattern instead of auto-detection
    #[arg(short, long)]
    pattern: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Validate against ground truth
    #[arg(long)]
    validate: bool,

    /// Ground truth JSON file (implies --validate)
    #[arg(short, long)]
    ground_truth: Option<PathBuf>,

    /// Bill id for validation (default: file stem)
    #[arg(long)]
    bill: Option<String>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table
    Table,
    /// JSON document
    Json,
    /// CSV rows
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Table => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

/// JSON output: the processing result with its validation, if any.
#[derive(Serialize)]
pub struct ExtractOutput<'a> {
    #[serde(flatten)]
    pub result: &'a ProcessingResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<&'a ValidationResult>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    require_file(&args.input)?;

    let validate = args.validate || args.ground_truth.is_some();
    let processor = build_processor(config, validate, args.ground_truth.as_deref())?;

    info!("Processing file: {}", args.input.display());
    let (result, validation) =
        processor.process_with_validation(&args.input, args.bill.as_deref(), args.pattern.as_deref());

    if !result.success {
        anyhow::bail!(
            "Failed to process {}: {}",
            args.input.display(),
            result.errors.join("; ")
        );
    }

    for warning in &result.warnings {
        eprintln!("{} {}", style("⚠").yellow(), warning);
    }

    let output = format_result(&result, validation.as_ref(), args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        print!("{}", output);
    }

    // JSON output already embeds the validation
    if let Some(validation) = &validation {
        if !matches!(args.format, OutputFormat::Json) {
            print_validation(validation);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

/// Render a processing result in the requested format.
pub fn format_result(
    result: &ProcessingResult,
    validation: Option<&ValidationResult>,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Table => Ok(format_table(result)),
        OutputFormat::Json => {
            let output = ExtractOutput { result, validation };
            Ok(format!("{}\n", serde_json::to_string_pretty(&output)?))
        }
        OutputFormat::Csv => format_csv(result),
    }
}

fn format_table(result: &ProcessingResult) -> String {
    let mut output = String::new();

    let width = result
        .transactions
        .iter()
        .map(|t| t.description.chars().count())
        .max()
        .unwrap_or(0)
        .max("Description".len());

    output.push_str(&format!(
        "{:<10}  {:<width$}  {:>16}\n",
        "Date",
        "Description",
        "Amount",
        width = width
    ));
    output.push_str(&format!("{}\n", "-".repeat(10 + 2 + width + 2 + 16)));

    for t in &result.transactions {
        output.push_str(&format!(
            "{:<10}  {:<width$}  {:>16}\n",
            t.date.format("%Y-%m-%d").to_string(),
            t.description,
            format!("${}", format_amount(t.amount)),
            width = width
        ));
    }

    output.push_str(&format!("{}\n", "-".repeat(10 + 2 + width + 2 + 16)));
    output.push_str(&format!(
        "{} transactions, total ${} (pattern: {})\n",
        result.transaction_count(),
        format_amount(result.total_amount()),
        result.pattern_used.as_deref().unwrap_or("none")
    ));

    output
}

fn format_csv(result: &ProcessingResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["date", "description", "amount", "confidence"])?;
    for t in &result.transactions {
        wtr.write_record([
            &t.date.format("%Y-%m-%d").to_string(),
            &t.description,
            &t.amount.to_string(),
            &format!("{:.2}", t.confidence),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

/// Print a validation result to stderr.
pub fn print_validation(validation: &ValidationResult) {
    eprintln!();
    if !validation.has_ground_truth() {
        eprintln!(
            "{} No ground truth for bill '{}'",
            style("⚠").yellow(),
            validation.bill_id
        );
        return;
    }

    let status = if validation.overall_valid {
        style("PASS").green()
    } else {
        style("FAIL").red()
    };
    eprintln!("Validation for '{}': {}", validation.bill_id, status);
    eprintln!(
        "  Count:  {}/{} {}",
        validation.actual_count,
        validation.expected_count,
        if validation.count_valid { "✓" } else { "✗" }
    );
    eprintln!(
        "  Total:  ${} / ${} (difference {}, tolerance {}) {}",
        format_amount(validation.actual_total),
        format_amount(validation.expected_total),
        validation.amount_difference,
        validation.tolerance,
        if validation.amount_valid { "✓" } else { "✗" }
    );
    eprintln!("  Accuracy: {:.1}%", validation.accuracy * 100.0);

    if !validation.missing_transactions.is_empty() {
        eprintln!(
            "  {} transactions missing (estimated ${} each; approximation)",
            validation.missing_transactions.len(),
            format_amount(validation.missing_transactions[0].estimated_amount)
        );
    }
    if !validation.extra_transactions.is_empty() {
        eprintln!(
            "  {} extra transactions (trailing rows; approximation):",
            validation.extra_transactions.len()
        );
        for t in &validation.extra_transactions {
            eprintln!("    {} {} ${}", t.date, t.description, format_amount(t.amount));
        }
    }
}
