//! Validate command - check one statement against ground truth.

use std::path::PathBuf;

use clap::Args;
use console::style;

use stmt_core::statement::processor::bill_id_for;

use super::extract::{format_result, print_validation, OutputFormat};
use super::{build_processor, load_config, require_file};

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Input statement (PDF or text export)
    #[arg(required = true)]
    input: PathBuf,

    /// Ground truth JSON file
    #[arg(required = true)]
    ground_truth: PathBuf,

    /// Use this pattern instead of auto-detection
    #[arg(short, long)]
    pattern: Option<String>,

    /// Bill id to look up (default: file stem)
    #[arg(long)]
    bill: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: ValidateFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ValidateFormat {
    /// Human-readable summary
    Table,
    /// JSON document
    Json,
}

pub async fn run(args: ValidateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    require_file(&args.input)?;
    require_file(&args.ground_truth)?;

    let processor = build_processor(config, true, Some(&args.ground_truth))?;
    let bill_id = args.bill.clone().unwrap_or_else(|| bill_id_for(&args.input));

    let (result, validation) =
        processor.process_with_validation(&args.input, Some(&bill_id), args.pattern.as_deref());

    if !result.success {
        anyhow::bail!(
            "Failed to process {}: {}",
            args.input.display(),
            result.errors.join("; ")
        );
    }

    let Some(validation) = validation else {
        anyhow::bail!("No validator configured");
    };

    match args.format {
        ValidateFormat::Json => {
            print!("{}", format_result(&result, Some(&validation), OutputFormat::Json)?);
        }
        ValidateFormat::Table => {
            println!(
                "{} Extracted {} transactions with pattern {}",
                style("ℹ").blue(),
                result.transaction_count(),
                result.pattern_used.as_deref().unwrap_or("none")
            );
            print_validation(&validation);
        }
    }

    Ok(())
}
