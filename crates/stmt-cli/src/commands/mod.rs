//! Subcommand implementations and shared setup.

pub mod batch;
pub mod config;
pub mod extract;
pub mod info;
pub mod learn;
pub mod patterns;
pub mod validate;

use std::path::{Path, PathBuf};

use tracing::debug;

use stmt_core::models::config::StmtConfig;
use stmt_core::validation::{GroundTruthTable, Validator};
use stmt_core::StatementProcessor;

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stmt")
        .join("config.json")
}

/// Load the explicit config file, else the default file if present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<StmtConfig> {
    if let Some(path) = config_path {
        let path = Path::new(path);
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return Ok(StmtConfig::from_file(path)?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config at {}", default_path.display());
        return Ok(StmtConfig::from_file(&default_path)?);
    }

    Ok(StmtConfig::default())
}

/// Ground truth from an explicit file, the configured file, or the built-in sample.
pub fn load_ground_truth(path: Option<&Path>, config: &StmtConfig) -> anyhow::Result<GroundTruthTable> {
    match path.or(config.ground_truth_file.as_deref()) {
        Some(path) => Ok(GroundTruthTable::load(path)?),
        None => {
            debug!("No ground truth file given, using the built-in sample table");
            Ok(GroundTruthTable::sample())
        }
    }
}

/// Build a processor, with a validator when ground truth is requested.
pub fn build_processor(
    config: StmtConfig,
    validate: bool,
    ground_truth: Option<&Path>,
) -> anyhow::Result<StatementProcessor> {
    let validator = if validate {
        let table = load_ground_truth(ground_truth, &config)?;
        Some(Validator::from_config(table, &config.validation))
    } else {
        None
    };

    let processor = StatementProcessor::new(config)?;
    Ok(match validator {
        Some(validator) => processor.with_validator(validator),
        None => processor,
    })
}

/// Check that an input file exists.
pub fn require_file(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    Ok(())
}
