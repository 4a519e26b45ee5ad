//! CLI application for credit-card statement extraction and validation.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, extract, info, learn, patterns, validate};

/// Statement parser - Extract and validate transactions from credit-card statements
#[derive(Parser)]
#[command(name = "stmt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract transactions from a single statement
    Extract(extract::ExtractArgs),

    /// Extract transactions from many statements
    Batch(batch::BatchArgs),

    /// Validate a statement against ground truth
    Validate(validate::ValidateArgs),

    /// List, check and export patterns
    Patterns(patterns::PatternsArgs),

    /// Learn a pattern from known transactions
    Learn(learn::LearnArgs),

    /// Show text extraction details for a file
    Info(info::InfoArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Extract(args) => extract::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Validate(args) => validate::run(args, config_path).await,
        Commands::Patterns(args) => patterns::run(args, config_path).await,
        Commands::Learn(args) => learn::run(args, config_path).await,
        Commands::Info(args) => info::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path),
    }
}
