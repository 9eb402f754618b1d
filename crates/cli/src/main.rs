//! Strata CLI: the main entry point.
//!
//! Commands:
//! - `rerank`: Rerank a JSON document list against a query
//! - `assemble`: Build a token-budgeted context from system prompt, history, and documents
//! - `fuse`: Merge several ranked result lists with Reciprocal Rank Fusion
//! - `config`: Show, locate, validate, or initialize the configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "strata",
    about = "Strata: token-budgeted context assembly for LLM prompts",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.strata/config.toml
    #[arg(long, global = true, env = "STRATA_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rerank documents against a query and print them as JSON
    Rerank {
        /// The search query
        query: String,

        /// JSON array of documents ("-" reads stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Keep at most this many documents
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Assemble a context and print it
    Assemble(commands::assemble::AssembleArgs),

    /// Fuse ranked result lists (one JSON array per file)
    Fuse {
        /// Result list files, one per query variant
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Keep at most this many fused results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Print the config file path
    Path,
    /// Validate the configuration
    Validate,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Rerank { query, input, top_k } => {
            commands::rerank::run(config_path, &query, &input, top_k).await?
        }
        Commands::Assemble(args) => commands::assemble::run(config_path, args).await?,
        Commands::Fuse { inputs, top_k } => commands::fuse::run(config_path, &inputs, top_k).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(config_path).await?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
            ConfigAction::Init { force } => commands::config_cmd::init(config_path, force).await?,
        },
    }

    Ok(())
}
