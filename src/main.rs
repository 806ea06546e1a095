// Autokaker - command line entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use autokaker::{
    AnalysisOrchestrator, ConfigService, EditorHost, FileHost, ModelClient, RunMode, RunOutcome,
};

#[derive(Parser)]
#[command(name = "autokaker")]
#[command(about = "LLM-assisted vulnerability hunting, one code block at a time", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (default: ~/.autokaker/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the block containing a line, or every block of the file
    Analyze {
        /// Source file to analyze
        file: PathBuf,

        /// 1-based line selecting the block to start with
        #[arg(long, default_value_t = 1)]
        line: usize,

        /// Analyze every block, starting with the one at --line
        #[arg(long)]
        all: bool,
    },
    /// Print the effective settings
    Config {
        /// Restore the default settings first
        #[arg(long)]
        reset: bool,
    },
    /// List the models offered by the configured backend
    Models,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_config(path: Option<PathBuf>) -> Result<ConfigService> {
    let service = match path {
        Some(path) => ConfigService::open(path),
        None => ConfigService::new(),
    };
    service.context("failed to load settings")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = open_config(cli.config)?;

    match cli.command {
        Commands::Analyze { file, line, all } => {
            let host = Arc::new(
                FileHost::open(&file, line.saturating_sub(1), config.get_config_clone())
                    .with_context(|| format!("failed to read {}", file.display()))?,
            );
            let editor: Arc<dyn EditorHost> = host.clone();
            let orchestrator = AnalysisOrchestrator::from_host(editor)?;
            let mode = if all {
                RunMode::AnalyzeAllBlocks
            } else {
                RunMode::AnalyzeCurrentBlock
            };

            match orchestrator.run(host.document(), mode).await? {
                RunOutcome::Completed(summary) => {
                    let findings = host.format_findings();
                    if !findings.is_empty() {
                        println!("{}", findings);
                    }
                    info!(
                        "{} block(s) analyzed, {} finding(s)",
                        summary.analyzed, summary.findings
                    );
                }
                RunOutcome::NothingSelected => {
                    eprintln!("No code block found at line {}", line);
                }
                RunOutcome::Busy => {
                    eprintln!("An analysis is already running");
                }
            }
        }
        Commands::Config { reset } => {
            if reset {
                config.reset()?;
            }
            println!("# {}", config.path().display());
            println!("{}", serde_json::to_string_pretty(config.get_config())?);
        }
        Commands::Models => {
            let settings = config.get_config();
            let client = ModelClient::from_config(&settings.to_provider_config())?;
            match client.list_models().await? {
                Some(models) => {
                    for model in models {
                        println!("{}", model);
                    }
                }
                None => eprintln!("The configured backend does not list its models"),
            }
        }
    }

    Ok(())
}
