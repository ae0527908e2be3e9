//! Overwatch CLI — the main entry point.
//!
//! Runs one supervised mission: the planner proposes, the operator
//! authorizes, the executor acts, the log remembers.

use clap::Parser;
use overwatch_config::ReportFormat;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "overwatch",
    about = "Overwatch — human-supervised LLM reconnaissance missions",
    version,
    author
)]
struct Cli {
    /// Target host, domain, or URL. Prompted interactively if omitted.
    target: Option<String>,

    /// Run exactly one proposal/authorization cycle, then terminate.
    #[arg(long)]
    once: bool,

    /// Final report format.
    #[arg(long, value_name = "FORMAT")]
    report_format: Option<ReportFormat>,

    /// Override the mission log location.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Treat every execution as fresh; store nothing.
    #[arg(long)]
    disable_cache: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    commands::run::run(commands::run::RunArgs {
        target: cli.target,
        once: cli.once,
        report_format: cli.report_format,
        log_file: cli.log_file,
        disable_cache: cli.disable_cache,
    })
    .await
}
