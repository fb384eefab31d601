use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "vmpack",
    about = "vmpack — consolidation-aware VM placement",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a placement for a JSON request.
    ///
    /// The request lists hosts, VM demands, the previous placement and an
    /// optional add/remove diff. The response is written to stdout; run
    /// statistics are logged to stderr.
    Place {
        /// Request file (default: read stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// TOML file overriding the scoring weights
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Print the placement curve value for a utilization fraction (0.0–1.0)
    Score {
        utilization: f64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the response.
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()));
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Place { input, config, compact } => {
            commands::place::place(input.as_deref(), config.as_deref(), compact)
        }
        Commands::Score { utilization } => commands::score::score(utilization),
    }
}

/// `RUST_LOG` directives when set and valid, otherwise `vmpack=info`.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("vmpack=info"))
}
