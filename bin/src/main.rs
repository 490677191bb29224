//! factorfolio CLI binary.
//!
//! Runs factor-portfolio backtests against a directory of price and signal
//! files, keeping each backtest's state between runs.

mod cmd;
mod data;
mod store;

use std::path::PathBuf;
use std::process;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use cmd::sync::SyncArgs;

const DATA_DIR_ENV: &str = "FACTORFOLIO_DATA_DIR";
const STATE_DIR_ENV: &str = "FACTORFOLIO_STATE_DIR";

#[derive(Parser)]
#[command(name = "factorfolio")]
#[command(about = "Incremental factor-portfolio backtesting", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync backtests with the latest prices and signals
    Sync {
        /// Backtest config file (JSON, one config or a list); the standard
        /// backtests are synced when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory with prices.csv and signals/ [env: FACTORFOLIO_DATA_DIR]
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Directory for backtest state [env: FACTORFOLIO_STATE_DIR]
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Directory for return tables (defaults to the state directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Print the rebalancing schedule
    Schedule {
        /// First day after the first rebalancing date (YYYY-MM-DD)
        #[arg(long, default_value = "2022-07-01")]
        start: String,

        /// Months between rebalancing dates
        #[arg(short, long, default_value = "12")]
        frequency: u32,

        /// Latest date to schedule (YYYY-MM-DD)
        #[arg(long)]
        max: String,
    },

    /// List available signals
    Signals {
        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sync {
            config,
            data_dir,
            state_dir,
            out_dir,
        } => {
            let data_dir = dir_or_env(data_dir, DATA_DIR_ENV)?;
            let state_dir = dir_or_env(state_dir, STATE_DIR_ENV)?;
            let out_dir = out_dir.unwrap_or_else(|| state_dir.clone());
            cmd::sync::run_sync(SyncArgs {
                config,
                data_dir,
                state_dir,
                out_dir,
            })
            .await?;
        }
        Commands::Schedule {
            start,
            frequency,
            max,
        } => {
            cmd::schedule::print_schedule(&start, frequency, &max)?;
        }
        Commands::Signals { category, verbose } => {
            cmd::signals::list_signals(category, verbose)?;
        }
    }

    Ok(())
}

fn dir_or_env(arg: Option<PathBuf>, var: &str) -> Result<PathBuf> {
    if let Some(dir) = arg {
        return Ok(dir);
    }
    match std::env::var_os(var) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => bail!("pass the directory explicitly or set {var}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_explicit_dir_wins() {
        let dir = dir_or_env(Some(PathBuf::from("data")), "FACTORFOLIO_UNSET_FOR_TEST").unwrap();
        assert_eq!(dir, PathBuf::from("data"));
        assert!(dir_or_env(None, "FACTORFOLIO_UNSET_FOR_TEST").is_err());
    }

    #[test]
    fn test_parse_sync() {
        let cli = Cli::try_parse_from([
            "factorfolio",
            "sync",
            "--config",
            "size_value.json",
            "--data-dir",
            "data",
            "--state-dir",
            "state",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sync { out_dir: None, .. }
        ));
    }

    #[test]
    fn test_parse_sync_without_config() {
        let cli = Cli::try_parse_from(["factorfolio", "sync", "--data-dir", "data"]).unwrap();
        assert!(matches!(cli.command, Commands::Sync { config: None, .. }));
    }
}
