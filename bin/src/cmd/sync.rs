//! Sync command implementation.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{error, info};

use factorfolio::backtest::presets;
use factorfolio::{Backtest, BacktestConfig, SignalRef, SyncOutcome};

use crate::data;
use crate::store::{CsvSink, JsonFileStore};

/// A config file holds one backtest or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    Many(Vec<BacktestConfig>),
    One(BacktestConfig),
}

/// Locations used by a sync run.
#[derive(Debug, Clone)]
pub(crate) struct SyncArgs {
    pub(crate) config: Option<PathBuf>,
    pub(crate) data_dir: PathBuf,
    pub(crate) state_dir: PathBuf,
    pub(crate) out_dir: PathBuf,
}

/// Run one sync cycle for every configured backtest and write their
/// return tables.
///
/// Backtests run concurrently, each on its own blocking task with its own
/// state file. A failing backtest does not stop the others.
pub(crate) async fn run_sync(args: SyncArgs) -> Result<()> {
    let configs = match &args.config {
        Some(path) => read_configs(path)?,
        None => {
            info!("no config given; syncing the standard backtests");
            presets::standard()
        }
    };
    let backtests = build_backtests(configs)?;
    info!(backtests = backtests.len(), data_dir = %args.data_dir.display(), "starting sync");

    let prices = data::load_prices(&args.data_dir)?;
    let needed: Vec<SignalRef> = backtests
        .iter()
        .flat_map(|b| b.config().factors.iter().map(|f| f.signal.clone()))
        .collect();
    let signals = data::load_signals(&args.data_dir, &needed, &prices)?;

    let prices = Arc::new(prices);
    let signals = Arc::new(signals);
    let total = backtests.len();

    let mut handles = Vec::with_capacity(total);
    for backtest in backtests {
        let prices = Arc::clone(&prices);
        let signals = Arc::clone(&signals);
        let artifact = backtest.config().artifact_name();
        let state_path = args.state_dir.join(format!("{artifact}.json"));
        let out_dir = args.out_dir.clone();
        let name = backtest.name();

        let handle = tokio::task::spawn_blocking(
            move || -> factorfolio::Result<(SyncOutcome, Option<PathBuf>)> {
                let mut store = JsonFileStore::open(state_path)?;
                let outcome = backtest.sync(&*signals, &*prices, &mut store)?;
                if outcome == SyncOutcome::NoPrices {
                    return Ok((outcome, None));
                }
                let mut sink = CsvSink::new(out_dir);
                backtest.publish(&store, &mut sink)?;
                Ok((outcome, Some(sink.path(&artifact))))
            },
        );
        handles.push((name, handle));
    }

    let mut failed = 0;
    let mut incomplete = 0;
    for (name, handle) in handles {
        match handle.await.context("sync task panicked")? {
            Ok((outcome, output)) => {
                println!("{name}: {outcome}");
                for failure in outcome.failures() {
                    println!("  formation failed on {failure}");
                }
                if !outcome.failures().is_empty() {
                    incomplete += 1;
                }
                if let Some(path) = output {
                    println!("  returns -> {}", path.display());
                }
            }
            Err(err) => {
                failed += 1;
                error!(backtest = %name, error = %err, "backtest failed");
                println!("{name}: failed: {err}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {total} backtests failed");
    }
    if incomplete > 0 {
        bail!("{incomplete} of {total} backtests have rebalancing dates that failed to form");
    }
    Ok(())
}

fn read_configs(path: &Path) -> Result<Vec<BacktestConfig>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let configs = match serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?
    {
        ConfigFile::Many(configs) => configs,
        ConfigFile::One(config) => vec![config],
    };
    if configs.is_empty() {
        bail!("{} defines no backtest", path.display());
    }
    Ok(configs)
}

fn build_backtests(configs: Vec<BacktestConfig>) -> Result<Vec<Backtest>> {
    let mut artifacts = HashSet::new();
    let mut backtests = Vec::with_capacity(configs.len());
    for config in configs {
        let backtest = Backtest::new(config)?;
        let artifact = backtest.config().artifact_name();
        if !artifacts.insert(artifact.clone()) {
            bail!("two backtests share the artifact {artifact}");
        }
        backtests.push(backtest);
    }
    Ok(backtests)
}
