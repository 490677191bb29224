//! File-backed price and signal providers for the factorfolio CLI.
//!
//! A data directory holds:
//! - `prices.csv` with `date,stock_code,market,mktcap` and an optional
//!   `is_month_end` column
//! - `signals/<name>.csv` with `date,stock_code,market,value` for every
//!   signal that is not derived

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{debug, info};

use factorfolio::signals::derive::derive_signal;
use factorfolio::signals::registry::{self, SignalInfo};
use factorfolio::traits::{PriceRecord, SignalRecord};
use factorfolio::{FactorfolioError, PricePanel, PriceProvider, SignalPanel, SignalRef};

/// Loads `prices.csv` from `dir`.
pub(crate) fn load_prices(dir: &Path) -> Result<PricePanel> {
    let path = dir.join("prices.csv");
    let df = read_csv(&path)?;
    let dates = str_column(&df, "date")?;
    let codes = str_column(&df, "stock_code")?;
    let markets = str_column(&df, "market")?;
    let mktcaps = str_column(&df, "mktcap")?;
    let flags = match df.column("is_month_end") {
        Ok(column) => Some(column.str()?),
        Err(_) => None,
    };

    let mut records = Vec::with_capacity(df.height());
    let mut month_ends = BTreeSet::new();
    for i in 0..df.height() {
        let date = parse_date(required(dates, i, "date")?)?;
        let mktcap = parse_value(mktcaps.get(i)).with_context(|| format!("row {i} of {}", path.display()))?;
        if let Some(flags) = flags
            && matches!(flags.get(i), Some("true" | "1" | "True" | "TRUE"))
        {
            month_ends.insert(date);
        }
        records.push(PriceRecord {
            date,
            stock_code: required(codes, i, "stock_code")?.to_string(),
            market: required(markets, i, "market")?.to_string(),
            mktcap,
        });
    }

    info!(path = %path.display(), rows = records.len(), "loaded prices");
    Ok(match flags {
        Some(_) => PricePanel::with_month_ends(records, month_ends),
        None => PricePanel::new(records),
    })
}

/// Builds a panel holding every signal in `signals`.
///
/// Signals with a file under `signals/` are read from it; registry signals
/// without one are derived from their inputs and month-end prices.
pub(crate) fn load_signals(
    dir: &Path,
    signals: &[SignalRef],
    prices: &PricePanel,
) -> Result<SignalPanel> {
    let signal_dir = dir.join("signals");
    let month_end = prices.month_end_range(NaiveDate::MIN, NaiveDate::MAX)?;
    let mut source = |info: &SignalInfo| -> factorfolio::Result<Option<Vec<SignalRecord>>> {
        let path = signal_file(&signal_dir, info.name);
        if !path.exists() {
            return Ok(None);
        }
        read_signals(&path)
            .map(Some)
            .map_err(|e| FactorfolioError::Provider(format!("{e:#}")))
    };

    let mut panel = SignalPanel::new();
    for signal in signals {
        if panel.contains(signal) {
            continue;
        }
        let records = match registry::lookup(signal) {
            Some(info) => derive_signal(&info, &mut source, &month_end)
                .with_context(|| format!("failed to produce signal {}", signal.name))?,
            None => {
                let path = signal_file(&signal_dir, &signal.name);
                if !path.exists() {
                    bail!(
                        "signal {} is not in the registry and {} does not exist",
                        signal.name,
                        path.display()
                    );
                }
                read_signals(&path)?
            }
        };
        debug!(signal = %signal.name, records = records.len(), "signal ready");
        panel.insert(signal, records);
    }
    Ok(panel)
}

/// Parse a date string in YYYY-MM-DD format.
pub(crate) fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date {date_str:?}, expected YYYY-MM-DD"))
}

fn signal_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.csv"))
}

fn read_signals(path: &Path) -> Result<Vec<SignalRecord>> {
    let df = read_csv(path)?;
    let dates = str_column(&df, "date")?;
    let codes = str_column(&df, "stock_code")?;
    let markets = str_column(&df, "market")?;
    let values = str_column(&df, "value")?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        records.push(SignalRecord {
            date: parse_date(required(dates, i, "date")?)?,
            stock_code: required(codes, i, "stock_code")?.to_string(),
            market: required(markets, i, "market")?.to_string(),
            value: parse_value(values.get(i))
                .with_context(|| format!("row {i} of {}", path.display()))?,
        });
    }
    Ok(records)
}

/// Reads a CSV file with every column as a string.
fn read_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .with_context(|| format!("failed to read {}", path.display()))
}

fn str_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    let column = df
        .column(name)
        .with_context(|| format!("missing column {name}"))?;
    Ok(column.str()?)
}

fn required<'a>(column: &'a StringChunked, row: usize, name: &str) -> Result<&'a str> {
    match column.get(row) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim()),
        _ => bail!("row {row}: {name} is empty"),
    }
}

/// Empty cells are missing values.
fn parse_value(cell: Option<&str>) -> Result<f64> {
    match cell.map(str::trim) {
        None | Some("") => Ok(f64::NAN),
        Some(text) => text
            .parse()
            .with_context(|| format!("invalid number {text:?}")),
    }
}
