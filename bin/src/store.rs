//! File-backed backtest state and return table output.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use factorfolio::traits::{RebalancingHistory, SyncCommit, ValuationSeries, apply_writes};
use factorfolio::{BacktestStore, FactorfolioError, ReturnSink, ReturnTable};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct State {
    history: RebalancingHistory,
    valuations: ValuationSeries,
}

/// Backtest state kept in one JSON file.
///
/// Commits write a temporary file and rename it over the previous state.
#[derive(Debug)]
pub(crate) struct JsonFileStore {
    path: PathBuf,
    state: State,
}

impl JsonFileStore {
    /// Opens the state at `path`, or starts empty if there is none yet.
    pub(crate) fn open(path: impl Into<PathBuf>) -> factorfolio::Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let bytes = fs::read(&path).map_err(|e| store_error(&path, e))?;
            serde_json::from_slice(&bytes).map_err(|e| store_error(&path, e))?
        } else {
            State::default()
        };
        Ok(Self { path, state })
    }
}

impl BacktestStore for JsonFileStore {
    fn load_history(&self) -> factorfolio::Result<RebalancingHistory> {
        Ok(self.state.history.clone())
    }

    fn load_valuations(&self) -> factorfolio::Result<ValuationSeries> {
        Ok(self.state.valuations.clone())
    }

    fn commit(&mut self, commit: SyncCommit) -> factorfolio::Result<()> {
        let mut valuations = self.state.valuations.clone();
        apply_writes(&mut valuations, &commit);
        let next = State {
            history: commit.history,
            valuations,
        };
        let bytes = serde_json::to_vec(&next).map_err(|e| store_error(&self.path, e))?;
        write_atomic(&self.path, |file| {
            use std::io::Write;
            file.write_all(&bytes).map_err(|e| store_error(&self.path, e))
        })?;
        self.state = next;
        Ok(())
    }
}

/// Writes each return table to `<dir>/<name>.csv`.
#[derive(Debug)]
pub(crate) struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub(crate) fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv"))
    }
}

impl ReturnSink for CsvSink {
    fn emit(&mut self, name: &str, table: &ReturnTable) -> factorfolio::Result<()> {
        let mut df = table.to_dataframe()?;
        let path = self.path(name);
        write_atomic(&path, |file| {
            CsvWriter::new(file).include_header(true).finish(&mut df)?;
            Ok(())
        })
    }
}

fn write_atomic<F>(path: &Path, write: F) -> factorfolio::Result<()>
where
    F: FnOnce(&mut File) -> factorfolio::Result<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| store_error(parent, e))?;
    }
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp).map_err(|e| store_error(&tmp, e))?;
    write(&mut file)?;
    file.sync_all().map_err(|e| store_error(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| store_error(path, e))
}

fn store_error(path: &Path, err: impl std::fmt::Display) -> FactorfolioError {
    FactorfolioError::Store(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorfolio::Date;
    use factorfolio::traits::{Membership, ValuationRecord};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("factorfolio-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = temp_dir("store");
        let path = dir.join("state.json");
        let date = Date::from_ymd_opt(2023, 1, 2).unwrap();
        let rebalanced = Date::from_ymd_opt(2022, 6, 30).unwrap();

        let mut store = JsonFileStore::open(&path).unwrap();
        assert!(store.load_history().unwrap().is_empty());
        store
            .commit(SyncCommit {
                history: [(rebalanced, Membership::new())].into_iter().collect(),
                created: vec![ValuationRecord {
                    label: "small_value".to_string(),
                    date,
                    mktcap: 1234.5,
                }],
                updated: vec![],
            })
            .unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.load_history().unwrap().len(), 1);
        assert_eq!(reopened.load_valuations().unwrap()["small_value"][&date], 1234.5);
        assert!(!path.with_extension("tmp").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_fractional_valuations_reload_exactly() {
        let dir = temp_dir("floats");
        let path = dir.join("state.json");
        let first = Date::from_ymd_opt(2023, 1, 2).unwrap();
        let values = [
            0.1 + 0.2,
            1.0 / 3.0,
            123_456_789.0 / 7.0,
            1.0e16 / 3.0,
            f64::MIN_POSITIVE * 3.0,
        ];
        let created = values
            .iter()
            .enumerate()
            .map(|(i, &mktcap)| ValuationRecord {
                label: "small".to_string(),
                date: first + chrono::Days::new(i as u64),
                mktcap,
            })
            .collect();

        let mut store = JsonFileStore::open(&path).unwrap();
        store
            .commit(SyncCommit {
                history: RebalancingHistory::new(),
                created,
                updated: vec![],
            })
            .unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        let series = &reopened.load_valuations().unwrap()["small"];
        assert_eq!(series.len(), values.len());
        for (stored, expected) in series.values().zip(values) {
            assert_eq!(stored.to_bits(), expected.to_bits());
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_csv_sink_writes_header() {
        let dir = temp_dir("sink");
        let mut series = ValuationSeries::new();
        let s = series.entry("big".to_string()).or_default();
        s.insert(Date::from_ymd_opt(2023, 1, 2).unwrap(), 100.0);
        s.insert(Date::from_ymd_opt(2023, 1, 3).unwrap(), 110.0);

        let mut sink = CsvSink::new(&dir);
        sink.emit("daily_returns", &ReturnTable::render(&series)).unwrap();
        let text = fs::read_to_string(sink.path("daily_returns")).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,big"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("2023-01-03,10"), "{row}");

        fs::remove_dir_all(&dir).unwrap();
    }
}
