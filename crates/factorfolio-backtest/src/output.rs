//! Portfolio return table.
//!
//! Returns are simple period returns between consecutive valuations of a
//! portfolio, in percent rounded to two decimals. Only dates on which every
//! portfolio has a return are kept.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array1, Array2, s};
use polars::prelude::*;

use factorfolio_traits::{Date, Label, Result, ValuationSeries};

/// Returns pivoted by date (rows) and portfolio label (columns).
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTable {
    dates: Vec<Date>,
    labels: Vec<Label>,
    returns: Array2<f64>,
}

impl ReturnTable {
    /// Builds the table from valuation series.
    pub fn render(series: &ValuationSeries) -> Self {
        let labels: Vec<Label> = series.keys().cloned().collect();
        let per_label: Vec<BTreeMap<Date, f64>> = series.values().map(period_returns).collect();

        let dates: Vec<Date> = match per_label.split_first() {
            None => Vec::new(),
            Some((first, rest)) => first
                .keys()
                .filter(|date| rest.iter().all(|r| r.contains_key(*date)))
                .copied()
                .collect(),
        };

        let mut returns = Array2::zeros((dates.len(), labels.len()));
        for (j, by_date) in per_label.iter().enumerate() {
            for (i, date) in dates.iter().enumerate() {
                returns[[i, j]] = by_date[date];
            }
        }

        Self {
            dates,
            labels,
            returns,
        }
    }

    /// Row dates, ascending.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Column labels, ascending.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Returns in percent, one row per date.
    pub const fn returns(&self) -> &Array2<f64> {
        &self.returns
    }

    /// Return of `label` on `date`.
    pub fn get(&self, date: Date, label: &str) -> Option<f64> {
        let i = self.dates.binary_search(&date).ok()?;
        let j = self.labels.iter().position(|l| l == label)?;
        Some(self.returns[[i, j]])
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Returns whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Converts to a DataFrame with a `date` column followed by one column
    /// per label.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.labels.len() + 1);
        let dates: Vec<String> = self.dates.iter().map(Date::to_string).collect();
        columns.push(Column::new("date".into(), dates));
        for (j, label) in self.labels.iter().enumerate() {
            let values: Vec<f64> = self.returns.column(j).to_vec();
            columns.push(Column::new(label.as_str().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Destination of a rendered return table.
pub trait ReturnSink {
    /// Emits the table under `name`, replacing any previous emission.
    fn emit(&mut self, name: &str, table: &ReturnTable) -> Result<()>;
}

/// Keeps the latest emitted table per name.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    tables: BTreeMap<String, ReturnTable>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table last emitted under `name`.
    pub fn get(&self, name: &str) -> Option<&ReturnTable> {
        self.tables.get(name)
    }
}

impl ReturnSink for MemorySink {
    fn emit(&mut self, name: &str, table: &ReturnTable) -> Result<()> {
        self.tables.insert(name.to_string(), table.clone());
        Ok(())
    }
}

/// Percent return at each date after the first, where both ends are positive.
fn period_returns(series: &BTreeMap<Date, f64>) -> BTreeMap<Date, f64> {
    if series.len() < 2 {
        return BTreeMap::new();
    }
    let dates: Vec<Date> = series.keys().copied().collect();
    let values: Array1<f64> = series.values().copied().collect();

    let prev = values.slice(s![..-1]);
    let next = values.slice(s![1..]);
    let returns = (&next / &prev - 1.0) * 100.0;

    let valid: BTreeSet<usize> = prev
        .iter()
        .zip(next.iter())
        .enumerate()
        .filter(|(_, (p, n))| **p > 0.0 && **n > 0.0)
        .map(|(i, _)| i)
        .collect();

    valid
        .into_iter()
        .map(|i| (dates[i + 1], round2(returns[i])))
        .collect()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
