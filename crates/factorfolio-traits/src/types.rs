//! Common types used throughout factorfolio.
//!
//! Signals and prices are plain point-in-time records. Portfolio membership is
//! kept as a date × label table of stock-code sets so that successive
//! formation runs can be compared cell by cell.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Months;
use serde::{Deserialize, Serialize};

use crate::{FactorfolioError, Result};

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// A listed stock identifier (e.g. `"005930"`).
pub type StockCode = String;

/// A human-readable portfolio label such as `"small_value"`.
pub type Label = String;

/// Portfolio membership at one rebalancing date: label → member stock codes.
pub type Membership = BTreeMap<Label, BTreeSet<StockCode>>;

/// Aggregate market capitalization per portfolio label, ordered by date.
pub type ValuationSeries = BTreeMap<Label, BTreeMap<Date, f64>>;

/// One observation of a signal for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    /// Observation date.
    pub date: Date,
    /// Stock identifier.
    pub stock_code: StockCode,
    /// Market segment the stock is listed on.
    pub market: String,
    /// Signal value. Non-finite values are treated as missing.
    pub value: f64,
}

/// One daily price observation for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Trading date.
    pub date: Date,
    /// Stock identifier.
    pub stock_code: StockCode,
    /// Market segment the stock is listed on.
    pub market: String,
    /// Market capitalization at the close.
    pub mktcap: f64,
}

/// One aggregate market-cap observation for a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRecord {
    /// Portfolio label.
    pub label: Label,
    /// Trading date.
    pub date: Date,
    /// Sum of member market caps present on `date`.
    pub mktcap: f64,
}

/// Membership of every portfolio at every rebalancing date.
///
/// This is the sync checkpoint of a backtest. It is always replaced as a
/// whole by the latest full formation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RebalancingHistory {
    dates: BTreeMap<Date, Membership>,
}

impl RebalancingHistory {
    /// Creates an empty history.
    pub const fn new() -> Self {
        Self {
            dates: BTreeMap::new(),
        }
    }

    /// Returns whether no rebalancing date has been recorded.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of rebalancing dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Records the membership formed on `date`, replacing any previous one.
    pub fn insert(&mut self, date: Date, membership: Membership) {
        self.dates.insert(date, membership);
    }

    /// Membership formed on `date`.
    pub fn get(&self, date: Date) -> Option<&Membership> {
        self.dates.get(&date)
    }

    /// Members of one `(date, label)` cell.
    pub fn cell(&self, date: Date, label: &str) -> Option<&BTreeSet<StockCode>> {
        self.dates.get(&date).and_then(|m| m.get(label))
    }

    /// Iterates rebalancing dates in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&Date, &Membership)> {
        self.dates.iter()
    }

    /// Total number of `(date, label)` cells.
    pub fn cell_count(&self) -> usize {
        self.dates.values().map(BTreeMap::len).sum()
    }
}

impl FromIterator<(Date, Membership)> for RebalancingHistory {
    fn from_iter<I: IntoIterator<Item = (Date, Membership)>>(iter: I) -> Self {
        Self {
            dates: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RebalancingHistory {
    type Item = (Date, Membership);
    type IntoIter = std::collections::btree_map::IntoIter<Date, Membership>;

    fn into_iter(self) -> Self::IntoIter {
        self.dates.into_iter()
    }
}

/// Shifts `date` by a signed number of calendar months.
///
/// The day is clamped to the end of the target month, so
/// `2024-01-31 + 1 month == 2024-02-29`.
pub fn shift_months(date: Date, months: i32) -> Result<Date> {
    let delta = Months::new(months.unsigned_abs());
    let shifted = if months >= 0 {
        date.checked_add_months(delta)
    } else {
        date.checked_sub_months(delta)
    };
    shifted.ok_or_else(|| {
        FactorfolioError::InvalidDate(format!("{date} shifted by {months} months is out of range"))
    })
}

/// Latest date recorded in any series.
pub fn latest_valuation_date(series: &ValuationSeries) -> Option<Date> {
    series
        .values()
        .filter_map(|s| s.keys().next_back().copied())
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_shift_months_clamps_day() {
        assert_eq!(shift_months(d(2024, 1, 31), 1).unwrap(), d(2024, 2, 29));
        assert_eq!(shift_months(d(2022, 6, 30), 12).unwrap(), d(2023, 6, 30));
        assert_eq!(shift_months(d(2023, 6, 30), -6).unwrap(), d(2022, 12, 30));
    }

    #[test]
    fn test_history_cells() {
        let mut membership = Membership::new();
        membership.insert(
            "small".to_string(),
            ["A", "B"].iter().map(|s| s.to_string()).collect(),
        );
        membership.insert("big".to_string(), BTreeSet::new());

        let mut history = RebalancingHistory::new();
        assert!(history.is_empty());
        history.insert(d(2023, 6, 30), membership);

        assert_eq!(history.len(), 1);
        assert_eq!(history.cell_count(), 2);
        assert_eq!(history.cell(d(2023, 6, 30), "small").unwrap().len(), 2);
        assert!(history.cell(d(2023, 6, 30), "mid").is_none());
        assert!(history.get(d(2024, 6, 30)).is_none());
    }

    #[test]
    fn test_history_json_keys_are_dates() {
        let history: RebalancingHistory = [(d(2023, 6, 30), Membership::new())]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&history).unwrap();
        assert_eq!(json, r#"{"2023-06-30":{}}"#);
        let back: RebalancingHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }

    #[test]
    fn test_latest_valuation_date() {
        let mut series = ValuationSeries::new();
        assert_eq!(latest_valuation_date(&series), None);
        series
            .entry("a".to_string())
            .or_default()
            .insert(d(2023, 1, 2), 1.0);
        series
            .entry("b".to_string())
            .or_default()
            .insert(d(2023, 1, 3), 1.0);
        assert_eq!(latest_valuation_date(&series), Some(d(2023, 1, 3)));
    }
}
