//! Daily price data and the price provider interface.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Days};

use crate::{Date, PriceRecord, Result};

/// Source of daily per-stock market data.
pub trait PriceProvider: Send + Sync {
    /// Latest trading date available, or `None` when there is no data.
    fn latest_date(&self) -> Result<Option<Date>>;

    /// All records dated in `from..=to`, ordered by date then stock code.
    fn get_range(&self, from: Date, to: Date) -> Result<Vec<PriceRecord>>;

    /// Returns whether `date` is the month-end observation of its month.
    fn is_month_end(&self, date: Date) -> Result<bool>;

    /// All month-end records dated in `from..=to`.
    fn month_end_range(&self, from: Date, to: Date) -> Result<Vec<PriceRecord>> {
        let mut out = Vec::new();
        for record in self.get_range(from, to)? {
            if self.is_month_end(record.date)? {
                out.push(record);
            }
        }
        Ok(out)
    }
}

/// In-memory price table.
///
/// Records are bucketed by date. Unless given explicitly, the month-end date
/// of a month is its last trading date; the latest month only counts once
/// its calendar month is over.
#[derive(Debug, Clone, Default)]
pub struct PricePanel {
    by_date: BTreeMap<Date, Vec<PriceRecord>>,
    month_ends: BTreeSet<Date>,
}

impl PricePanel {
    /// Builds a panel and derives month-end dates from the records.
    pub fn new(records: Vec<PriceRecord>) -> Self {
        let mut panel = Self::bucket(records);
        panel.month_ends = panel.derive_month_ends();
        panel
    }

    /// Builds a panel with explicitly flagged month-end dates.
    pub fn with_month_ends(records: Vec<PriceRecord>, month_ends: BTreeSet<Date>) -> Self {
        let mut panel = Self::bucket(records);
        panel.month_ends = month_ends;
        panel
    }

    fn bucket(records: Vec<PriceRecord>) -> Self {
        let mut by_date: BTreeMap<Date, Vec<PriceRecord>> = BTreeMap::new();
        for record in records {
            by_date.entry(record.date).or_default().push(record);
        }
        for day in by_date.values_mut() {
            day.sort_by(|a, b| a.stock_code.cmp(&b.stock_code));
        }
        Self {
            by_date,
            month_ends: BTreeSet::new(),
        }
    }

    fn derive_month_ends(&self) -> BTreeSet<Date> {
        let mut last_in_month: BTreeMap<(i32, u32), Date> = BTreeMap::new();
        for &date in self.by_date.keys() {
            last_in_month.insert((date.year(), date.month()), date);
        }
        let latest = self.by_date.keys().next_back().copied();
        last_in_month
            .into_values()
            .filter(|&date| {
                Some(date) != latest
                    || date
                        .checked_add_days(Days::new(1))
                        .is_some_and(|next| next.month() != date.month())
            })
            .collect()
    }

    /// Number of trading dates.
    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    /// Returns whether the panel holds no data.
    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// Appends records, e.g. a newly published trading day.
    ///
    /// Month-end flags are derived again from the extended data.
    pub fn extend(&mut self, records: Vec<PriceRecord>) {
        for record in records {
            self.by_date.entry(record.date).or_default().push(record);
        }
        for day in self.by_date.values_mut() {
            day.sort_by(|a, b| a.stock_code.cmp(&b.stock_code));
            day.dedup_by(|a, b| a.stock_code == b.stock_code);
        }
        self.month_ends = self.derive_month_ends();
    }
}

impl PriceProvider for PricePanel {
    fn latest_date(&self) -> Result<Option<Date>> {
        Ok(self.by_date.keys().next_back().copied())
    }

    fn get_range(&self, from: Date, to: Date) -> Result<Vec<PriceRecord>> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .by_date
            .range(from..=to)
            .flat_map(|(_, day)| day.iter().cloned())
            .collect())
    }

    fn is_month_end(&self, date: Date) -> Result<bool> {
        Ok(self.month_ends.contains(&date))
    }
}
