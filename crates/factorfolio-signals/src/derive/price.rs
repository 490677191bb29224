//! Signals derived from month-end market capitalization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use factorfolio_traits::{Date, FactorfolioError, PriceRecord, Result, SignalRecord};

/// Largest gap between consecutive month-end observations that still counts
/// as a one-month return.
pub const MAX_MONTH_GAP_DAYS: i64 = 40;

/// Size signal: the month-end market cap itself.
pub fn size(month_end: &[PriceRecord]) -> Vec<SignalRecord> {
    let mut out: Vec<SignalRecord> = month_end
        .iter()
        .map(|p| SignalRecord {
            date: p.date,
            stock_code: p.stock_code.clone(),
            market: p.market.clone(),
            value: p.mktcap,
        })
        .collect();
    sort_records(&mut out);
    out
}

/// Configuration for the momentum signal.
///
/// With `near = 2, far = 12` the value at month `t` is the gross market-cap
/// return from the end of month `t-12` to the end of month `t-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentumConfig {
    /// Most recent month included, counted back from the observation month (1 = current).
    pub near: usize,
    /// Oldest month included, counted the same way.
    pub far: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self { near: 2, far: 12 }
    }
}

/// Momentum signal over month-end market caps.
///
/// Per stock, month-end observations are taken in date order. A monthly
/// return is undefined when the gap to the previous observation exceeds
/// [`MAX_MONTH_GAP_DAYS`]; any undefined return inside the window leaves the
/// value undefined and no record is produced.
pub fn momentum(month_end: &[PriceRecord], config: MomentumConfig) -> Result<Vec<SignalRecord>> {
    let MomentumConfig { near, far } = config;
    if near == 0 || near > far {
        return Err(FactorfolioError::InvalidConfig(format!(
            "momentum window must satisfy 1 <= near <= far, got near={near} far={far}"
        )));
    }

    let mut by_stock: BTreeMap<&str, Vec<&PriceRecord>> = BTreeMap::new();
    for p in month_end {
        by_stock.entry(p.stock_code.as_str()).or_default().push(p);
    }

    let mut out = Vec::new();
    for rows in by_stock.values_mut() {
        rows.sort_by_key(|p| p.date);

        // defined[j]: the return from row j-1 to row j is usable
        let defined: Vec<bool> = (0..rows.len())
            .map(|j| {
                j > 0
                    && gap_days(rows[j - 1].date, rows[j].date) <= MAX_MONTH_GAP_DAYS
                    && rows[j - 1].mktcap > 0.0
                    && rows[j].mktcap > 0.0
            })
            .collect();

        for i in far..rows.len() {
            let (first, last) = (i + 1 - far, i + 1 - near);
            if !defined[first..=last].iter().all(|&ok| ok) {
                continue;
            }
            let value = rows[last].mktcap / rows[i - far].mktcap;
            if value.is_finite() {
                out.push(SignalRecord {
                    date: rows[i].date,
                    stock_code: rows[i].stock_code.clone(),
                    market: rows[i].market.clone(),
                    value,
                });
            }
        }
    }
    sort_records(&mut out);
    Ok(out)
}

fn gap_days(from: Date, to: Date) -> i64 {
    (to - from).num_days()
}

pub(crate) fn sort_records(records: &mut [SignalRecord]) {
    records.sort_by(|a, b| (a.date, &a.stock_code).cmp(&(b.date, &b.stock_code)));
}
