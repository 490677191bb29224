//! Signals combined from financial-statement accounts.

use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;

use factorfolio_traits::{Date, PriceRecord, SignalRecord};

use super::price::sort_records;

type RecordKey<'a> = (Date, &'a str, &'a str);

/// Ratio of two account signals.
///
/// Records are matched on date, stock code and market; unmatched records and
/// non-finite ratios (e.g. a zero denominator) are dropped.
pub fn account_ratio(numerator: &[SignalRecord], denominator: &[SignalRecord]) -> Vec<SignalRecord> {
    let denominators: HashMap<RecordKey<'_>, f64> = denominator
        .iter()
        .map(|r| ((r.date, r.stock_code.as_str(), r.market.as_str()), r.value))
        .collect();

    let mut out: Vec<SignalRecord> = numerator
        .iter()
        .filter_map(|num| {
            let den = denominators.get(&(num.date, num.stock_code.as_str(), num.market.as_str()))?;
            ratio(num, num.value / den)
        })
        .collect();
    sort_records(&mut out);
    out
}

/// An account divided by the month-end market cap of the same month.
pub fn price_ratio(numerator: &[SignalRecord], month_end: &[PriceRecord]) -> Vec<SignalRecord> {
    let mktcaps: HashMap<(i32, u32, &str, &str), f64> = month_end
        .iter()
        .map(|p| {
            (
                (p.date.year(), p.date.month(), p.stock_code.as_str(), p.market.as_str()),
                p.mktcap,
            )
        })
        .collect();

    let mut out: Vec<SignalRecord> = numerator
        .iter()
        .filter_map(|num| {
            let key = (
                num.date.year(),
                num.date.month(),
                num.stock_code.as_str(),
                num.market.as_str(),
            );
            let mktcap = mktcaps.get(&key)?;
            ratio(num, num.value / mktcap)
        })
        .collect();
    sort_records(&mut out);
    out
}

/// Coalesces several account signals in priority order.
///
/// For each stock and date the record from the earliest source wins, so a
/// preferred account falls back to substitutes only where it is missing.
pub fn mixed_account(ordered: &[Vec<SignalRecord>]) -> Vec<SignalRecord> {
    let mut merged: BTreeMap<(Date, &str), &SignalRecord> = BTreeMap::new();
    for source in ordered {
        for record in source {
            merged
                .entry((record.date, record.stock_code.as_str()))
                .or_insert(record);
        }
    }
    merged.into_values().cloned().collect()
}

fn ratio(template: &SignalRecord, value: f64) -> Option<SignalRecord> {
    value.is_finite().then(|| SignalRecord {
        value,
        ..template.clone()
    })
}
