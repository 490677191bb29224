//! Portfolio valuation.
//!
//! The accumulator stages `(label, date) -> aggregate market cap` values on
//! top of the committed series and, when finished, sorts them into records
//! to create and records to correct. Values equal to the committed ones are
//! not written again, so re-running a cycle is idempotent.

use std::collections::{BTreeMap, HashMap};

use factorfolio_traits::{
    Date, Label, Membership, PriceRecord, RebalancingHistory, ValuationRecord, ValuationSeries,
};

use crate::schedule::Schedule;

/// Valuation writes of one sync cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuationWrites {
    /// Records for `(label, date)` pairs not valued before.
    pub created: Vec<ValuationRecord>,
    /// Records whose committed value changed.
    pub updated: Vec<ValuationRecord>,
}

impl ValuationWrites {
    /// Returns whether nothing needs to be written.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty()
    }
}

/// Stages portfolio valuations against a committed series.
#[derive(Debug)]
pub struct ValuationAccumulator<'a> {
    committed: &'a ValuationSeries,
    staged: BTreeMap<(Label, Date), f64>,
}

impl<'a> ValuationAccumulator<'a> {
    /// Creates an accumulator on top of `committed`.
    pub fn new(committed: &'a ValuationSeries) -> Self {
        Self {
            committed,
            staged: BTreeMap::new(),
        }
    }

    /// Values `cells` on every date in `prices`.
    ///
    /// Used for the holding period of a rebalancing date whose membership
    /// changed. Returns the number of dates valued.
    pub fn recompute(&mut self, prices: &[PriceRecord], cells: &Membership) -> usize {
        let days = group_by_date(prices);
        for (&date, day) in &days {
            self.value_day(date, cells, day);
        }
        days.len()
    }

    /// Values every portfolio on every date in `prices`, using the
    /// membership of the rebalancing date each price date is matched to.
    ///
    /// Dates before the first rebalancing are skipped. Returns the number of
    /// dates valued.
    pub fn append(
        &mut self,
        prices: &[PriceRecord],
        schedule: &Schedule,
        history: &RebalancingHistory,
    ) -> usize {
        let mut valued = 0;
        for (date, day) in group_by_date(prices) {
            let membership = schedule
                .matched_rebalancing_date(date)
                .and_then(|r| history.get(r));
            if let Some(membership) = membership {
                self.value_day(date, membership, &day);
                valued += 1;
            }
        }
        valued
    }

    /// Number of staged values.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Returns whether nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Splits staged values into creates and updates, dropping values that
    /// match the committed series.
    pub fn finish(self) -> ValuationWrites {
        let mut writes = ValuationWrites::default();
        for ((label, date), mktcap) in self.staged {
            let committed = self.committed.get(&label).and_then(|s| s.get(&date));
            let record = ValuationRecord {
                label,
                date,
                mktcap,
            };
            match committed {
                None => writes.created.push(record),
                Some(&old) if old != mktcap => writes.updated.push(record),
                Some(_) => {}
            }
        }
        writes
    }

    fn value_day(&mut self, date: Date, cells: &Membership, day: &HashMap<&str, f64>) {
        for (label, members) in cells {
            // Members are summed in code order so equal inputs give equal bits.
            let mktcap: f64 = members
                .iter()
                .filter_map(|code| day.get(code.as_str()))
                .sum();
            self.staged.insert((label.clone(), date), mktcap);
        }
    }
}

fn group_by_date(prices: &[PriceRecord]) -> BTreeMap<Date, HashMap<&str, f64>> {
    let mut days: BTreeMap<Date, HashMap<&str, f64>> = BTreeMap::new();
    for record in prices {
        if record.mktcap.is_finite() {
            days.entry(record.date)
                .or_default()
                .insert(record.stock_code.as_str(), record.mktcap);
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use factorfolio_traits::StockCode;
    use std::collections::BTreeSet;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn price(date: Date, code: &str, mktcap: f64) -> PriceRecord {
        PriceRecord {
            date,
            stock_code: code.to_string(),
            market: "KOSPI".to_string(),
            mktcap,
        }
    }

    fn members(codes: &str) -> BTreeSet<StockCode> {
        codes.split_whitespace().map(str::to_string).collect()
    }

    fn cells() -> Membership {
        [
            ("small".to_string(), members("A B")),
            ("big".to_string(), members("C")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_sums_members_present_on_the_day() {
        let committed = ValuationSeries::new();
        let mut acc = ValuationAccumulator::new(&committed);
        let prices = vec![
            price(d(2023, 1, 2), "A", 10.0),
            price(d(2023, 1, 2), "B", 5.5),
            price(d(2023, 1, 2), "C", 100.0),
            price(d(2023, 1, 3), "A", 11.0),
            price(d(2023, 1, 3), "X", 1.0),
        ];
        assert_eq!(acc.recompute(&prices, &cells()), 2);
        let writes = acc.finish();
        assert!(writes.updated.is_empty());
        assert_eq!(writes.created.len(), 4);

        let small_jan2 = writes
            .created
            .iter()
            .find(|r| r.label == "small" && r.date == d(2023, 1, 2))
            .unwrap();
        assert_relative_eq!(small_jan2.mktcap, 15.5);
        let big_jan3 = writes
            .created
            .iter()
            .find(|r| r.label == "big" && r.date == d(2023, 1, 3))
            .unwrap();
        assert_relative_eq!(big_jan3.mktcap, 0.0);
    }

    #[test]
    fn test_finish_splits_created_updated_and_unchanged() {
        let mut committed = ValuationSeries::new();
        let small = committed.entry("small".to_string()).or_default();
        small.insert(d(2023, 1, 2), 15.0);
        small.insert(d(2023, 1, 3), 99.0);

        let mut acc = ValuationAccumulator::new(&committed);
        acc.recompute(
            &[
                price(d(2023, 1, 2), "A", 10.0),
                price(d(2023, 1, 2), "B", 5.0),
                price(d(2023, 1, 3), "A", 11.0),
                price(d(2023, 1, 4), "A", 12.0),
            ],
            &[("small".to_string(), members("A B"))].into_iter().collect(),
        );
        let writes = acc.finish();
        assert_eq!(writes.updated.len(), 1);
        assert_eq!(writes.updated[0].date, d(2023, 1, 3));
        assert_relative_eq!(writes.updated[0].mktcap, 11.0);
        assert_eq!(writes.created.len(), 1);
        assert_eq!(writes.created[0].date, d(2023, 1, 4));
    }

    #[test]
    fn test_append_uses_matched_membership() {
        let schedule = Schedule::new(d(2022, 7, 1), 6, d(2023, 2, 1)).unwrap();
        let history: RebalancingHistory = [
            (d(2022, 6, 30), cells()),
            (
                d(2022, 12, 30),
                [
                    ("small".to_string(), members("C")),
                    ("big".to_string(), members("A B")),
                ]
                .into_iter()
                .collect(),
            ),
        ]
        .into_iter()
        .collect();

        let committed = ValuationSeries::new();
        let mut acc = ValuationAccumulator::new(&committed);
        let valued = acc.append(
            &[
                price(d(2022, 6, 30), "A", 1.0),
                price(d(2022, 12, 30), "A", 1.0),
                price(d(2022, 12, 30), "C", 7.0),
                price(d(2023, 1, 2), "A", 1.0),
                price(d(2023, 1, 2), "C", 7.0),
            ],
            &schedule,
            &history,
        );
        assert_eq!(valued, 2);

        let writes = acc.finish();
        let value = |label: &str, date: Date| {
            writes
                .created
                .iter()
                .find(|r| r.label == label && r.date == date)
                .map(|r| r.mktcap)
        };
        assert_eq!(value("small", d(2022, 12, 30)), Some(1.0));
        assert_eq!(value("big", d(2022, 12, 30)), Some(7.0));
        assert_eq!(value("small", d(2023, 1, 2)), Some(7.0));
        assert_eq!(value("big", d(2023, 1, 2)), Some(1.0));
        assert_eq!(value("small", d(2022, 6, 30)), None);
    }
}
