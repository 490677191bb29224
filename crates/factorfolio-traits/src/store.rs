//! Persistence boundary for backtest state.
//!
//! A backtest owns exactly one store. Each sync cycle reads the committed
//! state once and, if anything changed, hands back a single [`SyncCommit`]
//! that the store must apply all-or-nothing.

use crate::{RebalancingHistory, Result, ValuationRecord, ValuationSeries};

/// Everything one sync cycle writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncCommit {
    /// Replacement rebalancing history.
    pub history: RebalancingHistory,
    /// Valuation records that did not exist before.
    pub created: Vec<ValuationRecord>,
    /// Existing valuation records whose value changed.
    pub updated: Vec<ValuationRecord>,
}

impl SyncCommit {
    /// Number of valuation records written.
    pub fn write_count(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}

/// Persistent state of one backtest.
pub trait BacktestStore {
    /// Last committed rebalancing history (empty before the first sync).
    fn load_history(&self) -> Result<RebalancingHistory>;

    /// All committed valuation records.
    fn load_valuations(&self) -> Result<ValuationSeries>;

    /// Applies `commit` atomically: either all of it becomes visible or the
    /// previously committed state stays authoritative.
    fn commit(&mut self, commit: SyncCommit) -> Result<()>;
}

/// Applies a commit to an in-memory valuation series.
pub fn apply_writes(series: &mut ValuationSeries, commit: &SyncCommit) {
    for record in commit.created.iter().chain(&commit.updated) {
        series
            .entry(record.label.clone())
            .or_default()
            .insert(record.date, record.mktcap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Date;

    #[test]
    fn test_apply_writes_upserts() {
        let date = Date::from_ymd_opt(2023, 1, 2).unwrap();
        let mut series = ValuationSeries::new();
        let commit = SyncCommit {
            history: RebalancingHistory::new(),
            created: vec![ValuationRecord {
                label: "small".to_string(),
                date,
                mktcap: 10.0,
            }],
            updated: vec![],
        };
        apply_writes(&mut series, &commit);
        assert_eq!(series["small"][&date], 10.0);

        let commit = SyncCommit {
            updated: vec![ValuationRecord {
                label: "small".to_string(),
                date,
                mktcap: 12.0,
            }],
            ..SyncCommit::default()
        };
        assert_eq!(commit.write_count(), 1);
        apply_writes(&mut series, &commit);
        assert_eq!(series["small"][&date], 12.0);
    }
}
