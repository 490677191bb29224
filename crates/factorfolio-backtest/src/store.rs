//! In-memory backtest store.

use factorfolio_traits::{
    BacktestStore, RebalancingHistory, Result, SyncCommit, ValuationSeries, apply_writes,
};

/// Backtest state held in memory.
///
/// A commit is applied to a copy of the series and swapped in, so a
/// committed state is never observed half-written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    history: RebalancingHistory,
    valuations: ValuationSeries,
    commits: usize,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed history.
    pub const fn history(&self) -> &RebalancingHistory {
        &self.history
    }

    /// Committed valuations.
    pub const fn valuations(&self) -> &ValuationSeries {
        &self.valuations
    }

    /// Number of commits applied.
    pub const fn commits(&self) -> usize {
        self.commits
    }
}

impl BacktestStore for MemoryStore {
    fn load_history(&self) -> Result<RebalancingHistory> {
        Ok(self.history.clone())
    }

    fn load_valuations(&self) -> Result<ValuationSeries> {
        Ok(self.valuations.clone())
    }

    fn commit(&mut self, commit: SyncCommit) -> Result<()> {
        let mut valuations = self.valuations.clone();
        apply_writes(&mut valuations, &commit);
        self.valuations = valuations;
        self.history = commit.history;
        self.commits += 1;
        Ok(())
    }
}
