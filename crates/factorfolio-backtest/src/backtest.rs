//! Sync orchestration.
//!
//! One sync cycle:
//! 1. Build the schedule up to the latest price date
//! 2. Form every rebalancing date and diff against the committed history
//! 3. Recompute the holding period of every changed `(date, label)` cell
//! 4. Append valuations for price dates newer than the committed series
//! 5. Commit the new history and the valuation writes together
//!
//! Nothing is written until the last step, so a cycle that fails anywhere
//! leaves the committed state as it was.

use std::fmt;

use tracing::{debug, error, info, warn};

use factorfolio_traits::{
    BacktestStore, Date, PriceProvider, Result, SignalProvider, SyncCommit, latest_valuation_date,
};

use crate::config::BacktestConfig;
use crate::formation::{FormationEngine, FormationFailure, FormationRun};
use crate::history::diff;
use crate::output::{ReturnSink, ReturnTable};
use crate::portfolio::{self, Portfolio};
use crate::schedule::Schedule;
use crate::valuation::ValuationAccumulator;

/// Result of a sync cycle.
///
/// Dates that failed to form are reported alongside a successful cycle: the
/// rest of the schedule is still diffed, valued and committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// New state was committed.
    Synced {
        /// `(date, label)` cells whose membership changed.
        changed_cells: usize,
        /// Valuation records created.
        created: usize,
        /// Valuation records corrected.
        updated: usize,
        /// Rebalancing dates that could not be formed.
        failures: Vec<FormationFailure>,
    },
    /// Nothing changed since the last commit.
    UpToDate {
        /// Rebalancing dates that could not be formed.
        failures: Vec<FormationFailure>,
    },
    /// The price provider has no data yet.
    NoPrices,
}

impl SyncOutcome {
    /// Rebalancing dates that could not be formed in this cycle.
    pub fn failures(&self) -> &[FormationFailure] {
        match self {
            Self::Synced { failures, .. } | Self::UpToDate { failures } => failures,
            Self::NoPrices => &[],
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synced {
                changed_cells,
                created,
                updated,
                ..
            } => write!(
                f,
                "synced ({changed_cells} changed cells, {created} created, {updated} updated)"
            )?,
            Self::UpToDate { .. } => write!(f, "already up to date")?,
            Self::NoPrices => write!(f, "no price data")?,
        }
        match self.failures().len() {
            0 => Ok(()),
            n => write!(f, ", {n} rebalancing dates failed to form"),
        }
    }
}

/// A multi-factor portfolio backtest.
#[derive(Debug, Clone)]
pub struct Backtest {
    config: BacktestConfig,
    portfolios: Vec<Portfolio>,
}

impl Backtest {
    /// Validates `config` and enumerates its portfolios.
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        let portfolios = portfolio::enumerate(&config.factors);
        portfolio::check_unique_labels(&portfolios)?;
        Ok(Self { config, portfolios })
    }

    /// Configuration.
    pub const fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Display name.
    pub fn name(&self) -> String {
        self.config.name()
    }

    /// Every portfolio of the factor cross-product, first factor slowest.
    pub fn portfolios(&self) -> &[Portfolio] {
        &self.portfolios
    }

    /// Rebalancing dates up to `max_date`.
    pub fn schedule(&self, max_date: Date) -> Result<Schedule> {
        Schedule::new(
            self.config.starts_on,
            self.config.rebalancing_frequency_months,
            max_date,
        )
    }

    /// Runs one sync cycle against `store`.
    pub fn sync<S>(
        &self,
        signals: &dyn SignalProvider,
        prices: &dyn PriceProvider,
        store: &mut S,
    ) -> Result<SyncOutcome>
    where
        S: BacktestStore + ?Sized,
    {
        let name = self.name();
        info!(backtest = %name, "sync cycle started");
        let outcome = self.run_cycle(signals, prices, store);
        match &outcome {
            Ok(SyncOutcome::Synced {
                changed_cells,
                created,
                updated,
                failures,
            }) => info!(
                backtest = %name,
                changed_cells,
                created,
                updated,
                failed_dates = failures.len(),
                "sync cycle completed"
            ),
            Ok(SyncOutcome::UpToDate { failures }) => info!(
                backtest = %name,
                failed_dates = failures.len(),
                "already up to date"
            ),
            Ok(SyncOutcome::NoPrices) => warn!(backtest = %name, "no price data; nothing to sync"),
            Err(err) => error!(backtest = %name, error = %err, "sync cycle failed"),
        }
        outcome
    }

    fn run_cycle<S>(
        &self,
        signals: &dyn SignalProvider,
        prices: &dyn PriceProvider,
        store: &mut S,
    ) -> Result<SyncOutcome>
    where
        S: BacktestStore + ?Sized,
    {
        let Some(latest) = prices.latest_date()? else {
            return Ok(SyncOutcome::NoPrices);
        };
        let schedule = self.schedule(latest)?;
        let cached = store.load_history()?;
        let committed = store.load_valuations()?;

        let FormationRun {
            mut history,
            failures,
        } = FormationEngine::new(&self.config, signals).form_all(&schedule)?;
        // A date that failed to form keeps its committed membership, so the
        // differ sees no change there.
        for failure in &failures {
            if let Some(previous) = cached.get(failure.date) {
                history.insert(failure.date, previous.clone());
            }
        }
        let changed = diff(&history, &cached);
        let changed_cells = changed.cell_count();
        if changed_cells > 0 {
            info!(
                dates = changed.len(),
                cells = changed_cells,
                "membership changed"
            );
        }

        let data_starts_on = self.config.data_starts_on;
        let mut acc = ValuationAccumulator::new(&committed);

        for (&rebalancing_date, cells) in changed.iter() {
            let (from, to) = schedule.holding_period(rebalancing_date)?;
            let (from, to) = (from.max(data_starts_on), to.min(latest));
            if from > to {
                debug!(date = %rebalancing_date, "holding period outside the valuation range");
                continue;
            }
            let rows = prices.get_range(from, to)?;
            let days = acc.recompute(&rows, cells);
            if days == 0 {
                warn!(
                    date = %rebalancing_date,
                    %from,
                    %to,
                    "no prices in holding period; skipped"
                );
            } else {
                debug!(
                    date = %rebalancing_date,
                    labels = cells.len(),
                    days,
                    "holding period recomputed"
                );
            }
        }

        // Also runs after a recompute: dates newer than the committed series
        // need every portfolio, not just the changed cells.
        let append_from = latest_valuation_date(&committed)
            .and_then(|date| date.succ_opt())
            .map_or(data_starts_on, |next| next.max(data_starts_on));
        if append_from <= latest {
            let rows = prices.get_range(append_from, latest)?;
            let days = acc.append(&rows, &schedule, &history);
            if days > 0 {
                info!(%append_from, %latest, days, "appended new price dates");
            }
        }

        let writes = acc.finish();
        if writes.is_empty() && history == cached {
            return Ok(SyncOutcome::UpToDate { failures });
        }

        let outcome = SyncOutcome::Synced {
            changed_cells,
            created: writes.created.len(),
            updated: writes.updated.len(),
            failures,
        };
        store.commit(SyncCommit {
            history,
            created: writes.created,
            updated: writes.updated,
        })?;
        Ok(outcome)
    }

    /// Return table of the committed valuations.
    pub fn render<S>(&self, store: &S) -> Result<ReturnTable>
    where
        S: BacktestStore + ?Sized,
    {
        Ok(ReturnTable::render(&store.load_valuations()?))
    }

    /// Renders the committed valuations and emits them to `sink` under the
    /// artifact name.
    pub fn publish<S>(&self, store: &S, sink: &mut dyn ReturnSink) -> Result<ReturnTable>
    where
        S: BacktestStore + ?Sized,
    {
        let table = self.render(store)?;
        sink.emit(&self.config.artifact_name(), &table)?;
        info!(
            backtest = %self.name(),
            rows = table.len(),
            "return table published"
        );
        Ok(table)
    }
}
