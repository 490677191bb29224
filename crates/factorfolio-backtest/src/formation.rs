//! Portfolio formation.
//!
//! Formation is not maintained incrementally: every sync cycle forms every
//! scheduled date from the signal snapshots, and only the consumers of the
//! result (differ, valuation) work incrementally.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, error, warn};

use factorfolio_traits::{
    Date, FactorfolioError, Membership, RebalancingHistory, Result, SignalProvider, StockCode,
    shift_months,
};

use crate::config::{BacktestConfig, FactorConfig};
use crate::portfolio::{self, Portfolio};
use crate::quantile::classify;
use crate::schedule::Schedule;

/// A rebalancing date that could not be formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormationFailure {
    /// Rebalancing date.
    pub date: Date,
    /// Name of the factor whose classification failed.
    pub signal: String,
    /// What went wrong.
    pub error: String,
}

impl fmt::Display for FormationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.date, self.signal, self.error)
    }
}

/// Result of forming every scheduled date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormationRun {
    /// Membership of every date that formed.
    pub history: RebalancingHistory,
    /// Dates that failed, in schedule order.
    pub failures: Vec<FormationFailure>,
}

/// Forms portfolio membership for rebalancing dates.
pub struct FormationEngine<'a> {
    config: &'a BacktestConfig,
    signals: &'a dyn SignalProvider,
    portfolios: Vec<Portfolio>,
}

impl fmt::Debug for FormationEngine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormationEngine")
            .field("backtest", &self.config.name())
            .field("portfolios", &self.portfolios.len())
            .finish()
    }
}

impl<'a> FormationEngine<'a> {
    /// Creates an engine for a validated configuration.
    pub fn new(config: &'a BacktestConfig, signals: &'a dyn SignalProvider) -> Self {
        Self {
            config,
            signals,
            portfolios: portfolio::enumerate(&config.factors),
        }
    }

    /// Membership of every portfolio on `rebalancing_date`.
    ///
    /// Every portfolio label is present, possibly with no members. A factor
    /// with no coverage at all leaves every portfolio empty for the date, but
    /// every factor is still classified so that failures are reported.
    /// Classification failures come back as [`FactorfolioError::Formation`].
    pub fn form(&self, rebalancing_date: Date) -> Result<Membership> {
        let mut membership: Membership = self
            .portfolios
            .iter()
            .map(|p| (p.label.clone(), BTreeSet::new()))
            .collect();

        let mut per_factor = Vec::with_capacity(self.config.factors.len());
        let mut uncovered = false;
        for factor in &self.config.factors {
            match self.classify_factor(factor, rebalancing_date)? {
                Some(buckets) => per_factor.push(buckets),
                None => uncovered = true,
            }
        }
        if uncovered {
            return Ok(membership);
        }

        let Some((first, rest)) = per_factor.split_first() else {
            return Ok(membership);
        };
        let mut dropped = 0usize;
        for (code, &loc) in first {
            let mut locs = Vec::with_capacity(per_factor.len());
            locs.push(loc);
            for buckets in rest {
                match buckets.get(code) {
                    Some(&loc) => locs.push(loc),
                    None => break,
                }
            }
            if locs.len() != per_factor.len() {
                dropped += 1;
                continue;
            }
            if let Some(label) = portfolio::label_for(&self.config.factors, &locs) {
                membership.entry(label).or_default().insert(code.clone());
            }
        }
        if dropped > 0 {
            debug!(
                date = %rebalancing_date,
                dropped,
                "entities without a value for every factor left out"
            );
        }
        Ok(membership)
    }

    /// Forms every scheduled date.
    ///
    /// A date whose classification fails is left out of the history and
    /// reported in [`FormationRun::failures`]; the other dates are unaffected.
    /// Provider errors abort the run.
    pub fn form_all(&self, schedule: &Schedule) -> Result<FormationRun> {
        let mut run = FormationRun::default();
        for &date in schedule.dates() {
            match self.form(date) {
                Ok(membership) => run.history.insert(date, membership),
                Err(FactorfolioError::Formation {
                    date,
                    signal,
                    source,
                }) => {
                    error!(
                        backtest = %self.config.name(),
                        date = %date,
                        factor = %signal,
                        error = %source,
                        "portfolio formation failed"
                    );
                    run.failures.push(FormationFailure {
                        date,
                        signal,
                        error: source.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(run)
    }

    /// Buckets of one factor, or `None` when the as-of window is empty.
    fn classify_factor(
        &self,
        factor: &FactorConfig,
        rebalancing_date: Date,
    ) -> Result<Option<BTreeMap<StockCode, usize>>> {
        let as_of = shift_months(rebalancing_date, -(factor.lookback_months as i32))?;
        let window = factor.signal.kind.as_of_window(as_of);
        let records = self.signals.get_as_of(&factor.signal, &window)?;

        let mut latest: BTreeMap<StockCode, (Date, f64)> = BTreeMap::new();
        for record in records {
            if self.config.is_excluded(&record.market) || !record.value.is_finite() {
                continue;
            }
            match latest.get(&record.stock_code) {
                Some(&(date, _)) if date >= record.date => {}
                _ => {
                    latest.insert(record.stock_code, (record.date, record.value));
                }
            }
        }

        if latest.is_empty() {
            let missing = FactorfolioError::MissingSignal {
                signal: factor.name().to_string(),
                date: as_of,
            };
            warn!(date = %rebalancing_date, "{missing}");
            return Ok(None);
        }

        let values: Vec<(StockCode, f64)> = latest
            .into_iter()
            .map(|(code, (_, value))| (code, value))
            .collect();
        classify(&values, &factor.breakpoints)
            .map(Some)
            .map_err(|e| FactorfolioError::formation(rebalancing_date, factor.name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorfolio_signals::SignalPanel;
    use factorfolio_traits::{AsOfWindow, SignalKind, SignalRecord, SignalRef};

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn rec(date: Date, code: &str, market: &str, value: f64) -> SignalRecord {
        SignalRecord {
            date,
            stock_code: code.to_string(),
            market: market.to_string(),
            value,
        }
    }

    fn size_ref() -> SignalRef {
        SignalRef::new(SignalKind::Size, 1, "market_equity")
    }

    fn bm_ref() -> SignalRef {
        SignalRef::new(SignalKind::PriceRatio, 1, "book_to_market")
    }

    fn two_factor() -> BacktestConfig {
        BacktestConfig::new(vec![
            FactorConfig::new(size_ref()).with_buckets(&[0.0, 0.5, 1.0], &["small", "big"]),
            FactorConfig::new(bm_ref()).with_buckets(&[0.0, 0.5, 1.0], &["growth", "value"]),
        ])
    }

    fn members(codes: &[&str]) -> BTreeSet<StockCode> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_two_factor_join() {
        // 2023-06-30 with a 6 month lookback reads December 2022 for size
        // and October to December 2022 for book-to-market.
        let panel = SignalPanel::new()
            .with_signal(
                &size_ref(),
                vec![
                    rec(d(2022, 12, 29), "A", "KOSPI", 10.0),
                    rec(d(2022, 12, 29), "B", "KOSPI", 20.0),
                ],
            )
            .with_signal(
                &bm_ref(),
                vec![
                    rec(d(2022, 12, 29), "A", "KOSPI", 1.0),
                    rec(d(2022, 12, 29), "B", "KOSPI", 1.0),
                    rec(d(2022, 12, 29), "C", "KOSPI", 2.0),
                    rec(d(2022, 12, 29), "D", "KOSPI", 3.0),
                ],
            );
        let config = two_factor();
        let engine = FormationEngine::new(&config, &panel);
        let membership = engine.form(d(2023, 6, 30)).unwrap();

        assert_eq!(membership.len(), 4);
        assert_eq!(membership["small_growth"], members(&["A"]));
        assert_eq!(membership["big_growth"], members(&["B"]));
        assert!(membership["small_value"].is_empty());
        assert!(membership["big_value"].is_empty());
    }

    #[test]
    fn test_excluded_market_and_latest_record() {
        let panel = SignalPanel::new().with_signal(
            &size_ref(),
            vec![
                rec(d(2022, 12, 1), "A", "KOSPI", 100.0),
                rec(d(2022, 12, 29), "A", "KOSPI", 1.0),
                rec(d(2022, 12, 29), "B", "KOSPI", 2.0),
                rec(d(2022, 12, 29), "K", "KONEX", 0.5),
            ],
        );
        let config = BacktestConfig::new(vec![
            FactorConfig::new(size_ref()).with_buckets(&[0.0, 0.5, 1.0], &["small", "big"]),
        ]);
        let engine = FormationEngine::new(&config, &panel);
        let membership = engine.form(d(2023, 6, 30)).unwrap();
        assert_eq!(membership["small"], members(&["A"]));
        assert_eq!(membership["big"], members(&["B"]));
    }

    #[test]
    fn test_deterministic() {
        let records: Vec<_> = (0..30)
            .map(|i| rec(d(2022, 12, 29), &format!("S{i:02}"), "KOSDAQ", (i * 7 % 11) as f64))
            .collect();
        let panel = SignalPanel::new().with_signal(&size_ref(), records);
        let config = BacktestConfig::new(vec![FactorConfig::new(size_ref())]);
        let engine = FormationEngine::new(&config, &panel);
        assert_eq!(
            engine.form(d(2023, 6, 30)).unwrap(),
            engine.form(d(2023, 6, 30)).unwrap()
        );
    }

    #[test]
    fn test_missing_coverage_is_empty() {
        let panel = SignalPanel::new().with_signal(&size_ref(), vec![]);
        let config = BacktestConfig::new(vec![FactorConfig::new(size_ref())]);
        let engine = FormationEngine::new(&config, &panel);
        let membership = engine.form(d(2023, 6, 30)).unwrap();
        assert_eq!(membership.len(), 3);
        assert!(membership.values().all(BTreeSet::is_empty));
    }

    #[test]
    fn test_failed_date_does_not_stop_the_others() {
        let panel = SignalPanel::new().with_signal(
            &size_ref(),
            vec![
                rec(d(2022, 12, 29), "A", "KOSPI", 1.0),
                rec(d(2023, 12, 28), "A", "KOSPI", 1.0),
                rec(d(2023, 12, 28), "B", "KOSPI", 2.0),
                rec(d(2023, 12, 28), "C", "KOSPI", 3.0),
            ],
        );
        let config = BacktestConfig::new(vec![FactorConfig::new(size_ref())]);
        let engine = FormationEngine::new(&config, &panel);
        let schedule = Schedule::new(d(2023, 7, 1), 12, d(2024, 7, 1)).unwrap();

        let run = engine.form_all(&schedule).unwrap();
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].date, d(2023, 6, 30));
        assert_eq!(run.failures[0].signal, "market_equity");
        assert!(run.history.get(d(2023, 6, 30)).is_none());
        assert!(run.history.get(d(2024, 6, 30)).is_some());

        match engine.form(d(2023, 6, 30)).unwrap_err() {
            FactorfolioError::Formation { source, .. } => assert!(matches!(
                *source,
                FactorfolioError::InsufficientPopulation { .. }
            )),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_later_factor_failure_reported_despite_missing_coverage() {
        // No size coverage, and a single book-to-market value for two buckets.
        let panel = SignalPanel::new()
            .with_signal(&size_ref(), vec![])
            .with_signal(&bm_ref(), vec![rec(d(2022, 12, 29), "A", "KOSPI", 1.0)]);
        let config = two_factor();
        let engine = FormationEngine::new(&config, &panel);

        match engine.form(d(2023, 6, 30)).unwrap_err() {
            FactorfolioError::Formation { date, signal, .. } => {
                assert_eq!(date, d(2023, 6, 30));
                assert_eq!(signal, "book_to_market");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    struct Unreachable;

    impl SignalProvider for Unreachable {
        fn get_as_of(&self, _signal: &SignalRef, _window: &AsOfWindow) -> Result<Vec<SignalRecord>> {
            Err(FactorfolioError::Provider("timed out".to_string()))
        }
    }

    #[test]
    fn test_provider_error_aborts_the_run() {
        let config = BacktestConfig::new(vec![FactorConfig::new(size_ref())]);
        let engine = FormationEngine::new(&config, &Unreachable);
        let schedule = Schedule::new(d(2023, 7, 1), 12, d(2024, 7, 1)).unwrap();
        assert!(matches!(
            engine.form_all(&schedule),
            Err(FactorfolioError::Provider(_))
        ));
    }
}
