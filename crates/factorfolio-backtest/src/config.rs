//! Backtest configuration.
//!
//! A backtest sorts the universe on one or more factors and holds the
//! resulting portfolios for `rebalancing_frequency_months` at a time.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use factorfolio_traits::{Date, FactorfolioError, Result, SignalRef};

use crate::presets;

/// One sorting factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorConfig {
    /// Signal the factor sorts on.
    pub signal: SignalRef,
    /// Quantile breakpoints as fractions of the ranked population, from 0 to 1.
    pub breakpoints: Vec<f64>,
    /// One label per bucket, lowest values first.
    pub labels: Vec<String>,
    /// Months between the signal's as-of date and the rebalancing date.
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,
}

const fn default_lookback_months() -> u32 {
    presets::DEFAULT_LOOKBACK_MONTHS
}

impl FactorConfig {
    /// Creates a factor with the default breakpoints, labels and lookback.
    pub fn new(signal: SignalRef) -> Self {
        Self {
            signal,
            breakpoints: presets::DEFAULT_BREAKPOINTS.to_vec(),
            labels: presets::DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            lookback_months: presets::DEFAULT_LOOKBACK_MONTHS,
        }
    }

    /// Replaces breakpoints and labels.
    #[must_use]
    pub fn with_buckets(mut self, breakpoints: &[f64], labels: &[&str]) -> Self {
        self.breakpoints = breakpoints.to_vec();
        self.labels = labels.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Replaces the lookback.
    #[must_use]
    pub const fn with_lookback(mut self, lookback_months: u32) -> Self {
        self.lookback_months = lookback_months;
        self
    }

    /// Number of buckets.
    pub fn buckets(&self) -> usize {
        self.labels.len()
    }

    /// Name of the underlying signal.
    pub fn name(&self) -> &str {
        &self.signal.name
    }

    /// Checks breakpoints and labels.
    pub fn validate(&self) -> Result<()> {
        let name = self.name();
        let bp = &self.breakpoints;
        if bp.len() < 2 {
            return Err(invalid(format!("{name}: need at least two breakpoints")));
        }
        if bp.iter().any(|b| !b.is_finite()) {
            return Err(invalid(format!("{name}: breakpoints must be finite")));
        }
        if bp[0] != 0.0 || bp[bp.len() - 1] != 1.0 {
            return Err(invalid(format!("{name}: breakpoints must start at 0 and end at 1")));
        }
        if bp.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid(format!("{name}: breakpoints must be strictly ascending")));
        }
        if self.labels.len() != bp.len() - 1 {
            return Err(invalid(format!(
                "{name}: {} labels for {} breakpoints",
                self.labels.len(),
                bp.len()
            )));
        }
        let unique: HashSet<&str> = self.labels.iter().map(String::as_str).collect();
        if unique.len() != self.labels.len() || unique.contains("") {
            return Err(invalid(format!("{name}: labels must be unique and non-empty")));
        }
        Ok(())
    }
}

/// Backtesting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Sorting factors; portfolios are their Cartesian product, in this order.
    pub factors: Vec<FactorConfig>,
    /// Months between rebalancing dates.
    #[serde(default = "default_frequency")]
    pub rebalancing_frequency_months: u32,
    /// The first rebalancing happens the day before this date.
    #[serde(default = "presets::default_starts_on")]
    pub starts_on: Date,
    /// No valuation is recorded before this date.
    #[serde(default = "presets::default_data_starts_on")]
    pub data_starts_on: Date,
    /// Market segments left out of the universe.
    #[serde(default = "presets::default_excluded_markets")]
    pub excluded_markets: Vec<String>,
}

const fn default_frequency() -> u32 {
    presets::DEFAULT_REBALANCING_FREQUENCY_MONTHS
}

impl BacktestConfig {
    /// Creates a configuration with default schedule and universe settings.
    pub fn new(factors: Vec<FactorConfig>) -> Self {
        Self {
            factors,
            rebalancing_frequency_months: presets::DEFAULT_REBALANCING_FREQUENCY_MONTHS,
            starts_on: presets::default_starts_on(),
            data_starts_on: presets::default_data_starts_on(),
            excluded_markets: presets::default_excluded_markets(),
        }
    }

    /// Replaces the rebalancing frequency.
    #[must_use]
    pub const fn with_frequency(mut self, months: u32) -> Self {
        self.rebalancing_frequency_months = months;
        self
    }

    /// Replaces the schedule start and the first valuation date.
    #[must_use]
    pub const fn with_dates(mut self, starts_on: Date, data_starts_on: Date) -> Self {
        self.starts_on = starts_on;
        self.data_starts_on = data_starts_on;
        self
    }

    /// Checks every factor and the schedule settings.
    pub fn validate(&self) -> Result<()> {
        if self.factors.is_empty() {
            return Err(invalid("at least one factor is required".to_string()));
        }
        if self.rebalancing_frequency_months == 0 {
            return Err(invalid(
                "rebalancing frequency must be at least one month".to_string(),
            ));
        }
        for factor in &self.factors {
            factor.validate()?;
        }
        Ok(())
    }

    /// Display name, e.g. `"market_equity x book_to_market"`.
    pub fn name(&self) -> String {
        self.factor_names().join(" x ")
    }

    /// Name of the exported return table.
    pub fn artifact_name(&self) -> String {
        format!(
            "daily_returns_of_portfolios_formed_on_{}",
            self.factor_names().join("_by_")
        )
    }

    /// Returns whether stocks listed on `market` are left out.
    pub fn is_excluded(&self, market: &str) -> bool {
        self.excluded_markets.iter().any(|m| m == market)
    }

    fn factor_names(&self) -> Vec<&str> {
        self.factors.iter().map(FactorConfig::name).collect()
    }
}

fn invalid(msg: String) -> FactorfolioError {
    FactorfolioError::InvalidConfig(msg)
}
