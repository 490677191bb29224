//! Standard backtest settings.

use factorfolio_signals::registry::{
    SignalCategory, SignalInfo, get_signal_info, signals_by_category,
};
use factorfolio_traits::{Date, SignalRef};

use crate::config::{BacktestConfig, FactorConfig};

/// Signals sorted into terciles on their own by [`standard`], besides every
/// momentum signal.
pub const STANDARD_UNIVARIATE_SIGNALS: [&str; 4] = [
    "book_to_market",
    "earnings_to_price",
    "operating_profitability",
    "market_equity",
];

/// Terciles split at the 30th and 70th percentiles.
pub const DEFAULT_BREAKPOINTS: [f64; 4] = [0.0, 0.3, 0.7, 1.0];

/// Labels for [`DEFAULT_BREAKPOINTS`].
pub const DEFAULT_LABELS: [&str; 3] = ["bottom", "middle", "top"];

/// Signals are read six months before each rebalancing date.
pub const DEFAULT_LOOKBACK_MONTHS: u32 = 6;

/// Annual rebalancing.
pub const DEFAULT_REBALANCING_FREQUENCY_MONTHS: u32 = 12;

/// Market segment excluded from every universe by default.
pub const EXCLUDED_MARKET: &str = "KONEX";

/// Schedule start: first rebalancing on 2022-06-30.
pub fn default_starts_on() -> Date {
    Date::from_ymd_opt(2022, 7, 1).unwrap_or_default()
}

/// First date for which portfolio valuations are recorded.
pub fn default_data_starts_on() -> Date {
    Date::from_ymd_opt(2022, 12, 29).unwrap_or_default()
}

/// Default excluded markets.
pub fn default_excluded_markets() -> Vec<String> {
    vec![EXCLUDED_MARKET.to_string()]
}

/// Single-factor tercile sort with default settings.
pub fn univariate(signal: SignalRef) -> BacktestConfig {
    BacktestConfig::new(vec![FactorConfig::new(signal)])
}

/// Size halves crossed with book-to-market terciles.
pub fn size_value(size: SignalRef, book_to_market: SignalRef) -> BacktestConfig {
    BacktestConfig::new(vec![
        FactorConfig::new(size).with_buckets(&[0.0, 0.5, 1.0], &["small", "big"]),
        FactorConfig::new(book_to_market)
            .with_buckets(&DEFAULT_BREAKPOINTS, &["growth", "neutral", "value"]),
    ])
}

/// The backtests synced when no configuration is given: a tercile sort on
/// each standard signal and on every momentum signal, plus size × value.
/// All of them rebalance annually.
pub fn standard() -> Vec<BacktestConfig> {
    let signal = |name: &str| get_signal_info(name).map(|info| info.signal_ref());

    let mut configs: Vec<BacktestConfig> = STANDARD_UNIVARIATE_SIGNALS
        .iter()
        .filter_map(|&name| signal(name))
        .chain(
            signals_by_category(&SignalCategory::Momentum)
                .iter()
                .map(SignalInfo::signal_ref),
        )
        .map(univariate)
        .collect();
    if let (Some(size), Some(book_to_market)) = (signal("market_equity"), signal("book_to_market"))
    {
        configs.push(size_value(size, book_to_market));
    }
    configs
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorfolio_traits::SignalKind;

    #[test]
    fn test_default_dates() {
        assert_eq!(default_starts_on().to_string(), "2022-07-01");
        assert_eq!(default_data_starts_on().to_string(), "2022-12-29");
    }

    #[test]
    fn test_size_value_preset() {
        let config = size_value(
            SignalRef::new(SignalKind::Size, 1, "market_equity"),
            SignalRef::new(SignalKind::PriceRatio, 1, "book_to_market"),
        );
        assert!(config.validate().is_ok());
        assert_eq!(config.factors[0].labels, vec!["small", "big"]);
        assert_eq!(config.factors[1].buckets(), 3);
    }

    #[test]
    fn test_standard_catalog() {
        let configs = standard();
        assert_eq!(configs.len(), 6);

        let mut artifacts = std::collections::HashSet::new();
        for config in &configs {
            assert!(config.validate().is_ok(), "{}", config.name());
            assert!(crate::Backtest::new(config.clone()).is_ok());
            assert_eq!(
                config.rebalancing_frequency_months,
                DEFAULT_REBALANCING_FREQUENCY_MONTHS
            );
            assert!(artifacts.insert(config.artifact_name()));
        }

        let names: Vec<String> = configs.iter().map(BacktestConfig::name).collect();
        assert!(names.iter().any(|n| n == "momentum"));
        assert_eq!(configs.last().unwrap().factors.len(), 2);
    }
}
