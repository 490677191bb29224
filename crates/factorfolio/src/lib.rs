#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorfolio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # factorfolio
//!
//! Incremental factor-portfolio backtesting.
//!
//! factorfolio is an umbrella crate that re-exports all factorfolio sub-crates
//! for convenience. It sorts a stock universe into quantile portfolios on one
//! or more signals and keeps the portfolios' aggregate market cap, and hence
//! their returns, up to date as new prices and corrected signals arrive.
//!
//! ## Quick Start
//!
//! ```ignore
//! use factorfolio::prelude::*;
//! use factorfolio::backtest::presets;
//!
//! # fn main() -> Result<()> {
//! let size = get_signal_info("market_equity").unwrap().signal_ref();
//! let bm = get_signal_info("book_to_market").unwrap().signal_ref();
//! let backtest = Backtest::new(presets::size_value(size, bm))?;
//!
//! let mut store = MemoryStore::new();
//! let outcome = backtest.sync(&signals, &prices, &mut store)?;
//! println!("{outcome}");
//!
//! let table = backtest.render(&store)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`traits`] - Records, provider and store traits, errors
//! - [`signals`] - Signal derivations, registry and the in-memory signal panel
//! - [`backtest`] - Classification, formation, diffing, valuation and returns
//!
//! ## Sync Cycle
//!
//! 1. **Schedule** rebalancing dates up to the latest price date
//! 2. **Form** every rebalancing date from the signal snapshots
//! 3. **Diff** against the committed membership history
//! 4. **Value** changed holding periods in full and new price dates incrementally
//! 5. **Commit** the new history and the valuation writes together

/// Version information for the factorfolio crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Core Types
// ============================================================================

/// Records, provider and store traits, and the error type.
pub mod traits {
    pub use factorfolio_traits::*;
}

pub use factorfolio_traits::{
    BacktestStore, Date, FactorfolioError, PricePanel, PriceProvider, Result, SignalKind,
    SignalProvider, SignalRef,
};

// ============================================================================
// Signals
// ============================================================================

/// Signal derivations and the signal registry.
///
/// ## Derived Signals
///
/// - **Size**: month-end market cap
/// - **Momentum**: month-end market cap ratio over a skip-month window
/// - **Account ratios**: e.g. return on equity, debt to equity
/// - **Price ratios**: e.g. book to market, earnings to price
/// - **Mixed accounts**: several reported accounts coalesced by priority
pub mod signals {
    pub use factorfolio_signals::*;
}

pub use factorfolio_signals::SignalPanel;

// ============================================================================
// Backtesting
// ============================================================================

/// Portfolio formation, valuation and returns.
pub mod backtest {
    pub use factorfolio_backtest::*;
}

pub use factorfolio_backtest::{
    Backtest, BacktestConfig, FactorConfig, FormationFailure, MemoryStore, ReturnSink,
    ReturnTable, SyncOutcome,
};

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use factorfolio::prelude::*;
/// ```
pub mod prelude {
    pub use crate::signals::registry::get_signal_info;
    pub use crate::{
        Backtest, BacktestConfig, BacktestStore, Date, FactorConfig, FactorfolioError,
        MemoryStore, PricePanel, PriceProvider, Result, ReturnSink, ReturnTable, SignalKind,
        SignalPanel, SignalProvider, SignalRef, SyncOutcome,
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
    }

    #[test]
    fn test_re_exports() {
        fn _accept_signals(_provider: &dyn SignalProvider) {}
        fn _accept_prices(_provider: &dyn PriceProvider) {}
        fn _accept_store(_store: &dyn BacktestStore) {}
        fn _accept_sink(_sink: &dyn ReturnSink) {}
    }

    #[test]
    fn test_prelude_backtest() {
        use crate::prelude::*;

        let size = get_signal_info("market_equity").unwrap().signal_ref();
        let backtest = Backtest::new(BacktestConfig::new(vec![FactorConfig::new(size)])).unwrap();
        assert_eq!(backtest.portfolios().len(), 3);

        let mut store = MemoryStore::new();
        let outcome = backtest
            .sync(&SignalPanel::new(), &PricePanel::default(), &mut store)
            .unwrap();
        assert_eq!(outcome, SyncOutcome::NoPrices);
    }
}
