//! Incremental multi-factor portfolio backtesting for factorfolio.
//!
//! This crate sorts a stock universe into quantile portfolios on one or
//! more signals and keeps the portfolios' aggregate market cap up to date
//! as prices and signals arrive:
//! - Quantile classification with rank-based, equal-frequency buckets
//! - Rebalancing schedules and holding periods
//! - Portfolio formation over the factor cross-product
//! - Membership diffing against the last committed formation
//! - Valuation that recomputes changed holding periods and appends new dates
//! - Return tables and sinks
//!
//! # Example
//!
//! ```rust,ignore
//! use factorfolio_backtest::{Backtest, MemoryStore, presets};
//!
//! let backtest = Backtest::new(presets::size_value(size, book_to_market))?;
//! let mut store = MemoryStore::new();
//! let outcome = backtest.sync(&signals, &prices, &mut store)?;
//! let table = backtest.render(&store)?;
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod backtest;
pub mod config;
pub mod formation;
pub mod history;
pub mod output;
pub mod portfolio;
pub mod presets;
pub mod quantile;
pub mod schedule;
pub mod store;
pub mod valuation;

// Re-export main types
pub use backtest::{Backtest, SyncOutcome};
pub use config::{BacktestConfig, FactorConfig};
pub use formation::{FormationEngine, FormationFailure, FormationRun};
pub use history::diff;
pub use output::{MemorySink, ReturnSink, ReturnTable};
pub use portfolio::Portfolio;
pub use quantile::classify;
pub use schedule::Schedule;
pub use store::MemoryStore;
pub use valuation::{ValuationAccumulator, ValuationWrites};
