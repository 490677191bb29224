#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorfolio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and provider traits for factorfolio.
//!
//! This crate defines the boundary of the factor-portfolio engine: the
//! records it consumes from signal and price providers, the membership and
//! valuation state it persists, and the error taxonomy shared by every crate.

/// The version of the factorfolio-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod error;
pub mod price;
pub mod signal;
pub mod store;
pub mod types;

// Re-exports
pub use error::{FactorfolioError, Result};
pub use price::{PricePanel, PriceProvider};
pub use signal::{AsOfWindow, SignalFrequency, SignalKind, SignalProvider, SignalRef};
pub use store::{BacktestStore, SyncCommit, apply_writes};
pub use types::{
    Date, Label, Membership, PriceRecord, RebalancingHistory, SignalRecord, StockCode,
    ValuationRecord, ValuationSeries, latest_valuation_date, shift_months,
};
