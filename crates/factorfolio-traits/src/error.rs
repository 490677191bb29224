//! Error types for the factorfolio engine.
//!
//! Classification and formation failures carry enough context (rebalancing
//! date, signal name) for a failed sync cycle to report where it broke.
//! Provider and store failures abort only the cycle that hit them.

use crate::Date;
use thiserror::Error;

/// The main error type for factorfolio operations.
#[derive(Debug, Error)]
pub enum FactorfolioError {
    /// A cross-section has fewer distinct values than requested buckets.
    #[error("Insufficient population: {distinct} distinct values for {buckets} buckets")]
    InsufficientPopulation {
        /// Number of distinct values in the cross-section.
        distinct: usize,
        /// Number of buckets requested by the breakpoints.
        buckets: usize,
    },

    /// No signal records cover a required as-of window.
    #[error("No records for signal {signal} as of {date}")]
    MissingSignal {
        /// Signal name.
        signal: String,
        /// The as-of date that had no coverage.
        date: Date,
    },

    /// Portfolio formation failed for one rebalancing date and factor.
    #[error("Formation on {date} failed for factor {signal}: {source}")]
    Formation {
        /// Rebalancing date being formed.
        date: Date,
        /// Name of the factor whose classification failed.
        signal: String,
        /// Underlying failure.
        #[source]
        source: Box<FactorfolioError>,
    },

    /// Backtest configuration violates an invariant.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Error due to invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error when a date is out of range or invalid.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A signal or price provider call failed.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Loading or committing persisted state failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Error when a signal is not found.
    #[error("Signal not found: {0}")]
    SignalNotFound(String),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl FactorfolioError {
    /// Wrap a classification failure with the date and factor it belongs to.
    pub fn formation(date: Date, signal: impl Into<String>, source: Self) -> Self {
        Self::Formation {
            date,
            signal: signal.into(),
            source: Box::new(source),
        }
    }
}

impl From<String> for FactorfolioError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for FactorfolioError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// A specialized Result type for factorfolio operations.
pub type Result<T> = std::result::Result<T, FactorfolioError>;
