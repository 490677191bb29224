//! Signal identification and the signal provider interface.
//!
//! A factor refers to a signal through a [`SignalRef`]. The closed
//! [`SignalKind`] enum decides the native frequency of the signal and hence
//! the as-of window that formation pulls records from.

use chrono::Datelike;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{Date, Result, SignalRecord};

/// Native frequency at which a signal is produced.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalFrequency {
    /// One cross-section per month, sampled at month-end prices.
    Monthly,
    /// One cross-section per fiscal quarter.
    Quarterly,
}

/// The closed set of signal kinds.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// A single financial-statement account.
    SingleAccount,
    /// Several accounts coalesced in priority order.
    MixedAccount,
    /// Ratio of two accounts.
    AccountRatio,
    /// An account divided by month-end market cap.
    PriceRatio,
    /// Month-end market-cap momentum.
    Momentum,
    /// Month-end market cap.
    Size,
}

impl SignalKind {
    /// Native frequency of this kind.
    #[must_use]
    pub const fn frequency(&self) -> SignalFrequency {
        match self {
            Self::Momentum | Self::Size => SignalFrequency::Monthly,
            Self::SingleAccount | Self::MixedAccount | Self::AccountRatio | Self::PriceRatio => {
                SignalFrequency::Quarterly
            }
        }
    }

    /// Window of records that are "as of" `date` for this kind.
    ///
    /// Monthly kinds read the calendar month of `date`. Quarterly kinds read
    /// the trailing three months up to and including that month, without
    /// crossing into the previous calendar year.
    #[must_use]
    pub fn as_of_window(&self, date: Date) -> AsOfWindow {
        let month = date.month();
        match self.frequency() {
            SignalFrequency::Monthly => AsOfWindow::new(date.year(), month, month),
            SignalFrequency::Quarterly => {
                AsOfWindow::new(date.year(), month.saturating_sub(2).max(1), month)
            }
        }
    }
}

/// A range of months within one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AsOfWindow {
    /// Calendar year.
    pub year: i32,
    /// First month of the window, inclusive.
    pub first_month: u32,
    /// Last month of the window, inclusive.
    pub last_month: u32,
}

impl AsOfWindow {
    /// Creates a window covering `first_month..=last_month` of `year`.
    #[must_use]
    pub const fn new(year: i32, first_month: u32, last_month: u32) -> Self {
        Self {
            year,
            first_month,
            last_month,
        }
    }

    /// Returns whether `date` falls inside the window.
    #[must_use]
    pub fn contains(&self, date: Date) -> bool {
        date.year() == self.year
            && (self.first_month..=self.last_month).contains(&date.month())
    }
}

/// Reference to a stored signal: its kind, id and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalRef {
    /// Kind of the signal, which fixes its frequency.
    pub kind: SignalKind,
    /// Identifier unique within `kind`.
    pub id: u32,
    /// Snake-case name, e.g. `"book_to_market"`.
    pub name: String,
}

impl SignalRef {
    /// Creates a new signal reference.
    pub fn new(kind: SignalKind, id: u32, name: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            name: name.into(),
        }
    }
}

/// Source of cleaned, point-in-time signal records.
///
/// Implementations return at most one record per stock and date and are
/// responsible for deduplication upstream of the engine.
pub trait SignalProvider: Send + Sync {
    /// Returns all records of `signal` dated inside `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source cannot be read or
    /// `signal` is unknown.
    fn get_as_of(&self, signal: &SignalRef, window: &AsOfWindow) -> Result<Vec<SignalRecord>>;
}
