//! Signal implementations for factorfolio.
//!
//! This crate is the signal-provider side of the engine:
//! - Derivations: size and momentum from month-end market caps, account
//!   ratios, price ratios and priority-coalesced accounts
//! - [`SignalPanel`]: an in-memory [`SignalProvider`](factorfolio_traits::SignalProvider)
//! - Registry: the standard named signals and how each is produced
//!
//! # Example
//!
//! ```ignore
//! use factorfolio_signals::{SignalPanel, derive, registry::get_signal_info};
//!
//! let info = get_signal_info("market_equity").unwrap();
//! let records = derive::size(&month_end_prices);
//! let panel = SignalPanel::new().with_signal(&info.signal_ref(), records);
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod derive;
pub mod panel;
pub mod registry;

// Re-export key types
pub use panel::SignalPanel;
pub use registry::{Derivation, SignalCategory, SignalInfo};
