//! Signal derivations.
//!
//! These produce the records a [`SignalPanel`](crate::SignalPanel) serves:
//! - Price based: size and momentum from month-end market caps
//! - Account based: ratios, price ratios and priority-coalesced accounts

mod account;
mod price;

pub use account::{account_ratio, mixed_account, price_ratio};
pub use price::{MAX_MONTH_GAP_DAYS, MomentumConfig, momentum, size};

use factorfolio_traits::{FactorfolioError, PriceRecord, Result, SignalRecord};
use tracing::debug;

use crate::registry::{Derivation, SignalInfo, get_signal_info};

/// Produces the records of `info`, deriving them from their inputs if needed.
///
/// `source` is asked first for every signal along the way; returning
/// `Some(records)` short-circuits the derivation (e.g. a precomputed panel
/// on disk). Sourced accounts must come from `source`.
pub fn derive_signal<F>(
    info: &SignalInfo,
    source: &mut F,
    month_end: &[PriceRecord],
) -> Result<Vec<SignalRecord>>
where
    F: FnMut(&SignalInfo) -> Result<Option<Vec<SignalRecord>>>,
{
    if let Some(records) = source(info)? {
        return Ok(records);
    }

    debug!(signal = info.name, derivation = ?info.derivation, "deriving signal");
    let mut input = |name: &str| -> Result<Vec<SignalRecord>> {
        let dep = get_signal_info(name)
            .ok_or_else(|| FactorfolioError::SignalNotFound(name.to_string()))?;
        derive_signal(&dep, source, month_end)
    };

    match info.derivation {
        Derivation::Sourced => Err(FactorfolioError::SignalNotFound(info.name.to_string())),
        Derivation::Mixed(names) => {
            let ordered = names
                .iter()
                .map(|name| input(name))
                .collect::<Result<Vec<_>>>()?;
            Ok(mixed_account(&ordered))
        }
        Derivation::Ratio {
            numerator,
            denominator,
        } => {
            let num = input(numerator)?;
            let den = input(denominator)?;
            Ok(account_ratio(&num, &den))
        }
        Derivation::PriceRatio { numerator } => Ok(price_ratio(&input(numerator)?, month_end)),
        Derivation::Momentum { near, far } => momentum(month_end, MomentumConfig { near, far }),
        Derivation::Size => Ok(size(month_end)),
    }
}
