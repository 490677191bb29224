//! In-memory signal provider.

use std::collections::{BTreeMap, HashMap};

use factorfolio_traits::{
    AsOfWindow, Date, FactorfolioError, Result, SignalKind, SignalProvider, SignalRecord,
    SignalRef,
};

/// Signal records held in memory, grouped by signal and date.
///
/// Records are keyed by the `(kind, id)` of their [`SignalRef`]; within a
/// date a later insert for the same stock replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct SignalPanel {
    signals: HashMap<(SignalKind, u32), BTreeMap<Date, BTreeMap<String, SignalRecord>>>,
}

impl SignalPanel {
    /// Creates an empty panel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the records of one signal.
    pub fn insert(&mut self, signal: &SignalRef, records: impl IntoIterator<Item = SignalRecord>) {
        let dates = self.signals.entry((signal.kind, signal.id)).or_default();
        for record in records {
            dates
                .entry(record.date)
                .or_default()
                .insert(record.stock_code.clone(), record);
        }
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with_signal(
        mut self,
        signal: &SignalRef,
        records: impl IntoIterator<Item = SignalRecord>,
    ) -> Self {
        self.insert(signal, records);
        self
    }

    /// Returns whether records of `signal` are held.
    pub fn contains(&self, signal: &SignalRef) -> bool {
        self.signals.contains_key(&(signal.kind, signal.id))
    }

    /// Number of signals held.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns whether the panel holds no signals.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl SignalProvider for SignalPanel {
    fn get_as_of(&self, signal: &SignalRef, window: &AsOfWindow) -> Result<Vec<SignalRecord>> {
        let dates = self
            .signals
            .get(&(signal.kind, signal.id))
            .ok_or_else(|| FactorfolioError::SignalNotFound(signal.name.clone()))?;

        let Some((from, to)) = window_bounds(window) else {
            return Ok(Vec::new());
        };
        Ok(dates
            .range(from..=to)
            .flat_map(|(_, by_stock)| by_stock.values().cloned())
            .collect())
    }
}

fn window_bounds(window: &AsOfWindow) -> Option<(Date, Date)> {
    let from = Date::from_ymd_opt(window.year, window.first_month, 1)?;
    let next = if window.last_month == 12 {
        Date::from_ymd_opt(window.year + 1, 1, 1)?
    } else {
        Date::from_ymd_opt(window.year, window.last_month + 1, 1)?
    };
    Some((from, next.pred_opt()?))
}
