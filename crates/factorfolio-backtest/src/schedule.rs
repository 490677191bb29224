//! Rebalancing schedule.

use chrono::Days;

use factorfolio_traits::{Date, FactorfolioError, Result, shift_months};

/// Rebalancing dates of a backtest, bounded by the latest price date.
///
/// The schedule is a pure function of its inputs. It is rebuilt on every
/// sync cycle instead of being stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    first: Date,
    dates: Vec<Date>,
    frequency_months: u32,
}

impl Schedule {
    /// Dates `starts_on - 1 day`, then every `frequency_months` after it,
    /// up to and including `max_date`.
    ///
    /// Each date is computed from the first one, so month-end clamping does
    /// not drift (`2023-01-31`, `2023-02-28`, `2023-03-31`).
    pub fn new(starts_on: Date, frequency_months: u32, max_date: Date) -> Result<Self> {
        if frequency_months == 0 {
            return Err(FactorfolioError::InvalidConfig(
                "rebalancing frequency must be at least one month".to_string(),
            ));
        }
        let first = starts_on.checked_sub_days(Days::new(1)).ok_or_else(|| {
            FactorfolioError::InvalidDate(format!("no day before {starts_on}"))
        })?;

        let mut dates = Vec::new();
        let mut step: i32 = 0;
        loop {
            let Some(offset) = step.checked_mul(frequency_months as i32) else {
                break;
            };
            let date = shift_months(first, offset)?;
            if date > max_date {
                break;
            }
            dates.push(date);
            step += 1;
        }

        Ok(Self {
            first,
            dates,
            frequency_months,
        })
    }

    /// Scheduled dates in ascending order.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Months between rebalancing dates.
    pub const fn frequency_months(&self) -> u32 {
        self.frequency_months
    }

    /// Returns whether no rebalancing date falls on or before the bound.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// The rebalancing date whose holding period contains `date`: the
    /// latest scheduled date strictly before it.
    pub fn matched_rebalancing_date(&self, date: Date) -> Option<Date> {
        let idx = self.dates.partition_point(|&r| r < date);
        idx.checked_sub(1).map(|i| self.dates[i])
    }

    /// Holding period `[rebalancing_date + 1 day, rebalancing_date + frequency]`.
    ///
    /// For a scheduled date the end is the next scheduled date, which may
    /// differ from `rebalancing_date + frequency` when the day of month was
    /// clamped. The period then holds exactly the dates matched to
    /// `rebalancing_date`.
    pub fn holding_period(&self, rebalancing_date: Date) -> Result<(Date, Date)> {
        let from = rebalancing_date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| FactorfolioError::InvalidDate(format!("no day after {rebalancing_date}")))?;
        let to = match self.dates.binary_search(&rebalancing_date) {
            Ok(i) => {
                let offset = i32::try_from(i + 1)
                    .ok()
                    .and_then(|steps| steps.checked_mul(self.frequency_months as i32))
                    .ok_or_else(|| {
                        FactorfolioError::InvalidDate(format!("{rebalancing_date} is too far out"))
                    })?;
                shift_months(self.first, offset)?
            }
            Err(_) => shift_months(rebalancing_date, self.frequency_months as i32)?,
        };
        Ok((from, to))
    }
}
