//! Schedule command implementation.

use anyhow::Result;
use factorfolio::backtest::Schedule;

use crate::data::parse_date;

/// Print the rebalancing dates and holding periods of a schedule.
pub(crate) fn print_schedule(start: &str, frequency: u32, max: &str) -> Result<()> {
    let starts_on = parse_date(start)?;
    let max_date = parse_date(max)?;
    let schedule = Schedule::new(starts_on, frequency, max_date)?;

    if schedule.is_empty() {
        println!("No rebalancing date on or before {max_date}.");
        return Ok(());
    }

    println!("{:<12}  holding period", "rebalancing");
    println!("{}", "-".repeat(40));
    for &date in schedule.dates() {
        let (from, to) = schedule.holding_period(date)?;
        println!("{date}    {from} .. {to}");
    }
    Ok(())
}
