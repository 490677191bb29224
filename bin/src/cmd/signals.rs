//! Signal listing command implementation.

use anyhow::Result;
use factorfolio::signals::registry::signals_by_category;
use factorfolio::signals::{Derivation, SignalCategory};

/// List registered signals, optionally filtered by category.
pub(crate) fn list_signals(category: Option<String>, verbose: bool) -> Result<()> {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Available Signals                         ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let categories = [
        (SignalCategory::Account, "Account"),
        (SignalCategory::Profitability, "Profitability"),
        (SignalCategory::Leverage, "Leverage"),
        (SignalCategory::Value, "Value"),
        (SignalCategory::Momentum, "Momentum"),
        (SignalCategory::Size, "Size"),
    ];

    for (cat, cat_name) in categories {
        if let Some(ref filter) = category
            && !cat_name.to_lowercase().contains(&filter.to_lowercase())
        {
            continue;
        }

        let signals = signals_by_category(&cat);
        if signals.is_empty() {
            continue;
        }

        println!("{cat_name}: {}", cat.description());
        println!("{}", "-".repeat(60));

        for info in signals {
            if verbose {
                println!(
                    "  {:32} {:>15} #{:<3} {} ({})",
                    info.name,
                    info.kind.to_string(),
                    info.id,
                    info.description,
                    source(&info.derivation)
                );
            } else {
                println!("  {}", info.name);
            }
        }
        println!();
    }

    if !verbose {
        println!("Use --verbose for kinds, ids and how each signal is produced.\n");
    }

    Ok(())
}

fn source(derivation: &Derivation) -> String {
    match derivation {
        Derivation::Sourced => "read from signals/<name>.csv".to_string(),
        Derivation::Mixed(names) => format!("first of {}", names.join(", ")),
        Derivation::Ratio {
            numerator,
            denominator,
        } => format!("{numerator} / {denominator}"),
        Derivation::PriceRatio { numerator } => format!("{numerator} / month-end market cap"),
        Derivation::Momentum { near, far } => {
            format!("market cap t-{} / t-{far}", near.saturating_sub(1))
        }
        Derivation::Size => "month-end market cap".to_string(),
    }
}
