//! Signal registry for discovering the standard signals.
//!
//! Every signal the engine ships with is listed here together with how it is
//! produced: read from a source file, or derived from other signals and
//! month-end prices.

use serde::{Deserialize, Serialize};

use factorfolio_traits::{SignalKind, SignalRef};

/// Signal category classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalCategory {
    /// Raw financial-statement accounts
    Account,
    /// Profitability and operating ratios
    Profitability,
    /// Balance-sheet structure ratios
    Leverage,
    /// Valuation signals
    Value,
    /// Price momentum signals
    Momentum,
    /// Market capitalization
    Size,
}

impl SignalCategory {
    /// Get a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &str {
        match self {
            Self::Account => "Financial-statement accounts as reported",
            Self::Profitability => "Profit relative to capital, assets or revenue",
            Self::Leverage => "Liquidity and capital structure ratios",
            Self::Value => "Accounts relative to market capitalization",
            Self::Momentum => "Past market-cap growth",
            Self::Size => "Market capitalization",
        }
    }
}

/// How a signal's records are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Derivation {
    /// Read as-is from a source panel.
    Sourced,
    /// First available of several signals, in priority order.
    Mixed(&'static [&'static str]),
    /// Ratio of two signals.
    Ratio {
        /// Numerator signal name.
        numerator: &'static str,
        /// Denominator signal name.
        denominator: &'static str,
    },
    /// A signal divided by month-end market cap.
    PriceRatio {
        /// Numerator signal name.
        numerator: &'static str,
    },
    /// Month-end market-cap momentum.
    Momentum {
        /// Most recent month of the window.
        near: usize,
        /// Oldest month of the window.
        far: usize,
    },
    /// Month-end market cap.
    Size,
}

/// Metadata about a signal.
#[derive(Debug, Clone, Serialize)]
pub struct SignalInfo {
    /// Unique identifier for the signal
    pub name: &'static str,

    /// Kind, which fixes the native frequency
    pub kind: SignalKind,

    /// Identifier unique within the kind
    pub id: u32,

    /// Category classification
    pub category: SignalCategory,

    /// Human-readable description
    pub description: &'static str,

    /// How the records are produced
    pub derivation: Derivation,
}

impl SignalInfo {
    /// Reference used by factor configurations.
    #[must_use]
    pub fn signal_ref(&self) -> SignalRef {
        SignalRef::new(self.kind, self.id, self.name)
    }
}

const fn sourced(
    name: &'static str,
    id: u32,
    description: &'static str,
) -> SignalInfo {
    SignalInfo {
        name,
        kind: SignalKind::SingleAccount,
        id,
        category: SignalCategory::Account,
        description,
        derivation: Derivation::Sourced,
    }
}

const fn account_ratio(
    name: &'static str,
    id: u32,
    category: SignalCategory,
    description: &'static str,
    numerator: &'static str,
    denominator: &'static str,
) -> SignalInfo {
    SignalInfo {
        name,
        kind: SignalKind::AccountRatio,
        id,
        category,
        description,
        derivation: Derivation::Ratio {
            numerator,
            denominator,
        },
    }
}

/// Get information about all available signals.
#[must_use]
pub fn available_signals() -> Vec<SignalInfo> {
    use SignalCategory::{Leverage, Profitability};

    vec![
        // Accounts
        sourced("assets", 1, "Total assets"),
        sourced("current_assets", 2, "Current assets"),
        sourced("current_liabilities", 3, "Current liabilities"),
        sourced("inventories", 4, "Inventories"),
        sourced("liabilities", 5, "Total liabilities"),
        sourced("equity", 6, "Total equity"),
        sourced(
            "equity_attributable_to_owners_of_parent",
            7,
            "Equity attributable to owners of the parent",
        ),
        sourced("issued_capital", 8, "Issued capital"),
        sourced("issued_capital_of_common_stock", 9, "Issued capital of common stock"),
        sourced("gross_profit", 10, "Gross profit (trailing four quarters)"),
        sourced("profit_loss", 11, "Net profit (trailing four quarters)"),
        sourced("revenue", 12, "Revenue (trailing four quarters)"),
        sourced(
            "operating_income_loss",
            13,
            "Operating income (trailing four quarters)",
        ),
        sourced(
            "profit_loss_attributable_to_owners_of_parent",
            14,
            "Net profit attributable to owners of the parent (trailing four quarters)",
        ),
        sourced(
            "total_selling_general_administrative_expenses",
            15,
            "Selling, general and administrative expenses (trailing four quarters)",
        ),
        SignalInfo {
            name: "book_equity",
            kind: SignalKind::MixedAccount,
            id: 1,
            category: SignalCategory::Account,
            description: "Book equity, falling back to issued common stock",
            derivation: Derivation::Mixed(&["issued_capital", "issued_capital_of_common_stock"]),
        },
        // Ratios
        account_ratio(
            "gross_profitability",
            1,
            Profitability,
            "Gross profit to assets",
            "gross_profit",
            "assets",
        ),
        account_ratio(
            "operating_profitability",
            2,
            Profitability,
            "Operating income to book equity",
            "operating_income_loss",
            "book_equity",
        ),
        account_ratio(
            "current_ratio",
            3,
            Leverage,
            "Current assets to current liabilities",
            "current_assets",
            "current_liabilities",
        ),
        account_ratio(
            "debt_to_equity",
            4,
            Leverage,
            "Liabilities to equity",
            "liabilities",
            "equity",
        ),
        account_ratio(
            "equity_to_assets",
            5,
            Leverage,
            "Equity to assets",
            "equity",
            "assets",
        ),
        account_ratio(
            "gross_profit_margin",
            6,
            Profitability,
            "Gross profit to revenue",
            "gross_profit",
            "revenue",
        ),
        account_ratio(
            "operating_profit_margin",
            7,
            Profitability,
            "Operating income to revenue",
            "operating_income_loss",
            "revenue",
        ),
        account_ratio(
            "return_on_assets",
            8,
            Profitability,
            "Net profit to assets",
            "profit_loss",
            "assets",
        ),
        account_ratio(
            "return_on_equity",
            9,
            Profitability,
            "Parent net profit to parent equity",
            "profit_loss_attributable_to_owners_of_parent",
            "equity_attributable_to_owners_of_parent",
        ),
        account_ratio(
            "asset_turnover",
            10,
            Profitability,
            "Revenue to assets",
            "revenue",
            "assets",
        ),
        // Value
        SignalInfo {
            name: "book_to_market",
            kind: SignalKind::PriceRatio,
            id: 1,
            category: SignalCategory::Value,
            description: "Book equity to month-end market cap",
            derivation: Derivation::PriceRatio {
                numerator: "book_equity",
            },
        },
        SignalInfo {
            name: "earnings_to_price",
            kind: SignalKind::PriceRatio,
            id: 2,
            category: SignalCategory::Value,
            description: "Parent net profit to month-end market cap",
            derivation: Derivation::PriceRatio {
                numerator: "profit_loss_attributable_to_owners_of_parent",
            },
        },
        // Momentum
        SignalInfo {
            name: "momentum",
            kind: SignalKind::Momentum,
            id: 1,
            category: SignalCategory::Momentum,
            description: "Market-cap growth from month t-12 to t-1",
            derivation: Derivation::Momentum { near: 2, far: 12 },
        },
        // Size
        SignalInfo {
            name: "market_equity",
            kind: SignalKind::Size,
            id: 1,
            category: SignalCategory::Size,
            description: "Month-end market cap",
            derivation: Derivation::Size,
        },
    ]
}

/// Get all signals in a specific category.
#[must_use]
pub fn signals_by_category(category: &SignalCategory) -> Vec<SignalInfo> {
    available_signals()
        .into_iter()
        .filter(|info| &info.category == category)
        .collect()
}

/// Get information about a specific signal by name.
#[must_use]
pub fn get_signal_info(name: &str) -> Option<SignalInfo> {
    available_signals()
        .into_iter()
        .find(|info| info.name == name)
}

/// Get information about the signal a reference points at.
#[must_use]
pub fn lookup(signal: &SignalRef) -> Option<SignalInfo> {
    available_signals()
        .into_iter()
        .find(|info| info.kind == signal.kind && info.id == signal.id)
}
