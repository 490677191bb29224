//! Portfolios of the factor cross-product.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use factorfolio_traits::{FactorfolioError, Label, Result};

use crate::config::FactorConfig;

/// One cell of the factor cross-product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Portfolio {
    /// Bucket index per factor, in factor order.
    pub quantile_locs: Vec<usize>,
    /// Per-factor bucket labels joined with `_`.
    pub label: Label,
}

/// Enumerates every portfolio, first factor varying slowest.
pub fn enumerate(factors: &[FactorConfig]) -> Vec<Portfolio> {
    if factors.is_empty() {
        return Vec::new();
    }
    let mut locs: Vec<Vec<usize>> = vec![Vec::new()];
    for factor in factors {
        locs = locs
            .into_iter()
            .flat_map(|prefix| {
                (0..factor.buckets()).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect();
    }
    locs.into_iter()
        .filter_map(|quantile_locs| {
            let label = label_for(factors, &quantile_locs)?;
            Some(Portfolio {
                quantile_locs,
                label,
            })
        })
        .collect()
}

/// Label of the portfolio at `locs`, or `None` if an index is out of range.
pub fn label_for(factors: &[FactorConfig], locs: &[usize]) -> Option<Label> {
    if locs.len() != factors.len() {
        return None;
    }
    let parts = factors
        .iter()
        .zip(locs)
        .map(|(factor, &i)| factor.labels.get(i).map(String::as_str))
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("_"))
}

/// Fails if two portfolios share a label, e.g. `a_b` + `c` vs `a` + `b_c`.
pub fn check_unique_labels(portfolios: &[Portfolio]) -> Result<()> {
    let mut seen = HashSet::with_capacity(portfolios.len());
    for portfolio in portfolios {
        if !seen.insert(portfolio.label.as_str()) {
            return Err(FactorfolioError::InvalidConfig(format!(
                "portfolio label {} is ambiguous",
                portfolio.label
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorfolio_traits::{SignalKind, SignalRef};

    fn factor(name: &str, bp: &[f64], labels: &[&str]) -> FactorConfig {
        FactorConfig::new(SignalRef::new(SignalKind::AccountRatio, 1, name)).with_buckets(bp, labels)
    }

    #[test]
    fn test_cartesian_order() {
        let factors = [
            factor("size", &[0.0, 0.5, 1.0], &["small", "big"]),
            factor("bm", &[0.0, 0.3, 0.7, 1.0], &["growth", "neutral", "value"]),
        ];
        let portfolios = enumerate(&factors);
        assert_eq!(portfolios.len(), 6);
        assert_eq!(portfolios[0].quantile_locs, vec![0, 0]);
        assert_eq!(portfolios[0].label, "small_growth");
        assert_eq!(portfolios[1].label, "small_neutral");
        assert_eq!(portfolios[3].quantile_locs, vec![1, 0]);
        assert_eq!(portfolios[5].label, "big_value");
        assert!(check_unique_labels(&portfolios).is_ok());
    }

    #[test]
    fn test_single_factor_label() {
        let factors = [factor("size", &[0.0, 0.5, 1.0], &["small", "big"])];
        let labels: Vec<_> = enumerate(&factors).into_iter().map(|p| p.label).collect();
        assert_eq!(labels, vec!["small", "big"]);
        assert_eq!(label_for(&factors, &[2]), None);
        assert_eq!(label_for(&factors, &[0, 0]), None);
    }

    #[test]
    fn test_ambiguous_labels() {
        let factors = [
            factor("f1", &[0.0, 0.5, 1.0], &["a_b", "a"]),
            factor("f2", &[0.0, 0.5, 1.0], &["c", "b_c"]),
        ];
        assert!(check_unique_labels(&enumerate(&factors)).is_err());
    }
}
