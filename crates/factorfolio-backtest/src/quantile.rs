//! Rank-based quantile classification.
//!
//! Buckets are equal-frequency: breakpoints are fractions of the ranked
//! population, not of the value range. Entities are ranked by value
//! ascending, ties broken by stock code, and bucket `i` receives the ranks
//! `round(b_i * n)..round(b_{i+1} * n)`.

use std::collections::BTreeMap;

use factorfolio_traits::{FactorfolioError, Result, StockCode};

/// Assigns every entity with a finite value to a bucket index.
///
/// Entities with non-finite values are dropped. Fails with
/// [`FactorfolioError::InsufficientPopulation`] when the cross-section has
/// fewer distinct values than `breakpoints` describes buckets.
pub fn classify(
    values: &[(StockCode, f64)],
    breakpoints: &[f64],
) -> Result<BTreeMap<StockCode, usize>> {
    if breakpoints.len() < 2 {
        return Err(FactorfolioError::InvalidConfig(
            "need at least two breakpoints".to_string(),
        ));
    }
    let buckets = breakpoints.len() - 1;

    // First record per code wins.
    let mut by_code: BTreeMap<&str, f64> = BTreeMap::new();
    for (code, v) in values.iter().filter(|(_, v)| v.is_finite()) {
        by_code.entry(code.as_str()).or_insert(*v);
    }
    let mut ranked: Vec<(&str, f64)> = by_code.into_iter().collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let distinct = count_distinct(&ranked);
    if distinct < buckets {
        return Err(FactorfolioError::InsufficientPopulation { distinct, buckets });
    }

    let n = ranked.len() as f64;
    let cutoffs: Vec<usize> = breakpoints[1..buckets]
        .iter()
        .map(|b| (b * n).round() as usize)
        .collect();

    Ok(ranked
        .into_iter()
        .enumerate()
        .map(|(rank, (code, _))| {
            let bucket = cutoffs.partition_point(|&c| c <= rank);
            (code.to_string(), bucket)
        })
        .collect())
}

fn count_distinct(sorted: &[(&str, f64)]) -> usize {
    let mut distinct = 0;
    let mut last: Option<f64> = None;
    for &(_, v) in sorted {
        if last.is_none_or(|l| l.total_cmp(&v).is_ne()) {
            distinct += 1;
            last = Some(v);
        }
    }
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cross_section(pairs: &[(&str, f64)]) -> Vec<(StockCode, f64)> {
        pairs.iter().map(|(c, v)| (c.to_string(), *v)).collect()
    }

    #[test]
    fn test_halves() {
        let values = cross_section(&[("C", 30.0), ("A", 10.0), ("D", 40.0), ("B", 20.0)]);
        let buckets = classify(&values, &[0.0, 0.5, 1.0]).unwrap();
        assert_eq!(buckets["A"], 0);
        assert_eq!(buckets["B"], 0);
        assert_eq!(buckets["C"], 1);
        assert_eq!(buckets["D"], 1);
    }

    #[test]
    fn test_terciles_of_ten() {
        let values: Vec<_> = (0..10).map(|i| (format!("S{i:02}"), i as f64)).collect();
        let buckets = classify(&values, &[0.0, 0.3, 0.7, 1.0]).unwrap();
        let sizes = buckets.values().fold([0; 3], |mut acc, &b| {
            acc[b] += 1;
            acc
        });
        assert_eq!(sizes, [3, 4, 3]);
    }

    #[test]
    fn test_ties_broken_by_code() {
        let values = cross_section(&[("B", 1.0), ("A", 1.0), ("C", 2.0), ("D", 3.0)]);
        let buckets = classify(&values, &[0.0, 0.25, 1.0]).unwrap();
        assert_eq!(buckets["A"], 0);
        assert_eq!(buckets["B"], 1);
    }

    #[test]
    fn test_non_finite_values_dropped() {
        let values = cross_section(&[("A", 1.0), ("B", f64::NAN), ("C", 2.0), ("D", f64::INFINITY)]);
        let buckets = classify(&values, &[0.0, 0.5, 1.0]).unwrap();
        assert_eq!(buckets.len(), 2);
        assert!(!buckets.contains_key("B"));
        assert!(!buckets.contains_key("D"));
    }

    #[test]
    fn test_duplicate_code_keeps_first_value() {
        let values = cross_section(&[("A", 5.0), ("B", 1.0), ("A", 0.0), ("C", 9.0)]);
        let buckets = classify(&values, &[0.0, 0.5, 1.0]).unwrap();
        assert_eq!(buckets.len(), 3);
        // Ranks are B, A, C and the cutoff is round(1.5) = 2.
        assert_eq!(buckets["B"], 0);
        assert_eq!(buckets["A"], 0);
        assert_eq!(buckets["C"], 1);
    }

    #[test]
    fn test_insufficient_population() {
        let values = cross_section(&[("A", 1.0), ("B", 1.0), ("C", 1.0)]);
        let err = classify(&values, &[0.0, 0.5, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            FactorfolioError::InsufficientPopulation {
                distinct: 1,
                buckets: 2
            }
        ));

        let err = classify(&[], &[0.0, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            FactorfolioError::InsufficientPopulation { distinct: 0, .. }
        ));
    }

    proptest! {
        #[test]
        fn prop_buckets_are_equal_frequency(
            values in prop::collection::vec(-1e6f64..1e6, 3..200),
        ) {
            let breakpoints = [0.0, 0.3, 0.7, 1.0];
            let cross: Vec<_> = values
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("S{i:04}"), *v))
                .collect();
            let Ok(buckets) = classify(&cross, &breakpoints) else {
                return Ok(());
            };

            prop_assert_eq!(buckets.len(), cross.len());
            let n = cross.len() as f64;
            let mut sizes = [0usize; 3];
            for &b in buckets.values() {
                sizes[b] += 1;
            }
            for (i, size) in sizes.iter().enumerate() {
                let expected = (breakpoints[i + 1] - breakpoints[i]) * n;
                prop_assert!((*size as f64 - expected).abs() <= 1.0);
            }
        }

        #[test]
        fn prop_buckets_are_monotone_in_value(
            values in prop::collection::vec(-1e3f64..1e3, 2..100),
        ) {
            let cross: Vec<_> = values
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("S{i:04}"), *v))
                .collect();
            let Ok(buckets) = classify(&cross, &[0.0, 0.5, 1.0]) else {
                return Ok(());
            };
            for (a, va) in &cross {
                for (b, vb) in &cross {
                    if va < vb {
                        prop_assert!(buckets[a] <= buckets[b]);
                    }
                }
            }
        }
    }
}
