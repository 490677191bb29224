//! Membership history differ.

use std::collections::BTreeSet;

use factorfolio_traits::{Membership, RebalancingHistory};

/// `(date, label)` cells of `new` whose members differ from `cached`.
///
/// With an empty cache everything is new. A date missing from the cache
/// is changed as a whole. Labels missing on either side count as empty.
pub fn diff(new: &RebalancingHistory, cached: &RebalancingHistory) -> RebalancingHistory {
    if cached.is_empty() {
        return new.clone();
    }

    let empty = BTreeSet::new();
    let mut changed = RebalancingHistory::new();
    for (&date, membership) in new.iter() {
        let Some(previous) = cached.get(date) else {
            changed.insert(date, membership.clone());
            continue;
        };

        let labels: BTreeSet<&String> = membership.keys().chain(previous.keys()).collect();
        let cells: Membership = labels
            .into_iter()
            .filter_map(|label| {
                let now = membership.get(label).unwrap_or(&empty);
                let before = previous.get(label).unwrap_or(&empty);
                (now != before).then(|| (label.clone(), now.clone()))
            })
            .collect();
        if !cells.is_empty() {
            changed.insert(date, cells);
        }
    }
    changed
}
