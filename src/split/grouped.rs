//! Group-aware assignment shared by scaffold and cold splits
//!
//! Groups are ordered by descending size (ties broken by a seeded shuffle)
//! and each group goes, whole, to the partition with the largest relative
//! deficit `(target - assigned) / target`. Partitions with a zero fraction
//! never receive a group. Equal deficits resolve to train, then valid, then
//! test.

use super::{Assignment, SplitLabel};
use crate::dataset::{Dataset, Record, RecordId};
use crate::error::KeyDerivationError;
use crate::keyer::EntityKey;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Records sharing one entity key.
#[derive(Debug, Clone)]
pub(crate) struct Group {
    pub(crate) key: EntityKey,
    pub(crate) members: Vec<RecordId>,
}

/// Group records by key; records whose key cannot be derived are returned
/// separately and belong to no group.
pub(crate) fn group_records<F>(dataset: &Dataset, key_of: F) -> (Vec<Group>, Vec<KeyDerivationError>)
where
    F: Fn(&Record) -> std::result::Result<EntityKey, KeyDerivationError>,
{
    let mut by_key: BTreeMap<EntityKey, Vec<RecordId>> = BTreeMap::new();
    let mut excluded = Vec::new();
    for record in dataset {
        match key_of(record) {
            Ok(key) => by_key.entry(key).or_default().push(record.id().to_string()),
            Err(err) => excluded.push(err),
        }
    }
    let groups = by_key
        .into_iter()
        .map(|(key, members)| Group { key, members })
        .collect();
    (groups, excluded)
}

/// Largest groups first; the seed only decides the order among equal sizes.
pub(crate) fn order_groups(mut groups: Vec<Group>, seed: u64) -> Vec<Group> {
    let mut rng = StdRng::seed_from_u64(seed);
    groups.shuffle(&mut rng);
    groups.sort_by_key(|group| Reverse(group.members.len()));
    groups
}

/// Fail when there are fewer groups than partitions to fill.
pub(crate) fn check_diversity(
    groups: &[Group],
    fractions: [f64; 3],
    column: &str,
    seed: u64,
) -> Result<()> {
    let required = fractions.iter().filter(|f| **f > 0.0).count();
    if groups.len() < required {
        return Err(Error::InsufficientDiversity {
            column: column.to_string(),
            distinct: groups.len(),
            required,
            seed,
        });
    }
    Ok(())
}

/// Greedy assignment of ordered groups to partitions.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn assign(groups: Vec<Group>, fractions: [f64; 3]) -> Assignment {
    let total: usize = groups.iter().map(|g| g.members.len()).sum();
    let targets = fractions.map(|f| f * total as f64);
    let mut assigned = [0usize; 3];
    let mut assignment = Assignment::default();

    for group in groups {
        let mut best: Option<(usize, f64)> = None;
        for (slot, &target) in targets.iter().enumerate() {
            if fractions[slot] <= 0.0 {
                continue;
            }
            let deficit = (target - assigned[slot] as f64) / target;
            if best.map_or(true, |(_, d)| deficit > d) {
                best = Some((slot, deficit));
            }
        }
        // Train is always positive after policy validation.
        let slot = best.map_or(0, |(slot, _)| slot);
        assigned[slot] += group.members.len();
        tracing::trace!(key = %group.key, size = group.members.len(), slot, "group assigned");
        let label = SplitLabel::ALL[slot];
        for id in group.members {
            assignment.push(label, id);
        }
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(key: &str, size: usize) -> Group {
        Group {
            key: EntityKey::new(key),
            members: (0..size).map(|i| format!("{key}{i}")).collect(),
        }
    }

    #[test]
    fn test_order_groups_descending_size() {
        let ordered = order_groups(vec![group("a", 1), group("b", 5), group("c", 3)], 9);
        let sizes: Vec<usize> = ordered.iter().map(|g| g.members.len()).collect();
        assert_eq!(sizes, vec![5, 3, 1]);
    }

    #[test]
    fn test_order_groups_ties_depend_on_seed_only() {
        let groups: Vec<Group> = (0..20).map(|i| group(&format!("k{i}"), 2)).collect();
        let first: Vec<EntityKey> = order_groups(groups.clone(), 3).into_iter().map(|g| g.key).collect();
        let again: Vec<EntityKey> = order_groups(groups, 3).into_iter().map(|g| g.key).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_assign_relative_deficit() {
        // C(5) -> train, A(3) -> test, B(2) -> test (train 1/6 below, test 1/4 below).
        let groups = vec![group("C", 5), group("A", 3), group("B", 2)];
        let assignment = assign(groups, [0.6, 0.0, 0.4]);
        assert_eq!(assignment.train.len(), 5);
        assert!(assignment.valid.is_empty());
        assert_eq!(assignment.test.len(), 5);
        assert!(assignment.train.iter().all(|id| id.starts_with('C')));
    }

    #[test]
    fn test_check_diversity() {
        let groups = vec![group("a", 4), group("b", 4)];
        assert!(check_diversity(&groups, [0.8, 0.0, 0.2], "Drug", 1).is_ok());
        let err = check_diversity(&groups, [0.7, 0.1, 0.2], "Drug", 1).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientDiversity { distinct: 2, required: 3, .. }
        ));
    }
}
