//! Seeded random split

use super::{Assignment, SplitLabel};
use crate::dataset::Dataset;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Stable hash of an identifier (no per-process random state).
pub(crate) fn id_hash(id: &str) -> u64 {
    let mut hasher = FxHasher::default();
    id.hash(&mut hasher);
    hasher.finish()
}

/// Number of records each partition receives out of `n`.
///
/// Test and valid sizes are rounded; train takes the rest.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(crate) fn partition_sizes(n: usize, fractions: [f64; 3]) -> [usize; 3] {
    let test = ((fractions[2] * n as f64).round() as usize).min(n);
    let valid = ((fractions[1] * n as f64).round() as usize).min(n - test);
    [n - test - valid, valid, test]
}

/// Assign every record of `dataset` with a seeded permutation.
pub(crate) fn assign(dataset: &Dataset, fractions: [f64; 3], seed: u64) -> Assignment {
    // Canonical order first so the permutation does not depend on load order.
    let mut ids: Vec<&str> = dataset.iter().map(|r| r.id()).collect();
    ids.sort_by(|a, b| id_hash(a).cmp(&id_hash(b)).then_with(|| a.cmp(b)));

    let mut rng = StdRng::seed_from_u64(seed);
    ids.shuffle(&mut rng);

    let [_, valid, test] = partition_sizes(ids.len(), fractions);
    let mut assignment = Assignment::default();
    for (position, id) in ids.into_iter().enumerate() {
        let label = if position < test {
            SplitLabel::Test
        } else if position < test + valid {
            SplitLabel::Valid
        } else {
            SplitLabel::Train
        };
        assignment.push(label, id.to_string());
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_sizes_cover_everything() {
        assert_eq!(partition_sizes(1000, [0.7, 0.1, 0.2]), [700, 100, 200]);
        assert_eq!(partition_sizes(10, [0.6, 0.0, 0.4]), [6, 0, 4]);
        let sizes = partition_sizes(7, [0.34, 0.33, 0.33]);
        assert_eq!(sizes.iter().sum::<usize>(), 7);
    }

    #[test]
    fn test_id_hash_is_stable() {
        assert_eq!(id_hash("CHEMBL25"), id_hash("CHEMBL25"));
        assert_ne!(id_hash("CHEMBL25"), id_hash("CHEMBL26"));
    }
}
