//! Combination split: joint novelty over several entity columns
//!
//! Each cold column is split on its own; a record keeps its partition only
//! when every column agrees. Disagreeing records are discarded, so realized
//! fractions can fall far below the targets.

use super::{grouped, Assignment, SplitLabel};
use crate::dataset::{Dataset, RecordId};
use crate::error::KeyDerivationError;
use crate::keyer::{ColumnKeyer, EntityKeyer};
use crate::Result;
use rustc_hash::{FxHashMap, FxHashSet};

/// Result of intersecting per-column cold splits.
#[derive(Debug, Default)]
pub(crate) struct CombinationResult {
    pub(crate) assignment: Assignment,
    pub(crate) excluded: Vec<KeyDerivationError>,
    pub(crate) discarded: Vec<RecordId>,
}

pub(crate) fn assign(
    dataset: &Dataset,
    columns: &[String],
    fractions: [f64; 3],
    seed: u64,
) -> Result<CombinationResult> {
    let mut votes: Vec<FxHashMap<RecordId, SplitLabel>> = Vec::with_capacity(columns.len());
    let mut excluded = Vec::new();
    let mut excluded_ids = FxHashSet::default();

    for column in columns {
        let keyer = ColumnKeyer::new(column.as_str());
        let (groups, failures) = grouped::group_records(dataset, |record| keyer.key(record));
        grouped::check_diversity(&groups, fractions, column, seed)?;
        for failure in failures {
            if excluded_ids.insert(failure.record_id.clone()) {
                excluded.push(failure);
            }
        }
        let column_assignment = grouped::assign(grouped::order_groups(groups, seed), fractions);
        votes.push(column_assignment.into_labels().collect());
    }

    let mut result = CombinationResult {
        excluded,
        ..CombinationResult::default()
    };
    for record in dataset {
        let id = record.id();
        if excluded_ids.contains(id) {
            continue;
        }
        let mut labels = votes.iter().filter_map(|vote| vote.get(id).copied());
        let unanimous = labels
            .next()
            .filter(|label| labels.all(|other| other == *label));
        match unanimous {
            Some(label) => result.assignment.push(label, id.to_string()),
            None => result.discarded.push(id.to_string()),
        }
    }

    for label in empty_partitions(&result.assignment, fractions) {
        tracing::warn!(
            partition = %label,
            columns = %columns.join(","),
            seed,
            discarded = result.discarded.len(),
            "combination split left a requested partition empty"
        );
    }
    Ok(result)
}

/// Partitions with a positive fraction that received no records.
pub(crate) fn empty_partitions(assignment: &Assignment, fractions: [f64; 3]) -> Vec<SplitLabel> {
    SplitLabel::ALL
        .into_iter()
        .zip(fractions)
        .zip([&assignment.train, &assignment.valid, &assignment.test])
        .filter(|((_, fraction), ids)| *fraction > 0.0 && ids.is_empty())
        .map(|((label, _), _)| label)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Label, Record};

    fn pair(id: &str, drug: &str, target: &str) -> Record {
        Record::builder(id, Label::Scalar(0.0))
            .field("Drug", drug)
            .field("Target", target)
            .build()
    }

    #[test]
    fn test_assign_keeps_only_unanimous_records() {
        // Drug: D0 {a,b,c} -> train, D1 {d} -> test.
        // Target: T0 {a,b,d} -> train, T1 {c} -> test.
        let dataset = Dataset::new(
            "pairs",
            vec![
                pair("a", "D0", "T0"),
                pair("b", "D0", "T0"),
                pair("c", "D0", "T1"),
                pair("d", "D1", "T0"),
            ],
        )
        .unwrap();
        let columns = vec!["Drug".to_string(), "Target".to_string()];
        let fractions = [0.5, 0.0, 0.5];

        let result = assign(&dataset, &columns, fractions, 3).unwrap();
        assert_eq!(result.assignment.train, vec!["a".to_string(), "b".to_string()]);
        assert!(result.assignment.test.is_empty());
        assert_eq!(result.discarded, vec!["c".to_string(), "d".to_string()]);
        assert_eq!(
            empty_partitions(&result.assignment, fractions),
            vec![SplitLabel::Test]
        );
    }

    #[test]
    fn test_empty_partitions_ignores_zero_fractions() {
        let mut assignment = Assignment::default();
        assignment.push(SplitLabel::Train, "a".to_string());
        assignment.push(SplitLabel::Test, "b".to_string());
        assert!(empty_partitions(&assignment, [0.8, 0.0, 0.2]).is_empty());
        assert_eq!(
            empty_partitions(&assignment, [0.7, 0.1, 0.2]),
            vec![SplitLabel::Valid]
        );
    }
}
