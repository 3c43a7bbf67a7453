//! Per-group result cache keyed by (benchmark, seed).
//!
//! The check and the insert happen under one `DashMap` shard lock, so two
//! concurrent submissions for the same key cannot both commit under
//! [`ResubmissionPolicy::Reject`].

use super::record::ScoreRecord;
use crate::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// What happens when a (benchmark, seed) that already holds a score is
/// submitted again with different predictions.
///
/// Identical resubmissions always return the cached record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResubmissionPolicy {
    /// Fail with [`Error::AlreadyScored`]
    #[default]
    Reject,
    /// Append to the score history; aggregation uses the latest record
    Append,
}

/// Result of a cache lookup before scoring.
#[derive(Debug)]
pub(crate) enum Lookup {
    /// Nothing committed yet, or a different submission `Append` will accept
    Score,
    /// Same predictions as the latest committed record
    Cached(ScoreRecord),
}

/// Committed score records.
#[derive(Debug, Default)]
pub(crate) struct ResultCache {
    entries: DashMap<(String, u64), Vec<ScoreRecord>>,
}

impl ResultCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Decide whether a submission needs scoring. Avoids scoring work for
    /// submissions that are cached or will be rejected anyway.
    pub(crate) fn lookup(
        &self,
        benchmark: &str,
        seed: u64,
        digest: u64,
        policy: ResubmissionPolicy,
    ) -> Result<Lookup> {
        let Some(history) = self.entries.get(&(benchmark.to_string(), seed)) else {
            return Ok(Lookup::Score);
        };
        match history.last() {
            Some(latest) if latest.digest() == digest => Ok(Lookup::Cached(latest.clone())),
            Some(_) if policy == ResubmissionPolicy::Reject => Err(Error::AlreadyScored {
                benchmark: benchmark.to_string(),
                seed,
            }),
            _ => Ok(Lookup::Score),
        }
    }

    /// Commit a freshly scored record.
    ///
    /// Returns the record that now stands for the key: `record` itself, or the
    /// cached one if an identical submission committed first.
    pub(crate) fn commit(&self, record: ScoreRecord, policy: ResubmissionPolicy) -> Result<ScoreRecord> {
        let key = (record.benchmark().to_string(), record.seed());
        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(vec![record.clone()]);
                Ok(record)
            }
            Entry::Occupied(mut slot) => {
                let history = slot.get_mut();
                if let Some(latest) = history.last() {
                    if latest.digest() == record.digest() {
                        return Ok(latest.clone());
                    }
                    if policy == ResubmissionPolicy::Reject {
                        return Err(Error::AlreadyScored {
                            benchmark: record.benchmark().to_string(),
                            seed: record.seed(),
                        });
                    }
                }
                history.push(record.clone());
                Ok(record)
            }
        }
    }

    /// All committed records for a key, oldest first.
    pub(crate) fn history(&self, benchmark: &str, seed: u64) -> Vec<ScoreRecord> {
        self.entries
            .get(&(benchmark.to_string(), seed))
            .map(|history| history.value().clone())
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
