//! Leaderboard aggregation across participants
//!
//! Entries are append-only. Ordering for a benchmark:
//!
//! 1. mean, in the metric's direction ([`MetricName::higher_is_better`])
//! 2. std, lower first
//! 3. submission order
//!
//! Top-K selection keeps a bounded heap of size K instead of sorting the full
//! history.

use crate::benchmark::{AggregateScore, GroupEvaluation};
use crate::metric::MetricName;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::fmt::Write as _;

/// One participant's aggregated result on one benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Participant (team or model) name
    pub participant: String,
    /// Benchmark name
    pub benchmark: String,
    /// Metric the score was computed with
    pub metric: MetricName,
    /// Mean across seeds
    pub mean: f64,
    /// Population std across seeds
    pub std: f64,
    /// Submission time
    pub submitted_at: DateTime<Utc>,
    /// Position in the append-only history
    pub sequence: u64,
}

impl LeaderboardEntry {
    /// Rank order: `Less` means `self` ranks above `other`.
    #[must_use]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        let by_mean = if self.metric.higher_is_better() {
            other.mean.total_cmp(&self.mean)
        } else {
            self.mean.total_cmp(&other.mean)
        };
        by_mean
            .then_with(|| self.std.total_cmp(&other.std))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

// Heap item ordered by rank: the worst entry sits at the top of the max-heap
struct Ranked<'a>(&'a LeaderboardEntry);

impl PartialEq for Ranked<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked<'_> {}

impl Ord for Ranked<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(other.0)
    }
}

impl PartialOrd for Ranked<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Append-only leaderboard.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// Create an empty leaderboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the leaderboard is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry in submission order.
    #[must_use]
    pub fn history(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// Append one aggregated score.
    pub fn submit_score(
        &mut self,
        participant: impl Into<String>,
        benchmark: impl Into<String>,
        score: &AggregateScore,
    ) -> &LeaderboardEntry {
        let sequence = self.entries.len() as u64;
        self.entries.push(LeaderboardEntry {
            participant: participant.into(),
            benchmark: benchmark.into(),
            metric: score.metric,
            mean: score.mean,
            std: score.std,
            submitted_at: Utc::now(),
            sequence,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Append one entry per successfully scored benchmark of a group
    /// evaluation. Returns the number of entries added.
    pub fn submit(&mut self, participant: &str, evaluation: &GroupEvaluation) -> usize {
        for (benchmark, score) in &evaluation.scores {
            self.submit_score(participant, benchmark.as_str(), score);
        }
        if !evaluation.failures.is_empty() {
            tracing::warn!(
                participant,
                failed = ?evaluation.failures.keys().collect::<Vec<_>>(),
                "failed benchmarks are not ranked"
            );
        }
        tracing::info!(participant, entries = evaluation.scores.len(), "leaderboard submission");
        evaluation.scores.len()
    }

    /// Entries for `benchmark` in rank order.
    ///
    /// With `best_per_participant` only each participant's best entry is kept.
    #[must_use]
    pub fn ranking(&self, benchmark: &str, best_per_participant: bool) -> Vec<&LeaderboardEntry> {
        let mut ranked: Vec<&LeaderboardEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.benchmark == benchmark)
            .collect();
        ranked.sort_by(|a, b| a.rank_cmp(b));
        if best_per_participant {
            let mut seen = std::collections::BTreeSet::new();
            ranked.retain(|entry| seen.insert(entry.participant.as_str()));
        }
        ranked
    }

    /// Best `k` entries for `benchmark`, in rank order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `k` is zero.
    pub fn top_k(&self, benchmark: &str, k: usize) -> Result<Vec<&LeaderboardEntry>> {
        if k == 0 {
            return Err(Error::InvalidInput("k must be greater than 0".to_string()));
        }
        let mut heap = BinaryHeap::with_capacity(k + 1);
        for entry in self.entries.iter().filter(|entry| entry.benchmark == benchmark) {
            heap.push(Ranked(entry));
            if heap.len() > k {
                heap.pop();
            }
        }
        Ok(heap.into_sorted_vec().into_iter().map(|ranked| ranked.0).collect())
    }

    /// Mean rank of each participant across the benchmarks they entered,
    /// using each participant's best entry per benchmark. Sorted best first.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_rank(&self) -> Vec<(String, f64)> {
        let benchmarks: std::collections::BTreeSet<&str> =
            self.entries.iter().map(|entry| entry.benchmark.as_str()).collect();
        let mut ranks: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for benchmark in benchmarks {
            for (position, entry) in self.ranking(benchmark, true).into_iter().enumerate() {
                ranks.entry(entry.participant.as_str()).or_default().push(position + 1);
            }
        }
        let mut averages: Vec<(String, f64)> = ranks
            .into_iter()
            .map(|(participant, ranks)| {
                let mean = ranks.iter().sum::<usize>() as f64 / ranks.len() as f64;
                (participant.to_string(), mean)
            })
            .collect();
        averages.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        averages
    }

    /// Markdown table of the best entry per participant for `benchmark`.
    #[must_use]
    pub fn to_markdown(&self, benchmark: &str) -> String {
        let mut out = String::new();
        let ranking = self.ranking(benchmark, true);
        let metric = ranking.first().map_or("score", |entry| entry.metric.as_str());
        let _ = writeln!(out, "## {benchmark}\n");
        let _ = writeln!(out, "| Rank | Participant | {metric} | Std | Submitted |");
        let _ = writeln!(out, "|------|-------------|------|-----|-----------|");
        for (position, entry) in ranking.iter().enumerate() {
            let _ = writeln!(
                out,
                "| {} | {} | {:.3} | {:.3} | {} |",
                position + 1,
                entry.participant,
                entry.mean,
                entry.std,
                entry.submitted_at.format("%Y-%m-%d %H:%M")
            );
        }
        out
    }
}
