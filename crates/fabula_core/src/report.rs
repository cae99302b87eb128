//! Batch results and the aggregated range job summary.

use crate::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An inclusive range of natural indices.
///
/// # Examples
///
/// ```
/// use fabula_core::IndexRange;
///
/// let range = IndexRange::new(1, 45);
/// assert_eq!(range.len(), 45);
/// assert!(range.contains(45));
/// assert!(!range.contains(46));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRange {
    /// First index, inclusive
    pub start: u32,
    /// Last index, inclusive
    pub end: u32,
}

impl IndexRange {
    /// Create a new inclusive range.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Number of indices covered.
    pub fn len(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// Whether the range covers no indices.
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Whether `index` falls inside the range.
    pub fn contains(&self, index: u32) -> bool {
        index >= self.start && index <= self.end
    }
}

impl std::fmt::Display for IndexRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Outcome of one batch within a range job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Sub-range this batch covered
    pub range: IndexRange,
    /// Records inserted by the persister
    pub inserted: usize,
    /// Records skipped because a stronger stored record already existed
    pub skipped: usize,
    /// Whether escalation exhausted its options and an empty/partial set
    /// was accepted
    pub degraded: bool,
    /// Shrink-and-retry attempts consumed by this batch
    pub retries: u32,
}

/// Aggregated outcome of a full range job.
///
/// The caller always receives this best-effort accounting; a degraded or
/// partially-failed job is reported as such, never as a silent success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RangeJobSummary {
    /// The range the job actually attempted
    pub effective_range: Option<IndexRange>,
    /// Per-batch results in processing order
    pub batches: Vec<BatchResult>,
    /// Batches the planner intended to run
    pub planned_batches: usize,
    /// Batches that completed (possibly degraded)
    pub success_batches: usize,
    /// First unprocessed sub-range after a non-timeout failure
    pub failed_range: Option<IndexRange>,
    /// Total shrink-and-retry attempts across the job
    pub retry_count: u32,
    /// Whether any batch accepted a degraded result
    pub degraded: bool,
    /// Inserted record counts keyed by entity kind
    pub inserted_by_kind: BTreeMap<EntityKind, usize>,
    /// Skipped record counts keyed by entity kind
    pub skipped_by_kind: BTreeMap<EntityKind, usize>,
}

impl RangeJobSummary {
    /// Fold one batch result into the aggregate counters.
    pub fn absorb(&mut self, kind: EntityKind, batch: BatchResult) {
        self.retry_count += batch.retries;
        self.degraded |= batch.degraded;
        *self.inserted_by_kind.entry(kind).or_default() += batch.inserted;
        *self.skipped_by_kind.entry(kind).or_default() += batch.skipped;
        self.success_batches += 1;
        self.batches.push(batch);
    }

    /// Total records inserted across all kinds.
    pub fn total_inserted(&self) -> usize {
        self.inserted_by_kind.values().sum()
    }
}
