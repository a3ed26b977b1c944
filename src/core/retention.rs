// logtrim - core/retention.rs
//
// Age-based retention filter for parsed log entries.
// Core layer: pure logic. The reference instant is always a parameter, so
// the same inputs always select the same entries.

use crate::core::model::{FailMode, LogEntry};
use crate::util::constants;
use chrono::{DateTime, Duration, Utc};

/// Retention settings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum age of a kept entry, in days of 24 hours.
    pub retention_days: u32,

    /// What happens to entries whose age is unknown.
    pub mode: FailMode,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            retention_days: constants::DEFAULT_RETENTION_DAYS,
            mode: FailMode::default(),
        }
    }
}

impl RetentionPolicy {
    pub fn new(retention_days: u32, mode: FailMode) -> Self {
        Self {
            retention_days,
            mode,
        }
    }

    /// Oldest instant that is still retained: `now - retention_days`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(Duration::days(i64::from(self.retention_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether `entry` survives against `cutoff`.
    ///
    /// The lower bound is inclusive: an entry stamped exactly at the cutoff
    /// is kept.
    pub fn retains(&self, entry: &LogEntry, cutoff: DateTime<Utc>) -> bool {
        match entry.timestamp {
            Some(ts) => ts >= cutoff,
            None => self.mode == FailMode::FailSafe,
        }
    }
}

/// Which entries a retention pass keeps, plus the counts the summary needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionOutcome {
    /// The cutoff the entries were compared against.
    pub cutoff: DateTime<Utc>,

    /// Indices (into the input slice, ascending) of entries to keep.
    pub kept: Vec<usize>,

    /// Number of entries removed.
    pub dropped: usize,

    /// Physical lines in kept entries.
    pub lines_kept: usize,

    /// Physical lines in dropped entries.
    pub lines_dropped: usize,
}

impl RetentionOutcome {
    pub fn has_drops(&self) -> bool {
        self.dropped > 0
    }
}

/// Apply the retention window to `entries` relative to `now`.
///
/// Returns indices of surviving entries in original order. Returning indices
/// rather than clones keeps entry text in one place until it is rendered.
/// Entries are judged independently; the input need not be sorted.
pub fn apply_retention(
    entries: &[LogEntry],
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> RetentionOutcome {
    let cutoff = policy.cutoff(now);

    let mut kept = Vec::with_capacity(entries.len());
    let mut dropped = 0;
    let mut lines_kept = 0;
    let mut lines_dropped = 0;

    for (idx, entry) in entries.iter().enumerate() {
        if policy.retains(entry, cutoff) {
            kept.push(idx);
            lines_kept += entry.line_count();
        } else {
            tracing::trace!(
                line_number = entry.line_number,
                first_line = entry.first_line(),
                "Entry dropped"
            );
            dropped += 1;
            lines_dropped += entry.line_count();
        }
    }

    tracing::debug!(
        cutoff = %cutoff,
        mode = policy.mode.label(),
        kept = kept.len(),
        dropped,
        "Retention applied"
    );

    RetentionOutcome {
        cutoff,
        kept,
        dropped,
        lines_kept,
        lines_dropped,
    }
}
