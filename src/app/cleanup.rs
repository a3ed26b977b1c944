// logtrim - app/cleanup.rs
//
// One cleanup run against one log file: lock, read, parse, filter, rewrite.
//
// Architecture:
//   - Core does the thinking (parse, retention, render) on in-memory text.
//   - Platform does the I/O (lock file, strict read, atomic replace).
//   - This module sequences them and owns the failure semantics: every
//     error path returns before the rename, so the original is either
//     fully replaced or untouched.
//
// Ordering matters:
//   1. A missing file is detected before locking so `allow_missing` never
//      litters a directory with lock files.
//   2. The lock is taken before the read so the content we filter is the
//      content we replace.
//   3. The file is only replaced when something was dropped.

use crate::core::format::EntryFormat;
use crate::core::model::{CleanupSummary, LogEntry};
use crate::core::parser::{self, ParseConfig};
use crate::core::render;
use crate::core::retention::{self, RetentionPolicy};
use crate::platform::fs as pfs;
use crate::platform::lock::{self, LockGuard};
use crate::util::constants;
use crate::util::error::CleanupError;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of one cleanup run.
pub type CleanupResult = Result<CleanupSummary, CleanupError>;

/// Everything a cleanup run needs to know.
#[derive(Debug, Clone)]
pub struct CleanupRequest {
    /// Log file to clean.
    pub path: PathBuf,

    /// Retention window and undated-entry mode.
    pub policy: RetentionPolicy,

    /// How entries are recognised and dated.
    pub format: EntryFormat,

    /// Parser limits.
    pub parse: ParseConfig,

    /// Compute the summary without taking the lock or writing.
    pub dry_run: bool,

    /// A missing file is a successful no-op instead of `InputUnreadable`.
    pub allow_missing: bool,

    /// Lock files older than this are considered abandoned.
    pub stale_lock_after: Duration,
}

impl CleanupRequest {
    /// A request with default format, fail-safe mode and locking enabled.
    pub fn new(path: impl Into<PathBuf>, retention_days: u32) -> Self {
        Self {
            path: path.into(),
            policy: RetentionPolicy::new(retention_days, Default::default()),
            format: EntryFormat::default(),
            parse: ParseConfig::default(),
            dry_run: false,
            allow_missing: false,
            stale_lock_after: Duration::from_secs(constants::DEFAULT_STALE_LOCK_SECS),
        }
    }
}

/// Remove entries older than `retention_days` from `log_path`.
///
/// Uses the built-in Python `logging` entry format with naive timestamps in
/// host local time, fail-safe handling of undated entries, and lock-file
/// serialisation. `now` is the reference instant; pass `Utc::now()` in
/// production.
pub fn run_cleanup(log_path: &Path, retention_days: u32, now: DateTime<Utc>) -> CleanupResult {
    run_cleanup_with(&CleanupRequest::new(log_path, retention_days), now)
}

/// Run a cleanup with an explicit option set.
pub fn run_cleanup_with(request: &CleanupRequest, now: DateTime<Utc>) -> CleanupResult {
    let path = request.path.as_path();
    let cutoff = request.policy.cutoff(now);
    let mut summary = CleanupSummary::empty(
        path.to_path_buf(),
        cutoff,
        request.policy.retention_days,
        request.policy.mode,
    );
    summary.dry_run = request.dry_run;

    tracing::debug!(
        path = %path.display(),
        now = %now,
        cutoff = %cutoff,
        retention_days = request.policy.retention_days,
        mode = request.policy.mode.label(),
        dry_run = request.dry_run,
        "Cleanup starting"
    );

    match std::fs::metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound && request.allow_missing => {
            tracing::info!(path = %path.display(), "Log file not found; nothing to clean");
            summary.missing = true;
            return Ok(summary);
        }
        Err(e) => {
            return Err(CleanupError::InputUnreadable {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }

    let _lock: Option<LockGuard> = if request.dry_run {
        None
    } else {
        Some(LockGuard::acquire(
            &lock::lock_path_for(path),
            request.stale_lock_after,
        )?)
    };

    let content = pfs::read_log_file(path).map_err(|e| CleanupError::InputUnreadable {
        path: path.to_path_buf(),
        source: e,
    })?;

    let parsed = parser::parse_content(&content, path, &request.format, &request.parse);
    if parsed.unparseable > 0 {
        tracing::warn!(
            path = %path.display(),
            unparseable = parsed.unparseable,
            mode = request.policy.mode.label(),
            "Entries with unknown age found"
        );
    }
    for err in &parsed.errors {
        tracing::debug!(error = %err, "Timestamp diagnostic");
    }

    let outcome = retention::apply_retention(&parsed.entries, &request.policy, now);

    summary.entries_read = parsed.entries.len();
    summary.entries_kept = outcome.kept.len();
    summary.entries_dropped = outcome.dropped;
    summary.unparseable = parsed.unparseable;
    summary.lines_kept = outcome.lines_kept;
    summary.lines_dropped = outcome.lines_dropped;

    if outcome.has_drops() && !request.dry_run {
        write_back(path, &parsed.entries, &outcome.kept, content.len() as u64)?;
        summary.rewritten = true;
    }

    tracing::info!(
        path = %path.display(),
        read = summary.entries_read,
        kept = summary.entries_kept,
        dropped = summary.entries_dropped,
        unparseable = summary.unparseable,
        lines_dropped = summary.lines_dropped,
        rewritten = summary.rewritten,
        dry_run = summary.dry_run,
        "Cleanup complete"
    );

    Ok(summary)
}

/// Replace `path` with the kept entries followed by anything appended after
/// the first `read_len` bytes were read.
fn write_back(
    path: &Path,
    entries: &[LogEntry],
    kept: &[usize],
    read_len: u64,
) -> Result<u64, CleanupError> {
    pfs::replace_atomically(path, |w| {
        let kept_bytes = render::render_entries(entries, kept, w)?;
        let tail_bytes = copy_appended_tail(path, read_len, w)?;
        if tail_bytes > 0 {
            tracing::info!(
                path = %path.display(),
                bytes = tail_bytes,
                "Carried over lines appended during cleanup"
            );
        }
        Ok(kept_bytes + tail_bytes)
    })
    .map_err(|e| CleanupError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Copy bytes written to `path` past `offset` since it was read.
///
/// The lock only serialises cleanup runs; the service keeps appending while
/// we filter. Whatever it wrote after our read is newer than anything we
/// kept, so it goes verbatim at the end. A file that shrank (rotated or
/// truncated by someone else) contributes nothing.
fn copy_appended_tail<W: Write>(path: &Path, offset: u64, writer: &mut W) -> io::Result<u64> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len <= offset {
        return Ok(0);
    }
    file.seek(SeekFrom::Start(offset))?;
    io::copy(&mut file.take(len - offset), writer)
}
