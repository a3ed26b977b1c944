// logtrim - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

// =============================================================================
// Log Entry (one logical event, possibly spanning several lines)
// =============================================================================

/// How an entry came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Starts on a line matching the entry-boundary pattern.
    Timestamped,

    /// Synthetic entry holding lines that appear before the first boundary
    /// line (e.g. a header written by hand or a truncated record).
    Preamble,
}

/// A contiguous block of lines belonging to one logical log event.
///
/// The first line carries the timestamp; every following line is a
/// continuation (stack-trace frames, wrapped messages, trailing blanks).
/// Lines keep their original terminators so the entry can be written back
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// 1-based line number of the entry's first line in the source file.
    pub line_number: u64,

    /// Whether this is a real entry or the leading preamble.
    pub kind: EntryKind,

    /// Instant parsed from the first line. `None` for the preamble and for
    /// boundary lines whose timestamp could not be parsed.
    pub timestamp: Option<DateTime<Utc>>,

    /// Raw lines including their `\n` / `\r\n` terminators. The last line of
    /// a file may have no terminator.
    pub lines: Vec<String>,
}

impl LogEntry {
    /// Number of physical lines in this entry.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// First line without its terminator.
    pub fn first_line(&self) -> &str {
        self.lines
            .first()
            .map(|l| l.trim_end_matches(['\n', '\r']))
            .unwrap_or("")
    }

    /// True when the entry's age cannot be determined.
    pub fn is_undated(&self) -> bool {
        self.timestamp.is_none()
    }

    /// The entry's exact original text.
    pub fn text(&self) -> String {
        self.lines.concat()
    }
}

// =============================================================================
// Failure mode for undated entries
// =============================================================================

/// What the retention filter does with entries whose age is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailMode {
    /// Keep undated entries. Unknown age is never treated as old.
    #[default]
    FailSafe,

    /// Drop undated entries along with expired ones.
    Strict,
}

impl FailMode {
    /// Label used in log output and JSON summaries.
    pub fn label(&self) -> &'static str {
        match self {
            FailMode::FailSafe => "fail-safe",
            FailMode::Strict => "strict",
        }
    }
}

// =============================================================================
// Cleanup summary
// =============================================================================

/// Outcome of one successful cleanup run against one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    /// File that was processed.
    pub path: PathBuf,

    /// Entries older than this instant were eligible for removal.
    pub cutoff: DateTime<Utc>,

    /// Retention window used for this run.
    pub retention_days: u32,

    /// Undated-entry policy used for this run.
    pub mode: FailMode,

    /// Entries parsed from the file (preamble included).
    pub entries_read: usize,

    /// Entries written back.
    pub entries_kept: usize,

    /// Entries removed.
    pub entries_dropped: usize,

    /// Entries whose timestamp could not be determined (preamble included).
    pub unparseable: usize,

    /// Physical lines written back.
    pub lines_kept: usize,

    /// Physical lines removed.
    pub lines_dropped: usize,

    /// Whether the file was actually replaced on disk.
    pub rewritten: bool,

    /// Whether this was a dry run (nothing written, no lock taken).
    pub dry_run: bool,

    /// The file did not exist and missing files were allowed.
    pub missing: bool,
}

impl CleanupSummary {
    /// An all-zero summary for `path` (empty or missing file).
    pub fn empty(path: PathBuf, cutoff: DateTime<Utc>, retention_days: u32, mode: FailMode) -> Self {
        Self {
            path,
            cutoff,
            retention_days,
            mode,
            entries_read: 0,
            entries_kept: 0,
            entries_dropped: 0,
            unparseable: 0,
            lines_kept: 0,
            lines_dropped: 0,
            rewritten: false,
            dry_run: false,
            missing: false,
        }
    }
}
