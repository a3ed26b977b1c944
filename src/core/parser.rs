// logtrim - core/parser.rs
//
// Groups raw log text into multi-line entries and parses their timestamps.
// Core layer: accepts file content as a string, never touches the filesystem.

use crate::core::format::{EntryFormat, TimestampZone};
use crate::core::model::{EntryKind, LogEntry};
use crate::util::constants;
use crate::util::error::ParseError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::path::Path;

/// Configuration for parsing operations.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    pub max_parse_errors_per_file: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_parse_errors_per_file: constants::MAX_PARSE_ERRORS_PER_FILE,
        }
    }
}

/// Result of parsing a single log file.
#[derive(Debug)]
pub struct ParseResult {
    /// Entries in file order. Concatenating their lines reproduces the input.
    pub entries: Vec<LogEntry>,
    /// Timestamp diagnostics (capped at max_parse_errors_per_file).
    pub errors: Vec<ParseError>,
    /// Entries with no determinable timestamp, preamble included. Not capped.
    pub unparseable: usize,
    /// Total physical lines processed.
    pub lines_processed: u64,
}

/// Split `content` into log entries.
///
/// A line for which the format's boundary regex yields a `timestamp`
/// capture starts a new entry; every following line that does not is
/// appended to it. Lines before the first boundary form one `Preamble`
/// entry. Empty or whitespace-only content yields no entries.
///
/// A boundary line whose timestamp fails to parse still starts an entry
/// (with `timestamp: None`) so grouping never depends on date validity.
///
/// # Arguments
/// * `content` - File content as a string (the app layer handles reading)
/// * `file_path` - Path to the source file (for diagnostics only)
/// * `format` - Compiled entry format
/// * `config` - Parsing limits
pub fn parse_content(
    content: &str,
    file_path: &Path,
    format: &EntryFormat,
    config: &ParseConfig,
) -> ParseResult {
    let mut entries: Vec<LogEntry> = Vec::new();
    let mut errors = Vec::new();
    let mut lines_processed: u64 = 0;

    if content.trim().is_empty() {
        tracing::debug!(file = %file_path.display(), "Content is empty; no entries");
        return ParseResult {
            entries,
            errors,
            unparseable: 0,
            lines_processed: content.split_inclusive('\n').count() as u64,
        };
    }

    for (line_idx, line) in content.split_inclusive('\n').enumerate() {
        lines_processed += 1;
        let line_number = (line_idx as u64) + 1;
        let bare = line.trim_end_matches(['\n', '\r']);

        if let Some(raw_ts) = format.boundary_timestamp(bare) {
            let timestamp =
                match parse_timestamp(raw_ts, &format.timestamp_format, format.zone) {
                    Ok(ts) => Some(ts),
                    Err(reason) => {
                        tracing::debug!(
                            file = %file_path.display(),
                            line_number,
                            reason = %reason,
                            "Unparseable timestamp; entry age unknown"
                        );
                        if errors.len() < config.max_parse_errors_per_file {
                            errors.push(ParseError::TimestampParse {
                                file: file_path.to_path_buf(),
                                line_number,
                                raw_timestamp: raw_ts.to_string(),
                                format: format.timestamp_format.clone(),
                            });
                        }
                        None
                    }
                };

            entries.push(LogEntry {
                line_number,
                kind: EntryKind::Timestamped,
                timestamp,
                lines: vec![line.to_string()],
            });
        } else if let Some(last) = entries.last_mut() {
            last.lines.push(line.to_string());
        } else {
            tracing::debug!(
                file = %file_path.display(),
                preview = %preview(bare),
                "File does not start with a timestamped line; grouping preamble"
            );
            entries.push(LogEntry {
                line_number,
                kind: EntryKind::Preamble,
                timestamp: None,
                lines: vec![line.to_string()],
            });
        }
    }

    let unparseable = entries.iter().filter(|e| e.is_undated()).count();

    tracing::debug!(
        file = %file_path.display(),
        entries = entries.len(),
        unparseable,
        lines = lines_processed,
        "Parsing complete"
    );

    ParseResult {
        entries,
        errors,
        unparseable,
        lines_processed,
    }
}

/// Truncate a line for debug output.
fn preview(line: &str) -> &str {
    match line.char_indices().nth(constants::DEBUG_MAX_LINE_PREVIEW) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

// =============================================================================
// Timestamp parsing
// =============================================================================

/// Parse a raw timestamp string using a chrono format string.
///
/// Attempts multiple parse strategies in order so that common real-world
/// timestamp variations succeed even when the format string is not an exact
/// match.
///
/// Strategy:
///   1. Direct `NaiveDateTime` parse with the given format.
///   2. `NaiveDate`-only parse (date-only formats such as `%Y-%m-%d`),
///      treated as midnight.
///   3. RFC 3339 / ISO 8601 with an explicit offset. The offset wins over
///      the configured zone.
///   4. Normalised separators: `/`→`-`, `T`→` `, `,`→`.`, then retry 1–2.
///   5. Fractional seconds stripped (`14:30:22,123` → `14:30:22`) when the
///      format does not ask for them, then retry 1–2.
///
/// Naive results are converted to UTC through `zone`.
/// Returns `Ok(DateTime<Utc>)` on success, or `Err(description)` on failure.
pub fn parse_timestamp(
    raw: &str,
    format: &str,
    zone: TimestampZone,
) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();

    if let Some(ndt) = parse_naive(trimmed, format) {
        return Ok(zone.to_utc(ndt));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let normalised = trimmed.replace('/', "-").replace('T', " ").replace(',', ".");
    if normalised != trimmed {
        if let Some(ndt) = parse_naive(&normalised, format) {
            return Ok(zone.to_utc(ndt));
        }
    }

    if let Some(stripped) = strip_fraction(&normalised) {
        if let Some(ndt) = parse_naive(stripped, format) {
            return Ok(zone.to_utc(ndt));
        }
    }

    Err(format!("cannot parse '{trimmed}' with format '{format}'"))
}

fn parse_naive(s: &str, format: &str) -> Option<NaiveDateTime> {
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
        return Some(ndt);
    }
    NaiveDate::parse_from_str(s, format)
        .ok()
        .and_then(|nd| nd.and_hms_opt(0, 0, 0))
}

/// `"2024-01-15 14:30:22.123"` → `Some("2024-01-15 14:30:22")`.
fn strip_fraction(s: &str) -> Option<&str> {
    let dot = s.rfind('.')?;
    let digits = &s[dot + 1..];
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(&s[..dot])
    } else {
        None
    }
}
