// logtrim - core/format.rs
//
// Entry format compilation and validation.
// Core layer: accepts pattern strings, never touches the filesystem.
//
// An entry format answers two questions for the parser: "does this line
// start a new entry?" (the boundary regex) and "when was it written?" (the
// `timestamp` capture, the chrono format, and the zone naive times are in).

use crate::util::constants;
use crate::util::error::FormatError;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

// =============================================================================
// Timezone of naive timestamps
// =============================================================================

/// Zone in which timestamps without an explicit offset are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampZone {
    /// Host local time. Python's `logging` writes wall-clock local time.
    #[default]
    Local,

    /// Naive timestamps are already UTC.
    Utc,
}

impl TimestampZone {
    /// Convert a naive wall-clock time in this zone to UTC.
    ///
    /// For `Local`, a time repeated by a DST fall-back takes the earlier
    /// reading; a time skipped by a spring-forward gap is read one hour
    /// later, past the gap, so the entry keeps the zone's offset.
    pub fn to_utc(self, ndt: NaiveDateTime) -> DateTime<Utc> {
        match self {
            TimestampZone::Utc => ndt.and_utc(),
            TimestampZone::Local => resolve_wall_clock(ndt, |t| {
                Local
                    .from_local_datetime(t)
                    .map(|dt| dt.with_timezone(&Utc))
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimestampZone::Local => "local",
            TimestampZone::Utc => "utc",
        }
    }
}

/// Resolve a wall-clock time through `lookup`, handling DST folds and gaps.
fn resolve_wall_clock<F>(ndt: NaiveDateTime, lookup: F) -> DateTime<Utc>
where
    F: Fn(&NaiveDateTime) -> LocalResult<DateTime<Utc>>,
{
    match lookup(&ndt) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => lookup(&(ndt + Duration::hours(1)))
            .earliest()
            .map(|dt| dt - Duration::hours(1))
            .unwrap_or_else(|| ndt.and_utc()),
    }
}

impl FromStr for TimestampZone {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(TimestampZone::Local),
            "utc" | "z" => Ok(TimestampZone::Utc),
            _ => Err(FormatError::UnknownTimezone {
                value: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// Entry format (runtime representation)
// =============================================================================

/// Compiled entry format used by the parser at run time.
#[derive(Debug, Clone)]
pub struct EntryFormat {
    /// Boundary regex. A line matching it starts a new entry; the named
    /// `timestamp` group holds the text handed to the chrono parser.
    pub line_pattern: Regex,

    /// chrono format string for the `timestamp` capture.
    pub timestamp_format: String,

    /// Zone for naive timestamps.
    pub zone: TimestampZone,
}

impl EntryFormat {
    /// Validate and compile an entry format.
    ///
    /// Validates:
    /// - the boundary regex compiles, is within the length limit, and has a
    ///   named `timestamp` group
    /// - the chrono format is well-formed and includes a year, since a
    ///   year-less timestamp cannot be aged reliably
    pub fn compile(
        line_pattern: &str,
        timestamp_format: &str,
        zone: TimestampZone,
    ) -> Result<Self, FormatError> {
        let line_pattern = compile_regex("format.line_pattern", line_pattern)?;

        if !line_pattern
            .capture_names()
            .flatten()
            .any(|name| name == "timestamp")
        {
            return Err(FormatError::MissingTimestampGroup {
                pattern: line_pattern.as_str().to_string(),
            });
        }

        validate_timestamp_format(timestamp_format)?;

        tracing::debug!(
            pattern = line_pattern.as_str(),
            format = timestamp_format,
            zone = zone.label(),
            "Entry format compiled"
        );

        Ok(Self {
            line_pattern,
            timestamp_format: timestamp_format.to_string(),
            zone,
        })
    }

    /// The built-in format: Python `logging` text output
    /// (`2024-01-15 14:30:22 - name - LEVEL - message`) in the given zone.
    pub fn python_logging(zone: TimestampZone) -> Self {
        static DEFAULT_PATTERN: OnceLock<Regex> = OnceLock::new();
        let line_pattern = DEFAULT_PATTERN
            .get_or_init(|| {
                Regex::new(constants::DEFAULT_LINE_PATTERN).expect("built-in line pattern is valid")
            })
            .clone();
        Self {
            line_pattern,
            timestamp_format: constants::DEFAULT_TIMESTAMP_FORMAT.to_string(),
            zone,
        }
    }

    /// Returns the raw `timestamp` capture if `line` starts a new entry.
    ///
    /// `Some("")` never happens: a boundary match without a non-empty
    /// timestamp capture is not treated as a boundary.
    pub fn boundary_timestamp<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.line_pattern
            .captures(line)
            .and_then(|caps| caps.name("timestamp"))
            .map(|m| m.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

impl Default for EntryFormat {
    fn default() -> Self {
        Self::python_logging(TimestampZone::default())
    }
}

/// Compile a regex pattern with length validation to prevent ReDoS.
fn compile_regex(field: &'static str, pattern: &str) -> Result<Regex, FormatError> {
    if pattern.len() > constants::MAX_REGEX_PATTERN_LENGTH {
        return Err(FormatError::RegexTooLong {
            field,
            length: pattern.len(),
            max_length: constants::MAX_REGEX_PATTERN_LENGTH,
        });
    }

    Regex::new(pattern).map_err(|e| FormatError::InvalidRegex {
        field,
        pattern: pattern.to_string(),
        source: e,
    })
}

/// Reject empty, malformed, or year-less chrono formats.
fn validate_timestamp_format(format: &str) -> Result<(), FormatError> {
    if format.trim().is_empty() {
        return Err(FormatError::InvalidTimestampFormat {
            format: format.to_string(),
            reason: "format is empty".to_string(),
        });
    }

    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(FormatError::InvalidTimestampFormat {
            format: format.to_string(),
            reason: "unrecognised strftime specifier".to_string(),
        });
    }

    let has_year = ["%Y", "%y", "%G", "%g", "%C", "%s", "%+", "%F", "%D", "%c"]
        .iter()
        .any(|specifier| format.contains(specifier));
    if !has_year {
        return Err(FormatError::InvalidTimestampFormat {
            format: format.to_string(),
            reason: "format has no year; entry age would be ambiguous".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Wall clock at UTC+1 that jumps 02:00 → 03:00 (UTC+2) on 2024-03-31.
    fn central_europe_spring(t: &NaiveDateTime) -> LocalResult<DateTime<Utc>> {
        let day = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let gap_start = day.and_hms_opt(2, 0, 0).unwrap();
        let gap_end = day.and_hms_opt(3, 0, 0).unwrap();
        if *t < gap_start {
            LocalResult::Single((*t - Duration::hours(1)).and_utc())
        } else if *t < gap_end {
            LocalResult::None
        } else {
            LocalResult::Single((*t - Duration::hours(2)).and_utc())
        }
    }

    #[test]
    fn test_time_in_dst_gap_keeps_zone_offset() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let in_gap = day.and_hms_opt(2, 30, 0).unwrap();
        let resolved = resolve_wall_clock(in_gap, central_europe_spring);
        // 02:30 is read as 03:30 CEST (01:30 UTC) and moved back across the
        // gap, so the result stays within an hour of the true instant instead
        // of being off by the whole zone offset.
        assert_eq!(resolved, day.and_hms_opt(0, 30, 0).unwrap().and_utc());

        let before = day.and_hms_opt(1, 59, 0).unwrap();
        assert_eq!(
            resolve_wall_clock(before, central_europe_spring),
            day.and_hms_opt(0, 59, 0).unwrap().and_utc()
        );
    }

    #[test]
    fn test_ambiguous_time_takes_earlier_reading() {
        let t = NaiveDate::from_ymd_opt(2024, 10, 27)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let early = t.and_utc() - Duration::hours(2);
        let late = t.and_utc() - Duration::hours(1);
        assert_eq!(
            resolve_wall_clock(t, |_| LocalResult::Ambiguous(early, late)),
            early
        );
    }

    #[test]
    fn test_default_format_detects_python_logging_lines() {
        let fmt = EntryFormat::python_logging(TimestampZone::Utc);
        assert_eq!(
            fmt.boundary_timestamp("2024-01-15 14:30:22 - product - INFO - started"),
            Some("2024-01-15 14:30:22")
        );
        assert_eq!(
            fmt.boundary_timestamp("2024-01-15 14:30:22,123 - product - INFO - started"),
            Some("2024-01-15 14:30:22,123")
        );
        assert_eq!(fmt.boundary_timestamp("Traceback (most recent call last):"), None);
        assert_eq!(fmt.boundary_timestamp("  File \"main.py\", line 3"), None);
        // Digits alone are not enough to start an entry.
        assert_eq!(fmt.boundary_timestamp("404 not found"), None);
    }

    #[test]
    fn test_compile_custom_format() {
        let fmt = EntryFormat::compile(
            r"^\[(?P<timestamp>[^\]]+)\]",
            "%d/%m/%Y %H:%M:%S",
            TimestampZone::Utc,
        )
        .unwrap();
        assert_eq!(
            fmt.boundary_timestamp("[15/01/2024 14:30:22] hello"),
            Some("15/01/2024 14:30:22")
        );
    }

    #[test]
    fn test_compile_rejects_missing_timestamp_group() {
        let result = EntryFormat::compile(r"^\d{4}-\d{2}-\d{2}", "%Y-%m-%d", TimestampZone::Utc);
        assert!(matches!(
            result,
            Err(FormatError::MissingTimestampGroup { .. })
        ));
    }

    #[test]
    fn test_compile_rejects_invalid_regex() {
        let result = EntryFormat::compile("(?P<timestamp>[", "%Y", TimestampZone::Utc);
        assert!(matches!(result, Err(FormatError::InvalidRegex { .. })));
    }

    #[test]
    fn test_compile_rejects_overlong_regex() {
        let pattern = format!(
            "(?P<timestamp>{})",
            "a".repeat(constants::MAX_REGEX_PATTERN_LENGTH)
        );
        let result = EntryFormat::compile(&pattern, "%Y", TimestampZone::Utc);
        assert!(matches!(result, Err(FormatError::RegexTooLong { .. })));
    }

    #[test]
    fn test_compile_rejects_yearless_format() {
        let result = EntryFormat::compile(
            r"^(?P<timestamp>\w{3} \d{2} \d{2}:\d{2}:\d{2})",
            "%b %d %H:%M:%S",
            TimestampZone::Utc,
        );
        assert!(matches!(
            result,
            Err(FormatError::InvalidTimestampFormat { .. })
        ));
    }

    #[test]
    fn test_compile_rejects_malformed_strftime() {
        let result = EntryFormat::compile(r"^(?P<timestamp>\S+)", "%Y-%Q", TimestampZone::Utc);
        assert!(matches!(
            result,
            Err(FormatError::InvalidTimestampFormat { .. })
        ));
    }

    #[test]
    fn test_timezone_from_str() {
        assert_eq!("local".parse::<TimestampZone>().unwrap(), TimestampZone::Local);
        assert_eq!("UTC".parse::<TimestampZone>().unwrap(), TimestampZone::Utc);
        assert!(matches!(
            "Mars/Olympus".parse::<TimestampZone>(),
            Err(FormatError::UnknownTimezone { .. })
        ));
    }

    #[test]
    fn test_utc_zone_is_identity() {
        let ndt = NaiveDateTime::parse_from_str("2024-01-15 14:30:22", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(TimestampZone::Utc.to_utc(ndt), ndt.and_utc());
    }
}
