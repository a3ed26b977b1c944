// logtrim - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation between layers.
// All errors preserve the causal chain for diagnostic logging, and every
// top-level error maps onto a documented process exit code.

use crate::util::constants;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all logtrim operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogTrimError {
    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// The entry format (boundary regex, timestamp format) is invalid.
    Format(FormatError),

    /// Directory sweep failed.
    Discovery(DiscoveryError),

    /// A cleanup run failed.
    Cleanup(CleanupError),
}

impl LogTrimError {
    /// Process exit code reported to the scheduler for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Format(_) => constants::EXIT_CONFIG,
            Self::Discovery(_) => constants::EXIT_FAILURE,
            Self::Cleanup(e) => e.exit_code(),
        }
    }
}

impl fmt::Display for LogTrimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Format(e) => write!(f, "Entry format error: {e}"),
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Cleanup(e) => write!(f, "Cleanup error: {e}"),
        }
    }
}

impl std::error::Error for LogTrimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Format(e) => Some(e),
            Self::Discovery(e) => Some(e),
            Self::Cleanup(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// A value could not be interpreted at all (e.g. a non-numeric env var).
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "'{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::InvalidValue {
                field,
                value,
                reason,
            } => write!(f, "'{field}' = '{value}' is invalid: {reason}"),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LogTrimError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Format errors
// ---------------------------------------------------------------------------

/// Errors raised while compiling an entry format.
#[derive(Debug)]
pub enum FormatError {
    /// A regex pattern is invalid.
    InvalidRegex {
        field: &'static str,
        pattern: String,
        source: regex::Error,
    },

    /// A regex pattern exceeds the maximum allowed length.
    RegexTooLong {
        field: &'static str,
        length: usize,
        max_length: usize,
    },

    /// The boundary pattern has no `timestamp` capture group.
    MissingTimestampGroup { pattern: String },

    /// The chrono format string is empty or contains no date/time specifier.
    InvalidTimestampFormat { format: String, reason: String },

    /// The timezone name is not recognised.
    UnknownTimezone { value: String },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegex {
                field,
                pattern,
                source,
            } => write!(f, "invalid regex in '{field}' ('{pattern}'): {source}"),
            Self::RegexTooLong {
                field,
                length,
                max_length,
            } => write!(
                f,
                "regex in '{field}' is {length} chars, exceeds maximum of {max_length}"
            ),
            Self::MissingTimestampGroup { pattern } => write!(
                f,
                "line pattern '{pattern}' has no named 'timestamp' capture group"
            ),
            Self::InvalidTimestampFormat { format, reason } => {
                write!(f, "invalid timestamp format '{format}': {reason}")
            }
            Self::UnknownTimezone { value } => write!(
                f,
                "timezone \"{value}\" is not recognised. Expected \"local\" or \"utc\""
            ),
        }
    }
}

impl std::error::Error for FormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRegex { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<FormatError> for LogTrimError {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}

// ---------------------------------------------------------------------------
// Parse diagnostics
// ---------------------------------------------------------------------------

/// Non-fatal per-entry parse diagnostics.
///
/// These are collected in `ParseResult::errors` and never abort a run: an entry
/// whose age cannot be determined is handled by the fail mode instead.
#[derive(Debug)]
pub enum ParseError {
    /// A boundary line matched but its timestamp could not be parsed.
    TimestampParse {
        file: PathBuf,
        line_number: u64,
        raw_timestamp: String,
        format: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimestampParse {
                file,
                line_number,
                raw_timestamp,
                format,
            } => write!(
                f,
                "'{}' line {line_number}: cannot parse timestamp \
                 '{raw_timestamp}' with format '{format}'",
                file.display()
            ),
        }
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to the directory sweep.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The root scan path does not exist or is not accessible.
    RootNotFound { path: PathBuf },

    /// The root path is not a directory.
    NotADirectory { path: PathBuf },

    /// Permission denied accessing the root path.
    PermissionDenied { path: PathBuf, source: io::Error },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Scan path '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Scan path '{}' is not a directory", path.display())
            }
            Self::PermissionDenied { path, source } => {
                write!(
                    f,
                    "Permission denied accessing '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PermissionDenied { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DiscoveryError> for LogTrimError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Cleanup errors
// ---------------------------------------------------------------------------

/// File-level failures of a cleanup run. Each one aborts the run for that
/// file and leaves the original content untouched.
#[derive(Debug)]
pub enum CleanupError {
    /// The log file is missing or could not be read.
    InputUnreadable { path: PathBuf, source: io::Error },

    /// The filtered content could not be persisted. The original is intact.
    WriteFailed { path: PathBuf, source: io::Error },

    /// Another run holds the lock file.
    LockContention {
        lock_path: PathBuf,
        holder: String,
    },

    /// The lock file could not be created for a reason other than contention
    /// (e.g. the directory is not writable).
    LockFailed { lock_path: PathBuf, source: io::Error },
}

impl CleanupError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::LockContention { .. } => constants::EXIT_LOCK_CONTENTION,
            Self::InputUnreadable { .. } | Self::WriteFailed { .. } | Self::LockFailed { .. } => {
                constants::EXIT_FAILURE
            }
        }
    }

    /// Short machine-friendly category name used in JSON summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputUnreadable { .. } => "input_unreadable",
            Self::WriteFailed { .. } => "write_failed",
            Self::LockContention { .. } => "lock_contention",
            Self::LockFailed { .. } => "lock_failed",
        }
    }
}

impl fmt::Display for CleanupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputUnreadable { path, source } => {
                write!(f, "cannot read log file '{}': {source}", path.display())
            }
            Self::WriteFailed { path, source } => write!(
                f,
                "failed to rewrite '{}' (original left untouched): {source}",
                path.display()
            ),
            Self::LockContention { lock_path, holder } => write!(
                f,
                "another cleanup run holds '{}' ({holder}); no changes made",
                lock_path.display()
            ),
            Self::LockFailed { lock_path, source } => write!(
                f,
                "cannot create lock file '{}': {source}",
                lock_path.display()
            ),
        }
    }
}

impl std::error::Error for CleanupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InputUnreadable { source, .. } => Some(source),
            Self::WriteFailed { source, .. } => Some(source),
            Self::LockFailed { source, .. } => Some(source),
            Self::LockContention { .. } => None,
        }
    }
}

impl From<CleanupError> for LogTrimError {
    fn from(e: CleanupError) -> Self {
        Self::Cleanup(e)
    }
}

/// Convenience type alias for logtrim results.
pub type Result<T> = std::result::Result<T, LogTrimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        let contention = CleanupError::LockContention {
            lock_path: PathBuf::from("log.txt.lock"),
            holder: "pid 42".to_string(),
        };
        assert_eq!(contention.exit_code(), constants::EXIT_LOCK_CONTENTION);

        let unreadable = CleanupError::InputUnreadable {
            path: PathBuf::from("log.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(unreadable.exit_code(), constants::EXIT_FAILURE);
        assert_eq!(
            LogTrimError::from(unreadable).exit_code(),
            constants::EXIT_FAILURE
        );

        let config = LogTrimError::from(ConfigError::ValueOutOfRange {
            field: "retention_days".to_string(),
            value: "0".to_string(),
            expected: "1-36500".to_string(),
        });
        assert_eq!(config.exit_code(), constants::EXIT_CONFIG);
    }

    #[test]
    fn test_error_chain_preserves_io_source() {
        use std::error::Error as _;
        let err = LogTrimError::from(CleanupError::WriteFailed {
            path: PathBuf::from("log.txt"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        });
        let cleanup = err.source().expect("top-level error has a source");
        let io = cleanup.source().expect("write failure keeps the io error");
        assert!(io.to_string().contains("read-only"));
        assert!(err.to_string().contains("original left untouched"));
    }
}
