// logtrim - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every configurable value has its default and its bounds declared here.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "logtrim";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "logtrim";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Retention
// =============================================================================

/// Default retention window in days. Entries older than this are pruned.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Smallest accepted retention window. Zero would keep only entries stamped
/// exactly `now` or later, which is almost certainly a configuration mistake.
pub const MIN_RETENTION_DAYS: u32 = 1;

/// Largest accepted retention window (~100 years).
pub const MAX_RETENTION_DAYS: u32 = 36_500;

// =============================================================================
// Log file defaults
// =============================================================================

/// Log file cleaned when no path is given anywhere (relative to the working
/// directory, matching the per-service `log.txt` the services write).
pub const DEFAULT_LOG_PATH: &str = "log.txt";

/// Default entry-boundary pattern: a line starting with a Python `logging`
/// style timestamp (`2024-01-15 14:30:22`, optionally `T`-separated and with
/// fractional seconds). The `timestamp` group feeds the chrono parser.
pub const DEFAULT_LINE_PATTERN: &str =
    r"^(?P<timestamp>\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?)";

/// Default chrono format for the `timestamp` capture.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Maximum regex pattern length to prevent ReDoS.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4_096;

/// Maximum number of timestamp diagnostics kept per file. Counting continues
/// past this; only the detailed records are dropped.
pub const MAX_PARSE_ERRORS_PER_FILE: usize = 1_000;

/// Maximum length of a log line included in debug output.
/// Prevents accidental exposure of sensitive data in long lines.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Rewrite and locking
// =============================================================================

/// Suffix appended to the log file name for the sibling lock file.
pub const LOCK_FILE_SUFFIX: &str = ".lock";

/// Suffix appended to the log file name for the temporary rewrite target.
/// The process ID is inserted before it so concurrent strays never collide.
pub const TEMP_FILE_SUFFIX: &str = ".tmp";

/// Age in seconds after which an existing lock file is considered abandoned
/// by a killed run and may be broken.
pub const DEFAULT_STALE_LOCK_SECS: u64 = 6 * 60 * 60;

/// Smallest accepted stale-lock threshold.
pub const MIN_STALE_LOCK_SECS: u64 = 60;

/// Largest accepted stale-lock threshold (one week).
pub const MAX_STALE_LOCK_SECS: u64 = 7 * 24 * 60 * 60;

// =============================================================================
// Directory sweep
// =============================================================================

/// File name matched by `--scan-dir` when no pattern is given.
pub const DEFAULT_SCAN_PATTERN: &str = "log.txt";

/// Maximum directory recursion depth during a sweep.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Hard upper bound on max depth (prevents runaway traversal).
pub const ABSOLUTE_MAX_DEPTH: usize = 50;

/// Maximum number of files cleaned in a single sweep.
pub const DEFAULT_MAX_FILES: usize = 500;

/// Hard upper bound on max files.
pub const ABSOLUTE_MAX_FILES: usize = 10_000;

/// Directory names never descended into during a sweep.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[".git", "node_modules", "__pycache__", ".venv"];

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG: &str = "LOGTRIM_CONFIG";

/// Environment variable overriding the log file path.
pub const ENV_LOG_PATH: &str = "LOGTRIM_LOG_PATH";

/// Environment variable overriding the retention window.
pub const ENV_RETENTION_DAYS: &str = "LOGTRIM_RETENTION_DAYS";

// =============================================================================
// Process exit codes
// =============================================================================

/// Run completed (including "nothing to clean").
pub const EXIT_OK: i32 = 0;

/// Unrecoverable I/O failure: input unreadable or rewrite failed.
pub const EXIT_FAILURE: i32 = 1;

/// Another run holds the lock; nothing was changed (sysexits EX_TEMPFAIL).
pub const EXIT_LOCK_CONTENTION: i32 = 75;

/// Invalid configuration (sysexits EX_CONFIG).
pub const EXIT_CONFIG: i32 = 78;
