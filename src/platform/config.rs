// logtrim - platform/config.rs
//
// Platform config directory resolution and config.toml loading with
// startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.
//
// Resolution order for every setting, highest first:
//   command line > environment (LOGTRIM_*) > config.toml > built-in default
// The command line and environment are merged by clap before they reach
// `AppConfig::apply_overrides`; this module owns the file and defaults.

use crate::core::format::TimestampZone;
use crate::core::model::FailMode;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for logtrim configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logtrim/ or %APPDATA%\logtrim\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Returns `None` if no home directory can be determined (e.g. a bare
    /// service account); the tool then runs on defaults alone.
    pub fn resolve() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("", "", constants::APP_ID)?;
        let config_dir = proj_dirs.config_dir().to_path_buf();
        tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
        Some(Self { config_dir })
    }

    /// `config.toml` inside the platform config directory.
    pub fn default_config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

/// Decide which config file to load.
///
/// An explicit path (from `--config` or `LOGTRIM_CONFIG`) is returned as-is
/// and must exist. Otherwise the platform default is used only if present.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    PlatformPaths::resolve()
        .map(|p| p.default_config_file())
        .filter(|p| p.is_file())
}

// =============================================================================
// config.toml shape
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[log]` section.
    pub log: LogSection,
    /// `[retention]` section.
    pub retention: RetentionSection,
    /// `[format]` section.
    pub format: FormatSection,
    /// `[discovery]` section.
    pub discovery: DiscoverySection,
    /// `[lock]` section.
    pub lock: LockSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[log]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// File to clean. Relative paths resolve against the working directory.
    pub path: Option<PathBuf>,
    /// Treat a missing file as a successful no-op.
    pub allow_missing: Option<bool>,
}

/// `[retention]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RetentionSection {
    /// Retention window in days.
    pub days: Option<i64>,
    /// "fail-safe" or "strict".
    pub mode: Option<String>,
}

/// `[format]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct FormatSection {
    /// Boundary regex with a `timestamp` named group.
    pub line_pattern: Option<String>,
    /// chrono strftime format for the captured timestamp.
    pub timestamp_format: Option<String>,
    /// "local" or "utc".
    pub timezone: Option<String>,
}

/// `[discovery]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// File name glob for `--scan-dir` sweeps.
    pub pattern: Option<String>,
    /// Maximum directory recursion depth.
    pub max_depth: Option<usize>,
    /// Maximum files cleaned per sweep.
    pub max_files: Option<usize>,
    /// Directory names never descended into.
    pub exclude_dirs: Option<Vec<String>>,
}

/// `[lock]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LockSection {
    /// Age in seconds after which a lock file is considered abandoned.
    pub stale_after_secs: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

// =============================================================================
// Validated configuration
// =============================================================================

/// Validated application configuration.
///
/// All values are validated against named constants at load time. Invalid
/// values in the file produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Log --
    pub log_path: PathBuf,
    pub allow_missing: bool,

    // -- Retention --
    pub retention_days: u32,
    pub mode: FailMode,

    // -- Format --
    pub line_pattern: String,
    pub timestamp_format: String,
    pub timezone: TimestampZone,

    // -- Discovery --
    pub scan_pattern: String,
    pub max_depth: usize,
    pub max_files: usize,
    pub exclude_dirs: Vec<String>,

    // -- Lock --
    pub stale_lock_secs: u64,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(constants::DEFAULT_LOG_PATH),
            allow_missing: false,
            retention_days: constants::DEFAULT_RETENTION_DAYS,
            mode: FailMode::default(),
            line_pattern: constants::DEFAULT_LINE_PATTERN.to_string(),
            timestamp_format: constants::DEFAULT_TIMESTAMP_FORMAT.to_string(),
            timezone: TimestampZone::default(),
            scan_pattern: constants::DEFAULT_SCAN_PATTERN.to_string(),
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_files: constants::DEFAULT_MAX_FILES,
            exclude_dirs: constants::DEFAULT_EXCLUDE_DIRS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            stale_lock_secs: constants::DEFAULT_STALE_LOCK_SECS,
            log_level: None,
            log_file: None,
        }
    }
}

/// Values supplied on the command line or through the environment.
///
/// `None` / `false` means "not given" and leaves the file value in place.
/// Log paths are not here: explicit paths replace `[log] path` outright and
/// are resolved by the caller.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub retention_days: Option<i64>,
    pub strict: bool,
    pub allow_missing: bool,
    pub timezone: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    /// Layer command-line/environment values over this configuration.
    ///
    /// Unlike file values, an invalid override is an error: the operator
    /// asked for it explicitly, so silently substituting a default would run
    /// the cleanup with a window nobody chose.
    pub fn apply_overrides(&mut self, overrides: &Overrides) -> Result<(), ConfigError> {
        if let Some(days) = overrides.retention_days {
            self.retention_days =
                validate_retention_days(days).ok_or_else(|| ConfigError::ValueOutOfRange {
                    field: "retention_days".to_string(),
                    value: days.to_string(),
                    expected: retention_range(),
                })?;
        }
        if overrides.strict {
            self.mode = FailMode::Strict;
        }
        if overrides.allow_missing {
            self.allow_missing = true;
        }
        if let Some(ref tz) = overrides.timezone {
            self.timezone = tz.parse().map_err(|_| ConfigError::InvalidValue {
                field: "timezone".to_string(),
                value: tz.clone(),
                reason: "expected \"local\" or \"utc\"".to_string(),
            })?;
        }
        if let Some(ref file) = overrides.log_file {
            self.log_file = Some(file.clone());
        }
        Ok(())
    }
}

fn validate_retention_days(days: i64) -> Option<u32> {
    u32::try_from(days)
        .ok()
        .filter(|d| (constants::MIN_RETENTION_DAYS..=constants::MAX_RETENTION_DAYS).contains(d))
}

fn retention_range() -> String {
    format!(
        "{}-{} days",
        constants::MIN_RETENTION_DAYS,
        constants::MAX_RETENTION_DAYS
    )
}

// =============================================================================
// Loading
// =============================================================================

/// Load and validate a config file.
///
/// Returns the validated config and a list of non-fatal warnings. A file
/// that cannot be read or is not valid TOML is fatal: cleaning with a
/// half-understood configuration could delete the wrong entries.
pub fn load_config(path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let (config, warnings) = parse_config(&content).map_err(|e| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(path = %path.display(), "Loaded config.toml");
    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }
    Ok((config, warnings))
}

/// Validate config.toml content. Separated from `load_config` for testing.
pub fn parse_config(content: &str) -> Result<(AppConfig, Vec<String>), toml::de::Error> {
    let raw: RawConfig = toml::from_str(content)?;

    // Validate each field against named constants, accumulating all warnings.
    let mut config = AppConfig::default();
    let mut warnings: Vec<String> = Vec::new();

    // -- Log --
    if let Some(path) = raw.log.path {
        if path.as_os_str().is_empty() {
            warnings.push(format!(
                "[log] path is empty. Using default ({}).",
                constants::DEFAULT_LOG_PATH
            ));
        } else {
            config.log_path = path;
        }
    }
    if let Some(allow) = raw.log.allow_missing {
        config.allow_missing = allow;
    }

    // -- Retention: days --
    if let Some(days) = raw.retention.days {
        match validate_retention_days(days) {
            Some(d) => config.retention_days = d,
            None => warnings.push(format!(
                "[retention] days = {days} is out of range ({}). Using default ({}).",
                retention_range(),
                constants::DEFAULT_RETENTION_DAYS,
            )),
        }
    }

    // -- Retention: mode --
    if let Some(ref mode) = raw.retention.mode {
        match mode.to_lowercase().as_str() {
            "fail-safe" | "failsafe" => config.mode = FailMode::FailSafe,
            "strict" => config.mode = FailMode::Strict,
            other => warnings.push(format!(
                "[retention] mode = \"{other}\" is not recognised. \
                 Expected \"fail-safe\" or \"strict\". Using default (fail-safe).",
            )),
        }
    }

    // -- Format --
    // Patterns are compiled (and rejected fatally) when the entry format is
    // built; here they are only carried through.
    if let Some(pattern) = raw.format.line_pattern {
        config.line_pattern = pattern;
    }
    if let Some(format) = raw.format.timestamp_format {
        config.timestamp_format = format;
    }
    if let Some(ref tz) = raw.format.timezone {
        match tz.parse::<TimestampZone>() {
            Ok(zone) => config.timezone = zone,
            Err(_) => warnings.push(format!(
                "[format] timezone = \"{tz}\" is not recognised. \
                 Expected \"local\" or \"utc\". Using default (local).",
            )),
        }
    }

    // -- Discovery --
    if let Some(pattern) = raw.discovery.pattern {
        match glob::Pattern::new(&pattern) {
            Ok(_) => config.scan_pattern = pattern,
            Err(e) => warnings.push(format!(
                "[discovery] pattern = \"{pattern}\" is not a valid glob ({e}). Using default ({}).",
                constants::DEFAULT_SCAN_PATTERN,
            )),
        }
    }
    if let Some(depth) = raw.discovery.max_depth {
        if (1..=constants::ABSOLUTE_MAX_DEPTH).contains(&depth) {
            config.max_depth = depth;
        } else {
            warnings.push(format!(
                "[discovery] max_depth = {depth} is out of range (1-{}). Using default ({}).",
                constants::ABSOLUTE_MAX_DEPTH,
                constants::DEFAULT_MAX_DEPTH,
            ));
        }
    }
    if let Some(files) = raw.discovery.max_files {
        if (1..=constants::ABSOLUTE_MAX_FILES).contains(&files) {
            config.max_files = files;
        } else {
            warnings.push(format!(
                "[discovery] max_files = {files} is out of range (1-{}). Using default ({}).",
                constants::ABSOLUTE_MAX_FILES,
                constants::DEFAULT_MAX_FILES,
            ));
        }
    }
    if let Some(dirs) = raw.discovery.exclude_dirs {
        config.exclude_dirs = dirs;
    }

    // -- Lock --
    if let Some(secs) = raw.lock.stale_after_secs {
        if (constants::MIN_STALE_LOCK_SECS..=constants::MAX_STALE_LOCK_SECS).contains(&secs) {
            config.stale_lock_secs = secs;
        } else {
            warnings.push(format!(
                "[lock] stale_after_secs = {secs} is out of range ({}-{}). Using default ({}).",
                constants::MIN_STALE_LOCK_SECS,
                constants::MAX_STALE_LOCK_SECS,
                constants::DEFAULT_STALE_LOCK_SECS,
            ));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default ({}).",
                constants::DEFAULT_LOG_LEVEL,
            ));
        }
    }

    // -- Logging: file --
    if let Some(ref file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(PathBuf::from(file));
        }
    }

    Ok((config, warnings))
}

// =============================================================================
// Tests
// =============================================================================
