// logtrim - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing (flags and LOGTRIM_* environment variables)
// 2. Config file loading and override layering
// 3. Logging initialisation (debug mode support)
// 4. Target resolution (explicit paths, configured path, or directory sweep)
// 5. One cleanup run per target, exiting with the most severe outcome

use chrono::{DateTime, Utc};
use clap::Parser;
use logtrim::app::cleanup::{self, CleanupRequest};
use logtrim::core::discovery::{self, DiscoveryConfig};
use logtrim::core::format::EntryFormat;
use logtrim::core::model::CleanupSummary;
use logtrim::core::parser::ParseConfig;
use logtrim::core::retention::RetentionPolicy;
use logtrim::platform::config::{self, AppConfig, Overrides};
use logtrim::util::constants;
use logtrim::util::error::{CleanupError, ConfigError, LogTrimError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// logtrim - Remove log entries older than a retention window.
///
/// Multi-line entries (stack traces) are kept or removed as a unit, and the
/// file is replaced atomically so an interrupted run never corrupts it.
#[derive(Parser, Debug)]
#[command(name = "logtrim", version, about)]
struct Cli {
    /// Log files to clean (default: [log] path from config, else ./log.txt).
    #[arg(env = constants::ENV_LOG_PATH)]
    paths: Vec<PathBuf>,

    /// Config file (default: config.toml in the platform config directory).
    #[arg(short = 'c', long = "config", env = constants::ENV_CONFIG)]
    config: Option<PathBuf>,

    /// Keep entries newer than this many days.
    #[arg(
        short = 'r',
        long = "retention-days",
        env = constants::ENV_RETENTION_DAYS,
        allow_negative_numbers = true
    )]
    retention_days: Option<i64>,

    /// Also remove entries whose timestamp cannot be determined.
    #[arg(long = "strict")]
    strict: bool,

    /// Zone of timestamps without an offset: "local" or "utc".
    #[arg(long = "timezone")]
    timezone: Option<String>,

    /// Reference instant (RFC 3339) instead of the current time.
    #[arg(long = "now")]
    now: Option<DateTime<Utc>>,

    /// Report what would be removed without changing anything.
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// Treat a missing log file as nothing to clean.
    #[arg(long = "allow-missing")]
    allow_missing: bool,

    /// Clean every matching log file under this directory.
    #[arg(short = 's', long = "scan-dir")]
    scan_dir: Option<PathBuf>,

    /// File name glob used with --scan-dir.
    #[arg(short = 'p', long = "pattern", requires = "scan_dir")]
    pattern: Option<String>,

    /// Print one JSON summary per file on stdout.
    #[arg(long = "summary-json")]
    summary_json: bool,

    /// Also write the operational log to this file.
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    std::process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    // Config is read before logging starts because it can set the level.
    let loaded = match config::resolve_config_path(cli.config.as_deref()) {
        Some(path) => config::load_config(&path),
        None => Ok((AppConfig::default(), Vec::new())),
    };

    let (mut app_config, warnings) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            logtrim::util::logging::init(cli.debug, None, cli.log_file.as_deref());
            return fatal(LogTrimError::from(e));
        }
    };

    let overrides = Overrides {
        retention_days: cli.retention_days,
        strict: cli.strict,
        allow_missing: cli.allow_missing,
        timezone: cli.timezone.clone(),
        log_file: cli.log_file.clone(),
    };
    let override_result = app_config.apply_overrides(&overrides);

    logtrim::util::logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        dry_run = cli.dry_run,
        "logtrim starting"
    );

    for warning in &warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    if let Err(e) = override_result {
        return fatal(LogTrimError::from(e));
    }

    let format = match EntryFormat::compile(
        &app_config.line_pattern,
        &app_config.timestamp_format,
        app_config.timezone,
    ) {
        Ok(f) => f,
        Err(e) => return fatal(LogTrimError::from(e)),
    };

    let targets = match resolve_targets(cli, &app_config) {
        Ok(t) => t,
        Err(e) => return fatal(e),
    };

    let now = cli.now.unwrap_or_else(Utc::now);
    let policy = RetentionPolicy::new(app_config.retention_days, app_config.mode);

    tracing::info!(
        files = targets.len(),
        retention_days = policy.retention_days,
        mode = policy.mode.label(),
        timezone = app_config.timezone.label(),
        now = %now,
        "Cleanup plan resolved"
    );

    let mut exit_code = constants::EXIT_OK;

    for path in targets {
        let request = CleanupRequest {
            path,
            policy,
            format: format.clone(),
            parse: ParseConfig::default(),
            dry_run: cli.dry_run,
            allow_missing: app_config.allow_missing,
            stale_lock_after: Duration::from_secs(app_config.stale_lock_secs),
        };

        match cleanup::run_cleanup_with(&request, now) {
            Ok(summary) => {
                if cli.summary_json {
                    print_summary(&summary);
                }
            }
            Err(e) => {
                tracing::error!(
                    path = %request.path.display(),
                    kind = e.kind(),
                    error = %e,
                    "Cleanup failed"
                );
                if cli.summary_json {
                    print_failure(&request.path, &e);
                }
                exit_code = most_severe(exit_code, e.exit_code());
            }
        }
    }

    exit_code
}

/// Files to clean: explicit paths and/or a directory sweep, falling back to
/// the configured log path when neither is given.
fn resolve_targets(cli: &Cli, app_config: &AppConfig) -> Result<Vec<PathBuf>, LogTrimError> {
    let mut targets: Vec<PathBuf> = cli.paths.clone();

    if let Some(ref root) = cli.scan_dir {
        // A bad glob from the config file was already replaced by the default
        // with a warning; one given on the command line is fatal.
        if let Some(ref pattern) = cli.pattern {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(ConfigError::InvalidValue {
                    field: "pattern".to_string(),
                    value: pattern.clone(),
                    reason: e.to_string(),
                }
                .into());
            }
        }

        let discovery_config = DiscoveryConfig {
            max_depth: app_config.max_depth,
            max_files: app_config.max_files,
            file_pattern: cli
                .pattern
                .clone()
                .unwrap_or_else(|| app_config.scan_pattern.clone()),
            exclude_dirs: app_config.exclude_dirs.clone(),
        };
        let (found, warnings) = discovery::discover_log_files(root, &discovery_config)?;
        for warning in &warnings {
            tracing::warn!(warning = %warning, "Discovery warning");
        }
        tracing::info!(root = %root.display(), files = found.len(), "Directory sweep complete");
        targets.extend(found);
    } else if targets.is_empty() {
        targets.push(app_config.log_path.clone());
    }

    Ok(targets)
}

/// Combine two exit codes, keeping the one that needs more attention.
/// A hard failure outranks lock contention, which is retried by the next run.
fn most_severe(current: i32, new: i32) -> i32 {
    let rank = |code: i32| match code {
        constants::EXIT_OK => 0,
        constants::EXIT_LOCK_CONTENTION => 1,
        constants::EXIT_CONFIG => 3,
        _ => 2,
    };
    if rank(new) > rank(current) {
        new
    } else {
        current
    }
}

fn fatal(e: LogTrimError) -> i32 {
    tracing::error!(error = %e, "Fatal error");
    eprintln!("Error: {e}");
    e.exit_code()
}

fn print_summary(summary: &CleanupSummary) {
    match serde_json::to_string(summary) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialise summary"),
    }
}

fn print_failure(path: &Path, e: &CleanupError) {
    let value = serde_json::json!({
        "path": path,
        "error": e.kind(),
        "message": e.to_string(),
    });
    println!("{value}");
}
