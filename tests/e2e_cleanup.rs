// logtrim - tests/e2e_cleanup.rs
//
// End-to-end tests for the cleanup pipeline.
//
// These tests exercise the real filesystem, real lock files, real atomic
// replacement, and the real binary with its exit codes. No mocks, no
// stubs. Every test works on a copy of the fixture inside a temp dir so
// the fixture itself is never rewritten.

use chrono::{DateTime, TimeZone, Utc};
use logtrim::app::cleanup::{run_cleanup, run_cleanup_with, CleanupRequest};
use logtrim::core::format::{EntryFormat, TimestampZone};
use logtrim::core::model::FailMode;
use logtrim::platform::fs::temp_path_for;
use logtrim::platform::lock::lock_path_for;
use logtrim::util::constants;
use logtrim::util::error::{CleanupError, LogTrimError};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to an on-disk fixture file.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Copy the product-service fixture into `dir` as `log.txt`.
fn stage_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("log.txt");
    fs::copy(fixture("product_service_log.txt"), &path).expect("copy fixture");
    path
}

fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
}

fn utc_request(path: &Path) -> CleanupRequest {
    let mut req = CleanupRequest::new(path, 30);
    req.format = EntryFormat::python_logging(TimestampZone::Utc);
    req
}

/// Run the binary with a clean environment and an empty config file.
fn logtrim(dir: &Path, args: &[&str]) -> Output {
    let config = dir.join("empty-config.toml");
    if !config.exists() {
        fs::write(&config, "").unwrap();
    }
    Command::new(env!("CARGO_BIN_EXE_logtrim"))
        .current_dir(dir)
        .env_remove(constants::ENV_LOG_PATH)
        .env_remove(constants::ENV_RETENTION_DAYS)
        .env_remove("RUST_LOG")
        .env(constants::ENV_CONFIG, &config)
        .args(["--timezone", "utc", "--now", "2024-04-10T12:00:00Z"])
        .args(args)
        .output()
        .expect("run logtrim binary")
}

// =============================================================================
// Library pipeline
// =============================================================================

/// Old entries go, each with its traceback; the rest survive byte for byte.
#[test]
fn e2e_fixture_is_trimmed_to_retention_window() {
    let dir = TempDir::new().unwrap();
    let path = stage_fixture(dir.path());

    let summary = run_cleanup_with(&utc_request(&path), reference_now()).unwrap();

    assert_eq!(summary.entries_read, 7);
    assert_eq!(summary.entries_kept, 4);
    assert_eq!(summary.entries_dropped, 3);
    assert_eq!(summary.unparseable, 1);
    assert_eq!(summary.lines_dropped, 7);
    assert_eq!(summary.lines_kept, 8);
    assert!(summary.rewritten);

    let after = fs::read_to_string(&path).unwrap();
    let original = fs::read_to_string(fixture("product_service_log.txt")).unwrap();
    let expected: String = original
        .split_inclusive('\n')
        .skip(7)
        .collect();
    assert_eq!(after, expected);
    assert!(after.starts_with("2024-03-20 10:15:00"));
    assert!(after.contains("requests.exceptions.ReadTimeout: timed out\n"));
    assert!(!lock_path_for(&path).exists());
}

/// Strict mode additionally removes the entry with the impossible date.
#[test]
fn e2e_strict_mode_removes_undated_entry() {
    let dir = TempDir::new().unwrap();
    let path = stage_fixture(dir.path());
    let mut req = utc_request(&path);
    req.policy.mode = FailMode::Strict;

    let summary = run_cleanup_with(&req, reference_now()).unwrap();

    assert_eq!(summary.entries_dropped, 4);
    assert!(!fs::read_to_string(&path).unwrap().contains("clock glitch"));
}

/// An entry stamped exactly at now - retention is kept.
#[test]
fn e2e_entry_at_cutoff_is_kept() {
    let dir = TempDir::new().unwrap();
    let path = stage_fixture(dir.path());
    let now = Utc.with_ymd_and_hms(2024, 4, 19, 10, 15, 0).unwrap();

    run_cleanup_with(&utc_request(&path), now).unwrap();

    let after = fs::read_to_string(&path).unwrap();
    assert!(after.starts_with("2024-03-20 10:15:00 - product-service - INFO"));
}

/// Running twice with the same reference time changes nothing the second time.
#[test]
fn e2e_cleanup_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = stage_fixture(dir.path());

    run_cleanup_with(&utc_request(&path), reference_now()).unwrap();
    let once = fs::read(&path).unwrap();
    let second = run_cleanup_with(&utc_request(&path), reference_now()).unwrap();

    assert_eq!(second.entries_dropped, 0);
    assert!(!second.rewritten);
    assert_eq!(fs::read(&path).unwrap(), once);
}

/// A zero-entry file stays as it is and reports 0/0.
#[test]
fn e2e_empty_file_is_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    fs::write(&path, "").unwrap();

    let summary = run_cleanup(&path, 30, reference_now()).unwrap();

    assert_eq!(summary.entries_read, 0);
    assert_eq!(summary.entries_dropped, 0);
    assert!(!summary.rewritten);
    assert_eq!(fs::read(&path).unwrap(), b"");
}

/// CRLF line endings and a missing final newline survive a rewrite.
#[test]
fn e2e_line_endings_are_preserved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    fs::write(
        &path,
        "2024-01-01 00:00:00 - a - INFO - old\r\n\
         2024-04-09 00:00:00 - a - ERROR - new\r\n  detail\r\n\
         2024-04-10 00:00:00 - a - INFO - last",
    )
    .unwrap();

    run_cleanup_with(&utc_request(&path), reference_now()).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "2024-04-09 00:00:00 - a - ERROR - new\r\n  detail\r\n\
         2024-04-10 00:00:00 - a - INFO - last"
    );
}

/// A rewrite that cannot create its temp file fails as WriteFailed, exits 1,
/// keeps the original byte for byte and releases the lock.
#[test]
fn e2e_write_failure_keeps_original_and_releases_lock() {
    let dir = TempDir::new().unwrap();
    let path = stage_fixture(dir.path());
    let before = fs::read(&path).unwrap();
    fs::create_dir(temp_path_for(&path)).unwrap();

    let err = run_cleanup_with(&utc_request(&path), reference_now()).unwrap_err();

    assert!(matches!(err, CleanupError::WriteFailed { .. }), "{err:?}");
    assert_eq!(err.kind(), "write_failed");
    assert_eq!(LogTrimError::from(err).exit_code(), constants::EXIT_FAILURE);
    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(!lock_path_for(&path).exists());
}

/// A read-only directory stops the run at the lock, before anything is
/// written.
#[cfg(unix)]
#[test]
fn e2e_read_only_directory_fails_without_changes() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let path = stage_fixture(dir.path());
    let before = fs::read(&path).unwrap();
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();

    // Permission bits do not bind a privileged user; nothing to assert then.
    let privileged = fs::write(dir.path().join("writable-check"), b"").is_ok();
    let result = run_cleanup_with(&utc_request(&path), reference_now());
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
    if privileged {
        return;
    }

    let err = result.unwrap_err();
    assert!(matches!(err, CleanupError::LockFailed { .. }), "{err:?}");
    assert_eq!(err.exit_code(), constants::EXIT_FAILURE);
    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(!lock_path_for(&path).exists());
    assert!(!temp_path_for(&path).exists());
}

// =============================================================================
// Binary: exit codes and outputs
// =============================================================================

#[test]
fn e2e_binary_cleans_default_log_path() {
    let dir = TempDir::new().unwrap();
    let path = stage_fixture(dir.path());

    let out = logtrim(dir.path(), &[]);

    assert_eq!(out.status.code(), Some(constants::EXIT_OK), "{out:?}");
    assert!(fs::read_to_string(&path)
        .unwrap()
        .starts_with("2024-03-20 10:15:00"));
}

#[test]
fn e2e_binary_summary_json() {
    let dir = TempDir::new().unwrap();
    stage_fixture(dir.path());

    let out = logtrim(dir.path(), &["--dry-run", "--summary-json", "log.txt"]);

    assert_eq!(out.status.code(), Some(constants::EXIT_OK));
    let stdout = String::from_utf8(out.stdout).unwrap();
    let summary: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(summary["entries_dropped"], 3);
    assert_eq!(summary["dry_run"], true);
    assert_eq!(summary["rewritten"], false);
    assert_eq!(summary["mode"], "fail-safe");
}

#[test]
fn e2e_binary_missing_file_exit_codes() {
    let dir = TempDir::new().unwrap();

    let out = logtrim(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(constants::EXIT_FAILURE));

    let out = logtrim(dir.path(), &["--allow-missing"]);
    assert_eq!(out.status.code(), Some(constants::EXIT_OK));
    assert!(!dir.path().join("log.txt").exists());
}

#[test]
fn e2e_binary_lock_contention_exit_code() {
    let dir = TempDir::new().unwrap();
    let path = stage_fixture(dir.path());
    let before = fs::read(&path).unwrap();
    fs::write(lock_path_for(&path), "pid=1 acquired=now\n").unwrap();

    let out = logtrim(dir.path(), &[]);

    assert_eq!(out.status.code(), Some(constants::EXIT_LOCK_CONTENTION));
    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(lock_path_for(&path).exists(), "someone else's lock is left alone");
}

#[test]
fn e2e_binary_config_errors_exit_78() {
    let dir = TempDir::new().unwrap();
    stage_fixture(dir.path());

    let out = logtrim(dir.path(), &["--retention-days", "0"]);
    assert_eq!(out.status.code(), Some(constants::EXIT_CONFIG));

    let bad_toml = dir.path().join("bad.toml");
    fs::write(&bad_toml, "[retention\n").unwrap();
    let out = logtrim(dir.path(), &["--config", bad_toml.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(constants::EXIT_CONFIG));

    let out = logtrim(dir.path(), &["--scan-dir", ".", "--pattern", "[log.txt"]);
    assert_eq!(out.status.code(), Some(constants::EXIT_CONFIG));

    let bad_regex = dir.path().join("regex.toml");
    fs::write(&bad_regex, "[format]\nline_pattern = \"^(?P<when>\\\\d+\"\n").unwrap();
    let out = logtrim(dir.path(), &["--config", bad_regex.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(constants::EXIT_CONFIG));
}

#[test]
fn e2e_binary_config_file_sets_retention() {
    let dir = TempDir::new().unwrap();
    let path = stage_fixture(dir.path());
    let config = dir.path().join("week.toml");
    fs::write(&config, "[retention]\ndays = 7\n").unwrap();

    let out = logtrim(dir.path(), &["--config", config.to_str().unwrap()]);

    assert_eq!(out.status.code(), Some(constants::EXIT_OK));
    let after = fs::read_to_string(&path).unwrap();
    assert!(after.starts_with("2024-13-45"), "undated entry leads: {after}");
    assert!(!after.contains("2024-03-20"));
}

#[test]
fn e2e_binary_scan_dir_cleans_every_service() {
    let dir = TempDir::new().unwrap();
    let services = ["auth-service", "order-service", "product-service"];
    for service in services {
        fs::create_dir(dir.path().join(service)).unwrap();
        stage_fixture(&dir.path().join(service));
    }
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    stage_fixture(&dir.path().join(".git"));

    let out = logtrim(dir.path(), &["--scan-dir", "."]);

    assert_eq!(out.status.code(), Some(constants::EXIT_OK), "{out:?}");
    for service in services {
        let after = fs::read_to_string(dir.path().join(service).join("log.txt")).unwrap();
        assert!(after.starts_with("2024-03-20"), "{service} not cleaned");
    }
    let skipped = fs::read_to_string(dir.path().join(".git").join("log.txt")).unwrap();
    assert!(skipped.starts_with("2024-01-02"), ".git must not be swept");
}
