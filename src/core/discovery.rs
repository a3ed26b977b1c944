// logtrim - core/discovery.rs
//
// Recursive directory sweep for log files to clean.
//
// Architecture note: this module uses `walkdir` for directory traversal as an
// OS abstraction. It reads only directory entries and file types, never file
// contents; cleaning each discovered file is owned by app::cleanup.
//
//   - Per-entry I/O errors are non-fatal and collected as warnings.
//   - max_files / max_depth are clamped to named-constant upper bounds.
//   - Excluded directory names short-circuit descent via filter_entry so
//     subtrees like .git/ or node_modules/ are never traversed.

use crate::util::constants;
use crate::util::error::DiscoveryError;
use std::path::{Path, PathBuf};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a directory sweep.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Maximum directory recursion depth.
    pub max_depth: usize,

    /// Maximum number of matching files to return.
    pub max_files: usize,

    /// Glob matched against file names (not full paths), e.g. `log.txt`
    /// or `*.log`.
    pub file_pattern: String,

    /// Directory names that are never descended into.
    pub exclude_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_files: constants::DEFAULT_MAX_FILES,
            file_pattern: constants::DEFAULT_SCAN_PATTERN.to_string(),
            exclude_dirs: constants::DEFAULT_EXCLUDE_DIRS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// Find log files under `root` whose name matches `config.file_pattern`.
///
/// Results are sorted by path so sweeps are reproducible. Our own lock and
/// temp files are never returned even if the pattern would match them.
///
/// # Non-fatal errors
/// Entries that cannot be accessed, and an invalid glob, are reported in the
/// returned warnings vector.
///
/// # Fatal errors
/// Returns `Err` only if the root path is invalid (`RootNotFound`,
/// `NotADirectory`, `PermissionDenied`).
pub fn discover_log_files(
    root: &Path,
    config: &DiscoveryConfig,
) -> Result<(Vec<PathBuf>, Vec<String>), DiscoveryError> {
    // fs::metadata rather than Path::is_dir so access-denied is not
    // reported as "does not exist".
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(DiscoveryError::NotADirectory {
                path: root.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DiscoveryError::PermissionDenied {
                path: root.to_path_buf(),
                source: e,
            })
        }
        Err(_) => {
            return Err(DiscoveryError::RootNotFound {
                path: root.to_path_buf(),
            })
        }
    }

    let max_files = config.max_files.min(constants::ABSOLUTE_MAX_FILES);
    let max_depth = config.max_depth.min(constants::ABSOLUTE_MAX_DEPTH);

    let mut warnings: Vec<String> = Vec::new();

    let pattern = match glob::Pattern::new(&config.file_pattern) {
        Ok(p) => p,
        Err(e) => {
            warnings.push(format!(
                "Invalid file pattern '{}': {e}. Nothing swept.",
                config.file_pattern
            ));
            return Ok((Vec::new(), warnings));
        }
    };

    tracing::debug!(
        root = %root.display(),
        max_depth,
        max_files,
        pattern = %config.file_pattern,
        exclude = ?config.exclude_dirs,
        "Discovery starting"
    );

    let walker = walkdir::WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_str().unwrap_or("");
            !config.exclude_dirs.iter().any(|d| d == name)
        });

    let mut files: Vec<PathBuf> = Vec::new();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Discovery warning");
                warnings.push(msg);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = match entry.file_name().to_str() {
            Some(n) => n,
            None => {
                warnings.push(format!(
                    "Skipping '{}': non-UTF-8 filename",
                    entry.path().display()
                ));
                continue;
            }
        };

        if is_own_artifact(file_name) {
            tracing::trace!(file = file_name, "Skipping lock/temp artifact");
            continue;
        }

        if pattern.matches(file_name) {
            files.push(entry.into_path());
        }
    }

    files.sort();

    let total_found = files.len();
    if total_found > max_files {
        files.truncate(max_files);
        warnings.push(format!(
            "{total_found} log files matched but the sweep limit is {max_files}. \
             Only the first {max_files} (by path) will be cleaned."
        ));
    }

    tracing::debug!(
        total_found,
        files = files.len(),
        warnings = warnings.len(),
        "Discovery complete"
    );

    Ok((files, warnings))
}

/// Lock files and in-flight temp files written by a cleanup run.
fn is_own_artifact(file_name: &str) -> bool {
    file_name.ends_with(constants::LOCK_FILE_SUFFIX)
        || file_name.ends_with(constants::TEMP_FILE_SUFFIX)
}

// =============================================================================
// Tests
// =============================================================================
