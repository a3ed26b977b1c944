// logtrim - platform/lock.rs
//
// Sibling lock file serialising cleanup runs on the same log file.
//
// The lock is a plain file created with `create_new`, so acquisition is a
// single atomic filesystem operation with no platform-specific locking API.
// The guard removes the file on drop, which covers every exit path that
// unwinds or returns. A run killed outright leaves the file behind; such a
// lock is treated as abandoned once it is older than the stale threshold.
// Breaking one goes through an atomic rename so that two runs judging the
// same lock stale cannot both end up holding a new one.

use crate::platform::fs::temp_path_for;
use crate::util::constants;
use crate::util::error::CleanupError;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// `dir/log.txt` → `dir/log.txt.lock`.
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(constants::LOCK_FILE_SUFFIX);
    path.with_file_name(name)
}

/// Held lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    _file: File,
}

impl LockGuard {
    /// Acquire the lock at `lock_path`.
    ///
    /// Fails with `LockContention` if a live lock exists. A lock whose
    /// mtime is older than `stale_after` is removed (with a warning) and
    /// acquisition is retried once.
    pub fn acquire(lock_path: &Path, stale_after: Duration) -> Result<Self, CleanupError> {
        match try_create(lock_path) {
            Ok(guard) => return Ok(guard),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(CleanupError::LockFailed {
                    lock_path: lock_path.to_path_buf(),
                    source: e,
                })
            }
        }

        let holder = read_holder(lock_path);
        let age = lock_age(lock_path);

        match age {
            Some(age) if age > stale_after => {
                tracing::warn!(
                    lock = %lock_path.display(),
                    holder = %holder,
                    age_secs = age.as_secs(),
                    "Breaking stale lock left by an interrupted run"
                );
                break_stale_lock(lock_path, stale_after)?;
                try_create(lock_path).map_err(|e| {
                    if e.kind() == io::ErrorKind::AlreadyExists {
                        CleanupError::LockContention {
                            lock_path: lock_path.to_path_buf(),
                            holder: read_holder(lock_path),
                        }
                    } else {
                        CleanupError::LockFailed {
                            lock_path: lock_path.to_path_buf(),
                            source: e,
                        }
                    }
                })
            }
            _ => Err(CleanupError::LockContention {
                lock_path: lock_path.to_path_buf(),
                holder,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(lock = %self.path.display(), "Lock released"),
            Err(e) => tracing::warn!(
                lock = %self.path.display(),
                error = %e,
                "Could not remove lock file"
            ),
        }
    }
}

/// Move a stale lock aside under a name private to this process, then
/// delete it.
///
/// Only one of several racing runs can rename the file; the others see
/// `NotFound` and fall through to `create_new`, where at most one succeeds.
/// If the file moved aside is not stale after all (it was replaced between
/// the age check and the rename), it is linked back and the caller reports
/// contention.
fn break_stale_lock(lock_path: &Path, stale_after: Duration) -> Result<(), CleanupError> {
    let aside = temp_path_for(lock_path);

    match std::fs::rename(lock_path, &aside) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(CleanupError::LockFailed {
                lock_path: lock_path.to_path_buf(),
                source: e,
            })
        }
    }

    let still_stale = lock_age(&aside).map_or(true, |age| age > stale_after);
    if !still_stale {
        let holder = read_holder(&aside);
        if let Err(e) = std::fs::hard_link(&aside, lock_path) {
            tracing::warn!(
                lock = %lock_path.display(),
                error = %e,
                "Could not restore a live lock moved aside"
            );
        }
        remove_aside(&aside);
        return Err(CleanupError::LockContention {
            lock_path: lock_path.to_path_buf(),
            holder,
        });
    }

    remove_aside(&aside);
    Ok(())
}

fn remove_aside(aside: &Path) {
    if let Err(e) = std::fs::remove_file(aside) {
        tracing::warn!(path = %aside.display(), error = %e, "Could not remove old lock file");
    }
}

fn try_create(lock_path: &Path) -> io::Result<LockGuard> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)?;

    let stamp = chrono::Utc::now().to_rfc3339();
    // The lock is already ours once create_new succeeded; the holder line is
    // informational only.
    if let Err(e) = writeln!(file, "pid={} acquired={stamp}", std::process::id()) {
        tracing::debug!(lock = %lock_path.display(), error = %e, "Could not write lock holder");
    }

    tracing::debug!(lock = %lock_path.display(), "Lock acquired");
    Ok(LockGuard {
        path: lock_path.to_path_buf(),
        _file: file,
    })
}

/// Holder description from the lock file, for diagnostics.
fn read_holder(lock_path: &Path) -> String {
    let mut content = String::new();
    match File::open(lock_path).and_then(|mut f| f.read_to_string(&mut content)) {
        Ok(_) if !content.trim().is_empty() => content.trim().to_string(),
        _ => "unknown holder".to_string(),
    }
}

fn lock_age(lock_path: &Path) -> Option<Duration> {
    let modified = std::fs::metadata(lock_path).ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_lock_path_is_sibling() {
        assert_eq!(
            lock_path_for(Path::new("/srv/app/log.txt")),
            PathBuf::from("/srv/app/log.txt.lock")
        );
    }

    #[test]
    fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let lock = dir.path().join("log.txt.lock");
        {
            let guard = LockGuard::acquire(&lock, HOUR).unwrap();
            assert!(guard.path().exists());
            let holder = read_holder(&lock);
            assert!(holder.starts_with(&format!("pid={}", std::process::id())));
        }
        assert!(!lock.exists(), "drop must remove the lock file");
    }

    #[test]
    fn test_second_acquire_is_contention() {
        let dir = TempDir::new().unwrap();
        let lock = dir.path().join("log.txt.lock");
        let _held = LockGuard::acquire(&lock, HOUR).unwrap();

        let second = LockGuard::acquire(&lock, HOUR);
        assert!(matches!(second, Err(CleanupError::LockContention { .. })));
        assert!(lock.exists(), "failed acquire must not remove a live lock");
    }

    #[test]
    fn test_stale_lock_is_broken() {
        let dir = TempDir::new().unwrap();
        let lock = dir.path().join("log.txt.lock");
        std::fs::write(&lock, "pid=1 acquired=long ago\n").unwrap();

        // Everything is stale against a zero threshold once a moment passes.
        std::thread::sleep(Duration::from_millis(20));
        let guard = LockGuard::acquire(&lock, Duration::ZERO).unwrap();
        assert!(read_holder(guard.path()).contains(&std::process::id().to_string()));
    }

    #[test]
    fn test_breaking_stale_lock_leaves_no_aside_file() {
        let dir = TempDir::new().unwrap();
        let lock = dir.path().join("log.txt.lock");
        std::fs::write(&lock, "pid=1 acquired=long ago\n").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        break_stale_lock(&lock, Duration::ZERO).unwrap();

        assert!(!lock.exists());
        assert!(!temp_path_for(&lock).exists());
    }

    /// A lock that another run refreshed between our age check and the
    /// rename must be put back, not stolen.
    #[test]
    fn test_fresh_lock_moved_aside_is_restored() {
        let dir = TempDir::new().unwrap();
        let lock = dir.path().join("log.txt.lock");
        std::fs::write(&lock, "pid=4242 acquired=just now\n").unwrap();

        let result = break_stale_lock(&lock, HOUR);

        assert!(matches!(result, Err(CleanupError::LockContention { .. })));
        assert_eq!(read_holder(&lock), "pid=4242 acquired=just now");
        assert!(!temp_path_for(&lock).exists());
    }

    /// Two runs that both judged the same lock stale: exactly one gets it.
    #[cfg(unix)]
    #[test]
    fn test_racing_stale_breakers_single_winner() {
        let dir = TempDir::new().unwrap();
        let lock = dir.path().join("log.txt.lock");
        std::fs::write(&lock, "pid=1 acquired=long ago\n").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        // First breaker wins and holds the lock.
        break_stale_lock(&lock, Duration::ZERO).unwrap();
        let winner = try_create(&lock).unwrap();

        // Second breaker acts on its earlier stale judgement; the rename now
        // moves the winner's fresh lock, which must be restored.
        let loser = break_stale_lock(&lock, HOUR);
        assert!(matches!(loser, Err(CleanupError::LockContention { .. })));
        assert!(winner.path().exists());
        assert!(read_holder(&lock).contains(&std::process::id().to_string()));
    }

    #[test]
    fn test_unwritable_location_is_lock_failed() {
        let dir = TempDir::new().unwrap();
        let lock = dir.path().join("no-such-dir").join("log.txt.lock");
        let result = LockGuard::acquire(&lock, HOUR);
        assert!(matches!(result, Err(CleanupError::LockFailed { .. })));
    }
}
