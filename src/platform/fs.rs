// logtrim - platform/fs.rs
//
// Filesystem helpers: reading the log file and replacing it atomically.
//
// The replacement discipline is write-to-sibling-temp, fsync, rename. A
// crash or error at any point before the rename leaves the original file
// exactly as it was; the rename itself is atomic on every supported
// platform as long as both paths are on the same filesystem, which a
// sibling temp file guarantees.
//
// The replacement is a new inode. A writer that keeps the log open across
// a run (a Python `FileHandler`, for instance) goes on appending to the
// unlinked old file until it reopens the path; `WatchedFileHandler` or a
// reopen after each cleanup avoids losing those lines.

use crate::util::constants;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Read the full content of a log file as UTF-8.
///
/// Invalid UTF-8 is an `InvalidData` error rather than a lossy conversion:
/// a lossy read would silently rewrite the undecodable bytes.
pub fn read_log_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "not valid UTF-8 at byte {}; refusing to rewrite",
                e.utf8_error().valid_up_to()
            ),
        )
    })
}

/// Sibling temp path used while rewriting `path`:
/// `dir/log.txt` → `dir/log.txt.<pid>.tmp`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}{}", std::process::id(), constants::TEMP_FILE_SUFFIX));
    path.with_file_name(name)
}

/// Replace `path` with the bytes produced by `write_body`.
///
/// `write_body` receives a buffered writer on a sibling temp file and
/// returns a count it wants passed back (e.g. bytes written). The original
/// file's permissions are applied to the temp file before the rename.
///
/// On any error the temp file is removed and the original is untouched.
pub fn replace_atomically<F>(path: &Path, write_body: F) -> io::Result<u64>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<u64>,
{
    let tmp = temp_path_for(path);

    match write_temp_then_rename(path, &tmp, write_body) {
        Ok(n) => {
            sync_parent_dir(path);
            tracing::debug!(path = %path.display(), bytes = n, "File replaced atomically");
            Ok(n)
        }
        Err(e) => {
            // Best effort; the temp file may not exist yet.
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        tmp = %tmp.display(),
                        error = %cleanup,
                        "Could not remove temp file after failed rewrite"
                    );
                }
            }
            Err(e)
        }
    }
}

fn write_temp_then_rename<F>(path: &Path, tmp: &Path, write_body: F) -> io::Result<u64>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<u64>,
{
    let file = File::create(tmp)?;

    if let Ok(meta) = std::fs::metadata(path) {
        file.set_permissions(meta.permissions())?;
    }

    let mut writer = BufWriter::new(file);
    let n = write_body(&mut writer)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(tmp, path)?;
    Ok(n)
}

/// Persist the rename itself. Directory fsync is a unix concept; elsewhere
/// this is a no-op.
fn sync_parent_dir(path: &Path) {
    #[cfg(unix)]
    {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}
