// logtrim - core/render.rs
//
// Serialises surviving entries back to text.
// Core layer: writes to any Write trait object; the platform layer decides
// where the bytes land.

use crate::core::model::LogEntry;
use std::io::{self, Write};

/// Write the entries selected by `kept` (indices into `entries`) to `writer`,
/// byte-for-byte as they were read, in the order given.
///
/// Returns the number of bytes written.
pub fn render_entries<W: Write>(
    entries: &[LogEntry],
    kept: &[usize],
    writer: &mut W,
) -> io::Result<u64> {
    let mut written: u64 = 0;
    for &idx in kept {
        let entry = entries.get(idx).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("entry index {idx} out of range ({} entries)", entries.len()),
            )
        })?;
        for line in &entry.lines {
            writer.write_all(line.as_bytes())?;
            written += line.len() as u64;
        }
    }
    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::EntryKind;

    fn make_entry(lines: &[&str]) -> LogEntry {
        LogEntry {
            line_number: 1,
            kind: EntryKind::Timestamped,
            timestamp: None,
            lines: lines.iter().map(|l| (*l).to_string()).collect(),
        }
    }

    #[test]
    fn test_render_selected_entries_in_order() {
        let entries = vec![
            make_entry(&["a\n", "  a-cont\n"]),
            make_entry(&["b\n"]),
            make_entry(&["c\r\n", "c-cont"]),
        ];
        let mut buf = Vec::new();
        let n = render_entries(&entries, &[0, 2], &mut buf).unwrap();
        assert_eq!(buf, b"a\n  a-cont\nc\r\nc-cont");
        assert_eq!(n, buf.len() as u64);
    }

    #[test]
    fn test_render_nothing_is_empty() {
        let entries = vec![make_entry(&["a\n"])];
        let mut buf = Vec::new();
        let n = render_entries(&entries, &[], &mut buf).unwrap();
        assert_eq!(n, 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_render_rejects_bad_index() {
        let entries = vec![make_entry(&["a\n"])];
        let mut buf = Vec::new();
        let err = render_entries(&entries, &[3], &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
