//! Atomic file writes for generated artifacts
//!
//! Content is written to a temporary file in the destination directory,
//! fsynced, then renamed over the target. A reader never observes a
//! half-written file, and rerunning a generation simply replaces files.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

/// Result of an atomic write operation
#[derive(Debug, Clone, Default)]
pub struct AtomicWriteResult {
    /// Bytes written after line-ending normalization
    pub bytes_written: usize,
    /// Whether an existing file was replaced
    pub replaced_existing: bool,
}

/// Atomically write `content` to `path`, creating parent directories as needed.
///
/// Line endings are normalized to LF.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<AtomicWriteResult> {
    let normalized = normalize_line_endings(content);

    let parent = match path.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent directory: {parent}"))?;

    let replaced_existing = path.exists();

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in: {parent}"))?;

    temp_file
        .write_all(normalized.as_bytes())
        .with_context(|| "Failed to write content to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .with_context(|| "Failed to fsync temporary file")?;

    temp_file
        .persist(path.as_std_path())
        .map_err(|e| anyhow::anyhow!(e.error))
        .with_context(|| format!("Failed to atomically write file: {path}"))?;

    Ok(AtomicWriteResult {
        bytes_written: normalized.len(),
        replaced_existing,
    })
}

/// Check that `dir` exists (creating it if needed) and accepts new files.
///
/// Probes by creating and discarding a temporary file, which catches
/// read-only mounts and permission problems before any real write.
pub fn ensure_writable_dir(dir: &Utf8Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {dir}"))?;
    let probe = NamedTempFile::new_in(dir)
        .with_context(|| format!("Directory is not writable: {dir}"))?;
    probe
        .close()
        .with_context(|| format!("Failed to remove probe file in: {dir}"))?;
    Ok(())
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8_dir(dir: &TempDir) -> &Utf8Path {
        Utf8Path::from_path(dir.path()).unwrap()
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(
            normalize_line_endings("line1\r\nline2\rline3\n"),
            "line1\nline2\nline3\n"
        );
    }

    #[test]
    fn test_write_creates_parents_and_replaces() {
        let temp = TempDir::new().unwrap();
        let path = utf8_dir(&temp).join("backend/src/server.js");

        let first = write_file_atomic(&path, "console.log('a');\r\n").unwrap();
        assert!(!first.replaced_existing);
        assert_eq!(fs::read_to_string(&path).unwrap(), "console.log('a');\n");

        let second = write_file_atomic(&path, "console.log('b');").unwrap();
        assert!(second.replaced_existing);
        assert_eq!(second.bytes_written, "console.log('b');".len());
        assert_eq!(fs::read_to_string(&path).unwrap(), "console.log('b');");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp = TempDir::new().unwrap();
        let dir = utf8_dir(&temp);
        write_file_atomic(&dir.join("README.md"), "# hi").unwrap();

        let entries: Vec<_> = fs::read_dir(dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_ensure_writable_dir() {
        let temp = TempDir::new().unwrap();
        let dir = utf8_dir(&temp).join("out/nested");
        ensure_writable_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_ensure_writable_dir_rejects_file_path() {
        let temp = TempDir::new().unwrap();
        let file = utf8_dir(&temp).join("occupied");
        fs::write(&file, "x").unwrap();
        assert!(ensure_writable_dir(&file).is_err());
    }
}
