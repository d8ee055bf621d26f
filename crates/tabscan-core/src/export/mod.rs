//! Output artifacts and how they reach the filesystem.

mod xlsx;

pub use xlsx::{text_width, GridExporter};

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::warn;

use crate::error::ExportError;

/// Write `bytes` to `path` without ever exposing a partial file.
///
/// Data goes to a temporary file in the target directory first and is
/// renamed over `path` only once fully written.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let write_err = |source: std::io::Error| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

/// Write each `(path, bytes)` pair atomically, in order.
///
/// If one write fails, the files written before it are removed.
pub(crate) fn write_all_atomically(files: &[(&Path, Vec<u8>)]) -> Result<(), ExportError> {
    for (done, (path, bytes)) in files.iter().enumerate() {
        if let Err(err) = write_atomically(path, bytes) {
            for (written, _) in &files[..done] {
                if let Err(e) = fs::remove_file(written) {
                    warn!("Could not remove {}: {}", written.display(), e);
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomically_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        write_atomically(&path, b"first").unwrap();
        write_atomically(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        // Only the target remains, no stray temp files.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_directory_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.xlsx");

        let err = write_atomically(&path, b"data").unwrap_err();
        assert_eq!(err.path(), path.as_path());
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_write_rolls_back_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.xlsx");
        let second = dir.path().join("missing").join("b.png");

        let err = write_all_atomically(&[
            (first.as_path(), b"one".to_vec()),
            (second.as_path(), b"two".to_vec()),
        ])
        .unwrap_err();

        assert_eq!(err.path(), second.as_path());
        assert!(!first.exists());
    }
}
