//! Atomic replacement of the state file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::SnapshotError;
use crate::state::QueryView;

const TEMP_SUFFIX: &str = ".new";

/// Serialize locked views into the persisted JSON document.
///
/// Keys come out in endpoint order and every inner map is a `BTreeMap`, so
/// equal state always encodes to identical bytes.
pub fn encode_snapshot(views: &[QueryView<'_>]) -> Result<Vec<u8>, SnapshotError> {
    let document: BTreeMap<&str, &QueryView<'_>> =
        views.iter().map(|view| (view.endpoint(), view)).collect();
    Ok(serde_json::to_vec_pretty(&document)?)
}

/// Writes snapshots to a canonical path through a temp file in the same
/// directory followed by a rename.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    fn temp_prefix(&self) -> String {
        format!(
            ".{}.",
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "snapshot".to_string())
        )
    }

    /// Write `bytes` to a synced temp file next to the canonical path.
    ///
    /// Nothing is visible at the canonical path until `commit`. Dropping the
    /// staged snapshot deletes the temp file.
    pub fn stage(&self, bytes: &[u8]) -> Result<StagedSnapshot, SnapshotError> {
        let mut tmp = tempfile::Builder::new()
            .prefix(&self.temp_prefix())
            .suffix(TEMP_SUFFIX)
            .tempfile_in(self.dir())?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        Ok(StagedSnapshot {
            tmp,
            target: self.path.clone(),
        })
    }

    /// Stage and commit in one step.
    pub fn write(&self, bytes: &[u8]) -> Result<(), SnapshotError> {
        self.stage(bytes)?.commit()
    }

    /// Delete temp files a crash left between `stage` and `commit`.
    ///
    /// Must not run while a snapshot is being staged.
    pub fn remove_stale(&self) -> Result<usize, SnapshotError> {
        let prefix = self.temp_prefix();
        let mut removed = 0;
        for entry in std::fs::read_dir(self.dir())? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(TEMP_SUFFIX) {
                std::fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Flush the directory entry so a completed rename survives power loss.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// A fully written temp file waiting to be renamed into place.
#[derive(Debug)]
pub struct StagedSnapshot {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl StagedSnapshot {
    pub fn temp_path(&self) -> &Path {
        self.tmp.path()
    }

    /// Atomically rename the temp file over the canonical path.
    pub fn commit(self) -> Result<(), SnapshotError> {
        self.tmp
            .persist(&self.target)
            .map_err(|e| SnapshotError::Io(e.error))?;
        if let Some(dir) = self.target.parent() {
            let dir = if dir.as_os_str().is_empty() {
                Path::new(".")
            } else {
                dir
            };
            sync_dir(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Registry;
    use tempfile::TempDir;

    #[test]
    fn test_write_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("query.db");
        let writer = SnapshotWriter::new(&path);

        writer.write(b"first").unwrap();
        writer.write(b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_stage_leaves_canonical_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("query.db");
        let writer = SnapshotWriter::new(&path);
        writer.write(br#"{"bikes": {"params": {}}}"#).unwrap();

        let staged = writer.stage(b"{ half-writ").unwrap();
        assert!(staged.temp_path().starts_with(dir.path()));
        // Simulated crash before the rename
        drop(staged);

        let registry = Registry::load(&path).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_remove_stale_only_touches_own_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("query.db");
        let writer = SnapshotWriter::new(&path);
        writer.write(b"{}").unwrap();
        std::fs::write(dir.path().join(".query.db.x1y2z3.new"), b"{").unwrap();
        std::fs::write(dir.path().join(".other.db.x1y2z3.new"), b"{").unwrap();

        assert_eq!(writer.remove_stale().unwrap(), 1);
        assert!(path.exists());
        assert!(dir.path().join(".other.db.x1y2z3.new").exists());
        assert_eq!(writer.remove_stale().unwrap(), 0);
    }

    #[test]
    fn test_relative_path_uses_current_dir() {
        let writer = SnapshotWriter::new("query.db");
        assert_eq!(writer.dir(), Path::new("."));
    }

    #[test]
    fn test_missing_directory_fails() {
        let writer = SnapshotWriter::new("/nonexistent/dir/query.db");
        assert!(matches!(writer.write(b"{}"), Err(SnapshotError::Io(_))));
    }
}
