use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("ledger directory missing or not writable: {0}")]
    TargetDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the directory that will hold `target` exists; create it if missing.
pub fn ensure_parent_dir(target: &Path) -> Result<PathBuf, PersistError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if dir.exists() {
        let meta = fs::metadata(&dir).map_err(|e| PersistError::TargetDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::TargetDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(&dir).map_err(|e| PersistError::TargetDir(e.to_string()))?;
    }
    Ok(dir)
}

/// Atomically replaces one file by writing a sibling temp file then renaming it.
///
/// A reader (or a process restarted after a crash) sees either the old
/// content or the new content, never a prefix of the new one.
pub struct AtomicFileWriter {
    target: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(target: PathBuf) -> Self {
        Self { target }
    }

    pub fn write(&self, content: &str) -> Result<(), PersistError> {
        let dir = ensure_parent_dir(&self.target)?;

        // The temp file must live in the same directory for the rename to be atomic.
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&self.target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(())
    }
}
