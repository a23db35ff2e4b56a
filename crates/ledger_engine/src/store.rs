use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ledger_core::{Ledger, CURRENT_SCHEMA_VERSION};
use ledger_logging::{ledger_info, ledger_warn};

use crate::error::LedgerError;
use crate::persist::AtomicFileWriter;

/// Loads and persists the ledger document.
///
/// `load` never fails: anything that is not a valid ledger yields a fresh,
/// empty one so the pipeline can always start. `save` surfaces every I/O
/// problem to the caller.
pub trait StateStore: Send + Sync {
    fn load(&self, now: DateTime<Utc>) -> Ledger;
    fn save(&self, ledger: &Ledger) -> Result<(), LedgerError>;
}

/// Pretty-printed JSON document at a fixed path.
pub struct JsonFileStore {
    path: PathBuf,
    quarantine_corrupt: bool,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quarantine_corrupt: true,
        }
    }

    pub fn quarantine_corrupt(mut self, enabled: bool) -> Self {
        self.quarantine_corrupt = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unparsable ledger file found at `now` is moved to:
    /// `<name>.corrupt-<timestamp>`, with a `-N` suffix if that is taken.
    pub fn quarantine_path(&self, now: DateTime<Utc>) -> PathBuf {
        let mut base = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        base.push(format!(".corrupt-{}", now.format("%Y%m%dT%H%M%SZ")));

        let mut candidate = self.path.with_file_name(&base);
        let mut attempt = 1u32;
        while candidate.exists() {
            let mut name = base.clone();
            name.push(format!("-{attempt}"));
            candidate = self.path.with_file_name(name);
            attempt += 1;
        }
        candidate
    }

    fn quarantine(&self, now: DateTime<Utc>) {
        if !self.quarantine_corrupt {
            return;
        }
        let destination = self.quarantine_path(now);
        match fs::rename(&self.path, &destination) {
            Ok(()) => ledger_warn!(
                "Moved unreadable ledger {:?} aside to {:?}",
                self.path,
                destination
            ),
            Err(err) => ledger_warn!(
                "Failed to move unreadable ledger {:?} aside: {}",
                self.path,
                err
            ),
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, now: DateTime<Utc>) -> Ledger {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                ledger_info!("No ledger at {:?}, starting empty", self.path);
                return Ledger::new(now);
            }
            Err(err) => {
                ledger_warn!("Failed to read ledger from {:?}: {}", self.path, err);
                return Ledger::new(now);
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            ledger_info!("Ledger at {:?} is empty, starting empty", self.path);
            return Ledger::new(now);
        }

        let ledger: Ledger = match serde_json::from_slice(&bytes) {
            Ok(ledger) => ledger,
            Err(err) => {
                ledger_warn!("Failed to parse ledger from {:?}: {}", self.path, err);
                self.quarantine(now);
                return Ledger::new(now);
            }
        };

        if let Err(err) = ledger.validate() {
            ledger_warn!("Ledger at {:?} violates its invariants: {}", self.path, err);
            self.quarantine(now);
            return Ledger::new(now);
        }

        if ledger.version() != CURRENT_SCHEMA_VERSION {
            ledger_warn!(
                "Ledger at {:?} has schema version {:?}, expected {:?}; using it as-is",
                self.path,
                ledger.version(),
                CURRENT_SCHEMA_VERSION
            );
        }

        ledger_info!("Loaded {} ledger entries from {:?}", ledger.len(), self.path);
        ledger
    }

    fn save(&self, ledger: &Ledger) -> Result<(), LedgerError> {
        let mut content = serde_json::to_string_pretty(ledger)?;
        content.push('\n');
        AtomicFileWriter::new(self.path.clone()).write(&content)?;
        Ok(())
    }
}
