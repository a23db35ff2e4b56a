use std::path::PathBuf;

/// Default file name of the ledger document.
pub const DEFAULT_LEDGER_FILENAME: &str = ".article_ledger.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerSettings {
    /// Where the ledger document lives.
    pub ledger_path: PathBuf,
    /// Age in days after which `cleanup_expired` drops an entry.
    pub retention_days: u32,
    /// Rename an unparsable ledger file to `<name>.corrupt` instead of
    /// overwriting it on the next save.
    pub quarantine_corrupt: bool,
}

impl ManagerSettings {
    pub fn at(ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            ..Self::default()
        }
    }
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from(DEFAULT_LEDGER_FILENAME),
            retention_days: 30,
            quarantine_corrupt: true,
        }
    }
}
