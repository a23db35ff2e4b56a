//! Ledger engine: persistence and the concurrency-safe ledger manager.
mod error;
mod manager;
mod persist;
mod settings;
mod store;

pub use error::LedgerError;
pub use manager::LedgerManager;
pub use persist::{ensure_parent_dir, AtomicFileWriter, PersistError};
pub use settings::{ManagerSettings, DEFAULT_LEDGER_FILENAME};
pub use store::{JsonFileStore, StateStore};

pub use ledger_core::{
    ArticleRecord, ChangeDetector, Clock, EntryState, EntryStatus, Ledger, ManualClock,
    RecordError, Sha256ChangeDetector, StatisticsReport, SystemClock, UpsertOutcome,
    CURRENT_SCHEMA_VERSION,
};
