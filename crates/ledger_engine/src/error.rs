use ledger_core::RecordError;
use thiserror::Error;

use crate::persist::PersistError;

/// A mutation was rejected or could not be made durable. In both cases the
/// in-memory ledger is unchanged.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid item key: {0}")]
    Record(#[from] RecordError),
    #[error("failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write ledger: {0}")]
    Persist(#[from] PersistError),
}
