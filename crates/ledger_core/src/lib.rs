//! Ledger core: data model, change detection and pure state transitions.
mod clock;
mod detect;
mod entry;
mod ledger;
mod record;

pub use clock::{Clock, ManualClock, SystemClock};
pub use detect::{ChangeDetector, Sha256ChangeDetector};
pub use entry::{EntryState, EntryStatus};
pub use ledger::{
    Ledger, LedgerStatistics, LedgerValidationError, StatisticsReport, UpsertOutcome,
    CURRENT_SCHEMA_VERSION,
};
pub use record::{validate_key, ArticleRecord, RecordError};
