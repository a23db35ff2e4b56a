use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use ledger_core::{
    validate_key, ArticleRecord, ChangeDetector, Clock, EntryState, EntryStatus, Ledger,
    Sha256ChangeDetector, StatisticsReport, SystemClock,
};
use ledger_logging::{ledger_debug, ledger_error, ledger_info};

use crate::error::LedgerError;
use crate::settings::ManagerSettings;
use crate::store::{JsonFileStore, StateStore};

/// Incremental-processing ledger shared by pipeline workers.
///
/// All mutations run under one write lock that spans both the in-memory
/// change and the save. A mutation is applied to a copy of the ledger that
/// replaces the live one only once it is on disk, so a failed save leaves
/// memory and disk in agreement. Readers take the read lock and only ever see
/// whole ledgers.
///
/// Keys are trimmed and checked to be absolute urls on the way in. Mutations
/// reject an invalid key with `LedgerError::Record`; lookups treat it as
/// absent.
pub struct LedgerManager {
    settings: ManagerSettings,
    store: Box<dyn StateStore>,
    detector: Box<dyn ChangeDetector>,
    clock: Arc<dyn Clock>,
    ledger: RwLock<Ledger>,
}

impl LedgerManager {
    /// Opens the ledger at `settings.ledger_path` with the wall clock and SHA-256.
    pub fn open(settings: ManagerSettings) -> Self {
        let store = JsonFileStore::new(settings.ledger_path.clone())
            .quarantine_corrupt(settings.quarantine_corrupt);
        Self::with_parts(
            settings,
            Box::new(store),
            Box::new(Sha256ChangeDetector),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        settings: ManagerSettings,
        store: Box<dyn StateStore>,
        detector: Box<dyn ChangeDetector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = store.load(clock.now());
        Self {
            settings,
            store,
            detector,
            clock,
            ledger: RwLock::new(ledger),
        }
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// True if the key is known, whatever its status.
    pub fn is_processed(&self, key: &str) -> bool {
        match validate_key(key) {
            Ok(key) => self.read().contains(&key),
            Err(_) => false,
        }
    }

    pub fn get_state(&self, key: &str) -> Option<EntryState> {
        let key = validate_key(key).ok()?;
        self.read().get(&key).cloned()
    }

    pub fn needs_update(&self, key: &str, content: &str) -> bool {
        let Ok(key) = validate_key(key) else {
            return true;
        };
        let digest = self.detector.digest(content);
        self.read().needs_update(&key, &digest)
    }

    /// Keys not in the ledger, in input order and as given.
    pub fn filter_unprocessed<'a, I>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.read().unprocessed(keys)
    }

    /// Keys of the records whose content is new, changed or previously failed.
    pub fn filter_needing_update(&self, items: &[ArticleRecord]) -> Vec<String> {
        let digests: Vec<String> = items
            .iter()
            .map(|item| self.detector.digest(item.content()))
            .collect();
        let ledger = self.read();
        items
            .iter()
            .zip(digests.iter())
            .filter(|(item, digest)| ledger.needs_update(item.key(), digest))
            .map(|(item, _)| item.key().to_string())
            .collect()
    }

    pub fn statistics(&self) -> StatisticsReport {
        self.read().report()
    }

    /// Keys currently in `status`, sorted.
    pub fn entries_with_status(&self, status: EntryStatus) -> Vec<String> {
        self.read().keys_with_status(status)
    }

    /// A copy of the whole ledger as it is right now.
    pub fn snapshot(&self) -> Ledger {
        self.read().clone()
    }

    /// Records a successful processing of `record` and persists the ledger.
    pub fn upsert(&self, record: &ArticleRecord) -> Result<bool, LedgerError> {
        let digest = self.detector.digest(record.content());
        let outcome = self.mutate(|ledger, now| {
            let outcome = ledger.record_success(record, digest, now);
            (outcome, true)
        })?;
        ledger_debug!("Upserted {} ({:?})", record.key(), outcome);
        Ok(true)
    }

    /// Records a failed processing attempt and persists the ledger.
    pub fn mark_error(&self, key: &str, message: &str) -> Result<bool, LedgerError> {
        let key = validate_key(key)?;
        self.mutate(|ledger, now| {
            ledger.record_error(&key, message, now);
            ((), true)
        })?;
        ledger_debug!("Marked {} as failed: {}", key, message);
        Ok(true)
    }

    /// Deletes the entry if present. Removing an unknown key succeeds without
    /// touching disk.
    pub fn remove(&self, key: &str) -> Result<bool, LedgerError> {
        let key = validate_key(key)?;
        let removed = self.mutate(|ledger, now| {
            let removed = ledger.remove(&key, now).is_some();
            (removed, removed)
        })?;
        if removed {
            ledger_debug!("Removed {}", key);
        }
        Ok(true)
    }

    /// Drops entries last processed more than `retention_days` ago. Persists
    /// once, and only if something was removed.
    pub fn cleanup(&self, retention_days: u32) -> Result<usize, LedgerError> {
        let removed = self.mutate(|ledger, now| {
            let removed = ledger.sweep(retention_days, now);
            (removed, removed > 0)
        })?;
        ledger_info!(
            "Cleanup removed {} entries older than {} days",
            removed,
            retention_days
        );
        Ok(removed)
    }

    /// `cleanup` with the configured retention.
    pub fn cleanup_expired(&self) -> Result<usize, LedgerError> {
        self.cleanup(self.settings.retention_days)
    }

    /// Runs `op` on a working copy under the write lock. `op` returns its
    /// result plus whether the ledger changed; only changed ledgers are saved
    /// and swapped in.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut Ledger, DateTime<Utc>) -> (T, bool),
    ) -> Result<T, LedgerError> {
        let mut guard = self.write();
        let now = self.clock.now();
        let mut working = guard.clone();
        let (value, changed) = op(&mut working, now);
        if !changed {
            return Ok(value);
        }
        working.touch(now);
        if let Err(err) = self.store.save(&working) {
            ledger_error!("Failed to persist ledger: {}", err);
            return Err(err);
        }
        *guard = working;
        Ok(value)
    }

    // The live ledger is only replaced after a successful save, so a poisoned
    // lock still guards a consistent value.
    fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }
}
