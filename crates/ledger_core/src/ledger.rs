use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entry::{EntryState, EntryStatus};
use crate::record::{validate_key, ArticleRecord};

/// Schema version stamped onto every freshly created ledger.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0";

/// Monotonic counters kept alongside the entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatistics {
    pub total_processed: u64,
    pub total_updated: u64,
    pub total_errors: u64,
}

/// Point-in-time summary returned to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatisticsReport {
    pub total_entries: usize,
    pub completed_entries: usize,
    pub error_entries: usize,
    pub total_processed: u64,
    pub total_updated: u64,
    pub total_errors: u64,
}

/// What an upsert did to the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First time the key was seen.
    Inserted,
    /// Content hash identical to the stored one.
    Unchanged,
    /// Content hash differs from the stored one.
    ContentChanged,
    /// The entry was in `error` and is now `completed`.
    Recovered,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerValidationError {
    #[error("entry stored under {map_key:?} is keyed {entry_key:?}")]
    KeyMismatch { map_key: String, entry_key: String },
    #[error("entry {key:?} is invalid: {reason}")]
    InvalidEntry { key: String, reason: String },
    #[error("last_updated precedes created_at")]
    TimestampOrder,
    #[error("last_updated precedes the last processing of {key:?}")]
    StaleLastUpdated { key: String },
}

/// The persisted document: every known item key and its processing state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    version: String,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    // BTreeMap keeps the serialized document sorted and line-diffable.
    #[serde(default)]
    entries: BTreeMap<String, EntryState>,
    #[serde(default)]
    statistics: LedgerStatistics,
}

impl Ledger {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: CURRENT_SCHEMA_VERSION.to_string(),
            created_at: now,
            last_updated: now,
            entries: BTreeMap::new(),
            statistics: LedgerStatistics::default(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn statistics(&self) -> LedgerStatistics {
        self.statistics
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &EntryState> {
        self.entries.values()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&EntryState> {
        self.entries.get(key)
    }

    /// True unless the key is stored as `completed` with exactly this digest.
    pub fn needs_update(&self, key: &str, digest: &str) -> bool {
        match self.entries.get(key) {
            Some(entry) => !entry.is_completed() || entry.content_hash() != Some(digest),
            None => true,
        }
    }

    /// Keys not present in the ledger, in input order and as given. Keys are
    /// looked up trimmed; a key that is not an absolute url is never present.
    pub fn unprocessed<'a, I>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter()
            .filter(|key| match validate_key(key) {
                Ok(canonical) => !self.entries.contains_key(&canonical),
                Err(_) => true,
            })
            .map(str::to_string)
            .collect()
    }

    /// Keys currently in the given status, sorted.
    pub fn keys_with_status(&self, status: EntryStatus) -> Vec<String> {
        self.entries
            .values()
            .filter(|entry| entry.status() == status)
            .map(|entry| entry.key().to_string())
            .collect()
    }

    pub fn report(&self) -> StatisticsReport {
        let completed_entries = self.entries.values().filter(|e| e.is_completed()).count();
        StatisticsReport {
            total_entries: self.entries.len(),
            completed_entries,
            error_entries: self.entries.len() - completed_entries,
            total_processed: self.statistics.total_processed,
            total_updated: self.statistics.total_updated,
            total_errors: self.statistics.total_errors,
        }
    }

    /// Records a successful processing of `record` whose content hashes to `digest`.
    pub fn record_success(
        &mut self,
        record: &ArticleRecord,
        digest: String,
        now: DateTime<Utc>,
    ) -> UpsertOutcome {
        let title = record.title().map(str::to_string);
        let author = record.author().map(str::to_string);

        let outcome = match self.entries.get_mut(record.key()) {
            Some(entry) => {
                let was_completed = entry.is_completed();
                let previous = entry.complete(title, author, digest.clone(), now);
                match previous {
                    _ if !was_completed => UpsertOutcome::Recovered,
                    Some(old) if old == digest => UpsertOutcome::Unchanged,
                    _ => {
                        self.statistics.total_updated += 1;
                        UpsertOutcome::ContentChanged
                    }
                }
            }
            None => {
                let key = record.key().to_string();
                let entry = EntryState::completed(key.clone(), title, author, digest, now);
                self.entries.insert(key, entry);
                self.statistics.total_processed += 1;
                UpsertOutcome::Inserted
            }
        };
        self.touch(now);
        outcome
    }

    /// Records a failed processing attempt for `key`.
    pub fn record_error(&mut self, key: &str, message: &str, now: DateTime<Utc>) {
        match self.entries.get_mut(key) {
            Some(entry) => entry.fail(message.to_string(), now),
            None => {
                let entry = EntryState::failed(key.to_string(), message.to_string(), now);
                self.entries.insert(key.to_string(), entry);
            }
        }
        self.statistics.total_errors += 1;
        self.touch(now);
    }

    pub fn remove(&mut self, key: &str, now: DateTime<Utc>) -> Option<EntryState> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.touch(now);
        }
        removed
    }

    /// Drops every entry last processed strictly before `now - retention_days`.
    /// Returns how many were removed.
    pub fn sweep(&mut self, retention_days: u32, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(i64::from(retention_days));
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_processed_at() >= cutoff);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.touch(now);
        }
        removed
    }

    /// Advances `last_updated` to `now` without ever moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = self.last_updated.max(now);
    }

    /// Checks the document-level and per-entry invariants of a loaded ledger.
    pub fn validate(&self) -> Result<(), LedgerValidationError> {
        if self.last_updated < self.created_at {
            return Err(LedgerValidationError::TimestampOrder);
        }
        for (map_key, entry) in &self.entries {
            if map_key != entry.key() {
                return Err(LedgerValidationError::KeyMismatch {
                    map_key: map_key.clone(),
                    entry_key: entry.key().to_string(),
                });
            }
            entry
                .check()
                .map_err(|reason| LedgerValidationError::InvalidEntry {
                    key: map_key.clone(),
                    reason,
                })?;
            if entry.last_processed_at() > self.last_updated {
                return Err(LedgerValidationError::StaleLastUpdated {
                    key: map_key.clone(),
                });
            }
        }
        Ok(())
    }
}
