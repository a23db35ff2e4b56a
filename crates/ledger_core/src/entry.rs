use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Completed,
    Error,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Completed => write!(f, "completed"),
            EntryStatus::Error => write!(f, "error"),
        }
    }
}

/// Processing state of a single item key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryState {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_hash: Option<String>,
    process_count: u64,
    first_processed_at: DateTime<Utc>,
    last_processed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl EntryState {
    pub(crate) fn completed(
        key: String,
        title: Option<String>,
        author: Option<String>,
        content_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            title,
            author,
            status: EntryStatus::Completed,
            content_hash: Some(content_hash),
            process_count: 1,
            first_processed_at: now,
            last_processed_at: now,
            error: None,
        }
    }

    pub(crate) fn failed(key: String, message: String, now: DateTime<Utc>) -> Self {
        Self {
            key,
            title: None,
            author: None,
            status: EntryStatus::Error,
            content_hash: None,
            process_count: 1,
            first_processed_at: now,
            last_processed_at: now,
            error: Some(message),
        }
    }

    /// Moves the entry to `completed`. Returns the previous hash.
    pub(crate) fn complete(
        &mut self,
        title: Option<String>,
        author: Option<String>,
        content_hash: String,
        now: DateTime<Utc>,
    ) -> Option<String> {
        if title.is_some() {
            self.title = title;
        }
        if author.is_some() {
            self.author = author;
        }
        self.status = EntryStatus::Completed;
        self.error = None;
        self.process_count = self.process_count.saturating_add(1);
        self.stamp(now);
        self.content_hash.replace(content_hash)
    }

    /// Moves the entry to `error`. `process_count` only counts upserts.
    pub(crate) fn fail(&mut self, message: String, now: DateTime<Utc>) {
        self.status = EntryStatus::Error;
        self.error = Some(message);
        self.content_hash = None;
        self.stamp(now);
    }

    fn stamp(&mut self, now: DateTime<Utc>) {
        // first_processed_at is never touched after creation
        self.last_processed_at = self.last_processed_at.max(now);
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn status(&self) -> EntryStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == EntryStatus::Completed
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    pub fn process_count(&self) -> u64 {
        self.process_count
    }

    pub fn first_processed_at(&self) -> DateTime<Utc> {
        self.first_processed_at
    }

    pub fn last_processed_at(&self) -> DateTime<Utc> {
        self.last_processed_at
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Checks the per-entry invariants. Returns a description of the first violation.
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.process_count == 0 {
            return Err("process_count is zero".into());
        }
        if self.first_processed_at > self.last_processed_at {
            return Err("first_processed_at is after last_processed_at".into());
        }
        match self.status {
            EntryStatus::Completed if self.content_hash.is_none() => {
                Err("completed entry without content_hash".into())
            }
            EntryStatus::Completed if self.error.is_some() => {
                Err("completed entry carries an error".into())
            }
            EntryStatus::Error if self.content_hash.is_some() => {
                Err("error entry carries a content_hash".into())
            }
            EntryStatus::Error if self.error.is_none() => {
                Err("error entry without a message".into())
            }
            _ => Ok(()),
        }
    }
}
