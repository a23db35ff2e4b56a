use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("item key is empty")]
    EmptyKey,
    #[error("item key {key:?} is not an absolute url: {reason}")]
    InvalidUrl { key: String, reason: String },
}

/// One unit of work as handed to the ledger by the content pipeline.
///
/// The key is validated on construction, so a record that exists is always
/// safe to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    key: String,
    title: Option<String>,
    author: Option<String>,
    content: String,
}

impl ArticleRecord {
    pub fn new(key: &str, content: impl Into<String>) -> Result<Self, RecordError> {
        Ok(Self {
            key: validate_key(key)?,
            title: None,
            author: None,
            content: content.into(),
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = non_empty(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = non_empty(author.into());
        self
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

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Trim a key and check that it is an absolute url. Returns the trimmed key.
pub fn validate_key(key: &str) -> Result<String, RecordError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(RecordError::EmptyKey);
    }
    Url::parse(trimmed).map_err(|err| RecordError::InvalidUrl {
        key: trimmed.to_string(),
        reason: err.to_string(),
    })?;
    Ok(trimmed.to_string())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
