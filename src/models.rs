//! Core data models used throughout GitHub Memory.
//!
//! These are the two record kinds persisted by the [`Store`](crate::store::Store):
//! pull requests keyed by `(repository, number)` and commits keyed by their hash.
//! Timestamps are ISO-8601 strings and are ordered lexically, so writers must
//! supply zero-padded values in a single offset (the translator normalizes to UTC).

use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// A pull request as stored in the `pull_requests` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    /// Provider-assigned surface id. Stored, never used for conflict resolution.
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub body: Option<String>,
    /// Open vocabulary (`open`, `closed`, ...), not enforced.
    pub state: String,
    pub author: String,
    /// `owner/name`, treated as an opaque string.
    pub repository: String,
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
}

impl PullRequestRecord {
    /// Check the fields the store requires before a write.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.number < 1 {
            return Err(MemoryError::validation(format!(
                "pull request number must be >= 1, got {}",
                self.number
            )));
        }
        require_non_empty("pull request repository", &self.repository)?;
        require_non_empty("pull request title", &self.title)?;
        require_non_empty("pull request created_at", &self.created_at)?;
        require_non_empty("pull request updated_at", &self.updated_at)?;
        Ok(())
    }
}

/// A commit as stored in the `commits` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Commit hash. Unique across all repositories.
    pub id: String,
    pub message: String,
    pub author: String,
    pub repository: String,
    pub url: String,
    pub timestamp: String,
}

impl CommitRecord {
    /// Check the fields the store requires before a write.
    ///
    /// An empty `message` is accepted: git allows commits without one.
    pub fn validate(&self) -> Result<(), MemoryError> {
        require_non_empty("commit id", &self.id)?;
        require_non_empty("commit repository", &self.repository)?;
        require_non_empty("commit timestamp", &self.timestamp)?;
        Ok(())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), MemoryError> {
    if value.trim().is_empty() {
        return Err(MemoryError::validation(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}
