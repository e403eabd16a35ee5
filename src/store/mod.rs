//! Storage abstraction for GitHub Memory.
//!
//! The [`Store`] trait defines every persistence operation the event
//! translator and the query façade need. Two backends implement it:
//! [`SqliteStore`](sqlite::SqliteStore) for production and
//! [`InMemoryStore`](memory::InMemoryStore) for tests and embedding.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`upsert_pull_request`](Store::upsert_pull_request) | Insert or fully replace by `(repository, number)` |
//! | [`upsert_commit`](Store::upsert_commit) | Insert or fully replace by commit hash |
//! | [`get_pull_request`](Store::get_pull_request) | Point lookup, `None` when absent |
//! | [`get_commit`](Store::get_commit) | Point lookup, `None` when absent |
//! | [`search_pull_requests`](Store::search_pull_requests) | Filtered search, newest `updated_at` first |
//! | [`search_commits`](Store::search_commits) | Filtered search, newest `timestamp` first |
//!
//! Searches return at most [`SEARCH_LIMIT`] records. There is no pagination;
//! callers needing more must narrow their filters.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::MemoryError;
use crate::filter::{Column, Filter};
use crate::models::{CommitRecord, PullRequestRecord};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Maximum number of records returned by a search.
pub const SEARCH_LIMIT: usize = 50;

/// Columns matched by the free-text part of a pull request search.
pub const PULL_REQUEST_TEXT_COLUMNS: &[Column] = &[Column::Title, Column::Body];

/// Columns matched by the free-text part of a commit search.
pub const COMMIT_TEXT_COLUMNS: &[Column] = &[Column::Message];

/// Criteria for [`Store::search_pull_requests`]. Empty text and absent or
/// empty filters impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestQuery {
    pub text: String,
    pub repository: Option<String>,
    pub author: Option<String>,
    pub state: Option<String>,
}

impl PullRequestQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn filter(&self) -> Filter {
        Filter::new()
            .contains(PULL_REQUEST_TEXT_COLUMNS, &self.text)
            .equals(Column::Repository, self.repository.as_deref())
            .equals(Column::Author, self.author.as_deref())
            .equals(Column::State, self.state.as_deref())
    }
}

/// Criteria for [`Store::search_commits`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitQuery {
    pub text: String,
    pub repository: Option<String>,
    pub author: Option<String>,
}

impl CommitQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn filter(&self) -> Filter {
        Filter::new()
            .contains(COMMIT_TEXT_COLUMNS, &self.text)
            .equals(Column::Repository, self.repository.as_deref())
            .equals(Column::Author, self.author.as_deref())
    }
}

/// Persistence backend for pull request and commit records.
///
/// Upserts replace the whole row; there is no field-level merge and no
/// delete. Implementations must make each upsert atomic so concurrent
/// writers to the same key leave exactly one of the written records.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or fully replace the row keyed by `(repository, number)`.
    async fn upsert_pull_request(&self, record: &PullRequestRecord) -> Result<(), MemoryError>;

    /// Insert or fully replace the row keyed by `id`.
    async fn upsert_commit(&self, record: &CommitRecord) -> Result<(), MemoryError>;

    async fn get_pull_request(
        &self,
        repository: &str,
        number: i64,
    ) -> Result<Option<PullRequestRecord>, MemoryError>;

    async fn get_commit(&self, id: &str) -> Result<Option<CommitRecord>, MemoryError>;

    /// Ordered by `updated_at` descending, ties in storage order.
    async fn search_pull_requests(
        &self,
        query: &PullRequestQuery,
    ) -> Result<Vec<PullRequestRecord>, MemoryError>;

    /// Ordered by `timestamp` descending, ties in storage order.
    async fn search_commits(&self, query: &CommitQuery) -> Result<Vec<CommitRecord>, MemoryError>;
}
