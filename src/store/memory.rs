//! In-memory [`Store`] implementation for testing and embedding.
//!
//! Records live in insertion-ordered `Vec`s behind `std::sync::RwLock`.
//! An upsert replaces a record in place under a single write lock, so the
//! record keeps its original position, mirroring SQLite's rowid on conflict.
//! Search filters are evaluated with the same [`Filter`](crate::filter::Filter)
//! predicates the SQLite backend renders into SQL.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::MemoryError;
use crate::models::{CommitRecord, PullRequestRecord};

use super::{CommitQuery, PullRequestQuery, Store, SEARCH_LIMIT};

/// In-memory store for tests and embedders that need no persistence.
#[derive(Default)]
pub struct InMemoryStore {
    pull_requests: RwLock<Vec<PullRequestRecord>>,
    commits: RwLock<Vec<CommitRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> MemoryError {
    MemoryError::StorageUnavailable("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_pull_request(&self, record: &PullRequestRecord) -> Result<(), MemoryError> {
        record.validate()?;
        let mut prs = self.pull_requests.write().map_err(poisoned)?;
        match prs
            .iter_mut()
            .find(|pr| pr.repository == record.repository && pr.number == record.number)
        {
            Some(existing) => *existing = record.clone(),
            None => prs.push(record.clone()),
        }
        Ok(())
    }

    async fn upsert_commit(&self, record: &CommitRecord) -> Result<(), MemoryError> {
        record.validate()?;
        let mut commits = self.commits.write().map_err(poisoned)?;
        match commits.iter_mut().find(|c| c.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => commits.push(record.clone()),
        }
        Ok(())
    }

    async fn get_pull_request(
        &self,
        repository: &str,
        number: i64,
    ) -> Result<Option<PullRequestRecord>, MemoryError> {
        let prs = self.pull_requests.read().map_err(poisoned)?;
        Ok(prs
            .iter()
            .find(|pr| pr.repository == repository && pr.number == number)
            .cloned())
    }

    async fn get_commit(&self, id: &str) -> Result<Option<CommitRecord>, MemoryError> {
        let commits = self.commits.read().map_err(poisoned)?;
        Ok(commits.iter().find(|c| c.id == id).cloned())
    }

    async fn search_pull_requests(
        &self,
        query: &PullRequestQuery,
    ) -> Result<Vec<PullRequestRecord>, MemoryError> {
        let filter = query.filter();
        let prs = self.pull_requests.read().map_err(poisoned)?;
        let mut results: Vec<PullRequestRecord> =
            prs.iter().filter(|pr| filter.matches(*pr)).cloned().collect();
        // Stable sort: equal timestamps stay in storage order.
        results.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        results.truncate(SEARCH_LIMIT);
        Ok(results)
    }

    async fn search_commits(&self, query: &CommitQuery) -> Result<Vec<CommitRecord>, MemoryError> {
        let filter = query.filter();
        let commits = self.commits.read().map_err(poisoned)?;
        let mut results: Vec<CommitRecord> =
            commits.iter().filter(|c| filter.matches(*c)).cloned().collect();
        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        results.truncate(SEARCH_LIMIT);
        Ok(results)
    }
}
