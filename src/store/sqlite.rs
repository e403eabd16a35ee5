//! SQLite-backed [`Store`] implementation.
//!
//! Upserts are single `INSERT ... ON CONFLICT DO UPDATE` statements, so
//! SQLite's statement atomicity is what serializes concurrent writers to
//! the same key. On conflict the original rowid is kept, which is what
//! "storage order" means for search tie-breaking.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::config::Config;
use crate::error::MemoryError;
use crate::models::{CommitRecord, PullRequestRecord};
use crate::{db, migrate};

use super::{CommitQuery, PullRequestQuery, Store, SEARCH_LIMIT};

const PULL_REQUEST_COLUMNS: &str =
    "id, number, title, body, state, author, repository, url, created_at, updated_at";

const COMMIT_COLUMNS: &str = "id, message, author, repository, url, timestamp";

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database named by `[db].path`, creating the file, its parent
    /// directory, and the schema as needed.
    pub async fn open(config: &Config) -> Result<Self, MemoryError> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Wrap an existing pool. The schema must already exist.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close every pooled connection. Called once at shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn pull_request_from_row(row: &SqliteRow) -> Result<PullRequestRecord, MemoryError> {
    Ok(PullRequestRecord {
        id: row.try_get("id")?,
        number: row.try_get("number")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        state: row.try_get("state")?,
        author: row.try_get("author")?,
        repository: row.try_get("repository")?,
        url: row.try_get("url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn commit_from_row(row: &SqliteRow) -> Result<CommitRecord, MemoryError> {
    Ok(CommitRecord {
        id: row.try_get("id")?,
        message: row.try_get("message")?,
        author: row.try_get("author")?,
        repository: row.try_get("repository")?,
        url: row.try_get("url")?,
        timestamp: row.try_get("timestamp")?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_pull_request(&self, record: &PullRequestRecord) -> Result<(), MemoryError> {
        record.validate()?;

        sqlx::query(
            r#"
            INSERT INTO pull_requests (id, number, title, body, state, author,
                                       repository, url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(repository, number) DO UPDATE SET
                id = excluded.id,
                title = excluded.title,
                body = excluded.body,
                state = excluded.state,
                author = excluded.author,
                url = excluded.url,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.id)
        .bind(record.number)
        .bind(&record.title)
        .bind(&record.body)
        .bind(&record.state)
        .bind(&record.author)
        .bind(&record.repository)
        .bind(&record.url)
        .bind(&record.created_at)
        .bind(&record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_commit(&self, record: &CommitRecord) -> Result<(), MemoryError> {
        record.validate()?;

        sqlx::query(
            r#"
            INSERT INTO commits (id, message, author, repository, url, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                message = excluded.message,
                author = excluded.author,
                repository = excluded.repository,
                url = excluded.url,
                timestamp = excluded.timestamp
            "#,
        )
        .bind(&record.id)
        .bind(&record.message)
        .bind(&record.author)
        .bind(&record.repository)
        .bind(&record.url)
        .bind(&record.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_pull_request(
        &self,
        repository: &str,
        number: i64,
    ) -> Result<Option<PullRequestRecord>, MemoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, number, title, body, state, author, repository, url, created_at, updated_at
            FROM pull_requests
            WHERE repository = ? AND number = ?
            "#,
        )
        .bind(repository)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(pull_request_from_row).transpose()
    }

    async fn get_commit(&self, id: &str) -> Result<Option<CommitRecord>, MemoryError> {
        let row = sqlx::query(
            "SELECT id, message, author, repository, url, timestamp FROM commits WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(commit_from_row).transpose()
    }

    async fn search_pull_requests(
        &self,
        query: &PullRequestQuery,
    ) -> Result<Vec<PullRequestRecord>, MemoryError> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM pull_requests", PULL_REQUEST_COLUMNS));
        query.filter().push_where(&mut qb);
        qb.push(" ORDER BY updated_at DESC, rowid ASC LIMIT ");
        qb.push_bind(SEARCH_LIMIT as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(pull_request_from_row).collect()
    }

    async fn search_commits(&self, query: &CommitQuery) -> Result<Vec<CommitRecord>, MemoryError> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM commits", COMMIT_COLUMNS));
        query.filter().push_where(&mut qb);
        qb.push(" ORDER BY timestamp DESC, rowid ASC LIMIT ");
        qb.push_bind(SEARCH_LIMIT as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(commit_from_row).collect()
    }
}
