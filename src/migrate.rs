use sqlx::SqlitePool;

use crate::error::MemoryError;

/// Create the schema if it does not exist yet. Safe to run on every start.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MemoryError> {
    // `id` is the provider's surface id, not the key: conflicts resolve on
    // (repository, number) and the implicit rowid keeps first-insert order.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pull_requests (
            id INTEGER NOT NULL,
            number INTEGER NOT NULL,
            title TEXT NOT NULL,
            body TEXT,
            state TEXT NOT NULL,
            author TEXT NOT NULL,
            repository TEXT NOT NULL,
            url TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(repository, number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS commits (
            id TEXT PRIMARY KEY,
            message TEXT NOT NULL,
            author TEXT NOT NULL,
            repository TEXT NOT NULL,
            url TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_pr_repository ON pull_requests(repository)",
        "CREATE INDEX IF NOT EXISTS idx_pr_author ON pull_requests(author)",
        "CREATE INDEX IF NOT EXISTS idx_pr_state ON pull_requests(state)",
        "CREATE INDEX IF NOT EXISTS idx_pr_updated_at ON pull_requests(updated_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_commit_repository ON commits(repository)",
        "CREATE INDEX IF NOT EXISTS idx_commit_author ON commits(author)",
        "CREATE INDEX IF NOT EXISTS idx_commit_timestamp ON commits(timestamp DESC)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
