//! Event translation: GitHub webhook payloads into store writes.
//!
//! Payloads arrive as loosely-typed JSON. They are deserialized into
//! `Raw*` structs where every field is optional, then checked and converted
//! into strict [`PullRequestRecord`]s and [`CommitRecord`]s before anything
//! reaches the [`Store`]. Only the fields this crate persists are read.
//!
//! | Event | Requires | Writes |
//! |-------|----------|--------|
//! | `pull_request` | `pull_request`, `repository` | one pull request |
//! | `push` | `commits`, `repository` | one commit per list entry, in order |
//! | anything else | | nothing |
//!
//! A payload missing a required top-level object is accepted as a no-op.
//! A present object missing a required field fails with
//! [`MemoryError::Validation`]. Store failures propagate unchanged; the
//! translator never retries.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::MemoryError;
use crate::models::{CommitRecord, PullRequestRecord};
use crate::store::Store;

/// Author recorded when a payload names nobody.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// The kind of webhook delivery, from the `X-GitHub-Event` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    PullRequest,
    Push,
    Other(String),
}

impl EventKind {
    /// Parse the header value. A missing header is an unnamed `Other`.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("pull_request") => EventKind::PullRequest,
            Some("push") => EventKind::Push,
            Some(other) => EventKind::Other(other.to_string()),
            None => EventKind::Other(String::new()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::PullRequest => f.write_str("pull_request"),
            EventKind::Push => f.write_str("push"),
            EventKind::Other(name) if name.is_empty() => f.write_str("(none)"),
            EventKind::Other(name) => f.write_str(name),
        }
    }
}

/// Number of records written for one delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub pull_requests: usize,
    pub commits: usize,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    pull_request: Option<RawPullRequest>,
    commits: Option<Vec<RawCommit>>,
    repository: Option<RawRepository>,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    id: Option<i64>,
    number: Option<i64>,
    title: Option<String>,
    body: Option<String>,
    state: Option<String>,
    user: Option<RawUser>,
    html_url: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    id: Option<String>,
    message: Option<String>,
    author: Option<RawCommitAuthor>,
    url: Option<String>,
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCommitAuthor {
    name: Option<String>,
    username: Option<String>,
}

/// Maps webhook deliveries onto [`Store`] upserts.
#[derive(Clone)]
pub struct Translator {
    store: Arc<dyn Store>,
}

impl Translator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Translate one delivery and write the resulting records.
    ///
    /// `payload` is the raw request body. Events other than `pull_request`
    /// and `push` are ignored without parsing the body.
    pub async fn apply(
        &self,
        kind: &EventKind,
        payload: &[u8],
    ) -> Result<IngestSummary, MemoryError> {
        match kind {
            EventKind::PullRequest => self.apply_pull_request(parse_event(kind, payload)?).await,
            EventKind::Push => self.apply_push(parse_event(kind, payload)?).await,
            EventKind::Other(_) => {
                debug!(event = %kind, "ignoring event type");
                Ok(IngestSummary::default())
            }
        }
    }

    async fn apply_pull_request(&self, event: RawEvent) -> Result<IngestSummary, MemoryError> {
        let (Some(pr), Some(repo)) = (event.pull_request, event.repository) else {
            warn!("pull_request event missing pull_request or repository data");
            return Ok(IngestSummary::default());
        };

        let repository = repository_name(repo)?;
        let record = pull_request_record(pr, repository)?;
        self.store.upsert_pull_request(&record).await?;

        info!(
            repository = %record.repository,
            number = record.number,
            "indexed pull request"
        );

        Ok(IngestSummary {
            pull_requests: 1,
            commits: 0,
        })
    }

    async fn apply_push(&self, event: RawEvent) -> Result<IngestSummary, MemoryError> {
        let (Some(commits), Some(repo)) = (event.commits, event.repository) else {
            warn!("push event missing commits or repository data");
            return Ok(IngestSummary::default());
        };

        let repository = repository_name(repo)?;

        // Convert the whole batch first so a malformed entry writes nothing.
        let records = commits
            .into_iter()
            .map(|c| commit_record(c, &repository))
            .collect::<Result<Vec<_>, _>>()?;

        for record in &records {
            self.store.upsert_commit(record).await?;
            info!(
                repository = %record.repository,
                commit = short_sha(&record.id),
                "indexed commit"
            );
        }

        Ok(IngestSummary {
            pull_requests: 0,
            commits: records.len(),
        })
    }
}

fn parse_event(kind: &EventKind, payload: &[u8]) -> Result<RawEvent, MemoryError> {
    serde_json::from_slice(payload)
        .map_err(|e| MemoryError::validation(format!("malformed {} payload: {}", kind, e)))
}

fn repository_name(repo: RawRepository) -> Result<String, MemoryError> {
    repo.full_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| MemoryError::validation("repository.full_name is missing"))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, MemoryError> {
    value.ok_or_else(|| MemoryError::validation(format!("{} is missing", field)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn pull_request_record(
    pr: RawPullRequest,
    repository: String,
) -> Result<PullRequestRecord, MemoryError> {
    let author = pr
        .user
        .and_then(|u| non_empty(u.login))
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    let record = PullRequestRecord {
        id: required(pr.id, "pull_request.id")?,
        number: required(pr.number, "pull_request.number")?,
        title: required(pr.title, "pull_request.title")?,
        body: pr.body,
        state: required(pr.state, "pull_request.state")?,
        author,
        repository,
        url: required(pr.html_url, "pull_request.html_url")?,
        created_at: normalize_timestamp(&required(pr.created_at, "pull_request.created_at")?),
        updated_at: normalize_timestamp(&required(pr.updated_at, "pull_request.updated_at")?),
    };
    record.validate()?;
    Ok(record)
}

fn commit_record(commit: RawCommit, repository: &str) -> Result<CommitRecord, MemoryError> {
    let author = commit
        .author
        .and_then(|a| non_empty(a.username).or_else(|| non_empty(a.name)))
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    let record = CommitRecord {
        id: required(commit.id, "commits[].id")?,
        message: required(commit.message, "commits[].message")?,
        author,
        repository: repository.to_string(),
        url: required(commit.url, "commits[].url")?,
        timestamp: normalize_timestamp(&required(commit.timestamp, "commits[].timestamp")?),
    };
    record.validate()?;
    Ok(record)
}

/// Rewrite an RFC 3339 timestamp as UTC `YYYY-MM-DDTHH:MM:SSZ` so that
/// lexical order matches chronological order. Anything else is kept as-is.
///
/// Fractional seconds are truncated: a stored `.900Z` would otherwise sort
/// before the whole-second `Z` value of the same second.
pub fn normalize_timestamp(value: &str) -> String {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| {
            dt.with_timezone(&Utc)
                .format("%Y-%m-%dT%H:%M:%SZ")
                .to_string()
        })
        .unwrap_or_else(|_| value.to_string())
}

fn short_sha(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CommitQuery, InMemoryStore};
    use serde_json::json;

    fn translator() -> (Arc<InMemoryStore>, Translator) {
        let store = Arc::new(InMemoryStore::new());
        let translator = Translator::new(store.clone());
        (store, translator)
    }

    fn push_payload(commits: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "ref": "refs/heads/main",
            "commits": commits,
            "repository": { "full_name": "test/repo" }
        }))
        .unwrap()
    }

    fn commit(id: &str, author: serde_json::Value) -> serde_json::Value {
        json!({
            "id": id,
            "message": format!("commit {}", id),
            "author": author,
            "url": format!("https://github.com/test/repo/commit/{}", id),
            "timestamp": "2025-11-03T11:00:00Z"
        })
    }

    #[test]
    fn test_event_kind_from_header() {
        assert_eq!(EventKind::from_header(Some("pull_request")), EventKind::PullRequest);
        assert_eq!(EventKind::from_header(Some("push")), EventKind::Push);
        assert_eq!(
            EventKind::from_header(Some("issues")),
            EventKind::Other("issues".to_string())
        );
        assert_eq!(EventKind::from_header(None).to_string(), "(none)");
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(
            normalize_timestamp("2025-11-03T06:00:00-05:00"),
            "2025-11-03T11:00:00Z"
        );
        assert_eq!(normalize_timestamp("2025-11-03T11:00:00Z"), "2025-11-03T11:00:00Z");
        assert_eq!(normalize_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_normalize_timestamp_truncates_fractional_seconds() {
        let with_fraction = normalize_timestamp("2025-11-03T11:00:00.900Z");
        assert_eq!(with_fraction, "2025-11-03T11:00:00Z");
        assert!(with_fraction < normalize_timestamp("2025-11-03T11:00:01Z"));
    }

    #[tokio::test]
    async fn test_pull_request_event() {
        let (store, translator) = translator();
        let payload = serde_json::to_vec(&json!({
            "action": "opened",
            "pull_request": {
                "id": 1001,
                "number": 42,
                "title": "Add authentication feature",
                "body": "Implements OAuth2",
                "state": "open",
                "user": { "login": "alice" },
                "html_url": "https://github.com/test/repo/pull/42",
                "created_at": "2025-11-03T10:00:00Z",
                "updated_at": "2025-11-03T10:30:00Z"
            },
            "repository": { "full_name": "test/repo" }
        }))
        .unwrap();

        let summary = translator
            .apply(&EventKind::PullRequest, &payload)
            .await
            .unwrap();
        assert_eq!(summary.pull_requests, 1);

        let pr = store.get_pull_request("test/repo", 42).await.unwrap().unwrap();
        assert_eq!(pr.id, 1001);
        assert_eq!(pr.author, "alice");
        assert_eq!(pr.body.as_deref(), Some("Implements OAuth2"));
        assert_eq!(pr.updated_at, "2025-11-03T10:30:00Z");
    }

    #[tokio::test]
    async fn test_pull_request_without_user_is_unknown() {
        let (store, translator) = translator();
        let payload = serde_json::to_vec(&json!({
            "pull_request": {
                "id": 1, "number": 7, "title": "Ghost PR", "body": null, "state": "closed",
                "html_url": "https://github.com/test/repo/pull/7",
                "created_at": "2025-11-03T10:00:00Z", "updated_at": "2025-11-03T10:00:00Z"
            },
            "repository": { "full_name": "test/repo" }
        }))
        .unwrap();

        translator.apply(&EventKind::PullRequest, &payload).await.unwrap();
        let pr = store.get_pull_request("test/repo", 7).await.unwrap().unwrap();
        assert_eq!(pr.author, UNKNOWN_AUTHOR);
        assert!(pr.body.is_none());
    }

    #[tokio::test]
    async fn test_missing_objects_are_noops() {
        let (store, translator) = translator();

        let no_repo = serde_json::to_vec(&json!({ "pull_request": { "number": 1 } })).unwrap();
        let summary = translator.apply(&EventKind::PullRequest, &no_repo).await.unwrap();
        assert_eq!(summary, IngestSummary::default());

        let no_commits = serde_json::to_vec(&json!({ "repository": { "full_name": "a/b" } })).unwrap();
        let summary = translator.apply(&EventKind::Push, &no_commits).await.unwrap();
        assert_eq!(summary, IngestSummary::default());

        assert!(store
            .search_commits(&CommitQuery::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_other_events_ignored_without_parsing() {
        let (_store, translator) = translator();
        let summary = translator
            .apply(&EventKind::Other("issues".to_string()), b"not json at all")
            .await
            .unwrap();
        assert_eq!(summary, IngestSummary::default());
    }

    #[tokio::test]
    async fn test_malformed_fields_are_validation_errors() {
        let (_store, translator) = translator();

        let err = translator
            .apply(&EventKind::Push, b"{ this is not json")
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Validation(_)));

        let wrong_type = serde_json::to_vec(&json!({
            "pull_request": { "id": 1, "number": "forty-two", "title": "x" },
            "repository": { "full_name": "test/repo" }
        }))
        .unwrap();
        let err = translator
            .apply(&EventKind::PullRequest, &wrong_type)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Validation(_)));

        let missing_title = serde_json::to_vec(&json!({
            "pull_request": {
                "id": 1, "number": 3, "state": "open",
                "html_url": "u", "created_at": "2025-11-03T10:00:00Z", "updated_at": "2025-11-03T10:00:00Z"
            },
            "repository": { "full_name": "test/repo" }
        }))
        .unwrap();
        let err = translator
            .apply(&EventKind::PullRequest, &missing_title)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("pull_request.title"));
    }

    #[tokio::test]
    async fn test_commit_author_precedence() {
        let (store, translator) = translator();
        let payload = push_payload(json!([
            commit("aaa1111", json!({ "username": "alice-gh", "name": "Alice Liddell" })),
            commit("bbb2222", json!({ "name": "Bob Builder" })),
            commit("ccc3333", json!({ "email": "nobody@example.com" })),
            commit("ddd4444", json!({ "username": "", "name": "Dee" })),
        ]));

        let summary = translator.apply(&EventKind::Push, &payload).await.unwrap();
        assert_eq!(summary.commits, 4);

        let author = |id: &'static str| {
            let store = store.clone();
            async move { store.get_commit(id).await.unwrap().unwrap().author }
        };
        assert_eq!(author("aaa1111").await, "alice-gh");
        assert_eq!(author("bbb2222").await, "Bob Builder");
        assert_eq!(author("ccc3333").await, UNKNOWN_AUTHOR);
        assert_eq!(author("ddd4444").await, "Dee");
    }

    #[tokio::test]
    async fn test_commit_without_author_object() {
        let (store, translator) = translator();
        let payload = push_payload(json!([{
            "id": "eee5555",
            "message": "orphan",
            "url": "https://github.com/test/repo/commit/eee5555",
            "timestamp": "2025-11-03T11:00:00Z"
        }]));
        translator.apply(&EventKind::Push, &payload).await.unwrap();
        let c = store.get_commit("eee5555").await.unwrap().unwrap();
        assert_eq!(c.author, UNKNOWN_AUTHOR);
    }

    #[tokio::test]
    async fn test_later_duplicate_in_batch_wins() {
        let (store, translator) = translator();
        let mut second = commit("abc1234", json!({ "username": "bob" }));
        second["message"] = json!("amended message");
        let payload = push_payload(json!([commit("abc1234", json!({ "username": "alice" })), second]));

        let summary = translator.apply(&EventKind::Push, &payload).await.unwrap();
        assert_eq!(summary.commits, 2);

        let c = store.get_commit("abc1234").await.unwrap().unwrap();
        assert_eq!(c.author, "bob");
        assert_eq!(c.message, "amended message");
    }

    #[tokio::test]
    async fn test_invalid_commit_in_batch_writes_nothing() {
        let (store, translator) = translator();
        let payload = push_payload(json!([
            commit("fff6666", json!({ "username": "alice" })),
            { "message": "no id", "url": "u", "timestamp": "2025-11-03T11:00:00Z" }
        ]));

        assert!(translator.apply(&EventKind::Push, &payload).await.is_err());
        assert!(store.get_commit("fff6666").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_push_timestamps_normalized_to_utc() {
        let (store, translator) = translator();
        let mut c = commit("1234567abc", json!({ "username": "alice" }));
        c["timestamp"] = json!("2025-11-03T06:00:00-05:00");
        translator
            .apply(&EventKind::Push, &push_payload(json!([c])))
            .await
            .unwrap();
        let stored = store.get_commit("1234567abc").await.unwrap().unwrap();
        assert_eq!(stored.timestamp, "2025-11-03T11:00:00Z");
    }
}
