//! Integration tests for the SQLite store.
//!
//! Every test opens a fresh database file in a temporary directory, so
//! schema creation, upserts, and searches run against real SQLite.

use github_memory::config::Config;
use github_memory::error::MemoryError;
use github_memory::models::{CommitRecord, PullRequestRecord};
use github_memory::store::{CommitQuery, PullRequestQuery, SqliteStore, Store, SEARCH_LIMIT};
use github_memory::tools::QueryFacade;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn test_config(tmp: &TempDir) -> Config {
    let mut config = Config::default();
    config.db.path = tmp.path().join("data").join("memory.sqlite");
    config
}

fn pr(number: i64, title: &str, author: &str) -> PullRequestRecord {
    PullRequestRecord {
        id: 1000 + number,
        number,
        title: title.to_string(),
        body: None,
        state: "open".to_string(),
        author: author.to_string(),
        repository: "test/repo".to_string(),
        url: format!("https://github.com/test/repo/pull/{}", number),
        created_at: "2025-11-03T10:00:00Z".to_string(),
        updated_at: "2025-11-03T10:00:00Z".to_string(),
    }
}

fn commit(id: &str, message: &str, repository: &str) -> CommitRecord {
    CommitRecord {
        id: id.to_string(),
        message: message.to_string(),
        author: "alice".to_string(),
        repository: repository.to_string(),
        url: format!("https://github.com/{}/commit/{}", repository, id),
        timestamp: "2025-11-03T10:00:00Z".to_string(),
    }
}

fn numbers(results: &[PullRequestRecord]) -> Vec<i64> {
    results.iter().map(|p| p.number).collect()
}

#[tokio::test]
async fn test_open_creates_parent_directory_and_reopens() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);

    let store = SqliteStore::open(&cfg).await.unwrap();
    store
        .upsert_pull_request(&pr(1, "First", "alice"))
        .await
        .unwrap();
    store.close().await;
    assert!(cfg.db.path.exists());

    let reopened = SqliteStore::open(&cfg).await.unwrap();
    let found = reopened.get_pull_request("test/repo", 1).await.unwrap();
    assert_eq!(found.map(|p| p.title), Some("First".to_string()));
    reopened.close().await;
}

#[tokio::test]
async fn test_pull_request_upsert_is_idempotent_and_replaces() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();

    let mut record = pr(42, "Add authentication feature", "alice");
    record.body = Some("first draft".to_string());
    store.upsert_pull_request(&record).await.unwrap();
    store.upsert_pull_request(&record).await.unwrap();

    let mut updated = record.clone();
    updated.title = "Add OAuth2 authentication".to_string();
    updated.body = None;
    updated.state = "closed".to_string();
    updated.updated_at = "2025-11-04T09:00:00Z".to_string();
    store.upsert_pull_request(&updated).await.unwrap();

    let all = store
        .search_pull_requests(&PullRequestQuery::new(""))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0], updated);
}

#[tokio::test]
async fn test_same_number_in_other_repository_is_distinct() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();

    let a = pr(7, "In test/repo", "alice");
    let mut b = pr(7, "In other/repo", "alice");
    b.repository = "other/repo".to_string();
    store.upsert_pull_request(&a).await.unwrap();
    store.upsert_pull_request(&b).await.unwrap();

    assert_eq!(
        store.get_pull_request("test/repo", 7).await.unwrap(),
        Some(a)
    );
    assert_eq!(
        store.get_pull_request("other/repo", 7).await.unwrap(),
        Some(b)
    );
}

#[tokio::test]
async fn test_search_conjunction() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();
    store
        .upsert_pull_request(&pr(42, "Add authentication feature", "alice"))
        .await
        .unwrap();
    store
        .upsert_pull_request(&pr(43, "Fix bug in payment", "bob"))
        .await
        .unwrap();

    let by_text = store
        .search_pull_requests(&PullRequestQuery::new("authentication"))
        .await
        .unwrap();
    assert_eq!(numbers(&by_text), vec![42]);

    let by_filters = store
        .search_pull_requests(&PullRequestQuery::new("").repository("test/repo").author("bob"))
        .await
        .unwrap();
    assert_eq!(numbers(&by_filters), vec![43]);

    let none = store
        .search_pull_requests(&PullRequestQuery::new("authentication").author("bob"))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_text_search_covers_body_case_insensitively() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();
    let mut record = pr(5, "Refactor", "carol");
    record.body = Some("Moves the OAuth2 client into its own module".to_string());
    store.upsert_pull_request(&record).await.unwrap();

    let results = store
        .search_pull_requests(&PullRequestQuery::new("oauth2"))
        .await
        .unwrap();
    assert_eq!(numbers(&results), vec![5]);
}

#[tokio::test]
async fn test_absent_lookup_is_not_an_error() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();

    assert!(store
        .get_pull_request("test/repo", 999)
        .await
        .unwrap()
        .is_none());
    assert!(store.get_commit("deadbeef").await.unwrap().is_none());
}

#[tokio::test]
async fn test_result_cap_and_order() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();

    for n in 1..=60 {
        let mut record = pr(n, &format!("Change {}", n), "alice");
        record.updated_at = format!("2025-11-03T10:{:02}:00Z", n - 1);
        store.upsert_pull_request(&record).await.unwrap();
    }

    let results = store
        .search_pull_requests(&PullRequestQuery::new(""))
        .await
        .unwrap();
    assert_eq!(results.len(), SEARCH_LIMIT);
    assert_eq!(results[0].number, 60);
    assert_eq!(results[49].number, 11);
    assert!(results
        .windows(2)
        .all(|w| w[0].updated_at >= w[1].updated_at));
}

#[tokio::test]
async fn test_ties_keep_insertion_order() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();
    for n in [3, 1, 2] {
        store
            .upsert_pull_request(&pr(n, "Same time", "alice"))
            .await
            .unwrap();
    }

    let results = store
        .search_pull_requests(&PullRequestQuery::new(""))
        .await
        .unwrap();
    assert_eq!(numbers(&results), vec![3, 1, 2]);
}

#[tokio::test]
async fn test_query_text_is_bound_not_interpolated() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();
    store
        .upsert_pull_request(&pr(1, "Harmless", "alice"))
        .await
        .unwrap();

    let hostile = "'; DROP TABLE pull_requests; --";
    let results = store
        .search_pull_requests(&PullRequestQuery::new(hostile).author(hostile))
        .await
        .unwrap();
    assert!(results.is_empty());

    let still_there = store.get_pull_request("test/repo", 1).await.unwrap();
    assert!(still_there.is_some());
}

#[tokio::test]
async fn test_wildcards_in_query_are_not_escaped() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();
    store
        .upsert_commit(&commit("a1", "Fix login", "test/repo"))
        .await
        .unwrap();
    store
        .upsert_commit(&commit("b2", "Bump version", "test/repo"))
        .await
        .unwrap();

    let all = store.search_commits(&CommitQuery::new("%")).await.unwrap();
    assert_eq!(all.len(), 2);

    let underscore = store
        .search_commits(&CommitQuery::new("F_x"))
        .await
        .unwrap();
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].id, "a1");
}

#[tokio::test]
async fn test_commit_key_is_global_across_repositories() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();
    store
        .upsert_commit(&commit("abc123", "Original", "test/repo"))
        .await
        .unwrap();
    store
        .upsert_commit(&commit("abc123", "From the fork", "fork/repo"))
        .await
        .unwrap();

    let found = store.get_commit("abc123").await.unwrap().unwrap();
    assert_eq!(found.repository, "fork/repo");
    assert_eq!(found.message, "From the fork");

    let all = store.search_commits(&CommitQuery::new("")).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_commit_search_filters() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();

    let mut older = commit("c1", "Fix authentication bug", "test/repo");
    older.timestamp = "2025-11-03T09:00:00Z".to_string();
    let newer = commit("c2", "Fix authentication tests", "test/repo");
    let mut elsewhere = commit("c3", "Fix authentication docs", "other/repo");
    elsewhere.author = "bob".to_string();
    for c in [&older, &newer, &elsewhere] {
        store.upsert_commit(c).await.unwrap();
    }

    let results = store
        .search_commits(&CommitQuery::new("authentication").repository("test/repo"))
        .await
        .unwrap();
    let ids: Vec<&str> = results.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c2", "c1"]);

    let by_author = store
        .search_commits(&CommitQuery::new("").author("bob"))
        .await
        .unwrap();
    assert_eq!(by_author.len(), 1);
    assert_eq!(by_author[0].id, "c3");
}

#[tokio::test]
async fn test_invalid_records_are_rejected_without_writes() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();

    let mut bad = pr(1, "Title", "alice");
    bad.title = String::new();
    let err = store.upsert_pull_request(&bad).await.unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));

    let bad_commit = commit("", "msg", "test/repo");
    let err = store.upsert_commit(&bad_commit).await.unwrap_err();
    assert!(matches!(err, MemoryError::Validation(_)));

    assert!(store
        .search_pull_requests(&PullRequestQuery::new(""))
        .await
        .unwrap()
        .is_empty());
    assert!(store
        .search_commits(&CommitQuery::new(""))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_query_facade_over_sqlite() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(&test_config(&tmp)).await.unwrap());
    store
        .upsert_pull_request(&pr(42, "Add authentication feature", "alice"))
        .await
        .unwrap();
    let facade = QueryFacade::new(store.clone());

    let hit = facade
        .call(
            "get_pull_request",
            json!({ "repository": "test/repo", "number": "42" }),
        )
        .await;
    assert!(!hit.is_error);
    let record: PullRequestRecord = serde_json::from_str(&hit.text).unwrap();
    assert_eq!(record.number, 42);

    let search = facade
        .call("search_pull_requests", json!({ "query": null, "author": "alice" }))
        .await;
    assert!(!search.is_error);
    let results: Value = serde_json::from_str(&search.text).unwrap();
    assert_eq!(results.as_array().map(Vec::len), Some(1));

    let miss = facade
        .call("get_pull_request", json!({ "repository": "test/repo", "number": 999 }))
        .await;
    assert!(miss.is_error);

    store.close().await;
}

#[tokio::test]
async fn test_commit_result_cap_and_order() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteStore::open(&test_config(&tmp)).await.unwrap();

    for n in 0..60 {
        let mut record = commit(&format!("c{}", n), "Routine change", "test/repo");
        record.timestamp = format!("2025-11-03T10:{:02}:00Z", n);
        store.upsert_commit(&record).await.unwrap();
    }

    let results = store.search_commits(&CommitQuery::new("")).await.unwrap();
    assert_eq!(results.len(), SEARCH_LIMIT);
    assert_eq!(results[0].id, "c59");
    assert_eq!(results[49].id, "c10");
    assert!(results
        .windows(2)
        .all(|w| w[0].timestamp >= w[1].timestamp));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_leave_one_whole_write() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(&test_config(&tmp)).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..40 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut record = pr(42, &format!("write {}", i), &format!("author-{}", i));
            record.id = i;
            record.body = Some(format!("body {}", i));
            record.state = if i % 2 == 0 { "open" } else { "closed" }.to_string();
            record.updated_at = format!("2025-11-03T10:{:02}:00Z", i);
            store.upsert_pull_request(&record).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let all = store
        .search_pull_requests(&PullRequestQuery::new(""))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    let row = &all[0];
    let i = row.id;
    assert_eq!(row.number, 42);
    assert_eq!(row.title, format!("write {}", i));
    assert_eq!(row.author, format!("author-{}", i));
    assert_eq!(row.body, Some(format!("body {}", i)));
    assert_eq!(row.state, if i % 2 == 0 { "open" } else { "closed" });
    assert_eq!(row.updated_at, format!("2025-11-03T10:{:02}:00Z", i));

    store.close().await;
}
