//! `ghmem get`: print a single stored record.

use anyhow::Result;

use crate::models::{CommitRecord, PullRequestRecord};
use crate::store::Store;

/// Print the pull request, or a not-found line on stderr.
///
/// Returns whether the record existed; the CLI maps `false` to exit code 1.
pub async fn run_get_pull_request(store: &dyn Store, repository: &str, number: i64) -> Result<bool> {
    match store.get_pull_request(repository, number).await? {
        Some(pr) => {
            print!("{}", format_pull_request(&pr));
            Ok(true)
        }
        None => {
            eprintln!("Pull request not found: {}#{}", repository, number);
            Ok(false)
        }
    }
}

/// Print the commit, or a not-found line on stderr.
pub async fn run_get_commit(store: &dyn Store, id: &str) -> Result<bool> {
    match store.get_commit(id).await? {
        Some(commit) => {
            print!("{}", format_commit(&commit));
            Ok(true)
        }
        None => {
            eprintln!("Commit not found: {}", id);
            Ok(false)
        }
    }
}

fn format_pull_request(pr: &PullRequestRecord) -> String {
    let mut out = String::new();
    out.push_str("--- Pull Request ---\n");
    out.push_str(&format!("repository:   {}\n", pr.repository));
    out.push_str(&format!("number:       {}\n", pr.number));
    out.push_str(&format!("id:           {}\n", pr.id));
    out.push_str(&format!("title:        {}\n", pr.title));
    out.push_str(&format!("state:        {}\n", pr.state));
    out.push_str(&format!("author:       {}\n", pr.author));
    out.push_str(&format!("url:          {}\n", pr.url));
    out.push_str(&format!("created_at:   {}\n", pr.created_at));
    out.push_str(&format!("updated_at:   {}\n", pr.updated_at));
    out.push('\n');
    out.push_str("--- Body ---\n");
    out.push_str(pr.body.as_deref().unwrap_or("(no description)"));
    out.push('\n');
    out
}

fn format_commit(commit: &CommitRecord) -> String {
    let mut out = String::new();
    out.push_str("--- Commit ---\n");
    out.push_str(&format!("id:           {}\n", commit.id));
    out.push_str(&format!("repository:   {}\n", commit.repository));
    out.push_str(&format!("author:       {}\n", commit.author));
    out.push_str(&format!("url:          {}\n", commit.url));
    out.push_str(&format!("timestamp:    {}\n", commit.timestamp));
    out.push('\n');
    out.push_str("--- Message ---\n");
    out.push_str(&commit.message);
    out.push('\n');
    out
}
