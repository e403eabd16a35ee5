//! `ghmem search`: print filtered search results to stdout.
//!
//! Uses the same store queries as the MCP tools, so results, ordering, and
//! the result cap are identical.

use anyhow::Result;

use crate::models::{CommitRecord, PullRequestRecord};
use crate::store::{CommitQuery, PullRequestQuery, Store};

const EXCERPT_CHARS: usize = 120;

/// Collapse whitespace and cut to a one-line excerpt.
fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > EXCERPT_CHARS {
        let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

pub async fn run_search_pull_requests(store: &dyn Store, query: &PullRequestQuery) -> Result<()> {
    let results = store.search_pull_requests(query).await?;
    print!("{}", format_pull_requests(&results));
    Ok(())
}

pub async fn run_search_commits(store: &dyn Store, query: &CommitQuery) -> Result<()> {
    let results = store.search_commits(query).await?;
    print!("{}", format_commits(&results));
    Ok(())
}

fn format_pull_requests(results: &[PullRequestRecord]) -> String {
    if results.is_empty() {
        return "No results.\n".to_string();
    }

    let mut out = String::new();
    for (i, pr) in results.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}] {}#{} {}\n",
            i + 1,
            pr.state,
            pr.repository,
            pr.number,
            pr.title
        ));
        out.push_str(&format!("    author: {}\n", pr.author));
        out.push_str(&format!("    updated: {}\n", pr.updated_at));
        if !pr.url.is_empty() {
            out.push_str(&format!("    url: {}\n", pr.url));
        }
        if let Some(body) = pr.body.as_deref().filter(|b| !b.trim().is_empty()) {
            out.push_str(&format!("    excerpt: \"{}\"\n", excerpt(body)));
        }
        out.push('\n');
    }
    out
}

fn format_commits(results: &[CommitRecord]) -> String {
    if results.is_empty() {
        return "No results.\n".to_string();
    }

    let mut out = String::new();
    for (i, commit) in results.iter().enumerate() {
        let short: String = commit.id.chars().take(7).collect();
        let subject = commit.message.lines().next().unwrap_or_default();
        out.push_str(&format!(
            "{}. {} {} {}\n",
            i + 1,
            short,
            commit.repository,
            subject
        ));
        out.push_str(&format!("    author: {}\n", commit.author));
        out.push_str(&format!("    timestamp: {}\n", commit.timestamp));
        if !commit.url.is_empty() {
            out.push_str(&format!("    url: {}\n", commit.url));
        }
        out.push('\n');
    }
    out
}
