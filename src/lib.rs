//! # GitHub Memory
//!
//! A local, searchable memory of GitHub pull requests and commits.
//!
//! GitHub delivers `pull_request` and `push` events to a webhook listener,
//! which verifies each delivery's HMAC signature and translates the payload
//! into normalized records in SQLite. AI assistants read the memory back
//! through four MCP tools: filtered keyword search and point lookup for
//! both record kinds.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌────────────┐   ┌──────────┐
//! │  GitHub  │──▶│ Webhook Gate│──▶│ Translator │──▶│  SQLite  │
//! │ webhooks │   │ HMAC-SHA256 │   │ PR / push  │   │  Store   │
//! └──────────┘   └─────────────┘   └────────────┘   └────┬─────┘
//!                                                        │
//!                                  ┌─────────────────────┤
//!                                  ▼                     ▼
//!                            ┌──────────┐          ┌──────────┐
//!                            │   CLI    │          │   MCP    │
//!                            │ (ghmem)  │          │  tools   │
//!                            └──────────┘          └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ghmem init                                  # create database
//! GITHUB_WEBHOOK_SECRET=... ghmem serve webhook
//! ghmem search prs "authentication" --repo owner/repo
//! ghmem serve mcp                             # stdio MCP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`models`] | Pull request and commit records |
//! | [`error`] | Error taxonomy |
//! | [`filter`] | Typed search predicates |
//! | [`store`] | Storage trait, SQLite and in-memory backends |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`translate`] | Webhook payload → record translation |
//! | [`webhook`] | Signature verification and HTTP listener |
//! | [`tools`] | Query façade (tool registry) |
//! | [`mcp`] | MCP protocol bridge |
//! | [`search`] | CLI search output |
//! | [`get`] | CLI record output |
//! | [`logging`] | Tracing subscriber setup |

pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod get;
pub mod logging;
pub mod mcp;
pub mod migrate;
pub mod models;
pub mod search;
pub mod store;
pub mod tools;
pub mod translate;
pub mod webhook;
