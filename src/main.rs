//! # GitHub Memory CLI (`ghmem`)
//!
//! Runs the webhook listener and the MCP server, and offers direct access
//! to the stored records for inspection.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ghmem init` | Create the SQLite database and run schema migrations |
//! | `ghmem serve webhook` | Accept signed GitHub deliveries on `POST /webhook` |
//! | `ghmem serve mcp` | Serve the query tools over MCP (stdio or HTTP) |
//! | `ghmem search prs [QUERY]` | Search stored pull requests |
//! | `ghmem search commits [QUERY]` | Search stored commits |
//! | `ghmem get pr <REPO> <NUMBER>` | Print one pull request |
//! | `ghmem get commit <ID>` | Print one commit |
//!
//! ## Examples
//!
//! ```bash
//! ghmem init --config ./config/ghmem.toml
//! GITHUB_WEBHOOK_SECRET=s3cret WEBHOOK_PORT=8080 ghmem serve webhook
//! ghmem search prs "oauth" --repo octo/app --state open
//! ghmem serve mcp --transport http
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use github_memory::store::{CommitQuery, PullRequestQuery, SqliteStore, Store};
use github_memory::{config, get, logging, mcp, search, webhook};

/// GitHub Memory: a searchable local memory of pull requests and commits,
/// fed by GitHub webhooks and queried by AI assistants over MCP.
#[derive(Parser)]
#[command(name = "ghmem", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// A missing file means built-in defaults. `GITHUB_MEMORY_DB_PATH`,
    /// `WEBHOOK_PORT`, and `GITHUB_WEBHOOK_SECRET` override the file.
    #[arg(long, global = true, default_value = "./config/ghmem.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Start a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },

    /// Search stored records.
    Search {
        #[command(subcommand)]
        target: SearchTarget,
    },

    /// Print a single stored record. Exits with status 1 when absent.
    Get {
        #[command(subcommand)]
        target: GetTarget,
    },
}

#[derive(Subcommand)]
enum ServeService {
    /// Receive GitHub webhook deliveries.
    Webhook,

    /// Serve the query tools to MCP clients.
    Mcp {
        /// `stdio` for a client-launched process, `http` to listen on `[mcp].bind`.
        #[arg(long, value_enum, default_value = "stdio")]
        transport: Transport,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

#[derive(Subcommand)]
enum SearchTarget {
    /// Pull requests, matched on title and body.
    Prs {
        /// Substring to look for; omit to list the most recently updated.
        query: Option<String>,
        /// Exact repository, e.g. `owner/repo`.
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// `open` or `closed`.
        #[arg(long)]
        state: Option<String>,
    },
    /// Commits, matched on message.
    Commits {
        query: Option<String>,
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        author: Option<String>,
    },
}

#[derive(Subcommand)]
enum GetTarget {
    /// A pull request by repository and number.
    Pr { repository: String, number: i64 },
    /// A commit by SHA.
    Commit { id: String },
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let sqlite = Arc::new(SqliteStore::open(&cfg).await?);
    let store: Arc<dyn Store> = sqlite.clone();

    let mut found = true;
    let result = async {
        match cli.command {
            Commands::Init => {
                println!("Database initialized at {}", cfg.db.path.display());
            }
            Commands::Serve { service } => match service {
                ServeService::Webhook => {
                    webhook::run_webhook_server(&cfg, store.clone(), shutdown_signal()).await?;
                }
                ServeService::Mcp {
                    transport: Transport::Stdio,
                } => {
                    tokio::select! {
                        res = mcp::run_mcp_stdio(store.clone()) => res?,
                        _ = shutdown_signal() => {},
                    }
                }
                ServeService::Mcp {
                    transport: Transport::Http,
                } => {
                    mcp::run_mcp_http(&cfg, store.clone(), shutdown_signal()).await?;
                }
            },
            Commands::Search { target } => match target {
                SearchTarget::Prs {
                    query,
                    repo,
                    author,
                    state,
                } => {
                    let query = PullRequestQuery {
                        text: query.unwrap_or_default(),
                        repository: repo,
                        author,
                        state,
                    };
                    search::run_search_pull_requests(store.as_ref(), &query).await?;
                }
                SearchTarget::Commits {
                    query,
                    repo,
                    author,
                } => {
                    let query = CommitQuery {
                        text: query.unwrap_or_default(),
                        repository: repo,
                        author,
                    };
                    search::run_search_commits(store.as_ref(), &query).await?;
                }
            },
            Commands::Get { target } => {
                found = match target {
                    GetTarget::Pr { repository, number } => {
                        get::run_get_pull_request(store.as_ref(), &repository, number).await?
                    }
                    GetTarget::Commit { id } => get::run_get_commit(store.as_ref(), &id).await?,
                };
            }
        }
        anyhow::Ok(())
    }
    .await;

    sqlite.close().await;
    result?;

    if !found {
        std::process::exit(1);
    }
    Ok(())
}
