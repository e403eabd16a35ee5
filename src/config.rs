use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable overriding `[db].path`.
pub const ENV_DB_PATH: &str = "GITHUB_MEMORY_DB_PATH";
/// Environment variable overriding the port of `[webhook].bind`.
pub const ENV_WEBHOOK_PORT: &str = "WEBHOOK_PORT";
/// Environment variable overriding `[webhook].secret`.
pub const ENV_WEBHOOK_SECRET: &str = "GITHUB_WEBHOOK_SECRET";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub mcp: McpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/github-memory.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_bind")]
    pub bind: String,
    /// Shared secret for `X-Hub-Signature-256`. Absent disables verification.
    #[serde(default)]
    pub secret: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind: default_webhook_bind(),
            secret: None,
        }
    }
}

fn default_webhook_bind() -> String {
    "0.0.0.0:3000".to_string()
}

impl WebhookConfig {
    /// The configured secret, treating an empty string as "not configured".
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct McpConfig {
    /// Bind address for the Streamable HTTP transport.
    #[serde(default = "default_mcp_bind")]
    pub bind: String,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            bind: default_mcp_bind(),
        }
    }
}

fn default_mcp_bind() -> String {
    "127.0.0.1:7332".to_string()
}

/// Load the config file (defaults when it does not exist), then apply
/// environment overrides and validate.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

/// Apply overrides from `lookup` (normally the process environment).
pub fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(path) = lookup(ENV_DB_PATH).filter(|v| !v.is_empty()) {
        config.db.path = PathBuf::from(path);
    }

    if let Some(port) = lookup(ENV_WEBHOOK_PORT).filter(|v| !v.is_empty()) {
        let port: u16 = port
            .parse()
            .with_context(|| format!("{} must be a port number, got '{}'", ENV_WEBHOOK_PORT, port))?;
        let mut addr: SocketAddr = config
            .webhook
            .bind
            .parse()
            .with_context(|| format!("webhook.bind is not a socket address: {}", config.webhook.bind))?;
        addr.set_port(port);
        config.webhook.bind = addr.to_string();
    }

    if let Some(secret) = lookup(ENV_WEBHOOK_SECRET) {
        config.webhook.secret = Some(secret);
    }

    Ok(())
}

pub fn validate(config: &Config) -> Result<()> {
    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    config
        .webhook
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("webhook.bind is not a socket address: {}", config.webhook.bind))?;

    config
        .mcp
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("mcp.bind is not a socket address: {}", config.mcp.bind))?;

    Ok(())
}
