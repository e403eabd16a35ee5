//! Query façade: the store's read operations as named, callable tools.
//!
//! Tools take loosely-typed JSON arguments (as delivered by an MCP client),
//! coerce them into the store's query shapes, and run the read. Each call
//! ends in one of three outcomes:
//!
//! | Outcome | `is_error` | Text |
//! |---------|------------|------|
//! | [`ToolOutput::Found`] | `false` | pretty-printed JSON (a record or a list, possibly empty) |
//! | [`ToolOutput::NotFound`] | `true` | what was looked up and missed |
//! | [`MemoryError`] / unknown tool | `true` | `Error: ...` / `Unknown tool: ...` |
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  search_pull_requests   get_pull_request │
//! │  search_commits         get_commit       │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!       QueryFacade::call() → Store
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::MemoryError;
use crate::store::{CommitQuery, PullRequestQuery, Store};

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// Result of a tool that ran to completion.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// The operation succeeded. Searches always end here, even when empty.
    Found(Value),
    /// A point lookup found nothing. Not an error, but reported as one.
    NotFound(String),
}

/// A read-only operation exposed to tool-calling clients.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's name, e.g. `"search_commits"`.
    fn name(&self) -> &str;

    /// Returns a one-line description for client discovery.
    fn description(&self) -> &str;

    /// Returns the JSON Schema of the accepted arguments.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. `params` is whatever the client sent.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput, MemoryError>;
}

/// What a tool may touch while executing.
pub struct ToolContext {
    store: Arc<dyn Store>,
}

impl ToolContext {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Argument coercion
// ═══════════════════════════════════════════════════════════════════════

/// A string argument; absent, `null`, and `""` all mean "not given".
/// Numbers and booleans are accepted in their JSON text form.
fn optional_str(params: &Value, key: &str) -> Result<Option<String>, MemoryError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(_) => Err(MemoryError::validation(format!(
            "argument '{}' must be a string",
            key
        ))),
    }
}

fn required_str(params: &Value, key: &str) -> Result<String, MemoryError> {
    optional_str(params, key)?
        .ok_or_else(|| MemoryError::validation(format!("argument '{}' is required", key)))
}

/// An integer argument, given as a JSON integer or a numeric string.
fn required_int(params: &Value, key: &str) -> Result<i64, MemoryError> {
    let value = params
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| MemoryError::validation(format!("argument '{}' is required", key)))?;

    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| {
        MemoryError::validation(format!("argument '{}' must be an integer, got {}", key, value))
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Tool Implementations
// ═══════════════════════════════════════════════════════════════════════

/// Filtered pull request search.
pub struct SearchPullRequestsTool;

#[async_trait]
impl Tool for SearchPullRequestsTool {
    fn name(&self) -> &str {
        "search_pull_requests"
    }

    fn description(&self) -> &str {
        "Search indexed pull requests by query, repository, author, or state"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query to match against PR title and body" },
                "repository": { "type": "string", "description": "Filter by repository (e.g., \"owner/repo\")" },
                "author": { "type": "string", "description": "Filter by author username" },
                "state": { "type": "string", "description": "Filter by state (open, closed, merged)" }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput, MemoryError> {
        let query = PullRequestQuery {
            text: optional_str(&params, "query")?.unwrap_or_default(),
            repository: optional_str(&params, "repository")?,
            author: optional_str(&params, "author")?,
            state: optional_str(&params, "state")?,
        };
        let results = ctx.store().search_pull_requests(&query).await?;
        Ok(ToolOutput::Found(json!(results)))
    }
}

/// Pull request lookup by repository and number.
pub struct GetPullRequestTool;

#[async_trait]
impl Tool for GetPullRequestTool {
    fn name(&self) -> &str {
        "get_pull_request"
    }

    fn description(&self) -> &str {
        "Get details of a specific pull request by repository and number"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "repository": { "type": "string", "description": "Repository name (e.g., \"owner/repo\")" },
                "number": { "type": "number", "description": "Pull request number" }
            },
            "required": ["repository", "number"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput, MemoryError> {
        let repository = required_str(&params, "repository")?;
        let number = required_int(&params, "number")?;

        Ok(match ctx.store().get_pull_request(&repository, number).await? {
            Some(pr) => ToolOutput::Found(json!(pr)),
            None => ToolOutput::NotFound(format!(
                "Pull request not found: {}#{}",
                repository, number
            )),
        })
    }
}

/// Filtered commit search.
pub struct SearchCommitsTool;

#[async_trait]
impl Tool for SearchCommitsTool {
    fn name(&self) -> &str {
        "search_commits"
    }

    fn description(&self) -> &str {
        "Search indexed commits by message, repository, or author"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query to match against commit messages" },
                "repository": { "type": "string", "description": "Filter by repository (e.g., \"owner/repo\")" },
                "author": { "type": "string", "description": "Filter by author username" }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput, MemoryError> {
        let query = CommitQuery {
            text: optional_str(&params, "query")?.unwrap_or_default(),
            repository: optional_str(&params, "repository")?,
            author: optional_str(&params, "author")?,
        };
        let results = ctx.store().search_commits(&query).await?;
        Ok(ToolOutput::Found(json!(results)))
    }
}

/// Commit lookup by SHA.
pub struct GetCommitTool;

#[async_trait]
impl Tool for GetCommitTool {
    fn name(&self) -> &str {
        "get_commit"
    }

    fn description(&self) -> &str {
        "Get details of a specific commit by its SHA"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Commit SHA" }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput, MemoryError> {
        let id = required_str(&params, "id")?;

        Ok(match ctx.store().get_commit(&id).await? {
            Some(commit) => ToolOutput::Found(json!(commit)),
            None => ToolOutput::NotFound(format!("Commit not found: {}", id)),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry and façade
// ═══════════════════════════════════════════════════════════════════════

/// Registry of callable tools.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Create a registry holding the four query tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchPullRequestsTool));
        registry.register(Box::new(GetPullRequestTool));
        registry.register(Box::new(SearchCommitsTool));
        registry.register(Box::new(GetCommitTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Final, protocol-neutral result of one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallOutcome {
    pub is_error: bool,
    pub text: String,
}

impl ToolCallOutcome {
    fn success(text: String) -> Self {
        Self {
            is_error: false,
            text,
        }
    }

    fn error(text: String) -> Self {
        Self {
            is_error: true,
            text,
        }
    }
}

/// Dispatches tool calls by name against a shared store.
///
/// Cheap to clone; every clone shares the store and the registry.
#[derive(Clone)]
pub struct QueryFacade {
    ctx: Arc<ToolContext>,
    registry: Arc<ToolRegistry>,
}

impl QueryFacade {
    /// A façade serving the built-in query tools.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_registry(store, ToolRegistry::with_builtins())
    }

    pub fn with_registry(store: Arc<dyn Store>, registry: ToolRegistry) -> Self {
        Self {
            ctx: Arc::new(ToolContext::new(store)),
            registry: Arc::new(registry),
        }
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        self.registry.tools()
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.registry.find(name)
    }

    /// Run the named tool. Never fails: every problem becomes an
    /// error-flagged outcome.
    pub async fn call(&self, name: &str, args: Value) -> ToolCallOutcome {
        let Some(tool) = self.registry.find(name) else {
            return ToolCallOutcome::error(format!("Unknown tool: {}", name));
        };

        let params = match args {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };

        match tool.execute(params, &self.ctx).await {
            Ok(ToolOutput::Found(value)) => {
                ToolCallOutcome::success(serde_json::to_string_pretty(&value).unwrap_or_default())
            }
            Ok(ToolOutput::NotFound(message)) => ToolCallOutcome::error(message),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool call failed");
                ToolCallOutcome::error(format!("Error: {}", e))
            }
        }
    }
}
