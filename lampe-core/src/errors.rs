//! Crate-wide error hierarchy.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - Dedicated variants for git failures so callers can rescue the
//!   recoverable ones (missing file in a batch diff, no grep matches).
//! - No dynamic dispatch; ergonomic `?` via `From` impls.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type LampeResult<T> = Result<T, Error>;

/// Root error type for lampe-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Git inspector failure.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Workflow runtime failure (timeout, stall, step panic).
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// LLM call failure.
    #[error(transparent)]
    Llm(#[from] llm_service::LlmError),

    /// Tool registry failure.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Input validation errors (bad refs, empty paths, bad limits).
    #[error("validation error: {0}")]
    Validation(String),
}

/// Git inspector errors.
#[derive(Debug, Error)]
pub enum GitError {
    /// Path absent at the requested commit.
    #[error("file not found at commit: {commit}:{path}")]
    FileNotFound { commit: String, path: String },

    /// Commit could not be resolved locally (and fetch did not help).
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// Diff between two refs could not be produced.
    #[error("diff not found for commits {base} and {head}")]
    DiffNotFound { base: String, head: String },

    /// Installed git is older than the minimum supported version.
    #[error("git version {found} is older than required {required}")]
    Version { found: String, required: &'static str },

    /// git exited with an unexpected status.
    #[error("git {command} failed with status {status}: {stderr}")]
    Subprocess {
        command: String,
        status: i32,
        stderr: String,
    },

    /// A subprocess could not be spawned or timed out.
    #[error("io error running git: {0}")]
    Io(#[from] std::io::Error),

    /// A git call exceeded its per-call timeout.
    #[error("git {0} timed out")]
    Timeout(String),
}

/// Workflow runtime errors.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The global workflow deadline expired.
    #[error("workflow timed out after {0} seconds")]
    Timeout(u64),

    /// An emitted event matched no registered step.
    #[error("no step accepts event: {0}")]
    UnhandledEvent(String),

    /// All steps finished without a stop event.
    #[error("workflow stalled without producing a result")]
    Stalled,

    /// A step task failed to join (panic or abort).
    #[error("step task failed: {0}")]
    Join(String),

    /// A step handler returned an error.
    #[error("step '{step}' failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<Error>,
    },
}

/// Tool registry errors.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool name not in the registry.
    #[error("tool does not exist: {0}")]
    UnknownTool(String),

    /// Arguments did not match the tool schema.
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}
