//! Sink errors.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),

    /// Config value had the wrong shape (e.g. GITHUB_REPOSITORY not owner/repo).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Platform-side mutation attempted for a local run (PR number 0).
    #[error("cannot perform platform mutation for a local run (PR number 0)")]
    LocalRunMutation,

    /// Authentication with the platform failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Operation is not supported by this provider.
    #[error("operation not supported by the {0} provider")]
    Unsupported(&'static str),

    /// Non-2xx status from the platform API.
    #[error("platform returned HTTP {status}: {snippet}")]
    Status { status: u16, snippet: String },

    /// Transport failure.
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Payload decode failure.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Reads a required, non-empty environment variable.
pub(crate) fn must_env(name: &'static str) -> ProviderResult<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ProviderError::MissingEnv(name)),
    }
}

/// Trims a response body into a single line for error messages.
pub(crate) fn snippet(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    flat.chars().take(300).collect()
}
