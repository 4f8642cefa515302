//! Run-scoped input models.
//!
//! Both are immutable for the duration of a run.

use serde::{Deserialize, Serialize};

/// Repository information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Path to the local clone.
    pub local_path: String,
    /// Platform full name ("owner/repo"), when known.
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Pull request information.
///
/// `number == 0` marks a local-only run; sinks must refuse platform-side
/// mutation for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub base_commit_hash: String,
    pub base_branch_name: String,
    pub head_commit_hash: String,
    pub head_branch_name: String,
}

impl PullRequest {
    /// A placeholder PR for local runs against a (base, head) pair.
    pub fn local(title: impl Into<String>, base: impl Into<String>, head: impl Into<String>) -> Self {
        Self {
            number: 0,
            title: title.into(),
            body: None,
            base_commit_hash: base.into(),
            base_branch_name: String::new(),
            head_commit_hash: head.into(),
            head_branch_name: String::new(),
        }
    }

    /// True when this run has no platform-side PR to mutate.
    pub fn is_local(&self) -> bool {
        self.number == 0
    }
}
