//! PR review generation.
//!
//! Two pipelines over the core workflow runtime:
//!
//! - **diff-by-diff** ([`diff_by_diff`]): enumerate changed files, fan one
//!   diff-focused bug-finding agent per file over a bounded worker pool,
//!   then clean the merged findings with a single LLM aggregation pass.
//! - **multi-agent** ([`multi_agent`]): run whole-PR specialized agents
//!   sequentially and merge their findings heuristically.

pub mod agents;
pub mod aggregation;
pub mod aggregator;
pub mod data_models;
pub mod diff_by_diff;
pub mod multi_agent;

pub use data_models::{
    AgentReviewInput, AgentReviewOutput, FileReview, PRReviewInput, PRReviewOutput, ReviewComment, ReviewDepth,
    Severity,
};
