//! Core building blocks for the lampe pipelines.
//!
//! - [`git`]: read-side git inspector over a local clone, hardened for
//!   partial clones (sparse + blob-filter + shallow) with on-demand fetch.
//! - [`tools`]: the closed set of repository tools exposed to agents,
//!   with JSON schemas and partial-argument binding.
//! - [`workflow`]: event-typed step runtime (fan-out, collection,
//!   timeout, bounded parallelism) and the function-calling agent loop.
//! - [`parsers`]: tolerant output parsing (markdown code-block removal).
//! - [`utils`]: token counting and truncation.
//!
//! Dispatch throughout is enum-based; no `async-trait`, no `Box<dyn ...>`.

pub mod data_models;
pub mod errors;
pub mod git;
pub mod parsers;
pub mod tools;
pub mod utils;
pub mod workflow;

pub use data_models::{PullRequest, Repository};
pub use errors::{Error, GitError, LampeResult};
