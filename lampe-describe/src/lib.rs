//! PR description generation.
//!
//! Two variants share the output type:
//! - [`generation::generate_pr_description`]: single LLM shot over the
//!   token-truncated full diff.
//! - [`generation_agentic::generate_pr_description_agentic`]: a
//!   function-calling agent that inspects the repository with tools.

pub mod generation;
pub mod generation_agentic;
pub mod prompts;

pub use generation::{DEFAULT_TRUNCATION_TOKENS, PRDescriptionInput, PRDescriptionOutput};
