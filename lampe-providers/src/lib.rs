//! Delivery sinks for generated PR artifacts.
//!
//! A [`Provider`] (enum-dispatch) takes a typed payload and performs the
//! platform call: edit the PR body inside a tagged region, post review
//! comments (inline where the platform accepts them, general otherwise),
//! answer `has_reviewed`, and run connectivity healthchecks.
//!
//! A pull request with number 0 is a local run: every mutating platform
//! operation refuses it, and only console delivery is legal.

pub mod bitbucket;
pub mod console;
pub mod detect;
pub mod errors;
pub mod github;
pub mod gitlab;
pub mod payloads;
pub mod provider;
pub mod tags;

pub use detect::ProviderType;
pub use errors::{ProviderError, ProviderResult};
pub use payloads::{PRDescriptionPayload, PRReviewPayload, parse_line_number};
pub use provider::Provider;
pub use tags::update_or_add_text_between_tags;
