//! Read-side git inspector.
//!
//! The only place in the codebase that shells out to git. All operations
//! work against an existing local clone and never mutate the working tree;
//! the single exception is `git fetch` performed by the partial-clone
//! guard ([`management::LocalCommitsAvailability`]) and by
//! [`management::clone_repo`].
//!
//! Every subprocess result passes through lossy UTF-8 decoding, so inspector
//! output is always valid UTF-8 (invalid sequences become U+FFFD).

pub mod content;
pub mod diff;
pub mod encoding;
pub mod history;
pub mod management;
pub mod runner;
pub mod search;

pub use diff::{ChangeStatus, FileDiffInfo};
pub use management::{LocalCommitsAvailability, TempGitRepository};
pub use runner::{GitInspector, GitOutput, GitRunner, ScriptedGit};
