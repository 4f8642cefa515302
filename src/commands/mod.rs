pub mod check_reviewed;
pub mod describe;
pub mod healthcheck;
pub mod review;

use lampe_core::{PullRequest, Repository};

/// Builds the run models shared by the generate commands.
pub fn run_models(
    repo: &std::path::Path,
    repo_full_name: Option<String>,
    title: String,
    base: String,
    head: String,
) -> (Repository, PullRequest) {
    let repository = Repository {
        local_path: repo.display().to_string(),
        full_name: repo_full_name,
    };
    let pull_request = PullRequest::local(title, base, head);
    (repository, pull_request)
}
