//! `lampe check-reviewed`
//!
//! Exit 0 when the authenticated identity has already reviewed the PR,
//! 1 otherwise (including provider errors).

use lampe_core::{PullRequest, Repository};
use lampe_providers::Provider;

use crate::cli::CheckReviewedArgs;

pub async fn run(args: CheckReviewedArgs) -> anyhow::Result<i32> {
    let repository = Repository {
        local_path: args.repo.display().to_string(),
        full_name: args.repo_full_name,
    };
    let mut pull_request = PullRequest::local("", "", "");
    pull_request.number = args.pr_number;

    let provider_type = args.output.parse().map_err(anyhow::Error::msg)?;
    let provider = match Provider::create(provider_type, &repository, &pull_request).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("❌ Error creating provider: {e}");
            return Ok(1);
        }
    };

    match provider.has_reviewed().await {
        Ok(true) => {
            println!("✅ PR has already been reviewed by the token user");
            Ok(0)
        }
        Ok(false) => {
            println!("❌ PR has not been reviewed by the token user yet");
            Ok(1)
        }
        Err(e) => {
            eprintln!("❌ Error checking if PR has been reviewed: {e}");
            Ok(1)
        }
    }
}
