//! `lampe review`

use std::time::Duration;

use anyhow::Context;

use lampe_providers::Provider;

use crate::cli::ReviewArgs;
use crate::commands::run_models;
use crate::orchestrators::pr_review::{self, ReviewRun};

pub async fn run(args: ReviewArgs) -> anyhow::Result<()> {
    let (repository, pull_request) = run_models(
        &args.repo,
        args.repo_full_name,
        args.title,
        args.base,
        args.head,
    );

    let provider_type = args.output.parse().map_err(anyhow::Error::msg)?;
    let provider = Provider::create(provider_type, &repository, &pull_request)
        .await
        .context("creating output provider")?;

    pr_review::run(
        ReviewRun {
            repository,
            pull_request,
            variant: args.variant,
            review_depth: args.review_depth.into(),
            custom_guidelines: args.guidelines,
            files_exclude_patterns: args.files_exclude,
            timeout: args.timeout.map(Duration::from_secs),
        },
        &provider,
    )
    .await?;

    eprintln!("✅ PR review generated and delivered");
    Ok(())
}
