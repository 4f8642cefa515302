//! `lampe describe`

use std::time::Duration;

use anyhow::Context;

use lampe_providers::Provider;

use crate::cli::DescribeArgs;
use crate::commands::run_models;
use crate::orchestrators::pr_description::{self, DescriptionRun};

pub async fn run(args: DescribeArgs) -> anyhow::Result<()> {
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

    pr_description::run(
        DescriptionRun {
            repository,
            pull_request,
            variant: args.variant,
            files_exclude_patterns: args.files_exclude,
            files_reinclude_patterns: args.files_reinclude,
            truncation_tokens: args.truncation_tokens,
            timeout: args.timeout.map(Duration::from_secs),
        },
        &provider,
    )
    .await?;

    eprintln!("✅ PR description generated and delivered");
    Ok(())
}
