//! Sink dispatch.

use tracing::debug;

use lampe_core::{PullRequest, Repository};

use crate::bitbucket::BitbucketProvider;
use crate::console::ConsoleProvider;
use crate::detect::{ProviderType, detect_provider_type};
use crate::errors::{ProviderError, ProviderResult};
use crate::github::GitHubProvider;
use crate::gitlab::GitLabProvider;
use crate::payloads::{PRDescriptionPayload, PRReviewPayload};

/// Concrete sink (enum-dispatch).
#[derive(Debug)]
pub enum Provider {
    Console(ConsoleProvider),
    GitHub(GitHubProvider),
    GitLab(GitLabProvider),
    Bitbucket(BitbucketProvider),
}

impl Provider {
    /// Creates a sink of the requested type; `auto` scans the environment.
    pub async fn create(
        provider_type: ProviderType,
        repository: &Repository,
        pull_request: &PullRequest,
    ) -> ProviderResult<Self> {
        let resolved = match provider_type {
            ProviderType::Auto => {
                let detected = detect_provider_type();
                debug!(%detected, "auto-detected provider");
                detected
            }
            other => other,
        };

        Ok(match resolved {
            ProviderType::Console => Self::Console(ConsoleProvider),
            ProviderType::GitHub => Self::GitHub(GitHubProvider::new(repository, pull_request).await?),
            ProviderType::GitLab => Self::GitLab(GitLabProvider::new(repository, pull_request)?),
            ProviderType::Bitbucket => Self::Bitbucket(BitbucketProvider::new(pull_request).await?),
            ProviderType::Auto => unreachable!("auto resolved above"),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Console(_) => "console",
            Self::GitHub(_) => "github",
            Self::GitLab(_) => "gitlab",
            Self::Bitbucket(_) => "bitbucket",
        }
    }

    pub async fn deliver_pr_description(&self, payload: &PRDescriptionPayload) -> ProviderResult<()> {
        match self {
            Self::Console(p) => p.deliver_pr_description(payload),
            Self::GitHub(p) => p.deliver_pr_description(payload).await,
            Self::GitLab(p) => p.deliver_pr_description(payload).await,
            Self::Bitbucket(p) => p.deliver_pr_description(payload).await,
        }
    }

    pub async fn deliver_pr_review(&self, payload: &PRReviewPayload) -> ProviderResult<()> {
        match self {
            Self::Console(p) => p.deliver_pr_review(payload),
            Self::GitHub(p) => p.deliver_pr_review(payload).await,
            Self::GitLab(p) => p.deliver_pr_review(payload).await,
            Self::Bitbucket(p) => p.deliver_pr_review(payload).await,
        }
    }

    /// GitHub only: whether the authenticated identity already reviewed.
    pub async fn has_reviewed(&self) -> ProviderResult<bool> {
        match self {
            Self::GitHub(p) => p.has_reviewed().await,
            Self::Console(_) => Err(ProviderError::Unsupported("console")),
            Self::GitLab(_) => Err(ProviderError::Unsupported("gitlab")),
            Self::Bitbucket(_) => Err(ProviderError::Unsupported("bitbucket")),
        }
    }

    pub async fn healthcheck(&self) -> ProviderResult<()> {
        match self {
            Self::Console(p) => p.healthcheck(),
            Self::GitHub(p) => p.healthcheck().await,
            Self::GitLab(p) => p.healthcheck().await,
            Self::Bitbucket(p) => p.healthcheck().await,
        }
    }
}
