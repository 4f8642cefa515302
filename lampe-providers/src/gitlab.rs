//! GitLab sink.
//!
//! Uses the merge request API for the description and the Discussions API
//! for inline comments (position anchored on head/base/start sha), with MR
//! notes as the general fallback.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use lampe_core::{PullRequest, Repository};

use crate::errors::{ProviderError, ProviderResult, must_env, snippet};
use crate::payloads::{PRDescriptionPayload, PRReviewPayload, parse_line_number};
use crate::tags::update_or_add_text_between_tags;

const API_BASE: &str = "https://gitlab.com/api/v4";

#[derive(Debug)]
pub struct GitLabProvider {
    client: reqwest::Client,
    /// URL-encoded project path ("owner%2Frepo").
    project: String,
    mr_iid: u64,
    head_sha: String,
    base_sha: String,
}

impl GitLabProvider {
    pub fn new(repository: &Repository, pull_request: &PullRequest) -> ProviderResult<Self> {
        let mr_iid = if pull_request.number == 0 {
            must_env("PR_NUMBER")?
                .parse()
                .map_err(|_| ProviderError::InvalidConfig("PR_NUMBER must be an integer".into()))?
        } else {
            pull_request.number
        };

        let full_name = repository
            .full_name
            .clone()
            .or_else(|| std::env::var("CI_PROJECT_PATH").ok().filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                ProviderError::InvalidConfig("repository full name is required for the GitLab provider".into())
            })?;
        let project = urlencoding::encode(&full_name).into_owned();

        let token = must_env("GITLAB_API_TOKEN")?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "PRIVATE-TOKEN",
            HeaderValue::from_str(&token).map_err(|e| ProviderError::Auth(format!("invalid token header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("lampe"));
        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            project,
            mr_iid,
            head_sha: pull_request.head_commit_hash.clone(),
            base_sha: pull_request.base_commit_hash.clone(),
        })
    }

    fn mr_url(&self, suffix: &str) -> String {
        let base = format!("{API_BASE}/projects/{}/merge_requests/{}", self.project, self.mr_iid);
        if suffix.is_empty() {
            base
        } else {
            format!("{base}/{suffix}")
        }
    }

    pub async fn deliver_pr_description(&self, payload: &PRDescriptionPayload) -> ProviderResult<()> {
        if self.mr_iid == 0 {
            return Err(ProviderError::LocalRunMutation);
        }

        #[derive(Debug, Deserialize)]
        struct Mr {
            description: Option<String>,
        }
        let url = self.mr_url("");
        let current: Mr = check(self.client.get(&url).send().await?).await?.json().await?;
        let new_description = update_or_add_text_between_tags(
            current.description.as_deref().unwrap_or(""),
            &payload.description_with_title(),
            "description",
        );
        check(
            self.client
                .put(&url)
                .json(&json!({"description": new_description}))
                .send()
                .await?,
        )
        .await?;
        info!(mr = self.mr_iid, "✅ Successfully updated MR description on GitLab");
        Ok(())
    }

    pub async fn deliver_pr_review(&self, payload: &PRReviewPayload) -> ProviderResult<()> {
        if self.mr_iid == 0 {
            return Err(ProviderError::LocalRunMutation);
        }

        for agent_review in &payload.reviews {
            if !agent_review.summary.is_empty() {
                let body = format!(
                    "## {}\n\n**Focus Areas:** {}\n\n{}",
                    agent_review.agent_name,
                    agent_review.focus_areas.join(", "),
                    agent_review.summary
                );
                if let Err(e) = self.post_note(&body).await {
                    warn!(agent = %agent_review.agent_name, error = %e, "failed to post agent summary note");
                }
            }

            for file_review in &agent_review.reviews {
                for (key, comment) in &file_review.line_comments {
                    let line = parse_line_number(key);
                    if line > 0 {
                        match self.post_inline_discussion(&file_review.file_path, line, comment).await {
                            Ok(()) => continue,
                            Err(e) => {
                                warn!(
                                    path = %file_review.file_path,
                                    line,
                                    error = %e,
                                    "inline discussion rejected, falling back to note"
                                );
                            }
                        }
                    }
                    let fallback = format!("{} (Line {line})\n\n{comment}", file_review.file_path);
                    if let Err(e) = self.post_note(&fallback).await {
                        warn!(path = %file_review.file_path, error = %e, "failed to post fallback note");
                    }
                }

                if file_review.line_comments.is_empty() && !file_review.summary.is_empty() {
                    let body = format!("**{}:** {}", file_review.file_path, file_review.summary);
                    if let Err(e) = self.post_note(&body).await {
                        warn!(path = %file_review.file_path, error = %e, "failed to post file summary note");
                    }
                }
            }
        }
        info!(mr = self.mr_iid, "✅ Successfully posted MR review comments on GitLab");
        Ok(())
    }

    pub async fn healthcheck(&self) -> ProviderResult<()> {
        let url = format!("{API_BASE}/projects/{}", self.project);
        check(self.client.get(&url).send().await?).await?;
        info!(project = %self.project, "✅ GitLab project access confirmed");
        Ok(())
    }

    async fn post_note(&self, body: &str) -> ProviderResult<()> {
        let url = self.mr_url("notes");
        check(self.client.post(&url).json(&json!({"body": body})).send().await?).await?;
        Ok(())
    }

    async fn post_inline_discussion(&self, path: &str, line: u64, body: &str) -> ProviderResult<()> {
        let url = self.mr_url("discussions");
        let payload = json!({
            "body": body,
            "position": {
                "position_type": "text",
                "new_path": path,
                "new_line": line,
                "head_sha": self.head_sha,
                "base_sha": self.base_sha,
                "start_sha": self.base_sha,
            }
        });
        check(self.client.post(&url).json(&payload).send().await?).await?;
        Ok(())
    }
}

async fn check(resp: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(ProviderError::Status {
            status: status.as_u16(),
            snippet: snippet(&body),
        })
    }
}
