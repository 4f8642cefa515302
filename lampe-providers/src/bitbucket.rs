//! Bitbucket Cloud sink.
//!
//! Auth: repository/workspace access token (`LAMPE_BITBUCKET_TOKEN`) or
//! OAuth2 client credentials (`LAMPE_BITBUCKET_APP_KEY` +
//! `LAMPE_BITBUCKET_APP_SECRET`). Workspace and slug come from the
//! pipeline environment.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use lampe_core::PullRequest;

use crate::errors::{ProviderError, ProviderResult, must_env, snippet};
use crate::payloads::{PRDescriptionPayload, PRReviewPayload, parse_line_number};
use crate::tags::update_or_add_text_between_tags;

const API_BASE: &str = "https://api.bitbucket.org";

#[derive(Debug)]
pub struct BitbucketProvider {
    client: reqwest::Client,
    workspace: String,
    repo_slug: String,
    pr_id: u64,
}

impl BitbucketProvider {
    pub async fn new(pull_request: &PullRequest) -> ProviderResult<Self> {
        let pr_id = if pull_request.number == 0 {
            let raw = std::env::var("BITBUCKET_PR_ID")
                .ok()
                .filter(|v| !v.is_empty())
                .or_else(|| std::env::var("PR_NUMBER").ok().filter(|v| !v.is_empty()))
                .ok_or(ProviderError::MissingEnv("BITBUCKET_PR_ID"))?;
            raw.parse()
                .map_err(|_| ProviderError::InvalidConfig("BITBUCKET_PR_ID must be an integer".into()))?
        } else {
            pull_request.number
        };

        let workspace = must_env("BITBUCKET_WORKSPACE")?;
        let repo_slug = must_env("BITBUCKET_REPO_SLUG")?;
        let token = resolve_token().await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ProviderError::Auth(format!("invalid token header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("lampe"));
        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            workspace,
            repo_slug,
            pr_id,
        })
    }

    fn pr_url(&self, suffix: &str) -> String {
        let base = format!(
            "{API_BASE}/2.0/repositories/{}/{}/pullrequests/{}",
            self.workspace, self.repo_slug, self.pr_id
        );
        if suffix.is_empty() {
            base
        } else {
            format!("{base}/{suffix}")
        }
    }

    pub async fn deliver_pr_description(&self, payload: &PRDescriptionPayload) -> ProviderResult<()> {
        if self.pr_id == 0 {
            return Err(ProviderError::LocalRunMutation);
        }

        #[derive(Debug, Deserialize)]
        struct Pr {
            description: Option<String>,
        }
        let url = self.pr_url("");
        let current: Pr = check(self.client.get(&url).send().await?).await?.json().await?;
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
        info!(pr = self.pr_id, "✅ Successfully updated PR description on Bitbucket");
        Ok(())
    }

    pub async fn deliver_pr_review(&self, payload: &PRReviewPayload) -> ProviderResult<()> {
        if self.pr_id == 0 {
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
                if let Err(e) = self.post_comment(&body, None).await {
                    warn!(agent = %agent_review.agent_name, error = %e, "failed to post agent summary");
                }
            }

            for file_review in &agent_review.reviews {
                for (key, comment) in &file_review.line_comments {
                    let line = parse_line_number(key);
                    let inline = (line > 0).then(|| (file_review.file_path.as_str(), line));
                    if let Some((path, line)) = inline {
                        match self.post_comment(&format!("## 🔦🐛\n{comment}"), Some((path, line))).await {
                            Ok(()) => continue,
                            Err(e) => {
                                warn!(path, line, error = %e, "inline comment rejected, falling back");
                            }
                        }
                    }
                    let fallback = format!("{} (Line {line})\n\n{comment}", file_review.file_path);
                    if let Err(e) = self.post_comment(&fallback, None).await {
                        warn!(path = %file_review.file_path, error = %e, "failed to post fallback comment");
                    }
                }

                if file_review.line_comments.is_empty() && !file_review.summary.is_empty() {
                    let body = format!("**{}:** {}", file_review.file_path, file_review.summary);
                    if let Err(e) = self.post_comment(&body, None).await {
                        warn!(path = %file_review.file_path, error = %e, "failed to post file summary");
                    }
                }
            }
        }
        info!(pr = self.pr_id, "✅ Successfully posted PR review comments on Bitbucket");
        Ok(())
    }

    pub async fn healthcheck(&self) -> ProviderResult<()> {
        let url = format!("{API_BASE}/2.0/repositories/{}/{}", self.workspace, self.repo_slug);
        let repo: serde_json::Value = check(self.client.get(&url).send().await?).await?.json().await?;
        info!(
            full_name = %repo["full_name"].as_str().unwrap_or_default(),
            private = repo["is_private"].as_bool().unwrap_or_default(),
            "✅ Repository access confirmed"
        );
        Ok(())
    }

    async fn post_comment(&self, raw: &str, inline: Option<(&str, u64)>) -> ProviderResult<()> {
        let url = self.pr_url("comments");
        let mut payload = json!({"content": {"raw": raw}});
        if let Some((path, line)) = inline {
            payload["inline"] = json!({
                "from": line.saturating_sub(1),
                "to": line,
                "path": path,
            });
        }
        check(self.client.post(&url).json(&payload).send().await?).await?;
        Ok(())
    }
}

/// Token auth first, then the OAuth2 client-credentials flow.
async fn resolve_token() -> ProviderResult<String> {
    if let Ok(token) = std::env::var("LAMPE_BITBUCKET_TOKEN") {
        if !token.trim().is_empty() {
            return Ok(token);
        }
    }

    let app_key = std::env::var("LAMPE_BITBUCKET_APP_KEY").ok().filter(|v| !v.is_empty());
    let app_secret = std::env::var("LAMPE_BITBUCKET_APP_SECRET").ok().filter(|v| !v.is_empty());
    let (Some(app_key), Some(app_secret)) = (app_key, app_secret) else {
        return Err(ProviderError::Auth(
            "either a Bitbucket token (LAMPE_BITBUCKET_TOKEN) or app credentials \
             (LAMPE_BITBUCKET_APP_KEY, LAMPE_BITBUCKET_APP_SECRET) are required"
                .into(),
        ));
    };

    #[derive(Debug, Deserialize)]
    struct TokenResponse {
        access_token: String,
    }
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{API_BASE}/site/oauth2/access_token"))
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", app_key.as_str()),
            ("client_secret", app_secret.as_str()),
        ])
        .send()
        .await?;
    let token: TokenResponse = check(resp).await?.json().await?;
    Ok(token.access_token)
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
