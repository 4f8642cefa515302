//! GitHub sink.
//!
//! Auth priority: GitHub App (`LAMPE_GITHUB_APP_ID` +
//! `LAMPE_GITHUB_APP_PRIVATE_KEY`, exchanged for an installation token)
//! over a PAT (`LAMPE_GITHUB_TOKEN`). The repository comes from
//! `GITHUB_REPOSITORY` (set by Actions) or the configured full name.
//!
//! Review delivery: agent summaries as issue comments, line comments as
//! inline review comments anchored on the head commit, with a general
//! comment fallback (`path (Line N)`) when inline anchoring fails.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use lampe_core::{PullRequest, Repository};

use crate::errors::{ProviderError, ProviderResult, must_env, snippet};
use crate::payloads::{PRDescriptionPayload, PRReviewPayload, parse_line_number};
use crate::tags::update_or_add_text_between_tags;

const API_BASE: &str = "https://api.github.com";

#[derive(Debug)]
pub struct GitHubProvider {
    client: reqwest::Client,
    owner: String,
    repo: String,
    pr_number: u64,
    head_sha: String,
}

#[derive(Debug, Deserialize)]
struct PullBody {
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Comment {
    user: CommentUser,
}

impl GitHubProvider {
    /// Builds the client, resolving PR number, repository, and auth.
    pub async fn new(repository: &Repository, pull_request: &PullRequest) -> ProviderResult<Self> {
        let pr_number = if pull_request.number == 0 {
            must_env("PR_NUMBER")?
                .parse()
                .map_err(|_| ProviderError::InvalidConfig("PR_NUMBER must be an integer".into()))?
        } else {
            pull_request.number
        };

        let full_name = std::env::var("GITHUB_REPOSITORY")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| repository.full_name.clone())
            .ok_or(ProviderError::MissingEnv("GITHUB_REPOSITORY"))?;
        let (owner, repo) = full_name
            .split_once('/')
            .ok_or_else(|| ProviderError::InvalidConfig(format!("expected owner/repo, got: {full_name}")))?;

        let token = resolve_token(owner, repo).await?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ProviderError::Auth(format!("invalid token header: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("lampe"));
        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
            pr_number,
            head_sha: pull_request.head_commit_hash.clone(),
        })
    }

    fn url(&self, suffix: &str) -> String {
        format!("{API_BASE}/repos/{}/{}/{suffix}", self.owner, self.repo)
    }

    pub async fn deliver_pr_description(&self, payload: &PRDescriptionPayload) -> ProviderResult<()> {
        if self.pr_number == 0 {
            return Err(ProviderError::LocalRunMutation);
        }

        let url = self.url(&format!("pulls/{}", self.pr_number));
        let current: PullBody = check(self.client.get(&url).send().await?).await?.json().await?;
        let new_body = update_or_add_text_between_tags(
            current.body.as_deref().unwrap_or(""),
            &payload.description_with_title(),
            "description",
        );
        check(self.client.patch(&url).json(&json!({"body": new_body})).send().await?).await?;
        info!(pr = self.pr_number, "✅ Successfully updated PR description on GitHub");
        Ok(())
    }

    pub async fn deliver_pr_review(&self, payload: &PRReviewPayload) -> ProviderResult<()> {
        if self.pr_number == 0 {
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
                if let Err(e) = self.post_issue_comment(&body).await {
                    warn!(agent = %agent_review.agent_name, error = %e, "failed to post agent summary");
                }
            }

            for file_review in &agent_review.reviews {
                for (key, comment) in &file_review.line_comments {
                    let line = parse_line_number(key);
                    if line > 0 {
                        match self.post_inline_comment(&file_review.file_path, line, comment).await {
                            Ok(()) => continue,
                            Err(e) => {
                                warn!(
                                    path = %file_review.file_path,
                                    line,
                                    error = %e,
                                    "inline comment rejected, falling back to general comment"
                                );
                            }
                        }
                    }
                    let fallback = format!("{} (Line {line})\n\n{comment}", file_review.file_path);
                    if let Err(e) = self.post_issue_comment(&fallback).await {
                        warn!(path = %file_review.file_path, error = %e, "failed to post fallback comment");
                    }
                }

                if file_review.line_comments.is_empty() && !file_review.summary.is_empty() {
                    let body = format!("**{}:** {}", file_review.file_path, file_review.summary);
                    if let Err(e) = self.post_issue_comment(&body).await {
                        warn!(path = %file_review.file_path, error = %e, "failed to post file summary");
                    }
                }
            }
        }
        info!(pr = self.pr_number, "✅ Successfully posted PR review comments on GitHub");
        Ok(())
    }

    /// Whether the authenticated identity has left at least one issue
    /// comment or inline review comment on the PR.
    pub async fn has_reviewed(&self) -> ProviderResult<bool> {
        #[derive(Debug, Deserialize)]
        struct User {
            login: String,
        }
        let me: User = check(self.client.get(format!("{API_BASE}/user")).send().await?)
            .await?
            .json()
            .await?;

        let issue_comments: Vec<Comment> = check(
            self.client
                .get(self.url(&format!("issues/{}/comments", self.pr_number)))
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;
        if issue_comments.iter().any(|c| c.user.login == me.login) {
            return Ok(true);
        }

        let review_comments: Vec<Comment> = check(
            self.client
                .get(self.url(&format!("pulls/{}/comments", self.pr_number)))
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;
        Ok(review_comments.iter().any(|c| c.user.login == me.login))
    }

    pub async fn healthcheck(&self) -> ProviderResult<()> {
        let url = format!("{API_BASE}/repos/{}/{}", self.owner, self.repo);
        let repo: serde_json::Value = check(self.client.get(&url).send().await?).await?.json().await?;
        info!(
            full_name = %repo["full_name"].as_str().unwrap_or_default(),
            private = repo["private"].as_bool().unwrap_or_default(),
            "✅ Repository access confirmed"
        );
        Ok(())
    }

    async fn post_issue_comment(&self, body: &str) -> ProviderResult<()> {
        let url = self.url(&format!("issues/{}/comments", self.pr_number));
        check(self.client.post(&url).json(&json!({"body": body})).send().await?).await?;
        Ok(())
    }

    async fn post_inline_comment(&self, path: &str, line: u64, body: &str) -> ProviderResult<()> {
        let url = self.url(&format!("pulls/{}/comments", self.pr_number));
        let payload = json!({
            "body": body,
            "commit_id": self.head_sha,
            "path": path,
            "line": line,
            "side": "RIGHT",
        });
        check(self.client.post(&url).json(&payload).send().await?).await?;
        Ok(())
    }
}

/// Resolves an auth token: GitHub App first, PAT otherwise.
async fn resolve_token(owner: &str, repo: &str) -> ProviderResult<String> {
    let app_id = std::env::var("LAMPE_GITHUB_APP_ID").ok().filter(|v| !v.is_empty());
    let private_key = std::env::var("LAMPE_GITHUB_APP_PRIVATE_KEY")
        .ok()
        .filter(|v| !v.is_empty());

    if let (Some(app_id), Some(private_key)) = (app_id, private_key) {
        return installation_token(&app_id, &private_key, owner, repo).await;
    }

    must_env("LAMPE_GITHUB_TOKEN").map_err(|_| {
        ProviderError::Auth(
            "either GitHub App credentials (LAMPE_GITHUB_APP_ID, LAMPE_GITHUB_APP_PRIVATE_KEY) \
             or a user token (LAMPE_GITHUB_TOKEN) is required"
                .into(),
        )
    })
}

/// Exchanges an app JWT for an installation access token.
async fn installation_token(app_id: &str, private_key: &str, owner: &str, repo: &str) -> ProviderResult<String> {
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

    #[derive(serde::Serialize)]
    struct Claims {
        iat: i64,
        exp: i64,
        iss: String,
    }

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        iat: now - 60,
        exp: now + 540,
        iss: app_id.to_string(),
    };
    let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
        .map_err(|e| ProviderError::Auth(format!("invalid app private key: {e}")))?;
    let jwt = encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| ProviderError::Auth(format!("failed to sign app JWT: {e}")))?;

    let client = reqwest::Client::new();
    let auth = format!("Bearer {jwt}");

    #[derive(Debug, Deserialize)]
    struct Installation {
        id: u64,
    }
    let installation: Installation = check(
        client
            .get(format!("{API_BASE}/repos/{owner}/{repo}/installation"))
            .header(AUTHORIZATION, &auth)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "lampe")
            .send()
            .await?,
    )
    .await?
    .json()
    .await?;

    #[derive(Debug, Deserialize)]
    struct AccessToken {
        token: String,
    }
    let access: AccessToken = check(
        client
            .post(format!("{API_BASE}/app/installations/{}/access_tokens", installation.id))
            .header(AUTHORIZATION, &auth)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "lampe")
            .send()
            .await?,
    )
    .await?
    .json()
    .await?;

    Ok(access.token)
}

/// Maps non-2xx responses to [`ProviderError::Status`] with a body snippet.
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
