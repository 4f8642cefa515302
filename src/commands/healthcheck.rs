//! `lampe healthcheck`
//!
//! Verifies the git toolchain, provider environment, and LLM keys.
//! Prints ✅/❌ diagnostics and exits 1 on the first failure.

use lampe_core::git::management::{MINIMUM_GIT_VERSION, check_git_version};
use lampe_core::{PullRequest, Repository};
use lampe_providers::{Provider, ProviderType, detect};

pub async fn run() -> anyhow::Result<i32> {
    eprintln!("🔍 Checking CLI health...");

    // Git toolchain.
    match check_git_version().await {
        Ok(()) => eprintln!("✅ git {MINIMUM_GIT_VERSION}+ available"),
        Err(e) => {
            eprintln!("❌ Git version check failed: {e}");
            eprintln!("   lampe requires git {MINIMUM_GIT_VERSION} or newer (clone --revision support)");
            return Ok(1);
        }
    }

    // Provider environment.
    let detected = detect::detect_provider_type();
    eprintln!("✅ Detected output provider: {detected}");

    if detected != ProviderType::Console {
        if !report_provider_env(detected) {
            return Ok(1);
        }

        let repository = Repository {
            local_path: ".".to_string(),
            full_name: std::env::var("GITHUB_REPOSITORY").ok(),
        };
        let mut pull_request = PullRequest::local("Healthcheck", "", "");
        pull_request.number = std::env::var("PR_NUMBER")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        match Provider::create(detected, &repository, &pull_request).await {
            Ok(provider) => match provider.healthcheck().await {
                Ok(()) => eprintln!("✅ {} provider is healthy", provider.name()),
                Err(e) => {
                    eprintln!("❌ Provider healthcheck failed: {e}");
                    report_troubleshooting(detected);
                    return Ok(1);
                }
            },
            Err(e) => {
                eprintln!("❌ Provider configuration invalid: {e}");
                report_troubleshooting(detected);
                return Ok(1);
            }
        }
    }

    // LLM keys.
    eprintln!("🔑 Checking LLM API keys...");
    match llm_service::tiers::healthcheck() {
        Ok(()) => {
            if std::env::var("OPENAI_API_KEY").is_ok() {
                eprintln!("✅ OPENAI_API_KEY is set");
            }
            if std::env::var("ANTHROPIC_API_KEY").is_ok() {
                eprintln!("✅ ANTHROPIC_API_KEY is set");
            }
        }
        Err(_) => {
            eprintln!("❌ No LLM API keys found");
            eprintln!("   Set at least one of OPENAI_API_KEY or ANTHROPIC_API_KEY");
            return Ok(1);
        }
    }

    eprintln!("🎉 All health checks passed! CLI is ready to use.");
    Ok(0)
}

fn env_set(name: &str) -> bool {
    std::env::var(name).map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Prints per-provider environment diagnostics; false when misconfigured.
fn report_provider_env(provider: ProviderType) -> bool {
    match provider {
        ProviderType::GitHub => {
            match std::env::var("GITHUB_REPOSITORY") {
                Ok(repo) if repo.split('/').count() == 2 => {
                    eprintln!("✅ GITHUB_REPOSITORY set to: {repo}");
                }
                _ => {
                    eprintln!("❌ GITHUB_REPOSITORY environment variable not set");
                    eprintln!("   Set it to 'owner/repo' format");
                    return false;
                }
            }

            let app = env_set("LAMPE_GITHUB_APP_ID") && env_set("LAMPE_GITHUB_APP_PRIVATE_KEY");
            if app {
                eprintln!("✅ GitHub App authentication detected");
            } else if env_set("LAMPE_GITHUB_TOKEN") {
                eprintln!("✅ User token authentication detected");
            } else {
                eprintln!("❌ No GitHub authentication found");
                eprintln!("   Set either:");
                eprintln!("   - LAMPE_GITHUB_APP_ID and LAMPE_GITHUB_APP_PRIVATE_KEY for GitHub App");
                eprintln!("   - LAMPE_GITHUB_TOKEN for user token authentication");
                return false;
            }
            true
        }
        ProviderType::GitLab => {
            if env_set("GITLAB_API_TOKEN") {
                eprintln!("✅ GITLAB_API_TOKEN is set");
                true
            } else {
                eprintln!("❌ GITLAB_API_TOKEN environment variable not set");
                false
            }
        }
        ProviderType::Bitbucket => {
            let workspace = env_set("BITBUCKET_WORKSPACE");
            let slug = env_set("BITBUCKET_REPO_SLUG");
            if !workspace || !slug {
                eprintln!("❌ Bitbucket environment variables not set");
                eprintln!("   Set both:");
                eprintln!("   - BITBUCKET_WORKSPACE (e.g. 'my-workspace')");
                eprintln!("   - BITBUCKET_REPO_SLUG (e.g. 'my-repo')");
                return false;
            }
            eprintln!("✅ BITBUCKET_WORKSPACE and BITBUCKET_REPO_SLUG are set");

            if env_set("LAMPE_BITBUCKET_TOKEN") {
                eprintln!("✅ Bitbucket token authentication detected");
            } else if env_set("LAMPE_BITBUCKET_APP_KEY") && env_set("LAMPE_BITBUCKET_APP_SECRET") {
                eprintln!("✅ Bitbucket App authentication detected");
            } else {
                eprintln!("❌ No Bitbucket authentication found");
                eprintln!("   Set either:");
                eprintln!("   - LAMPE_BITBUCKET_TOKEN for token authentication");
                eprintln!("   - LAMPE_BITBUCKET_APP_KEY and LAMPE_BITBUCKET_APP_SECRET for app authentication");
                return false;
            }
            true
        }
        ProviderType::Console | ProviderType::Auto => true,
    }
}

fn report_troubleshooting(provider: ProviderType) {
    eprintln!("\nTroubleshooting tips:");
    match provider {
        ProviderType::GitHub => {
            eprintln!("- Verify the token or app credentials are valid and have appropriate permissions");
            eprintln!("- Ensure the token has 'repo' scope for private repositories");
            eprintln!("- For GitHub App auth, ensure the app is installed on the repository");
        }
        ProviderType::GitLab => {
            eprintln!("- Verify GITLAB_API_TOKEN is valid and has 'api' scope");
        }
        ProviderType::Bitbucket => {
            eprintln!("- Verify the token has 'repositories:read' and 'pullrequests:write' scopes");
            eprintln!("- For app auth, ensure the Bitbucket App is installed on the workspace");
        }
        ProviderType::Console | ProviderType::Auto => {}
    }
}
