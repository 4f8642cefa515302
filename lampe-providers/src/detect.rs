//! Provider selection.

use std::fmt;
use std::str::FromStr;

/// Available sink types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Console,
    GitHub,
    GitLab,
    Bitbucket,
    Auto,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Console => "console",
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::Bitbucket => "bitbucket",
            Self::Auto => "auto",
        };
        f.write_str(s)
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "console" => Ok(Self::Console),
            "github" => Ok(Self::GitHub),
            "gitlab" => Ok(Self::GitLab),
            "bitbucket" => Ok(Self::Bitbucket),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Environment variables scanned for auto-detection, in priority order:
/// GitHub tokens first, then GitLab, then Bitbucket.
const DETECTION_ORDER: &[(&str, ProviderType)] = &[
    ("GITHUB_API_TOKEN", ProviderType::GitHub),
    ("GITHUB_TOKEN", ProviderType::GitHub),
    ("LAMPE_GITHUB_TOKEN", ProviderType::GitHub),
    ("LAMPE_GITHUB_APP_ID", ProviderType::GitHub),
    ("LAMPE_GITHUB_APP_PRIVATE_KEY", ProviderType::GitHub),
    ("GITLAB_API_TOKEN", ProviderType::GitLab),
    ("LAMPE_BITBUCKET_TOKEN", ProviderType::Bitbucket),
    ("LAMPE_BITBUCKET_APP_KEY", ProviderType::Bitbucket),
    ("BITBUCKET_WORKSPACE", ProviderType::Bitbucket),
];

/// Pure detection over an env lookup; console when nothing is set.
pub fn detect_provider_type_from(lookup: impl Fn(&str) -> Option<String>) -> ProviderType {
    for (var, provider) in DETECTION_ORDER {
        if lookup(var).filter(|v| !v.is_empty()).is_some() {
            return *provider;
        }
    }
    ProviderType::Console
}

/// Detection against the process environment.
pub fn detect_provider_type() -> ProviderType {
    detect_provider_type_from(|var| std::env::var(var).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn bitbucket_token_alone_selects_bitbucket() {
        let detected = detect_provider_type_from(env_of(&[("LAMPE_BITBUCKET_TOKEN", "t")]));
        assert_eq!(detected, ProviderType::Bitbucket);
    }

    #[test]
    fn no_tokens_fall_back_to_console() {
        assert_eq!(detect_provider_type_from(env_of(&[])), ProviderType::Console);
    }

    #[test]
    fn github_wins_over_gitlab_and_bitbucket() {
        let detected = detect_provider_type_from(env_of(&[
            ("LAMPE_BITBUCKET_TOKEN", "t"),
            ("GITLAB_API_TOKEN", "t"),
            ("LAMPE_GITHUB_TOKEN", "t"),
        ]));
        assert_eq!(detected, ProviderType::GitHub);
    }

    #[test]
    fn gitlab_wins_over_bitbucket() {
        let detected = detect_provider_type_from(env_of(&[
            ("LAMPE_BITBUCKET_TOKEN", "t"),
            ("GITLAB_API_TOKEN", "t"),
        ]));
        assert_eq!(detected, ProviderType::GitLab);
    }

    #[test]
    fn empty_values_do_not_count() {
        let detected = detect_provider_type_from(env_of(&[("GITHUB_TOKEN", "")]));
        assert_eq!(detected, ProviderType::Console);
    }
}
