//! Source repository kinds and URL synthesis

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of repository a build definition pulls from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepoType {
    GitHub,
    TfsGit,
    Bitbucket,
    GitHubEnterprise,
}

impl RepoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoType::GitHub => "GitHub",
            RepoType::TfsGit => "TfsGit",
            RepoType::Bitbucket => "Bitbucket",
            RepoType::GitHubEnterprise => "GitHubEnterprise",
        }
    }

    /// Whether the service needs a service connection to reach this kind of repository
    pub fn requires_service_connection(&self) -> bool {
        matches!(self, RepoType::Bitbucket | RepoType::GitHubEnterprise)
    }
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(RepoType::GitHub),
            "tfsgit" => Ok(RepoType::TfsGit),
            "bitbucket" => Ok(RepoType::Bitbucket),
            "githubenterprise" => Ok(RepoType::GitHubEnterprise),
            _ => Err(format!("unknown repository type: {}", s)),
        }
    }
}

/// Clone and API URLs for a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryUrls {
    pub clone_url: String,
    pub api_url: String,
}

/// Build the URLs the service expects for a repository
///
/// Returns `None` for TfsGit, whose URLs are assigned by the service, and for
/// GitHubEnterprise without an enterprise URL.
pub fn synthesize_urls(
    repo_type: RepoType,
    repo_id: &str,
    github_enterprise_url: Option<&str>,
) -> Option<RepositoryUrls> {
    match repo_type {
        RepoType::GitHub => Some(RepositoryUrls {
            clone_url: format!("https://github.com/{}.git", repo_id),
            api_url: format!("https://api.github.com/repos/{}", repo_id),
        }),
        RepoType::Bitbucket => Some(RepositoryUrls {
            clone_url: format!("https://bitbucket.org/{}.git", repo_id),
            api_url: format!("https://api.bitbucket.org/2.0/repositories/{}", repo_id),
        }),
        RepoType::GitHubEnterprise => {
            let base = github_enterprise_url.filter(|u| !u.is_empty())?;
            Some(RepositoryUrls {
                clone_url: format!("{}/{}.git", base, repo_id),
                api_url: format!("{}/api/v3/repos/{}", base, repo_id),
            })
        }
        RepoType::TfsGit => None,
    }
}

/// Recover `scheme://host[:port]` from a GitHub Enterprise clone URL
pub fn enterprise_url_from_clone(clone_url: &str) -> Option<String> {
    let parsed = url::Url::parse(clone_url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}
