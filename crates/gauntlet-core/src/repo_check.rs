//! Repository accessibility checks for the eligibility layer.
//!
//! `RepositoryChecker` is the seam; `GithubRepoChecker` talks to the GitHub
//! REST API and `StaticRepoChecker` answers from a fixed table for tests
//! and offline runs.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::RepoCheckError;

const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Owner/name pair of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Outcome of probing a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoAccess {
    pub accessible: bool,
    pub is_public: bool,
    /// Set when the host answered but the answer is not a plain yes/no
    pub error: Option<String>,
}

impl RepoAccess {
    pub fn public() -> Self {
        Self {
            accessible: true,
            is_public: true,
            error: None,
        }
    }

    pub fn private() -> Self {
        Self {
            accessible: true,
            is_public: false,
            error: None,
        }
    }

    pub fn missing() -> Self {
        Self {
            accessible: false,
            is_public: false,
            error: None,
        }
    }
}

fn https_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:https?://)?(?:www\.)?github\.com/([a-z0-9_.-]+)/([a-z0-9_.-]+?)(?:\.git)?(?:[/?#].*)?$",
        )
        .expect("repository pattern is valid")
    })
}

fn ssh_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^git@github\.com:([a-z0-9_.-]+)/([a-z0-9_.-]+?)(?:\.git)?/?$")
            .expect("repository pattern is valid")
    })
}

/// Extract owner and repository name from a GitHub URL.
///
/// Accepts `https://github.com/o/r`, an optional `.git` suffix, the
/// scheme-less `github.com/o/r` and `git@github.com:o/r.git`. The host is
/// matched case-insensitively. Anything after the first two path segments
/// (`/tree/main`, `?tab=readme`, `#readme`) is ignored.
pub fn parse_repository_url(url: &str) -> Result<RepoRef, RepoCheckError> {
    let trimmed = url.trim();
    let captures = https_pattern()
        .captures(trimmed)
        .or_else(|| ssh_pattern().captures(trimmed))
        .ok_or_else(|| RepoCheckError::InvalidUrl(trimmed.to_string()))?;

    let owner = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let repo = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
    if owner.is_empty() || repo.is_empty() || repo == "." || repo == ".." {
        return Err(RepoCheckError::InvalidUrl(trimmed.to_string()));
    }

    Ok(RepoRef {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// Probe whether a repository exists and is public.
#[async_trait]
pub trait RepositoryChecker: Send + Sync {
    async fn check(&self, repo: &RepoRef) -> Result<RepoAccess, RepoCheckError>;
}

/// GitHub REST API checker (`GET /repos/{owner}/{repo}`).
pub struct GithubRepoChecker {
    api_base: String,
    token: Option<String>,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GithubRepo {
    #[serde(default)]
    private: bool,
}

impl GithubRepoChecker {
    pub fn new(timeout: Duration) -> Result<Self, RepoCheckError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("gauntlet/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RepoCheckError::Http(e.to_string()))?;

        Ok(Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            http_client,
        })
    }

    /// Set authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Point at a GitHub Enterprise or mock API root
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl RepositoryChecker for GithubRepoChecker {
    async fn check(&self, repo: &RepoRef) -> Result<RepoAccess, RepoCheckError> {
        let url = format!("{}/repos/{}/{}", self.api_base, repo.owner, repo.repo);
        let mut request = self
            .http_client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RepoCheckError::Timeout
            } else {
                RepoCheckError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        debug!(repo = %repo, status = status.as_u16(), "repository probed");

        if status.is_success() {
            let body: GithubRepo = response
                .json()
                .await
                .map_err(|e| RepoCheckError::Http(e.to_string()))?;
            return Ok(RepoAccess {
                accessible: true,
                is_public: !body.private,
                error: None,
            });
        }

        match status.as_u16() {
            // Private repositories are reported as missing to callers
            // without access.
            404 | 451 => Ok(RepoAccess::missing()),
            code => Err(RepoCheckError::UnexpectedStatus(code)),
        }
    }
}

/// Checker answering from a fixed `owner/repo` table.
///
/// Unknown repositories are reported as not accessible.
#[derive(Debug, Default)]
pub struct StaticRepoChecker {
    entries: HashMap<String, Result<RepoAccess, RepoCheckError>>,
}

impl StaticRepoChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, slug: &str, access: RepoAccess) -> Self {
        self.entries.insert(slug.to_string(), Ok(access));
        self
    }

    pub fn with_error(mut self, slug: &str, error: RepoCheckError) -> Self {
        self.entries.insert(slug.to_string(), Err(error));
        self
    }
}

#[async_trait]
impl RepositoryChecker for StaticRepoChecker {
    async fn check(&self, repo: &RepoRef) -> Result<RepoAccess, RepoCheckError> {
        self.entries
            .get(&repo.to_string())
            .cloned()
            .unwrap_or_else(|| Ok(RepoAccess::missing()))
    }
}
