//! Forge adapter: PR operations through a hosted-forge CLI.
//!
//! The `Forge` trait defines the operations the rest of the system needs;
//! the production implementation wraps the GitHub CLI (`gh`), invoked as
//! `gh <subcmd> -R owner/repo` with JSON output where the tool offers it.
//! Stderr is classified with substring rules into typed errors so callers
//! can degrade gracefully (status without CI, sync without cleanup).

use anyhow::{bail, Context, Result};
use thiserror::Error;

pub mod batch;
mod checks;
pub mod gh;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use batch::{fetch_statuses, BranchPrStatus};
pub use checks::parse_checks;
pub use gh::GhForge;
pub use types::{CheckState, CheckSummary, PrDetails, PrState, PrSummary, RepoSlug};

use crate::git::Git;

/// Typed forge failure.
///
/// `AuthRequired` and `NoAccess` are contracts: callers print them once per
/// run as warnings and continue best-effort.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("forge CLI is not authenticated. Run 'gh auth login' first")]
    AuthRequired,
    #[error("no access to repository {0}")]
    NoAccess(String),
    #[error("{0}")]
    Failed(String),
}

impl ForgeError {
    /// Classify CLI stderr; `None` means the error is not one of the
    /// recognized kinds and should pass through as `Failed`.
    pub fn classify(stderr: &str, slug: &RepoSlug) -> Option<ForgeError> {
        let lower = stderr.to_lowercase();
        if lower.contains("auth login")
            || lower.contains("not logged")
            || lower.contains("authentication")
            || stderr.contains("401")
        {
            return Some(ForgeError::AuthRequired);
        }
        if stderr.contains("Could not resolve to a Repository") {
            return Some(ForgeError::NoAccess(slug.to_string()));
        }
        None
    }
}

/// Operations on the PR service. All implementations are CLI wrappers.
pub trait Forge: Send + Sync {
    fn slug(&self) -> &RepoSlug;

    /// Create a PR; returns the full record of the created PR.
    fn create_pr(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
        draft: bool,
    ) -> Result<PrDetails, ForgeError>;

    fn pr_by_number(&self, number: u64) -> Result<PrDetails, ForgeError>;

    /// PR whose head is `branch`, if any.
    fn pr_for_branch(&self, branch: &str) -> Result<Option<PrDetails>, ForgeError>;

    fn list_open_prs(&self) -> Result<Vec<PrSummary>, ForgeError>;

    fn edit_pr_body(&self, number: u64, body: &str) -> Result<(), ForgeError>;

    fn edit_pr_base(&self, number: u64, base: &str) -> Result<(), ForgeError>;

    /// CI check rollup for the PR headed by `branch`.
    fn checks_for_branch(&self, branch: &str) -> Result<CheckSummary, ForgeError>;
}

/// Parse a git remote URL into `(owner, repo)`.
///
/// Accepts SSH (`git@host:owner/repo.git`, `ssh://git@host/owner/repo`)
/// and HTTPS (`https://host/owner/repo[.git]`) forms.
pub fn parse_remote_slug(url: &str) -> Result<RepoSlug> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        bail!("Remote URL is empty");
    }
    if trimmed.starts_with("file:") || trimmed.starts_with('/') || trimmed.starts_with('.') {
        bail!("Remote '{}' is a local path, not a forge URL", url);
    }

    // Strip scheme, then any user@ prefix
    let rest = trimmed
        .strip_prefix("ssh://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .or_else(|| trimmed.strip_prefix("http://"))
        .or_else(|| trimmed.strip_prefix("git://"))
        .unwrap_or(trimmed);
    let rest = rest.split_once('@').map(|(_, r)| r).unwrap_or(rest);

    // scp-style host:path vs URL-style host/path (a scp colon is followed by
    // the path, a URL colon by a port number)
    let path = match rest.split_once(':') {
        Some((_, after)) => {
            let after = after.trim_start_matches(|c: char| c.is_ascii_digit());
            after.trim_start_matches('/')
        }
        None => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
    };

    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next();
    let repo = segments.next_back().or(owner);

    match (owner, repo) {
        (Some(owner), Some(repo)) if owner != repo || path.matches('/').count() >= 1 => Ok(RepoSlug {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }),
        _ => bail!("Could not parse owner/repo from remote URL '{}'", url),
    }
}

/// Build the forge for the repository this git adapter points at.
pub fn forge_for(git: &Git, token: Option<String>) -> Result<GhForge> {
    let url = git
        .remote_url()
        .context("No 'origin' remote configured; a forge remote is required for PR operations")?;
    let slug = parse_remote_slug(&url)?;
    Ok(GhForge::new(slug, token))
}
