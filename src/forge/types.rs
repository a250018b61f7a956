//! Common types for the forge adapter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `owner/repo` pair parsed from a git remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// State of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

impl PrState {
    pub fn parse(s: &str) -> PrState {
        match s.to_uppercase().as_str() {
            "CLOSED" => PrState::Closed,
            "MERGED" => PrState::Merged,
            _ => PrState::Open,
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Merged => write!(f, "merged"),
        }
    }
}

/// Full pull request record from `pr view`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrDetails {
    pub number: u64,
    pub url: String,
    pub title: String,
    pub body: String,
    pub state: PrState,
    /// Base branch name (the branch being merged into)
    pub base_ref: String,
    /// Head branch name (the branch being merged)
    pub head_ref: String,
    /// Merge timestamp; empty means not merged
    pub merged_at: String,
    pub mergeable: String,
    pub is_draft: bool,
    pub review_decision: String,
}

impl PrDetails {
    /// Merged is derived from a non-empty mergedAt.
    pub fn merged(&self) -> bool {
        !self.merged_at.is_empty()
    }
}

/// One row from `pr list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrSummary {
    pub number: u64,
    pub title: String,
    pub head_ref: String,
    pub url: String,
    pub author: String,
}

/// Aggregated CI check state for a PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckState {
    Success,
    Failure,
    Pending,
    /// No checks configured
    #[default]
    None,
    /// Output present but unparseable
    Unknown,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckState::Success => write!(f, "success"),
            CheckState::Failure => write!(f, "failure"),
            CheckState::Pending => write!(f, "pending"),
            CheckState::None => write!(f, "none"),
            CheckState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Parsed `pr checks` output with a human summary like "3/4 passed".
#[derive(Debug, Clone, Default)]
pub struct CheckSummary {
    pub state: CheckState,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub total: usize,
    pub summary: String,
}
