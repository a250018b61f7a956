//! Sync planning: decide, per branch, what restores alignment with its
//! parent.
//!
//! Classification happens against fresh upstream state (callers fetch
//! first). The executor re-classifies each branch right before acting on
//! it, so a child always sees its parent's post-rebase position. Plan
//! order is the model's DFS order: parents before children, siblings in
//! tree-declaration order.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::git::REMOTE;
use crate::repo::Repo;

/// What to do for one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Rebase onto the freshest base ref (parent is the base branch)
    RebaseOntoBase { target: String },
    /// Rebase onto the parent's tip
    RebaseOntoParent { parent: String },
    /// Parent was merged: `rebase --onto <target> <old_parent>`; on
    /// success the branch's parent becomes the base branch
    RebaseOntoNewBase { target: String, old_parent: String },
    /// No commits of its own: `reset --hard` to the target, conflict-free
    FastForward { target: String },
    /// The branch's own PR is merged; slate for cleanup after the pass
    CleanupMerged,
}

impl SyncAction {
    /// Human description used by confirmation prompts and summaries.
    pub fn describe(&self) -> String {
        match self {
            SyncAction::RebaseOntoBase { target } => format!("rebase onto {}", target),
            SyncAction::RebaseOntoParent { parent } => format!("rebase onto {}", parent),
            SyncAction::RebaseOntoNewBase { target, old_parent } => {
                format!("rebase onto {} (parent {} was merged)", target, old_parent)
            }
            SyncAction::FastForward { target } => format!("fast-forward to {}", target),
            SyncAction::CleanupMerged => "delete (PR merged)".to_string(),
        }
    }
}

/// One classified branch, ready for execution.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub branch: String,
    pub worktree: PathBuf,
    pub action: SyncAction,
    /// Commits the branch is behind its sync target
    pub behind: usize,
    /// New parent recorded in the model after a successful rebase
    pub synced_parent: Option<String>,
}

/// One row of the status view: why a branch needs syncing.
#[derive(Debug, Clone)]
pub struct SyncNeed {
    pub branch: String,
    pub reason: String,
    pub behind: usize,
}

/// Freshest ref for the base branch: `origin/<base>` when it exists,
/// the local base branch otherwise.
pub fn base_target(repo: &Repo) -> String {
    let remote_ref = format!("{}/{}", REMOTE, repo.base_branch);
    match repo.git.rev_parse(&remote_ref) {
        Ok(_) => remote_ref,
        Err(_) => repo.base_branch.clone(),
    }
}

/// Classify one branch. `merged` carries branch names whose PR the forge
/// reported merged (squash/rebase merges leave no ancestry trail).
pub fn classify_branch(
    repo: &Repo,
    merged: &HashSet<String>,
    name: &str,
) -> Result<Option<PlanEntry>> {
    let branch = repo
        .stacks
        .get_branch(name)
        .with_context(|| format!("Branch '{}' is not tracked", name))?;

    // Imported upstream branches are never rebased
    if branch.is_remote {
        return Ok(None);
    }

    // The branch's own PR merged: no rebase, only cleanup
    if branch.is_merged || merged.contains(name) {
        return Ok(Some(PlanEntry {
            branch: name.to_string(),
            worktree: branch.worktree_path.clone(),
            action: SyncAction::CleanupMerged,
            behind: 0,
            synced_parent: None,
        }));
    }

    let parent = branch.parent.clone();
    let worktree = branch.worktree_path.clone();

    if repo.stacks.is_main_branch(&parent) {
        let target = base_target(repo);
        let behind = repo.git.commits_ahead(name, &target)?;
        if behind == 0 {
            return Ok(None);
        }
        let action = if own_commits(repo, name, &target)? == 0 {
            SyncAction::FastForward { target }
        } else {
            SyncAction::RebaseOntoBase { target }
        };
        return Ok(Some(PlanEntry {
            branch: name.to_string(),
            worktree,
            action,
            behind,
            synced_parent: None,
        }));
    }

    // Parent observed merged: via forge, sticky flag, or ancestry of the base
    let parent_merged = merged.contains(&parent)
        || repo.stacks.get_branch(&parent).is_some_and(|p| p.is_merged)
        || {
            let target = base_target(repo);
            repo.git.branch_exists(&parent)? && repo.git.is_ancestor(&parent, &target)?
        };

    if parent_merged {
        let target = base_target(repo);
        let behind = repo.git.commits_ahead(name, &target)?;
        let action = if !repo.git.branch_exists(&parent)? {
            // Parent ref is gone; its commits already live in the base, so a
            // plain rebase onto the base replays only this branch's own work
            SyncAction::RebaseOntoBase { target }
        } else if own_commits(repo, name, &parent)? == 0 {
            SyncAction::FastForward { target }
        } else {
            SyncAction::RebaseOntoNewBase {
                target,
                old_parent: parent,
            }
        };
        return Ok(Some(PlanEntry {
            branch: name.to_string(),
            worktree,
            action,
            behind,
            synced_parent: Some(repo.base_branch.clone()),
        }));
    }

    let behind = repo.git.commits_ahead(name, &parent)?;
    if behind == 0 {
        return Ok(None);
    }
    let action = if own_commits(repo, name, &parent)? == 0 {
        SyncAction::FastForward {
            target: parent.clone(),
        }
    } else {
        SyncAction::RebaseOntoParent { parent }
    };
    Ok(Some(PlanEntry {
        branch: name.to_string(),
        worktree,
        action,
        behind,
        synced_parent: None,
    }))
}

/// Commits the branch carries beyond its merge-base with `against`.
/// Zero means a conflict-free fast-forward is possible.
fn own_commits(repo: &Repo, branch: &str, against: &str) -> Result<usize> {
    let base = repo.git.merge_base(branch, against)?;
    repo.git.commits_ahead(&base, branch)
}

/// Branch names of every stack, stack by stack, in plan order.
pub fn plan_order_all(repo: &Repo) -> Vec<String> {
    repo.stacks
        .list_stacks()
        .iter()
        .flat_map(|s| s.branches.iter().map(|b| b.name.clone()))
        .collect()
}

// ──────────────────────────────────────────────────────────────
// Status-view detection
// ──────────────────────────────────────────────────────────────

pub fn detect_sync_needed_for_branch(
    repo: &Repo,
    merged: &HashSet<String>,
    name: &str,
) -> Result<Option<SyncNeed>> {
    Ok(classify_branch(repo, merged, name)?.map(need_from_entry))
}

/// Sync needs for every branch of the stack containing `branch`.
pub fn detect_sync_needed(
    repo: &Repo,
    merged: &HashSet<String>,
    branch: &str,
) -> Result<Vec<SyncNeed>> {
    let stack = repo.stacks.current_stack(branch)?;
    let names: Vec<String> = stack.branches.iter().map(|b| b.name.clone()).collect();
    collect_needs(repo, merged, &names)
}

pub fn detect_sync_needed_all_stacks(
    repo: &Repo,
    merged: &HashSet<String>,
) -> Result<Vec<SyncNeed>> {
    let names = plan_order_all(repo);
    collect_needs(repo, merged, &names)
}

fn collect_needs(repo: &Repo, merged: &HashSet<String>, names: &[String]) -> Result<Vec<SyncNeed>> {
    let mut needs = Vec::new();
    for name in names {
        if let Some(entry) = classify_branch(repo, merged, name)? {
            needs.push(need_from_entry(entry));
        }
    }
    Ok(needs)
}

fn need_from_entry(entry: PlanEntry) -> SyncNeed {
    let reason = match &entry.action {
        SyncAction::RebaseOntoBase { target } => format!("behind {} by {}", target, entry.behind),
        SyncAction::RebaseOntoParent { parent } => {
            format!("behind parent {} by {}", parent, entry.behind)
        }
        SyncAction::RebaseOntoNewBase { old_parent, .. } => {
            format!("parent {} was merged", old_parent)
        }
        SyncAction::FastForward { target } => format!("fast-forwardable to {}", target),
        SyncAction::CleanupMerged => "PR merged, ready for cleanup".to_string(),
    };
    SyncNeed {
        branch: entry.branch,
        reason,
        behind: entry.behind,
    }
}
