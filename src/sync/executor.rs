//! Sync execution: walk the plan in topological order across worktrees.
//!
//! Each branch gets a fresh git adapter bound to its worktree. Outcomes
//! are collected, never raised: a conflict or error skips the branch's
//! descendants but leaves independent subtrees running. Parent updates
//! from merged-parent rebases land in the model before any child is
//! processed, and every model effect is persisted only after the git
//! command that caused it succeeded.

use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::planner::{classify_branch, plan_order_all, PlanEntry, SyncAction};
use crate::git::Git;
use crate::repo::Repo;
use crate::stack::ops::worktree_contains_cwd;
use crate::ui;

/// Passed to `before_rebase` ahead of each pending action.
#[derive(Debug)]
pub struct RebaseRequest<'a> {
    pub branch: &'a str,
    pub worktree: &'a Path,
    /// Human description of the pending action
    pub action: String,
    pub behind: usize,
}

/// Per-branch outcome record.
#[derive(Debug, Clone)]
pub struct BranchSyncResult {
    pub branch: String,
    pub worktree: PathBuf,
    pub success: bool,
    pub has_conflict: bool,
    pub error: Option<String>,
    pub behind_by: usize,
    /// New parent recorded after a merged-parent rebase
    pub synced_parent: Option<String>,
}

/// The two hooks interactive and non-interactive front-ends plug in, plus
/// the optional cleanup confirmation.
pub struct SyncCallbacks<'a> {
    /// Return false to skip this branch (and its descendants) silently
    pub before_rebase: &'a mut dyn FnMut(&RebaseRequest) -> bool,
    /// Called after a successful rebase that left the branch ahead of its
    /// origin; returning false aborts the remainder of the plan
    pub after_rebase: &'a mut dyn FnMut(&BranchSyncResult, &Git) -> Result<bool>,
    /// Confirm deleting a merged branch; None disables cleanup entirely
    pub confirm_cleanup: Option<&'a mut dyn FnMut(&str) -> bool>,
}

/// Everything a sync pass did.
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub results: Vec<BranchSyncResult>,
    /// Branches skipped with the reason (declined parent, conflicted parent)
    pub skipped: Vec<(String, String)>,
    /// Merged branches deleted during cleanup
    pub cleaned: Vec<String>,
    /// True when `after_rebase` aborted the remainder of the plan
    pub aborted: bool,
    /// Set when the invoking worktree was deleted; the command should emit
    /// a cd directive to this path
    pub moved_to: Option<PathBuf>,
}

impl SyncSummary {
    pub fn conflicts(&self) -> Vec<&BranchSyncResult> {
        self.results.iter().filter(|r| r.has_conflict).collect()
    }

    pub fn rebased(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}

/// Execute a sync pass over every stack.
///
/// `merged` names branches whose PR the forge reported merged; it feeds
/// both classification and the cleanup phase.
pub fn execute(
    repo: &mut Repo,
    merged: &HashSet<String>,
    callbacks: SyncCallbacks,
) -> Result<SyncSummary> {
    let mut summary = SyncSummary::default();
    let mut skipped: HashSet<String> = HashSet::new();
    let mut cleanup_candidates: Vec<String> = Vec::new();

    let order = plan_order_all(repo);

    'branches: for name in &order {
        if skipped.contains(name) {
            continue;
        }

        let entry = match classify_branch(repo, merged, name)? {
            Some(entry) => entry,
            None => continue,
        };

        if entry.action == SyncAction::CleanupMerged {
            cleanup_candidates.push(name.clone());
            continue;
        }

        let request = RebaseRequest {
            branch: name,
            worktree: &entry.worktree,
            action: entry.action.describe(),
            behind: entry.behind,
        };
        if !(callbacks.before_rebase)(&request) {
            skip_descendants(repo, name, "parent sync declined", &mut skipped, &mut summary);
            continue;
        }

        // Fresh adapter bound to this branch's worktree
        let git = Git::in_dir(&entry.worktree);
        let outcome = run_action(&git, &entry)?;

        match outcome {
            ActionOutcome::Success => {
                // Merged-parent rebase: record the new parent before any
                // child is classified, and remember the parent for cleanup
                if let Some(ref new_parent) = entry.synced_parent {
                    if let SyncAction::RebaseOntoNewBase { ref old_parent, .. } = entry.action {
                        repo.stacks.set_merged(old_parent);
                        if !cleanup_candidates.contains(old_parent) {
                            cleanup_candidates.push(old_parent.clone());
                        }
                    }
                    repo.stacks.reparent(name, new_parent)?;
                }
                repo.save()?;

                let result = BranchSyncResult {
                    branch: name.clone(),
                    worktree: entry.worktree.clone(),
                    success: true,
                    has_conflict: false,
                    error: None,
                    behind_by: entry.behind,
                    synced_parent: entry.synced_parent.clone(),
                };

                // Children cannot be rebased on an unpushed parent: give the
                // front-end a chance to push, and abort the plan if it declines
                let diverged = git.has_diverged(name)?;
                if diverged.local_ahead > 0 && !(callbacks.after_rebase)(&result, &git)? {
                    summary.results.push(result);
                    summary.aborted = true;
                    break 'branches;
                }
                summary.results.push(result);
            }
            ActionOutcome::Conflict => {
                summary.results.push(BranchSyncResult {
                    branch: name.clone(),
                    worktree: entry.worktree.clone(),
                    success: false,
                    has_conflict: true,
                    error: None,
                    behind_by: entry.behind,
                    synced_parent: None,
                });
                skip_descendants(repo, name, "parent had conflicts", &mut skipped, &mut summary);
            }
            ActionOutcome::Error(message) => {
                summary.results.push(BranchSyncResult {
                    branch: name.clone(),
                    worktree: entry.worktree.clone(),
                    success: false,
                    has_conflict: false,
                    error: Some(message),
                    behind_by: entry.behind,
                    synced_parent: None,
                });
                skip_descendants(repo, name, "parent failed to sync", &mut skipped, &mut summary);
            }
        }
    }

    // Merged-branch cleanup after the rebase pass
    if let Some(confirm) = callbacks.confirm_cleanup {
        if !summary.aborted {
            cleanup_merged(repo, cleanup_candidates, confirm, &mut summary)?;
        }
    }

    Ok(summary)
}

enum ActionOutcome {
    Success,
    Conflict,
    Error(String),
}

fn run_action(git: &Git, entry: &PlanEntry) -> Result<ActionOutcome> {
    use crate::git::RebaseOutcome;

    let spin = ui::delayed_spinner(&format!("Syncing {}...", entry.branch));
    let outcome = match &entry.action {
        SyncAction::FastForward { target } => {
            let result = git.reset_hard(target);
            match result {
                Ok(()) => ActionOutcome::Success,
                Err(e) => ActionOutcome::Error(e.to_string()),
            }
        }
        SyncAction::RebaseOntoBase { target } | SyncAction::RebaseOntoParent { parent: target } => {
            match git.rebase(target)? {
                RebaseOutcome::Success => ActionOutcome::Success,
                RebaseOutcome::Conflict => ActionOutcome::Conflict,
                RebaseOutcome::Error(e) => ActionOutcome::Error(e),
            }
        }
        SyncAction::RebaseOntoNewBase { target, old_parent } => {
            match git.rebase_onto(target, old_parent, None)? {
                RebaseOutcome::Success => ActionOutcome::Success,
                RebaseOutcome::Conflict => ActionOutcome::Conflict,
                RebaseOutcome::Error(e) => ActionOutcome::Error(e),
            }
        }
        SyncAction::CleanupMerged => ActionOutcome::Success,
    };
    spin.finish_quiet();
    Ok(outcome)
}

fn skip_descendants(
    repo: &Repo,
    branch: &str,
    reason: &str,
    skipped: &mut HashSet<String>,
    summary: &mut SyncSummary,
) {
    for descendant in repo.stacks.get_descendants(branch) {
        if skipped.insert(descendant.clone()) {
            summary.skipped.push((descendant, reason.to_string()));
        }
    }
}

/// Delete merged branches: worktree + git branch + model entry, children
/// reparented. If the invoking directory sits inside a deleted worktree,
/// move to the main worktree first and record it for the cd directive.
fn cleanup_merged(
    repo: &mut Repo,
    candidates: Vec<String>,
    confirm: &mut dyn FnMut(&str) -> bool,
    summary: &mut SyncSummary,
) -> Result<()> {
    for name in candidates {
        let Some(branch) = repo.stacks.get_branch(&name).cloned() else {
            continue;
        };
        if branch.is_remote {
            continue;
        }
        if !confirm(&name) {
            continue;
        }

        if worktree_contains_cwd(&branch.worktree_path) {
            std::env::set_current_dir(&repo.root)?;
            summary.moved_to = Some(repo.root.clone());
        }

        repo.delete_branch(&name, true)?;
        summary.cleaned.push(name);
    }
    Ok(())
}
