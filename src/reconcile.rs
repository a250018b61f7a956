//! Reconciliation engine: align the tracked model with git reality.
//!
//! Drift shows up as tracked branches whose worktree directory vanished,
//! tracked branches whose git branch was deleted, and worktrees git knows
//! about that the model does not. `update` walks those classes in order,
//! previewing (`dry_run`), auto-accepting (`auto`), or confirming each
//! step interactively.

use anyhow::Result;
use std::path::PathBuf;

use crate::repo::Repo;
use crate::ui;

/// What a reconciliation pass found (and, unless previewing, fixed).
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Tracked branches whose worktree directory no longer exists
    pub missing_worktrees: Vec<String>,
    /// Tracked branches whose git branch no longer exists
    pub orphaned_branches: Vec<String>,
    /// Untracked worktrees adopted into the model (branch, path)
    pub adopted: Vec<(String, PathBuf)>,
    /// Untracked worktrees left alone (declined or previewed)
    pub skipped: Vec<(String, PathBuf)>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.missing_worktrees.is_empty()
            && self.orphaned_branches.is_empty()
            && self.adopted.is_empty()
            && self.skipped.is_empty()
    }
}

/// Run a reconciliation pass.
///
/// With `dry_run`, nothing is changed; the report describes what would
/// happen. With `auto`, every fix is applied without prompting. Otherwise
/// each fix is confirmed individually.
pub fn update(repo: &mut Repo, auto: bool, dry_run: bool) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    // Stale administrative entries first, so the worktree listing is honest
    if !dry_run {
        repo.git.prune_worktrees()?;
    }

    // Missing worktrees: directory vanished while the branch stayed tracked
    let missing: Vec<String> = repo
        .stacks
        .all_branches()
        .iter()
        .filter(|b| !b.is_remote && !b.worktree_path.exists())
        .map(|b| b.name.clone())
        .collect();
    for name in &missing {
        if accept(
            auto,
            dry_run,
            &format!("Worktree of '{}' is gone. Remove it from the stack?", name),
        )? {
            report.missing_worktrees.push(name.clone());
        }
    }
    if !dry_run && !report.missing_worktrees.is_empty() {
        repo.handle_missing_worktrees(&report.missing_worktrees)?;
    }

    // Orphaned branches: git branch deleted behind our back
    let orphaned: Vec<String> = {
        let mut found = Vec::new();
        for branch in repo.stacks.all_branches() {
            if !branch.is_remote && !repo.git.branch_exists(&branch.name)? {
                found.push(branch.name.clone());
            }
        }
        found
    };
    for name in &orphaned {
        if accept(
            auto,
            dry_run,
            &format!("Branch '{}' no longer exists in git. Remove it from the stack?", name),
        )? {
            report.orphaned_branches.push(name.clone());
        }
    }
    if !dry_run && !report.orphaned_branches.is_empty() {
        repo.remove_orphaned_branches(&report.orphaned_branches)?;
    }

    // Untracked worktrees: present in git, absent from the model
    let untracked: Vec<(String, PathBuf)> = repo
        .git
        .list_worktrees()?
        .into_iter()
        .filter(|wt| wt.path != repo.root)
        .filter(|wt| !repo.stacks.is_tracked(&wt.branch))
        .filter(|wt| !repo.stacks.is_main_branch(&wt.branch))
        .map(|wt| (wt.branch, wt.path))
        .collect();

    for (branch, path) in untracked {
        if dry_run {
            report.skipped.push((branch, path));
            continue;
        }
        if auto {
            // Auto mode adopts under the base branch
            repo.register_existing_branch(&branch, &path)?;
            report.adopted.push((branch, path));
            continue;
        }
        if !ui::confirm_optional(
            &format!("Track worktree '{}' ({})?", branch, path.display()),
            true,
        )? {
            report.skipped.push((branch, path));
            continue;
        }

        let parent = choose_parent(repo, &branch)?;
        if repo.stacks.is_main_branch(&parent) {
            repo.register_existing_branch(&branch, &path)?;
        } else {
            repo.add_branch_to_stack(&branch, &parent, &path)?;
        }
        report.adopted.push((branch, path));
    }

    Ok(report)
}

/// Interactive parent selection for an adopted worktree; the base branch
/// is the default.
fn choose_parent(repo: &Repo, branch: &str) -> Result<String> {
    let mut candidates = vec![repo.base_branch.clone()];
    candidates.extend(
        repo.stacks
            .all_branches()
            .iter()
            .filter(|b| b.name != branch)
            .map(|b| b.name.clone()),
    );

    if candidates.len() == 1 || !ui::is_stdin_terminal() {
        return Ok(repo.base_branch.clone());
    }

    let idx = ui::select(&format!("Parent for '{}'", branch), &candidates)?;
    Ok(candidates[idx].clone())
}

fn accept(auto: bool, dry_run: bool, message: &str) -> Result<bool> {
    if dry_run || auto {
        return Ok(true);
    }
    ui::confirm_optional(message, true)
}
