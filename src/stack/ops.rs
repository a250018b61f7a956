//! Stack mutations that touch both git and the model.
//!
//! Every operation here re-checks invariants and persists before
//! returning (`Repo::save`), except where a rebase is involved: its model
//! effect is flushed only after the git command succeeds.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::git::{RebaseOutcome, REMOTE};
use crate::repo::Repo;
use crate::store::CacheEntry;
use crate::ui;

impl Repo {
    /// Create a git branch from `parent`, add a worktree for it, and track
    /// it (a new stack when the parent is the base branch).
    pub fn create_branch(&mut self, name: &str, parent: &str) -> Result<PathBuf> {
        if self.stacks.is_tracked(name) {
            bail!("Branch '{}' is already tracked", name);
        }
        if self.git.branch_exists(name)? {
            bail!("Branch '{}' already exists in git. Use 'ezs stack' to register it.", name);
        }

        let from_base = self.stacks.is_main_branch(parent);
        if !from_base && !self.stacks.is_tracked(parent) {
            bail!(
                "Parent branch '{}' is not tracked. Track it first with 'ezs stack'.",
                parent
            );
        }

        self.git.create_branch(name, parent)?;

        let worktree = self.worktree_dir_for(name);
        let spin = ui::delayed_spinner(&format!("Creating worktree for {}...", name));
        let added = self.git.add_worktree(&worktree, name);
        spin.finish_quiet();
        if let Err(e) = added {
            // Roll the branch back so a failed worktree leaves nothing behind
            let _ = self.git.delete_branch(name);
            return Err(e);
        }

        let entry = CacheEntry {
            worktree_path: worktree.to_string_lossy().to_string(),
            ..Default::default()
        };
        if from_base {
            self.stacks.insert_root(name, &self.base_branch, entry)?;
        } else {
            self.stacks.insert_under(parent, name, entry)?;
        }
        self.save()?;
        Ok(worktree)
    }

    /// Register an existing worktree's branch as a new stack root.
    pub fn register_existing_branch(&mut self, name: &str, worktree: &Path) -> Result<()> {
        if self.stacks.is_tracked(name) {
            bail!("Branch '{}' is already tracked", name);
        }
        if !self.git.branch_exists(name)? {
            bail!("Branch '{}' does not exist in git", name);
        }

        let entry = CacheEntry {
            worktree_path: worktree.to_string_lossy().to_string(),
            ..Default::default()
        };
        self.stacks.insert_root(name, &self.base_branch, entry)?;
        self.save()
    }

    /// Import someone else's upstream branch as a remote stack root.
    /// Remote roots have no worktree and are never rebased or deleted.
    pub fn register_remote_branch(&mut self, name: &str, pr_number: u64, pr_url: &str) -> Result<()> {
        if self.stacks.is_tracked(name) {
            bail!("Branch '{}' is already tracked", name);
        }

        let entry = CacheEntry {
            is_remote: true,
            pr_number,
            pr_url: pr_url.to_string(),
            ..Default::default()
        };
        self.stacks.insert_root(name, &self.base_branch, entry)?;
        self.save()
    }

    /// Track an already-existing branch + worktree under a parent.
    pub fn add_branch_to_stack(&mut self, name: &str, parent: &str, worktree: &Path) -> Result<()> {
        if !self.git.branch_exists(name)? {
            bail!("Branch '{}' does not exist in git", name);
        }
        let entry = CacheEntry {
            worktree_path: worktree.to_string_lossy().to_string(),
            ..Default::default()
        };
        self.stacks.insert_under(parent, name, entry)?;
        self.save()
    }

    /// Move a branch under a new parent. With `do_rebase`, replays the
    /// branch's own commits onto the new parent first; the tree is only
    /// updated (and persisted) after the rebase succeeds. `interactive`
    /// opens the rebase todo list so the user picks what gets replayed.
    pub fn reparent_branch(
        &mut self,
        name: &str,
        new_parent: &str,
        do_rebase: bool,
        interactive: bool,
    ) -> Result<RebaseOutcome> {
        let branch = self
            .stacks
            .get_branch(name)
            .with_context(|| format!("Branch '{}' is not tracked", name))?;
        if branch.is_remote {
            bail!("Branch '{}' is a remote import and cannot be reparented", name);
        }
        let old_parent = branch.parent.clone();
        if old_parent == new_parent {
            bail!("'{}' is already parented on '{}'", name, new_parent);
        }

        if do_rebase {
            let git = self.git_for_branch(name)?;
            let outcome = if interactive {
                // The editor owns the terminal here; no spinner
                git.rebase_interactive(new_parent)?
            } else {
                let spin = ui::delayed_spinner(&format!("Rebasing {} onto {}...", name, new_parent));
                let outcome = git.rebase_onto(new_parent, &old_parent, None)?;
                spin.finish_quiet();
                outcome
            };
            match outcome {
                RebaseOutcome::Success => {}
                other => return Ok(other),
            }
        }

        self.stacks.reparent(name, new_parent)?;
        self.save()?;
        Ok(RebaseOutcome::Success)
    }

    /// Stop tracking a branch. Its children reparent to its parent; the
    /// git branch and worktree are left alone.
    pub fn untrack_branch(&mut self, name: &str) -> Result<()> {
        if !self.stacks.is_tracked(name) {
            bail!("Branch '{}' is not tracked", name);
        }
        self.stacks.remove_branch(name)?;
        self.save()
    }

    /// Delete a branch: worktree and git branch removed, children
    /// reparented to the deleted branch's parent (only with `force`).
    pub fn delete_branch(&mut self, name: &str, force: bool) -> Result<()> {
        if self.stacks.is_main_branch(name) {
            bail!("Refusing to delete the base branch '{}'", name);
        }
        let branch = self
            .stacks
            .get_branch(name)
            .with_context(|| format!("Branch '{}' is not tracked", name))?
            .clone();
        if branch.is_remote {
            bail!("Branch '{}' is a remote import; use 'ezs unstack {}' to stop tracking it", name, name);
        }

        let children = self.stacks.get_children(name);
        if !children.is_empty() && !force {
            bail!(
                "Branch '{}' has children ({}). Use --force to delete and reparent them.",
                name,
                children.join(", ")
            );
        }

        self.git
            .remove_worktree(&branch.worktree_path, Some(name))?;
        self.stacks.remove_branch(name)?;
        self.save()
    }

    /// Bulk removal of tracked branches whose git branch no longer exists.
    pub fn remove_orphaned_branches(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            if let Some(branch) = self.stacks.get_branch(name).cloned() {
                if !branch.worktree_path.as_os_str().is_empty() {
                    // Branch is gone; only the worktree needs cleaning up
                    self.git.remove_worktree(&branch.worktree_path, None)?;
                }
                self.stacks.remove_branch(name)?;
            }
        }
        self.save()
    }

    /// Bulk removal of tracked branches whose worktree directory vanished.
    /// Children reparent to each removed branch's parent.
    pub fn handle_missing_worktrees(&mut self, names: &[String]) -> Result<()> {
        self.git.prune_worktrees()?;
        for name in names {
            if self.stacks.is_tracked(name) {
                self.stacks.remove_branch(name)?;
            }
        }
        self.save()
    }

    /// Fetch and import `remote_branch` as a remote root, then create one
    /// local child branch (with worktree) on top of it.
    pub fn import_remote_branch(&mut self, remote_branch: &str, child: &str) -> Result<PathBuf> {
        let spin = ui::delayed_spinner("Fetching from origin...");
        let fetched = self.git.fetch_all_prune();
        spin.finish_quiet();
        fetched?;

        if !self
            .git
            .list_remote_branches()?
            .iter()
            .any(|b| b == remote_branch)
        {
            bail!("Branch '{}' does not exist on {}", remote_branch, REMOTE);
        }

        let remote_ref = format!("{}/{}", REMOTE, remote_branch);
        if !self.git.branch_exists(remote_branch)? {
            self.git.create_branch(remote_branch, &remote_ref)?;
        }
        self.register_remote_branch(remote_branch, 0, "")?;

        match self.create_branch(child, remote_branch) {
            Ok(worktree) => Ok(worktree),
            Err(e) => {
                // Leave the import undone rather than half-tracked
                let _ = self.stacks.remove_branch(remote_branch);
                let _ = self.save();
                Err(e)
            }
        }
    }
}

// Re-exported for the executor's worktree-aware deletions
pub fn worktree_contains_cwd(worktree: &Path) -> bool {
    match std::env::current_dir() {
        Ok(cwd) => {
            let cwd = cwd.canonicalize().unwrap_or(cwd);
            let wt = worktree
                .canonicalize()
                .unwrap_or_else(|_| worktree.to_path_buf());
            cwd.starts_with(&wt)
        }
        Err(_) => false,
    }
}
