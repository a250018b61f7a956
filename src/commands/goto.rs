//! `ezs goto <branch|stack-prefix>` - emit a cd directive for the wrapper.

use anyhow::{bail, Result};

use crate::repo::Repo;
use crate::shell;

pub fn run(target: &str) -> Result<()> {
    let repo = Repo::discover()?;

    // Branch name takes precedence; fall back to stack hash prefix
    if let Some(branch) = repo.stacks.get_branch(target) {
        if branch.worktree_path.as_os_str().is_empty() {
            bail!(
                "Branch '{}' is a remote import without a worktree; goto one of its children instead",
                target
            );
        }
        shell::emit_cd(&branch.worktree_path);
        return Ok(());
    }

    let stack = repo.stacks.stack_by_hash_prefix(target).map_err(|e| {
        anyhow::anyhow!("'{}' is neither a tracked branch nor a stack hash: {}", target, e)
    })?;
    let root = stack
        .branches
        .first()
        .ok_or_else(|| anyhow::anyhow!("Stack '{}' is empty", stack.name))?;
    if root.worktree_path.as_os_str().is_empty() {
        // Remote root: land on its first child with a worktree
        match stack
            .branches
            .iter()
            .find(|b| !b.worktree_path.as_os_str().is_empty())
        {
            Some(branch) => shell::emit_cd(&branch.worktree_path),
            None => bail!("Stack '{}' has no worktrees to go to", stack.name),
        }
    } else {
        shell::emit_cd(&root.worktree_path);
    }
    Ok(())
}
