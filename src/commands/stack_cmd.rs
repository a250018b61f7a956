//! `ezs stack [<name>]` - register an existing worktree as a stack root.

use anyhow::{bail, Context, Result};

use crate::git::Git;
use crate::repo::Repo;
use crate::ui;

pub fn run(name: Option<String>) -> Result<()> {
    let mut repo = Repo::discover()?;

    let branch = match name {
        Some(n) => n,
        None => Git::new()?.current_branch()?,
    };

    if repo.stacks.is_main_branch(&branch) {
        bail!("'{}' is the base branch; it cannot be part of a stack", branch);
    }

    let worktree = repo
        .git
        .list_worktrees()?
        .into_iter()
        .find(|wt| wt.branch == branch)
        .with_context(|| {
            format!(
                "Branch '{}' has no worktree. Create one with 'git worktree add', or use 'ezs new'.",
                branch
            )
        })?;

    repo.register_existing_branch(&branch, &worktree.path)?;
    ui::success(&format!(
        "Registered {} as a new stack on {}",
        ui::print_branch(&branch),
        ui::print_parent(&repo.base_branch)
    ));
    Ok(())
}
