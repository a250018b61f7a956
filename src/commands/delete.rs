//! `ezs delete <name> [--force]`

use anyhow::{bail, Result};

use crate::repo::Repo;
use crate::shell;
use crate::stack::ops::worktree_contains_cwd;
use crate::ui;

pub fn run(name: &str, force: bool) -> Result<()> {
    let mut repo = Repo::discover()?;

    let inside_deleted = repo
        .stacks
        .get_branch(name)
        .map(|b| worktree_contains_cwd(&b.worktree_path))
        .unwrap_or(false);

    if !force {
        if !ui::is_stdin_terminal() {
            bail!("Deleting requires confirmation. Use --force in non-interactive mode.");
        }
        // Show what would be thrown away before asking
        if let Some(b) = repo.stacks.get_branch(name) {
            if let Ok(commits) = repo.git.commits_between(&b.parent, name) {
                for commit in commits.iter().take(5) {
                    ui::bullet(&format!("{} {}", &commit.hash[..7], commit.subject));
                }
                if commits.len() > 5 {
                    ui::bullet(&format!("… and {} more", commits.len() - 5));
                }
            }
        }
        if !ui::confirm(&format!("Delete branch '{}' and its worktree?", name), false)? {
            ui::warning("Cancelled");
            return Ok(());
        }
    }

    repo.delete_branch(name, force)?;
    ui::success(&format!("Deleted {}", ui::print_branch(name)));

    if inside_deleted {
        shell::emit_cd(&repo.root);
    }
    Ok(())
}
