//! `ezs reparent [<branch>] --onto <parent> [--rebase [--interactive]]`

use anyhow::{bail, Result};

use crate::git::RebaseOutcome;
use crate::repo::Repo;
use crate::ui;

pub fn run(branch: Option<String>, onto: &str, rebase: bool, interactive: bool) -> Result<()> {
    let mut repo = Repo::discover()?;

    if interactive && !ui::is_stdin_terminal() {
        bail!("Interactive rebase needs a terminal. Drop --interactive in non-interactive mode.");
    }

    let name = match branch {
        Some(b) => b,
        None => repo.current_branch()?,
    };

    match repo.reparent_branch(&name, onto, rebase, interactive)? {
        RebaseOutcome::Success => {}
        RebaseOutcome::Conflict => {
            let worktree = repo
                .stacks
                .get_branch(&name)
                .map(|b| b.worktree_path.display().to_string())
                .unwrap_or_default();
            ui::warning(&format!(
                "Rebase of {} onto {} hit conflicts in {}",
                name, onto, worktree
            ));
            ui::bullet("Resolve them and run 'git rebase --continue', then re-run the reparent.");
            return Ok(());
        }
        RebaseOutcome::Error(e) => anyhow::bail!("Rebase failed: {}", e),
    }

    ui::success(&format!(
        "Reparented {} onto {}",
        ui::print_branch(&name),
        ui::print_parent(onto)
    ));

    // Keep the PR base aligned with the new parent, best effort
    if let Some(b) = repo.stacks.get_branch(&name) {
        if b.pr_number > 0 {
            match repo.forge() {
                Ok(forge) => {
                    use crate::forge::Forge;
                    if let Err(e) = forge.edit_pr_base(b.pr_number, onto) {
                        ui::warning(&format!("Could not update PR base: {}", e));
                    } else {
                        ui::bullet(&format!("PR #{} base updated to {}", b.pr_number, onto));
                    }
                }
                Err(e) => ui::warning(&format!("Could not reach forge: {:#}", e)),
            }
        }
    }
    Ok(())
}
