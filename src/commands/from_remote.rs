//! `ezs from-remote <branch> [child]` - import someone else's upstream
//! branch as a read-only stack root and start a local child on top of it.

use anyhow::Result;

use crate::forge::Forge;
use crate::repo::Repo;
use crate::shell;
use crate::ui;

pub fn run(remote_branch: &str, child: Option<String>) -> Result<()> {
    let mut repo = Repo::discover()?;

    let child = child.unwrap_or_else(|| format!("{}-local", remote_branch));
    let worktree = repo.import_remote_branch(remote_branch, &child)?;

    // Discover the imported branch's PR lazily, best effort. Listing and
    // filtering by head avoids `pr view` ambiguity for fork branches.
    match repo.forge() {
        Ok(forge) => match forge.list_open_prs() {
            Ok(prs) => {
                if let Some(pr) = prs.iter().find(|p| p.head_ref == remote_branch) {
                    repo.stacks.set_pr(remote_branch, pr.number, &pr.url);
                    repo.save()?;
                    ui::bullet(&format!("PR #{} by {}: {}", pr.number, pr.author, pr.title));
                }
            }
            Err(e) => ui::warning(&format!("Could not look up PR for '{}': {}", remote_branch, e)),
        },
        Err(e) => ui::warning(&format!("Could not reach forge: {:#}", e)),
    }

    ui::success(&format!(
        "Imported {} and created {} on top of it",
        ui::print_parent(remote_branch),
        ui::print_branch(&child)
    ));

    if repo.prefs.cd_after_new {
        shell::emit_cd(&worktree);
    }
    Ok(())
}
