//! `ezs new <name> [--parent <branch>]`

use anyhow::Result;

use crate::repo::Repo;
use crate::shell;
use crate::ui;

pub fn run(name: &str, parent: Option<String>) -> Result<()> {
    let mut repo = Repo::discover()?;

    // Default parent: the invoking worktree's branch when tracked (stacking
    // on top of where you are), otherwise the base branch.
    let parent = match parent {
        Some(p) => p,
        None => match repo.current_branch() {
            Ok(current) if repo.stacks.is_tracked(&current) => current,
            _ => repo.base_branch.clone(),
        },
    };

    let worktree = repo.create_branch(name, &parent)?;

    ui::success(&format!(
        "Created {} on {} ({})",
        ui::print_branch(name),
        ui::print_parent(&parent),
        worktree.display()
    ));

    if repo.prefs.cd_after_new {
        shell::emit_cd(&worktree);
    }
    Ok(())
}
