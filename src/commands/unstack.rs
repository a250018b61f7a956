//! `ezs unstack <name>` - stop tracking a branch; children reparent to its
//! parent (for a root, they become independent stacks).

use anyhow::Result;

use crate::repo::Repo;
use crate::ui;

pub fn run(name: &str) -> Result<()> {
    let mut repo = Repo::discover()?;

    let children = repo.stacks.get_children(name);
    repo.untrack_branch(name)?;

    ui::success(&format!("Stopped tracking {}", ui::print_branch(name)));
    if !children.is_empty() {
        ui::bullet(&format!("Reparented: {}", children.join(", ")));
    }
    Ok(())
}
