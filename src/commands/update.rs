//! `ezs update [--auto] [--dry-run]` - reconcile the model with git.

use anyhow::Result;
use colored::Colorize;

use crate::reconcile;
use crate::repo::Repo;
use crate::ui;

pub fn run(auto: bool, dry_run: bool) -> Result<()> {
    let mut repo = Repo::discover()?;
    let report = reconcile::update(&mut repo, auto, dry_run)?;

    if report.is_clean() {
        ui::success_bold("Everything in sync, no changes");
        return Ok(());
    }

    let prefix = if dry_run {
        format!("{} ", "[preview]".yellow().bold())
    } else {
        String::new()
    };

    for name in &report.missing_worktrees {
        ui::bullet(&format!("{}removed '{}' (worktree directory gone)", prefix, name));
    }
    for name in &report.orphaned_branches {
        ui::bullet(&format!("{}removed '{}' (git branch gone)", prefix, name));
    }
    for (name, path) in &report.adopted {
        ui::bullet_success(&format!("{}tracking '{}' ({})", prefix, name, path.display()));
    }
    for (name, path) in &report.skipped {
        ui::bullet(&format!("{}left '{}' untracked ({})", prefix, name, path.display()));
    }

    if dry_run {
        ui::step("No changes made (dry-run mode)");
    } else {
        ui::success_bold("Reconciliation complete");
    }
    Ok(())
}
