//! `ezs sync [--auto] [--no-cleanup]` - the full synchronization pass.
//!
//! Fetch, detect merged PRs, execute the topological rebase plan with
//! interactive (or auto-accepted) confirmations, clean up merged branches,
//! refresh PR stack blocks, and print the full picture. Conflicts are an
//! expected outcome, not an error: the process exits 0 and names each
//! conflicted branch and its worktree so the user can follow up.

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;

use crate::forge::{fetch_statuses, Forge, ForgeError};
use crate::git::{Git, PushMode};
use crate::prstack;
use crate::repo::Repo;
use crate::shell;
use crate::sync::{execute, BranchSyncResult, RebaseRequest, SyncCallbacks};
use crate::ui;

pub async fn run(auto: bool, no_cleanup: bool) -> Result<()> {
    let mut repo = Repo::discover()?;

    if repo.stacks.is_empty() {
        ui::success_bold("No stacks to sync");
        return Ok(());
    }

    let spin = ui::delayed_spinner("Fetching from origin...");
    match repo.git.fetch_all_prune() {
        Ok(()) => spin.finish_quiet(),
        // Non-fatal: remote may be unreachable; we sync against local state
        Err(e) => spin.finish_warning(&format!("Could not fetch from origin: {:#}", e)),
    }

    // Bring the local base branch forward when the main worktree sits on it
    if repo
        .git
        .current_branch()
        .map(|b| b == repo.base_branch)
        .unwrap_or(false)
    {
        match repo.git.pull_rebase() {
            Ok(outcome) if outcome.is_conflict() => {
                ui::warning(&format!(
                    "Pulling {} hit conflicts; resolve them in {} first",
                    repo.base_branch,
                    repo.root.display()
                ));
            }
            _ => {}
        }
    }

    let merged = detect_merged(&mut repo).await?;

    let mut before = |req: &RebaseRequest| {
        if auto {
            return true;
        }
        let prompt = if req.behind > 0 {
            format!("{}: {} ({} behind)?", req.branch, req.action, req.behind)
        } else {
            format!("{}: {}?", req.branch, req.action)
        };
        ui::confirm_optional(&prompt, true).unwrap_or(false)
    };
    let mut after =
        |result: &BranchSyncResult, git: &Git| push_after_rebase(git, &result.branch, auto);
    let mut cleanup = |name: &str| {
        if auto {
            return true;
        }
        ui::confirm_optional(&format!("Delete merged branch '{}'?", name), true).unwrap_or(false)
    };

    let summary = execute(
        &mut repo,
        &merged,
        SyncCallbacks {
            before_rebase: &mut before,
            after_rebase: &mut after,
            confirm_cleanup: if no_cleanup { None } else { Some(&mut cleanup) },
        },
    )?;

    // Mirror the new shape into the PR bodies, best effort
    if summary.rebased() > 0 || !summary.cleaned.is_empty() {
        refresh_stack_blocks(&repo);
    }

    ui::blank();
    if summary.rebased() > 0 {
        ui::success_bold(&format!(
            "Sync complete ({} branch{} updated)",
            summary.rebased(),
            if summary.rebased() == 1 { "" } else { "es" }
        ));
        for result in summary.results.iter().filter(|r| r.success) {
            let mut line = format!("Rebased {} (was {} behind)", result.branch, result.behind_by);
            if let Some(ref parent) = result.synced_parent {
                line.push_str(&format!(", now on {}", parent));
            }
            ui::bullet_success(&line);
        }
    } else if summary.conflicts().is_empty() {
        ui::success("All branches already in sync");
    }

    for name in &summary.cleaned {
        ui::bullet_success(&format!("Deleted merged branch {}", name));
    }

    let conflicts = summary.conflicts();
    if !conflicts.is_empty() {
        ui::blank();
        ui::warning(&format!(
            "{} branch{} hit conflicts:",
            conflicts.len(),
            if conflicts.len() == 1 { "" } else { "es" }
        ));
        for result in &conflicts {
            ui::bullet_error(&format!(
                "{} ({})",
                result.branch,
                result.worktree.display()
            ));
        }
        ui::hint(&format!(
            "Resolve each conflict in its worktree, finish with {}, then run {} again.",
            ui::print_cmd("git rebase --continue"),
            ui::print_cmd("ezs sync")
        ));
    }

    for (branch, reason) in &summary.skipped {
        ui::bullet(&format!("{} skipped: {}", branch, reason));
    }

    if summary.aborted {
        ui::warning("Sync halted: a rebased branch was not pushed, so its descendants were left alone.");
    }

    if let Some(ref path) = summary.moved_to {
        shell::emit_cd(path);
    }
    Ok(())
}

/// Ask the forge which tracked branches have merged PRs, filling the PR
/// cache along the way. Degrades to an empty set without forge access.
async fn detect_merged(repo: &mut Repo) -> Result<HashSet<String>> {
    let mut merged = HashSet::new();

    let forge = match repo.forge() {
        Ok(forge) => forge,
        Err(e) => {
            ui::warning(&format!("Forge unavailable, syncing from git state only: {:#}", e));
            return Ok(merged);
        }
    };

    let names: Vec<String> = repo
        .stacks
        .all_branches()
        .iter()
        .filter(|b| !b.is_remote)
        .map(|b| b.name.clone())
        .collect();

    let spin = ui::spinner(&format!("Checking {} PR{}...", names.len(), if names.len() == 1 { "" } else { "s" }));
    let forge: Arc<dyn Forge> = Arc::new(forge);
    let statuses = fetch_statuses(forge, names).await;
    ui::spinner_success(spin, "Checked PR status");

    let mut warned = false;
    let mut pr_updates: Vec<(String, u64, String)> = Vec::new();
    for status in statuses {
        if let Some(ref e) = status.error {
            if matches!(e, ForgeError::AuthRequired | ForgeError::NoAccess(_)) && !warned {
                ui::warning(&format!("Skipping merged-PR cleanup: {}", e));
                warned = true;
            }
            continue;
        }
        let Some(pr) = status.pr else { continue };

        if pr.merged() {
            merged.insert(status.branch.clone());
        }
        let known = repo
            .stacks
            .get_branch(&status.branch)
            .map(|b| b.pr_number)
            .unwrap_or(0);
        if known == 0 && pr.number > 0 {
            pr_updates.push((status.branch, pr.number, pr.url));
        }
    }

    for (name, number, url) in pr_updates {
        repo.stacks.set_pr(&name, number, &url);
    }
    repo.save()?;
    Ok(merged)
}

/// Push a freshly rebased branch so its children have something to build
/// on. A rejected push (remote advanced) offers force-with-lease; declining
/// halts the descendants.
fn push_after_rebase(git: &Git, branch: &str, auto: bool) -> Result<bool> {
    if git.push(branch, PushMode::Normal)? {
        return Ok(true);
    }

    let retry = auto
        || ui::confirm_optional(
            &format!(
                "Push of '{}' was rejected (remote advanced). Retry with --force-with-lease?",
                branch
            ),
            true,
        )?;
    if !retry {
        ui::warning(&format!(
            "'{}' left unpushed; skipping the rest of the plan",
            branch
        ));
        return Ok(false);
    }

    if git.push(branch, PushMode::ForceWithLease)? {
        Ok(true)
    } else {
        ui::warning(&format!(
            "Push of '{}' still rejected; fetch and resolve manually",
            branch
        ));
        Ok(false)
    }
}

fn refresh_stack_blocks(repo: &Repo) {
    let forge = match repo.forge() {
        Ok(forge) => forge,
        Err(_) => return,
    };

    for stack in repo.stacks.list_stacks() {
        match prstack::update_stack_prs(stack, &forge, &HashSet::new()) {
            Ok((_, failures)) => {
                for (branch, e) in failures {
                    ui::warning(&format!("Could not update stack block for {}: {}", branch, e));
                }
            }
            Err(e) => ui::warning(&format!("Could not update PR stack blocks: {:#}", e)),
        }
    }
}
