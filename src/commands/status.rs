//! `ezs status [--all]` - sync needs plus PR and CI state.
//!
//! PR and check lookups for all branches go through the bounded worker
//! pool; cache updates (lazily discovered PR numbers, merged flags) are
//! persisted once, after every worker has joined.

use anyhow::Result;
use colored::Colorize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::forge::{fetch_statuses, CheckState, Forge, ForgeError, PrState};
use crate::git::Git;
use crate::repo::Repo;
use crate::sync::{detect_sync_needed, detect_sync_needed_all_stacks};
use crate::ui;

pub async fn run(all: bool) -> Result<()> {
    let mut repo = Repo::discover()?;

    if repo.stacks.is_empty() {
        ui::line("No stacks yet.");
        ui::hint("Create one with 'ezs new <name>'.");
        return Ok(());
    }

    let current = repo.current_branch().ok();

    // A rebase someone interrupted mid-flight is the first thing to surface
    for branch in repo.stacks.all_branches() {
        if branch.worktree_path.as_os_str().is_empty() {
            continue;
        }
        if Git::in_dir(&branch.worktree_path)
            .rebase_in_progress()
            .unwrap_or(false)
        {
            ui::warning(&format!(
                "Rebase in progress in {} ({})",
                branch.name,
                branch.worktree_path.display()
            ));
        }
    }

    let spin = ui::delayed_spinner("Fetching from origin...");
    match repo.git.fetch_all_prune() {
        Ok(()) => spin.finish_quiet(),
        Err(e) => spin.finish_warning(&format!("Could not fetch from origin: {:#}", e)),
    }

    let scope_all = all || current.as_deref().map(|c| repo.stacks.stack_of(c)).unwrap_or(None).is_none();

    let names: Vec<String> = if scope_all {
        repo.stacks
            .all_branches()
            .iter()
            .map(|b| b.name.clone())
            .collect()
    } else {
        repo.stacks
            .current_stack(current.as_deref().unwrap_or_default())?
            .branches
            .iter()
            .map(|b| b.name.clone())
            .collect()
    };

    // Forge status sweep, best effort
    let mut merged: HashSet<String> = HashSet::new();
    let mut display: HashMap<String, String> = HashMap::new();
    match repo.forge() {
        Ok(forge) => {
            let spin = ui::spinner(&format!(
                "Checking {} PR{}...",
                names.len(),
                if names.len() == 1 { "" } else { "s" }
            ));
            let forge: Arc<dyn Forge> = Arc::new(forge);
            let statuses = fetch_statuses(forge, names.clone()).await;
            ui::spinner_success(spin, "Checked PR status");

            let mut warned = false;
            let mut pr_updates: Vec<(String, u64, String)> = Vec::new();
            let mut newly_merged: Vec<String> = Vec::new();

            for status in &statuses {
                if let Some(ref e) = status.error {
                    if matches!(e, ForgeError::AuthRequired | ForgeError::NoAccess(_)) {
                        if !warned {
                            ui::warning(&format!("Forge degraded: {}", e));
                            warned = true;
                        }
                        continue;
                    }
                }
                let Some(ref pr) = status.pr else { continue };

                if pr.merged() {
                    merged.insert(status.branch.clone());
                    newly_merged.push(status.branch.clone());
                }
                // Lazy PR discovery fills the cache
                let known = repo
                    .stacks
                    .get_branch(&status.branch)
                    .map(|b| b.pr_number)
                    .unwrap_or(0);
                if known == 0 && pr.number > 0 {
                    pr_updates.push((status.branch.clone(), pr.number, pr.url.clone()));
                }

                display.insert(status.branch.clone(), describe_pr(pr, status.checks.as_ref().map(|c| (c.state, c.summary.clone()))));
            }

            // Single persistence step after all workers joined
            for (name, number, url) in pr_updates {
                repo.stacks.set_pr(&name, number, &url);
            }
            for name in newly_merged {
                repo.stacks.set_merged(&name);
            }
            repo.save()?;
        }
        Err(e) => ui::warning(&format!("Forge unavailable, showing local status only: {:#}", e)),
    }

    // Sync classification against the fresh state
    let needs = if scope_all {
        detect_sync_needed_all_stacks(&repo, &merged)?
    } else {
        detect_sync_needed(&repo, &merged, current.as_deref().unwrap_or_default())?
    };
    let reasons: HashMap<String, String> = needs
        .into_iter()
        .map(|n| (n.branch, n.reason))
        .collect();

    for stack in repo.stacks.list_stacks() {
        if !scope_all && !stack.branches.iter().any(|b| names.contains(&b.name)) {
            continue;
        }
        ui::line(&format!(
            "{} {}",
            stack.base_branch.blue(),
            format!("[{}]", stack.hash).bright_black()
        ));
        for branch in &stack.branches {
            let marker = if current.as_deref() == Some(branch.name.as_str()) {
                "◉"
            } else {
                "◯"
            };
            let depth = depth_of(&repo, &branch.name);
            let mut line = format!(
                "{}{} {}",
                "│ ".repeat(depth),
                marker,
                ui::print_branch(&branch.name)
            );
            if branch.is_remote {
                line.push_str(&format!(" {}", "(remote)".bright_black()));
            }
            if let Some(info) = display.get(&branch.name) {
                line.push_str(&format!("  {}", info));
            }
            if let Some(reason) = reasons.get(&branch.name) {
                line.push_str(&format!("  {}", reason.yellow()));
            }
            ui::line(&line);
        }
        ui::line("");
    }
    Ok(())
}

fn depth_of(repo: &Repo, name: &str) -> usize {
    let mut depth = 0;
    let mut cursor = name.to_string();
    while let Some(branch) = repo.stacks.get_branch(&cursor) {
        if repo.stacks.is_main_branch(&branch.parent) {
            break;
        }
        cursor = branch.parent.clone();
        depth += 1;
    }
    depth
}

fn describe_pr(
    pr: &crate::forge::PrDetails,
    checks: Option<(CheckState, String)>,
) -> String {
    let state = if pr.is_draft && pr.state == PrState::Open {
        "draft".bright_black().to_string()
    } else {
        match pr.state {
            PrState::Open => "open".green().to_string(),
            PrState::Merged => "merged".magenta().to_string(),
            PrState::Closed => "closed".red().to_string(),
        }
    };

    let mut out = format!("#{} {}", pr.number, state);
    if !pr.review_decision.is_empty() {
        out.push_str(&format!(" {}", pr.review_decision.to_lowercase().bright_black()));
    }
    if let Some((state, summary)) = checks {
        let colored = match state {
            CheckState::Success => summary.green().to_string(),
            CheckState::Failure => summary.red().to_string(),
            CheckState::Pending => summary.yellow().to_string(),
            CheckState::None | CheckState::Unknown => summary.bright_black().to_string(),
        };
        out.push_str(&format!(" [{}]", colored));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::PrDetails;

    fn pr(state: PrState, is_draft: bool, review_decision: &str) -> PrDetails {
        PrDetails {
            number: 12,
            url: "https://github.com/acme/widgets/pull/12".to_string(),
            title: "Add frobnicator".to_string(),
            body: String::new(),
            state,
            base_ref: "main".to_string(),
            head_ref: "frobnicator".to_string(),
            merged_at: String::new(),
            mergeable: "MERGEABLE".to_string(),
            is_draft,
            review_decision: review_decision.to_string(),
        }
    }

    #[test]
    fn test_describe_pr_open_with_passing_checks() {
        let out = describe_pr(
            &pr(PrState::Open, false, ""),
            Some((CheckState::Success, "4/4 passed".to_string())),
        );
        assert!(out.contains("#12"));
        assert!(out.contains("open"));
        assert!(out.contains("4/4 passed"));
    }

    #[test]
    fn test_describe_pr_failing_checks() {
        let out = describe_pr(
            &pr(PrState::Open, false, ""),
            Some((CheckState::Failure, "2/3 failed".to_string())),
        );
        assert!(out.contains("2/3 failed"));
    }

    #[test]
    fn test_describe_pr_pending_checks() {
        let out = describe_pr(
            &pr(PrState::Open, false, ""),
            Some((CheckState::Pending, "1/2 pending".to_string())),
        );
        assert!(out.contains("1/2 pending"));
    }

    #[test]
    fn test_describe_pr_no_checks_omits_bracket() {
        let out = describe_pr(&pr(PrState::Open, false, ""), None);
        assert!(!out.contains('['));
    }

    #[test]
    fn test_describe_pr_draft_and_merged_states() {
        let out = describe_pr(&pr(PrState::Open, true, ""), None);
        assert!(out.contains("draft"));

        let out = describe_pr(&pr(PrState::Merged, false, ""), None);
        assert!(out.contains("merged"));

        let out = describe_pr(&pr(PrState::Closed, false, ""), None);
        assert!(out.contains("closed"));
    }

    #[test]
    fn test_describe_pr_review_decision_lowercased() {
        let out = describe_pr(&pr(PrState::Open, false, "APPROVED"), None);
        assert!(out.contains("approved"));
    }
}
