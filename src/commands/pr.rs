//! `ezs pr <create|update|stack>` - PR lifecycle for the current branch.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::collections::HashSet;

use crate::forge::Forge;
use crate::git::PushMode;
use crate::prstack;
use crate::repo::Repo;
use crate::ui;

#[derive(Subcommand)]
pub enum PrCmd {
    /// Create a PR for the current branch, based on its stack parent
    Create {
        /// Create as draft
        #[arg(short, long)]
        draft: bool,
    },
    /// Push the branch and refresh its PR base and stack block
    Update,
    /// Rewrite the stack block in every PR of the current stack
    Stack,
}

pub fn run(cmd: PrCmd) -> Result<()> {
    match cmd {
        PrCmd::Create { draft } => create(draft),
        PrCmd::Update => update(),
        PrCmd::Stack => stack_blocks(),
    }
}

fn create(draft_flag: bool) -> Result<()> {
    let mut repo = Repo::discover()?;
    let branch = repo.current_branch()?;
    let tracked = repo
        .stacks
        .get_branch(&branch)
        .with_context(|| format!("Branch '{}' is not tracked; run 'ezs stack' or 'ezs new' first", branch))?
        .clone();
    if tracked.pr_number > 0 {
        bail!("Branch '{}' already has PR #{} ({})", branch, tracked.pr_number, tracked.pr_url);
    }

    let git = repo.git_for_branch(&branch)?;
    let spin = ui::delayed_spinner(&format!("Pushing {}...", branch));
    let pushed = git.push(&branch, PushMode::SetUpstream)?;
    if !pushed {
        spin.finish_quiet();
        bail!(
            "Push of '{}' was rejected; the remote branch has diverged. Run 'ezs sync' first.",
            branch
        );
    }
    spin.finish_success(&format!("Pushed {}", branch));

    let title = git.last_commit_subject()?;

    // Template wins; otherwise start from the commit message body
    let initial = match repo.git.read_pr_template()? {
        Some(template) => template,
        None => {
            let message = git.last_commit_message()?;
            message
                .strip_prefix(&title)
                .map(|rest| rest.trim_start().to_string())
                .unwrap_or(message)
        }
    };
    let body = ui::edit_text(&initial)?;

    let draft = draft_flag || (repo.prefs.auto_draft_wip_commits && is_wip(&title));

    let forge = repo.forge()?;
    let pr = forge.create_pr(&title, &body, &branch, &tracked.parent, draft)?;

    repo.stacks.set_pr(&branch, pr.number, &pr.url);
    repo.save()?;

    ui::success(&format!(
        "Created PR #{} for {} → {}",
        pr.number,
        ui::print_branch(&branch),
        ui::print_parent(&tracked.parent)
    ));
    ui::bullet(&ui::print_url(&pr.url));

    refresh_current_stack(&mut repo, &branch, forge)
}

fn update() -> Result<()> {
    let mut repo = Repo::discover()?;
    let branch = repo.current_branch()?;
    let tracked = repo
        .stacks
        .get_branch(&branch)
        .with_context(|| format!("Branch '{}' is not tracked", branch))?
        .clone();

    // A PR refresh on an out-of-date branch usually wants a sync first
    if let Some(need) =
        crate::sync::detect_sync_needed_for_branch(&repo, &std::collections::HashSet::new(), &branch)?
    {
        ui::warning(&format!("'{}' needs sync: {}", branch, need.reason));
    }

    let git = repo.git_for_branch(&branch)?;
    let spin = ui::delayed_spinner(&format!("Pushing {}...", branch));
    let mut pushed = git.push(&branch, PushMode::Normal)?;
    spin.finish_quiet();
    if !pushed {
        let retry = ui::confirm_optional(
            &format!("Push of '{}' was rejected (remote advanced). Retry with --force-with-lease?", branch),
            true,
        )?;
        if !retry {
            ui::warning("Left unpushed");
            return Ok(());
        }
        pushed = git.push(&branch, PushMode::ForceWithLease)?;
    }
    if !pushed {
        bail!("Push of '{}' still rejected; fetch and resolve manually", branch);
    }

    let forge = repo.forge()?;

    // Discover the PR lazily when the cache doesn't know it yet
    let number = if tracked.pr_number > 0 {
        tracked.pr_number
    } else {
        match forge.pr_for_branch(&branch)? {
            Some(pr) => {
                repo.stacks.set_pr(&branch, pr.number, &pr.url);
                repo.save()?;
                pr.number
            }
            None => bail!("No PR exists for '{}'. Create one with 'ezs pr create'.", branch),
        }
    };

    if let Err(e) = forge.edit_pr_base(number, &tracked.parent) {
        ui::warning(&format!("Could not update PR base: {}", e));
    }

    ui::success(&format!("Updated PR #{} for {}", number, ui::print_branch(&branch)));
    refresh_current_stack(&mut repo, &branch, forge)
}

fn stack_blocks() -> Result<()> {
    let mut repo = Repo::discover()?;
    let branch = repo.current_branch()?;
    repo.stacks.current_stack(&branch)?;

    let forge = repo.forge()?;
    refresh_current_stack(&mut repo, &branch, forge)
}

/// Fill missing PR identities for the stack, then rewrite every block.
fn refresh_current_stack(repo: &mut Repo, branch: &str, forge: impl Forge) -> Result<()> {
    let unknown: Vec<String> = repo
        .stacks
        .current_stack(branch)?
        .branches
        .iter()
        .filter(|b| b.pr_number == 0 && !b.is_remote)
        .map(|b| b.name.clone())
        .collect();

    for name in unknown {
        match forge.pr_for_branch(&name) {
            Ok(Some(pr)) => repo.stacks.set_pr(&name, pr.number, &pr.url),
            Ok(None) => {}
            Err(e) => {
                ui::warning(&format!("Could not look up PR for '{}': {}", name, e));
                break;
            }
        }
    }
    repo.save()?;

    let stack = repo.stacks.current_stack(branch)?.clone();
    let (updated, failures) = prstack::update_stack_prs(&stack, &forge, &HashSet::new())?;

    if !updated.is_empty() {
        ui::success(&format!(
            "Stack block refreshed in {} PR{}",
            updated.len(),
            if updated.len() == 1 { "" } else { "s" }
        ));
    }
    for (name, e) in failures {
        ui::warning(&format!("Could not update stack block for {}: {}", name, e));
    }
    Ok(())
}

fn is_wip(subject: &str) -> bool {
    let lower = subject.to_lowercase();
    lower.starts_with("wip:") || lower.starts_with("wip ") || lower == "wip"
}
