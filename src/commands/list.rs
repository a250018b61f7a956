//! `ezs list` - render every stack as a tree.

use anyhow::Result;
use colored::Colorize;

use crate::repo::Repo;
use crate::stack::Stack;
use crate::ui;

pub fn run() -> Result<()> {
    let repo = Repo::discover()?;

    if repo.stacks.is_empty() {
        ui::line("No stacks yet.");
        ui::hint("Create one with 'ezs new <name>'.");
        return Ok(());
    }

    let current = repo.current_branch().ok();

    for stack in repo.stacks.list_stacks() {
        ui::line(&format!(
            "{} {} {}",
            stack.base_branch.blue(),
            format!("[{}]", stack.hash).bright_black(),
            format!("({} branches)", stack.branches.len()).bright_black(),
        ));
        render_stack(&repo, stack, current.as_deref());
        ui::line("");
    }
    Ok(())
}

fn render_stack(repo: &Repo, stack: &Stack, current: Option<&str>) {
    render_subtree(repo, stack, &stack.root, current, 0);
}

fn render_subtree(repo: &Repo, stack: &Stack, branch: &str, current: Option<&str>, depth: usize) {
    let Some(b) = stack.branches.iter().find(|b| b.name == branch) else {
        return;
    };

    let marker = if current == Some(branch) { "◉" } else { "◯" };
    let indent = "│ ".repeat(depth);

    let mut line = format!("{}{} {}", indent, marker, ui::print_branch(branch));
    if b.is_remote {
        line.push_str(&format!(" {}", "(remote)".bright_black()));
    }
    if b.is_merged {
        line.push_str(&format!(" {}", "merged".yellow()));
    }
    if b.has_pr() {
        line.push_str(&format!(" {}", format!("#{}", b.pr_number).cyan()));
    }
    ui::line(&line);

    for child in repo.stacks.get_children(branch) {
        render_subtree(repo, stack, &child, current, depth + 1);
    }
}
