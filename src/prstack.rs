//! PR stack-block projector.
//!
//! Every PR of a stack carries one trailing, deterministically rendered
//! block mirroring the stack order. Rewriting is idempotent: any previous
//! block (including older trailer wordings) is stripped by regex before
//! the fresh one is appended.

use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::forge::{Forge, ForgeError};
use crate::stack::Stack;

/// Trailer appended under the list; the strip regex keys on it.
const BLOCK_TRAILER: &str = "_This stack was created by ezstack (beta)_";

fn block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)\n*---\n## (?:.*? )?PR Stack\n.*?[_*](?:Managed by|This stack was created by).*?ezstack.*?[_*]\n?",
        )
        .expect("Invalid stack block regex")
    })
}

/// Remove any existing stack block from a PR body.
pub fn strip_stack_block(body: &str) -> String {
    block_re().replace_all(body, "").to_string()
}

/// Render the canonical block for a stack. `current` marks one branch with
/// an arrow so a reader knows which PR they are looking at.
pub fn render_stack_block(stack: &Stack, current: Option<&str>) -> String {
    let mut block = String::from("---\n## PR Stack\n");
    for (i, branch) in stack.branches.iter().enumerate() {
        let entry = if !branch.pr_url.is_empty() {
            branch.pr_url.clone()
        } else if branch.pr_number > 0 {
            format!("#{}", branch.pr_number)
        } else {
            format!("{} ·no PR yet·", branch.name)
        };
        block.push_str(&format!("{}. {}", i + 1, entry));
        if current == Some(branch.name.as_str()) {
            block.push_str(" ← **This PR**");
        }
        block.push('\n');
    }
    block.push('\n');
    block.push_str(BLOCK_TRAILER);
    block.push('\n');
    block
}

/// Replace the stack block in `body` with `block`.
pub fn apply_stack_block(body: &str, block: &str) -> String {
    let stripped = strip_stack_block(body);
    let stripped = stripped.trim_end();
    if stripped.is_empty() {
        block.to_string()
    } else {
        format!("{}\n\n{}", stripped, block)
    }
}

/// Push fresh stack blocks into every PR of the stack.
///
/// Branches that are remote imports, listed in `skip_branches`, or have no
/// PR are never edited (remote ones belong to other people; no-PR ones
/// merely render as "no PR yet" in the others' blocks). Returns the
/// branches whose PR body was updated, plus per-branch failures.
pub fn update_stack_prs(
    stack: &Stack,
    forge: &dyn Forge,
    skip_branches: &HashSet<String>,
) -> Result<(Vec<String>, Vec<(String, ForgeError)>)> {
    let mut updated = Vec::new();
    let mut failures = Vec::new();

    for branch in &stack.branches {
        if branch.is_remote || skip_branches.contains(&branch.name) || branch.pr_number == 0 {
            continue;
        }

        let block = render_stack_block(stack, Some(&branch.name));
        let result = forge
            .pr_by_number(branch.pr_number)
            .and_then(|pr| forge.edit_pr_body(branch.pr_number, &apply_stack_block(&pr.body, &block)));

        match result {
            Ok(()) => updated.push(branch.name.clone()),
            Err(e) => failures.push((branch.name.clone(), e)),
        }
    }

    Ok((updated, failures))
}
