//! Git adapter for ezstack.
//!
//! Every git interaction goes through a `git` subprocess bound to one
//! working directory. Operations on a different worktree take a fresh
//! adapter for that directory (`Git::in_dir`). Results are typed; stderr
//! is classified with substring rules where the outcome matters (see
//! `rebase::RebaseOutcome`).

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::context::ExecutionContext;

mod rebase;
mod remote;
mod worktree;

pub use rebase::RebaseOutcome;
pub use remote::{Divergence, PushMode, REMOTE};
pub use worktree::Worktree;

/// Conventional locations for a PR template, relative to the repo root.
const PR_TEMPLATE_PATHS: &[&str] = &[
    ".github/pull_request_template.md",
    ".github/PULL_REQUEST_TEMPLATE.md",
    "pull_request_template.md",
    "PULL_REQUEST_TEMPLATE.md",
    "docs/pull_request_template.md",
    "docs/PULL_REQUEST_TEMPLATE.md",
];

/// Log a git command if verbose mode is enabled
pub(crate) fn verbose_cmd(args: &[&str]) {
    if ExecutionContext::is_verbose() {
        eprintln!("  {} git {}", "[cmd]".dimmed(), args.join(" "));
    }
}

/// One commit from a range listing
#[derive(Debug, Clone)]
pub struct Commit {
    pub hash: String,
    pub subject: String,
    pub author: String,
}

/// Git adapter bound to a single working directory.
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    /// Adapter for the current working directory.
    pub fn new() -> Result<Self> {
        let workdir = std::env::current_dir().context("Failed to determine current directory")?;
        Ok(Self { workdir })
    }

    /// Adapter for a specific directory (e.g. another worktree).
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { workdir: dir.into() }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub(crate) fn run(&self, args: &[&str]) -> Result<Output> {
        verbose_cmd(args);
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("Failed to run 'git {}'", args.join(" ")))
    }

    /// Run a git command, requiring success; returns trimmed stdout.
    pub(crate) fn run_ok(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    // ──────────────────────────────────────────────────────────────
    // Repository and ref queries
    // ──────────────────────────────────────────────────────────────

    /// Name of the branch checked out in this working directory.
    pub fn current_branch(&self) -> Result<String> {
        let name = self.run_ok(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if name == "HEAD" {
            bail!("HEAD is detached in {}", self.workdir.display());
        }
        Ok(name)
    }

    /// Root of the working tree this adapter is bound to.
    pub fn repo_root(&self) -> Result<PathBuf> {
        let root = self.run_ok(&["rev-parse", "--show-toplevel"])
            .context("Not inside a git repository")?;
        Ok(PathBuf::from(root))
    }

    /// Path of the main worktree (the checkout owning the shared .git dir),
    /// with symlinks resolved. This is the repository's identity.
    pub fn main_worktree_path(&self) -> Result<PathBuf> {
        let common = self.run_ok(&["rev-parse", "--path-format=absolute", "--git-common-dir"])?;
        let common = PathBuf::from(common);
        let main = common
            .parent()
            .with_context(|| format!("Unexpected git common dir: {}", common.display()))?;
        main.canonicalize()
            .with_context(|| format!("Failed to canonicalize {}", main.display()))
    }

    pub fn rev_parse(&self, rev: &str) -> Result<String> {
        self.run_ok(&["rev-parse", "--verify", rev])
    }

    pub fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        self.run_ok(&["merge-base", a, b])
    }

    /// True when `ancestor` is reachable from `descendant` (the merged check).
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let output = self.run(&["merge-base", "--is-ancestor", ancestor, descendant])?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!("git merge-base --is-ancestor failed: {}", stderr.trim());
            }
        }
    }

    /// Number of commits in `to` that are not in `from` (`from..to`).
    pub fn commits_ahead(&self, from: &str, to: &str) -> Result<usize> {
        let count = self.run_ok(&["rev-list", "--count", &format!("{}..{}", from, to)])?;
        count
            .parse()
            .with_context(|| format!("Unexpected rev-list output: {}", count))
    }

    /// Commits in `base..head`, newest first.
    pub fn commits_between(&self, base: &str, head: &str) -> Result<Vec<Commit>> {
        let out = self.run_ok(&[
            "log",
            "--format=%H%x09%s%x09%an",
            &format!("{}..{}", base, head),
        ])?;

        let mut commits = Vec::new();
        for line in out.lines() {
            let mut fields = line.splitn(3, '\t');
            let hash = fields.next().unwrap_or("").to_string();
            let subject = fields.next().unwrap_or("").to_string();
            let author = fields.next().unwrap_or("").to_string();
            if !hash.is_empty() {
                commits.push(Commit { hash, subject, author });
            }
        }
        Ok(commits)
    }

    /// Subject line of the last commit.
    pub fn last_commit_subject(&self) -> Result<String> {
        self.run_ok(&["log", "-1", "--format=%s"])
    }

    /// Full message of the last commit.
    pub fn last_commit_message(&self) -> Result<String> {
        self.run_ok(&["log", "-1", "--format=%B"])
    }

    pub fn branch_exists(&self, name: &str) -> Result<bool> {
        let output = self.run(&["show-ref", "--verify", "--quiet", &format!("refs/heads/{}", name)])?;
        Ok(output.status.success())
    }

    // ──────────────────────────────────────────────────────────────
    // Branch mutations
    // ──────────────────────────────────────────────────────────────

    /// Create `name` pointing at `from_ref` without checking it out.
    pub fn create_branch(&self, name: &str, from_ref: &str) -> Result<()> {
        self.run_ok(&["branch", name, from_ref])?;
        Ok(())
    }

    pub fn delete_branch(&self, name: &str) -> Result<()> {
        self.run_ok(&["branch", "-D", name])?;
        Ok(())
    }

    pub fn reset_hard(&self, target: &str) -> Result<()> {
        self.run_ok(&["reset", "--hard", target])?;
        Ok(())
    }

    // ──────────────────────────────────────────────────────────────
    // Misc
    // ──────────────────────────────────────────────────────────────

    /// Read a PR template from the conventional paths, if present.
    pub fn read_pr_template(&self) -> Result<Option<String>> {
        let root = self.repo_root()?;
        for rel in PR_TEMPLATE_PATHS {
            let path = root.join(rel);
            if path.is_file() {
                let body = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                return Ok(Some(body));
            }
        }
        Ok(None)
    }
}
