//! Rebase operations and outcome classification.

use anyhow::Result;
use std::process::Stdio;

use super::{verbose_cmd, Git};

/// Outcome of a non-interactive rebase.
///
/// A conflict is not an error: the rebase is left in progress for the user
/// to resolve, and callers decide what to skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// Rebase completed
    Success,
    /// Rebase paused on conflicts requiring user resolution
    Conflict,
    /// Rebase failed outright
    Error(String),
}

impl RebaseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RebaseOutcome::Success)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RebaseOutcome::Conflict)
    }
}

/// Conflict markers git prints on stderr when a rebase stops.
const CONFLICT_MARKERS: &[&str] = &["CONFLICT", "could not apply", "Resolve all conflicts"];

impl Git {
    /// Non-interactive rebase of the checked-out branch onto `onto`.
    pub fn rebase(&self, onto: &str) -> Result<RebaseOutcome> {
        self.run_rebase(&["rebase", onto])
    }

    /// `git rebase --onto <new_base> <old_base>` for the checked-out branch,
    /// or with an explicit branch argument when `branch` is given.
    pub fn rebase_onto(&self, new_base: &str, old_base: &str, branch: Option<&str>) -> Result<RebaseOutcome> {
        match branch {
            Some(b) => self.run_rebase(&["rebase", "--onto", new_base, old_base, b]),
            None => self.run_rebase(&["rebase", "--onto", new_base, old_base]),
        }
    }

    /// Interactive rebase onto `onto`, inheriting the terminal.
    pub fn rebase_interactive(&self, onto: &str) -> Result<RebaseOutcome> {
        verbose_cmd(&["rebase", "-i", onto]);
        let status = std::process::Command::new("git")
            .args(["rebase", "-i", onto])
            .current_dir(self.workdir())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;

        if status.success() {
            Ok(RebaseOutcome::Success)
        } else if self.rebase_in_progress()? {
            Ok(RebaseOutcome::Conflict)
        } else {
            Ok(RebaseOutcome::Error("interactive rebase failed".to_string()))
        }
    }

    /// `git pull --rebase`.
    pub fn pull_rebase(&self) -> Result<RebaseOutcome> {
        self.run_rebase(&["pull", "--rebase"])
    }

    /// Check whether a rebase is currently in progress in this worktree.
    pub fn rebase_in_progress(&self) -> Result<bool> {
        // rebase-merge/rebase-apply live under the per-worktree git dir
        let git_dir = self.run_ok(&["rev-parse", "--path-format=absolute", "--git-dir"])?;
        let git_dir = std::path::PathBuf::from(git_dir);
        Ok(git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists())
    }

    fn run_rebase(&self, args: &[&str]) -> Result<RebaseOutcome> {
        // GIT_EDITOR=true suppresses editors; stdin from /dev/null prevents
        // interactive prompts from blocking.
        verbose_cmd(args);
        let output = std::process::Command::new("git")
            .args(args)
            .env("GIT_EDITOR", "true")
            .stdin(Stdio::null())
            .current_dir(self.workdir())
            .output()?;

        if output.status.success() {
            return Ok(RebaseOutcome::Success);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(self.classify_rebase_failure(&stderr)?)
    }

    /// Classify a failed rebase: conflict markers on stderr, or a rebase
    /// left in progress, mean Conflict; anything else is Error.
    fn classify_rebase_failure(&self, stderr: &str) -> Result<RebaseOutcome> {
        if CONFLICT_MARKERS.iter().any(|m| stderr.contains(m)) {
            return Ok(RebaseOutcome::Conflict);
        }
        if self.rebase_in_progress()? {
            return Ok(RebaseOutcome::Conflict);
        }
        Ok(RebaseOutcome::Error(stderr.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::init_repo;
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_rebase_success_when_up_to_date() {
        let dir = tempdir().unwrap();
        let git = init_repo(dir.path());

        git.create_branch("feature", "main").unwrap();
        git.run_ok(&["checkout", "feature"]).unwrap();

        let outcome = git.rebase("main").unwrap();
        assert!(outcome.is_success());
    }

    #[test]
    fn test_rebase_conflict_detected() {
        let dir = tempdir().unwrap();
        let git = init_repo(dir.path());

        // Diverge main and feature on the same file
        git.create_branch("feature", "main").unwrap();
        fs::write(dir.path().join("README.md"), "main version\n").unwrap();
        git.run_ok(&["commit", "-am", "main change"]).unwrap();

        git.run_ok(&["checkout", "feature"]).unwrap();
        fs::write(dir.path().join("README.md"), "feature version\n").unwrap();
        git.run_ok(&["commit", "-am", "feature change"]).unwrap();

        let outcome = git.rebase("main").unwrap();
        assert!(outcome.is_conflict());
        assert!(git.rebase_in_progress().unwrap());

        git.run_ok(&["rebase", "--abort"]).unwrap();
        assert!(!git.rebase_in_progress().unwrap());
    }

    #[test]
    fn test_rebase_error_on_bad_ref() {
        let dir = tempdir().unwrap();
        let git = init_repo(dir.path());

        let outcome = git.rebase("no-such-branch").unwrap();
        match outcome {
            RebaseOutcome::Error(msg) => assert!(!msg.is_empty()),
            other => panic!("expected error outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_rebase_onto_moves_only_own_commits() {
        let dir = tempdir().unwrap();
        let git = init_repo(dir.path());

        // main -> a -> b, then rebase b --onto main a
        git.create_branch("a", "main").unwrap();
        git.run_ok(&["checkout", "a"]).unwrap();
        fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        git.run_ok(&["add", "."]).unwrap();
        git.run_ok(&["commit", "-m", "a work"]).unwrap();

        git.create_branch("b", "a").unwrap();
        git.run_ok(&["checkout", "b"]).unwrap();
        fs::write(dir.path().join("b.txt"), "b\n").unwrap();
        git.run_ok(&["add", "."]).unwrap();
        git.run_ok(&["commit", "-m", "b work"]).unwrap();

        let outcome = git.rebase_onto("main", "a", None).unwrap();
        assert!(outcome.is_success());

        // b now has exactly one commit over main
        assert_eq!(git.commits_ahead("main", "b").unwrap(), 1);
    }

    #[test]
    fn test_rebase_interactive_with_stubbed_editors() {
        let dir = tempdir().unwrap();
        let git = init_repo(dir.path());
        // Accept the todo list as-is so nothing blocks on an editor
        git.run_ok(&["config", "sequence.editor", "true"]).unwrap();
        git.run_ok(&["config", "core.editor", "true"]).unwrap();

        fs::write(dir.path().join("m.txt"), "m\n").unwrap();
        git.run_ok(&["add", "."]).unwrap();
        git.run_ok(&["commit", "-m", "main moves on"]).unwrap();

        git.run_ok(&["checkout", "-b", "feature", "HEAD~1"]).unwrap();
        fs::write(dir.path().join("f.txt"), "x\n").unwrap();
        git.run_ok(&["add", "."]).unwrap();
        git.run_ok(&["commit", "-m", "feature work"]).unwrap();

        let outcome = git.rebase_interactive("main").unwrap();
        assert!(outcome.is_success());
        assert!(git.is_ancestor("main", "feature").unwrap());
        assert_eq!(git.commits_ahead("main", "feature").unwrap(), 1);
    }

    #[test]
    fn test_rebase_onto_with_explicit_branch() {
        let dir = tempdir().unwrap();
        let git = init_repo(dir.path());

        git.create_branch("a", "main").unwrap();
        git.run_ok(&["checkout", "a"]).unwrap();
        fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        git.run_ok(&["add", "."]).unwrap();
        git.run_ok(&["commit", "-m", "a work"]).unwrap();

        git.create_branch("b", "a").unwrap();
        git.run_ok(&["checkout", "b"]).unwrap();
        fs::write(dir.path().join("b.txt"), "b\n").unwrap();
        git.run_ok(&["add", "."]).unwrap();
        git.run_ok(&["commit", "-m", "b work"]).unwrap();

        // Back on main; the branch argument selects b without a checkout
        git.run_ok(&["checkout", "main"]).unwrap();
        let outcome = git.rebase_onto("main", "a", Some("b")).unwrap();
        assert!(outcome.is_success());
        assert_eq!(git.commits_ahead("main", "b").unwrap(), 1);
    }

    #[test]
    fn test_rebase_in_progress_false_initially() {
        let dir = tempdir().unwrap();
        let git = init_repo(dir.path());
        assert!(!git.rebase_in_progress().unwrap());
    }
}
