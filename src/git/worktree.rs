//! Worktree operations: porcelain listing, add, remove, prune.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use super::Git;

/// One entry from `git worktree list --porcelain`.
///
/// Bare and detached entries are skipped: every worktree ezstack tracks has
/// a branch checked out.
#[derive(Debug, Clone)]
pub struct Worktree {
    pub path: PathBuf,
    pub branch: String,
}

impl Git {
    /// List worktrees with a branch checked out.
    pub fn list_worktrees(&self) -> Result<Vec<Worktree>> {
        let out = self.run_ok(&["worktree", "list", "--porcelain"])?;
        Ok(parse_worktree_porcelain(&out))
    }

    /// Create a worktree at `path` with `branch` checked out.
    pub fn add_worktree(&self, path: &Path, branch: &str) -> Result<()> {
        let path_str = path
            .to_str()
            .with_context(|| format!("Worktree path is not valid UTF-8: {}", path.display()))?;
        self.run_ok(&["worktree", "add", path_str, branch])?;
        Ok(())
    }

    /// Remove the worktree at `path`, optionally deleting its branch too.
    ///
    /// Tolerates a worktree directory that was already removed from disk:
    /// git then only knows a stale administrative entry, which pruning
    /// clears.
    pub fn remove_worktree(&self, path: &Path, delete_branch: Option<&str>) -> Result<()> {
        if path.exists() {
            let path_str = path
                .to_str()
                .with_context(|| format!("Worktree path is not valid UTF-8: {}", path.display()))?;
            let output = self.run(&["worktree", "remove", "--force", path_str])?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                // A racing manual delete leaves only the stale entry
                if !stderr.contains("is not a working tree") && !stderr.contains("No such file") {
                    bail!("git worktree remove failed: {}", stderr.trim());
                }
                self.prune_worktrees()?;
            }
        } else {
            self.prune_worktrees()?;
        }

        if let Some(branch) = delete_branch {
            if self.branch_exists(branch)? {
                self.delete_branch(branch)?;
            }
        }
        Ok(())
    }

    /// Drop stale worktree administrative entries.
    pub fn prune_worktrees(&self) -> Result<()> {
        self.run_ok(&["worktree", "prune"])?;
        Ok(())
    }
}

/// Parse `git worktree list --porcelain` output.
fn parse_worktree_porcelain(stdout: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut current_path: Option<PathBuf> = None;
    let mut current_branch: Option<String> = None;
    let mut skip = false;

    let mut flush = |path: &mut Option<PathBuf>, branch: &mut Option<String>, skip: &mut bool| {
        if let (Some(p), Some(b)) = (path.take(), branch.take()) {
            if !*skip {
                worktrees.push(Worktree { path: p, branch: b });
            }
        }
        *path = None;
        *branch = None;
        *skip = false;
    };

    for line in stdout.lines() {
        if let Some(p) = line.strip_prefix("worktree ") {
            flush(&mut current_path, &mut current_branch, &mut skip);
            let path = PathBuf::from(p);
            current_path = Some(path.canonicalize().unwrap_or(path));
        } else if let Some(b) = line.strip_prefix("branch refs/heads/") {
            current_branch = Some(b.to_string());
        } else if line == "bare" || line == "detached" {
            skip = true;
        }
    }
    flush(&mut current_path, &mut current_branch, &mut skip);

    worktrees
}

#[cfg(test)]
mod tests {
    use super::super::tests::init_repo;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_porcelain_basic() {
        let out = "worktree /repo\nHEAD abc123\nbranch refs/heads/main\n\n\
                   worktree /repo-wt/feature\nHEAD def456\nbranch refs/heads/feature\n";
        let wts = parse_worktree_porcelain(out);
        assert_eq!(wts.len(), 2);
        assert_eq!(wts[0].branch, "main");
        assert_eq!(wts[1].branch, "feature");
        assert_eq!(wts[1].path, PathBuf::from("/repo-wt/feature"));
    }

    #[test]
    fn test_parse_porcelain_skips_bare_and_detached() {
        let out = "worktree /repo.git\nbare\n\n\
                   worktree /repo-wt/x\nHEAD abc\ndetached\n\n\
                   worktree /repo-wt/y\nHEAD def\nbranch refs/heads/y\n";
        let wts = parse_worktree_porcelain(out);
        assert_eq!(wts.len(), 1);
        assert_eq!(wts[0].branch, "y");
    }

    #[test]
    fn test_parse_porcelain_empty() {
        assert!(parse_worktree_porcelain("").is_empty());
    }

    #[test]
    fn test_add_and_list_worktrees() {
        let dir = tempdir().unwrap();
        let git = init_repo(dir.path());

        git.create_branch("feature", "main").unwrap();
        let wt = dir.path().join("wt-feature");
        git.add_worktree(&wt, "feature").unwrap();

        let wts = git.list_worktrees().unwrap();
        assert_eq!(wts.len(), 2);
        assert!(wts.iter().any(|w| w.branch == "feature"));
        assert!(Git::in_dir(&wt).current_branch().unwrap() == "feature");
    }

    #[test]
    fn test_remove_worktree_and_branch() {
        let dir = tempdir().unwrap();
        let git = init_repo(dir.path());

        git.create_branch("feature", "main").unwrap();
        let wt = dir.path().join("wt-feature");
        git.add_worktree(&wt, "feature").unwrap();

        git.remove_worktree(&wt, Some("feature")).unwrap();
        assert!(!wt.exists());
        assert!(!git.branch_exists("feature").unwrap());
    }

    #[test]
    fn test_remove_worktree_tolerates_missing_directory() {
        let dir = tempdir().unwrap();
        let git = init_repo(dir.path());

        git.create_branch("feature", "main").unwrap();
        let wt = dir.path().join("wt-feature");
        git.add_worktree(&wt, "feature").unwrap();

        // Simulate a manual rm -rf of the worktree directory
        std::fs::remove_dir_all(&wt).unwrap();

        git.remove_worktree(&wt, Some("feature")).unwrap();
        assert!(!git.branch_exists("feature").unwrap());
        assert_eq!(git.list_worktrees().unwrap().len(), 1);
    }
}
