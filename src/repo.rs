//! Repository context: identity, preferences, and loaded stack model.
//!
//! A repository is identified by the canonical path of its main worktree
//! (symlinks resolved); all persistent state is keyed by it. Commands
//! construct one `Repo` and operate through it.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::forge::{forge_for, GhForge};
use crate::git::Git;
use crate::stack::Stacks;
use crate::store::{repo_state_dir, CacheDoc, GlobalConfig, RepoPrefs, StackDoc};

pub struct Repo {
    /// Canonical main worktree path (repository identity)
    pub root: PathBuf,
    /// Git adapter bound to the main worktree
    pub git: Git,
    pub config: GlobalConfig,
    pub prefs: RepoPrefs,
    pub base_branch: String,
    pub stacks: Stacks,
    state_dir: PathBuf,
}

impl Repo {
    /// Discover the repository containing the current directory.
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        Self::discover_in(&cwd)
    }

    /// Discover the repository containing `dir`.
    pub fn discover_in(dir: &Path) -> Result<Self> {
        let probe = Git::in_dir(dir);
        let root = probe
            .main_worktree_path()
            .context("Not inside a git repository")?;
        let git = Git::in_dir(&root);

        let config = GlobalConfig::load()?;
        let prefs = config.prefs_for(&root);
        let base_branch = config.base_branch_for(&root);

        let state_dir = repo_state_dir(&root)?;
        let stack_doc = StackDoc::load(&state_dir)?;
        let cache_doc = CacheDoc::load(&state_dir)?;
        let stacks = Stacks::from_docs(stack_doc, cache_doc, &base_branch);

        Ok(Self {
            root,
            git,
            config,
            prefs,
            base_branch,
            stacks,
            state_dir,
        })
    }

    /// Persist the model. Invariants are re-checked first; a violation
    /// here is a bug, not a user error.
    pub fn save(&self) -> Result<()> {
        self.stacks
            .check_invariants()
            .context("Internal state is inconsistent; refusing to save")?;
        let (doc, cache) = self.stacks.to_docs();
        doc.save(&self.state_dir)?;
        cache.save(&self.state_dir)?;
        Ok(())
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Branch checked out in the invoking directory's worktree.
    pub fn current_branch(&self) -> Result<String> {
        Git::new()?.current_branch()
    }

    /// Git adapter bound to a tracked branch's worktree.
    pub fn git_for_branch(&self, name: &str) -> Result<Git> {
        let branch = self
            .stacks
            .get_branch(name)
            .with_context(|| format!("Branch '{}' is not tracked", name))?;
        if branch.worktree_path.as_os_str().is_empty() {
            anyhow::bail!("Branch '{}' has no worktree", name);
        }
        Ok(Git::in_dir(&branch.worktree_path))
    }

    /// Forge bound to this repository's origin remote.
    pub fn forge(&self) -> Result<GhForge> {
        forge_for(&self.git, self.config.forge_token.clone())
    }

    /// Directory a new worktree for `branch` is created in.
    ///
    /// Defaults to a sibling `<repo-name>-worktrees/` directory unless the
    /// repository preferences name one.
    pub fn worktree_dir_for(&self, branch: &str) -> PathBuf {
        let base = match self.prefs.worktree_base_dir {
            Some(ref dir) => dir.clone(),
            None => {
                let name = self
                    .root
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "repo".to_string());
                match self.root.parent() {
                    Some(parent) => parent.join(format!("{}-worktrees", name)),
                    None => self.root.join(".worktrees"),
                }
            }
        };
        // Slashes in branch names become path separators otherwise
        base.join(branch.replace('/', "-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    fn init_repo(dir: &Path) -> Git {
        let git = Git::in_dir(dir);
        git.run_ok(&["init", "-b", "main"]).unwrap();
        git.run_ok(&["config", "user.email", "t@example.com"]).unwrap();
        git.run_ok(&["config", "user.name", "T"]).unwrap();
        fs::write(dir.join("README.md"), "x\n").unwrap();
        git.run_ok(&["add", "."]).unwrap();
        git.run_ok(&["commit", "-m", "init"]).unwrap();
        git
    }

    #[test]
    #[serial]
    fn test_discover_in_repo() {
        let home = tempdir().unwrap();
        std::env::set_var(crate::store::HOME_ENV, home.path());

        let dir = tempdir().unwrap();
        init_repo(dir.path());

        let repo = Repo::discover_in(dir.path()).unwrap();
        assert_eq!(repo.root, dir.path().canonicalize().unwrap());
        assert_eq!(repo.base_branch, "main");
        assert!(repo.stacks.is_empty());

        std::env::remove_var(crate::store::HOME_ENV);
    }

    #[test]
    #[serial]
    fn test_discover_outside_repo_fails() {
        let home = tempdir().unwrap();
        std::env::set_var(crate::store::HOME_ENV, home.path());

        let dir = tempdir().unwrap();
        let result = Repo::discover_in(dir.path());
        assert!(result.is_err());

        std::env::remove_var(crate::store::HOME_ENV);
    }

    #[test]
    #[serial]
    fn test_worktree_dir_default_is_sibling() {
        let home = tempdir().unwrap();
        std::env::set_var(crate::store::HOME_ENV, home.path());

        let dir = tempdir().unwrap();
        let repo_dir = dir.path().join("myrepo");
        fs::create_dir(&repo_dir).unwrap();
        init_repo(&repo_dir);

        let repo = Repo::discover_in(&repo_dir).unwrap();
        let wt = repo.worktree_dir_for("feat/login");
        assert!(wt.ends_with("myrepo-worktrees/feat-login"));

        std::env::remove_var(crate::store::HOME_ENV);
    }

    #[test]
    #[serial]
    fn test_save_and_reload_model() {
        let home = tempdir().unwrap();
        std::env::set_var(crate::store::HOME_ENV, home.path());

        let dir = tempdir().unwrap();
        init_repo(dir.path());

        let mut repo = Repo::discover_in(dir.path()).unwrap();
        repo.stacks
            .insert_root("feature", "main", Default::default())
            .unwrap();
        repo.save().unwrap();

        let reloaded = Repo::discover_in(dir.path()).unwrap();
        assert!(reloaded.stacks.is_tracked("feature"));

        std::env::remove_var(crate::store::HOME_ENV);
    }
}
