//! Global configuration document (`config.json`).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{config_home, load_json, save_json};

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

/// Per-repository preferences, keyed by canonical repo path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoPrefs {
    /// Directory new worktrees are created under; defaults to a sibling
    /// `<repo>-worktrees` directory
    #[serde(default)]
    pub worktree_base_dir: Option<PathBuf>,
    /// Base branch override for this repository
    #[serde(default)]
    pub base_branch: Option<String>,
    /// Emit a cd directive after `new`
    #[serde(default = "default_true")]
    pub cd_after_new: bool,
    /// Create PRs as drafts when the head commit subject is a WIP marker
    #[serde(default)]
    pub auto_draft_wip_commits: bool,
}

impl Default for RepoPrefs {
    fn default() -> Self {
        Self {
            worktree_base_dir: None,
            base_branch: None,
            cd_after_new: true,
            auto_draft_wip_commits: false,
        }
    }
}

/// Global defaults plus the per-repo preference map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default base branch for repositories without an override
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    /// Token forwarded to the forge CLI (GH_TOKEN); empty uses ambient auth
    #[serde(default)]
    pub forge_token: Option<String>,
    #[serde(default)]
    pub repos: BTreeMap<String, RepoPrefs>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            base_branch: default_base_branch(),
            forge_token: None,
            repos: BTreeMap::new(),
        }
    }
}

impl GlobalConfig {
    pub fn path() -> Result<PathBuf> {
        Ok(config_home()?.join("config.json"))
    }

    pub fn load() -> Result<Self> {
        load_json(&Self::path()?)
    }

    pub fn save(&self) -> Result<()> {
        save_json(&Self::path()?, self)
    }

    /// Preferences for a repository (defaults when not configured).
    pub fn prefs_for(&self, repo_path: &Path) -> RepoPrefs {
        self.repos
            .get(&repo_path.to_string_lossy().to_string())
            .cloned()
            .unwrap_or_default()
    }

    /// Mutable preferences entry for a repository, created on first use.
    pub fn prefs_mut(&mut self, repo_path: &Path) -> &mut RepoPrefs {
        self.repos
            .entry(repo_path.to_string_lossy().to_string())
            .or_default()
    }

    /// Effective base branch for a repository.
    pub fn base_branch_for(&self, repo_path: &Path) -> String {
        self.prefs_for(repo_path)
            .base_branch
            .unwrap_or_else(|| self.base_branch.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let cfg = GlobalConfig::default();
        assert_eq!(cfg.base_branch, "main");
        assert!(cfg.forge_token.is_none());
        assert!(cfg.repos.is_empty());

        let prefs = RepoPrefs::default();
        assert!(prefs.cd_after_new);
        assert!(!prefs.auto_draft_wip_commits);
    }

    #[test]
    fn test_base_branch_override() {
        let mut cfg = GlobalConfig::default();
        let repo = Path::new("/work/alpha");
        assert_eq!(cfg.base_branch_for(repo), "main");

        cfg.prefs_mut(repo).base_branch = Some("develop".to_string());
        assert_eq!(cfg.base_branch_for(repo), "develop");
        // Other repos unaffected
        assert_eq!(cfg.base_branch_for(Path::new("/work/beta")), "main");
    }

    #[test]
    #[serial]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        std::env::set_var(super::super::HOME_ENV, dir.path());

        let mut cfg = GlobalConfig::default();
        cfg.forge_token = Some("tok".to_string());
        cfg.prefs_mut(Path::new("/work/alpha")).cd_after_new = false;
        cfg.save().unwrap();

        let loaded = GlobalConfig::load().unwrap();
        assert_eq!(loaded.forge_token.as_deref(), Some("tok"));
        assert!(!loaded.prefs_for(Path::new("/work/alpha")).cd_after_new);

        std::env::remove_var(super::super::HOME_ENV);
    }

    #[test]
    fn test_missing_fields_deserialize_with_defaults() {
        let cfg: GlobalConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.base_branch, "main");

        let prefs: RepoPrefs = serde_json::from_str("{}").unwrap();
        assert!(prefs.cd_after_new);
    }
}
