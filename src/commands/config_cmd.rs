//! `ezs config <get|set|list>` - global and per-repo preferences.

use anyhow::{bail, Result};
use clap::Subcommand;
use std::path::PathBuf;

use crate::repo::Repo;
use crate::store::GlobalConfig;
use crate::ui;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Print all effective values for this repository
    List,
}

const KEYS_HELP: &str = "Known keys:\n\
  base-branch            global default base branch\n\
  forge-token            token passed to the forge CLI\n\
  repo.base-branch       base branch override for this repository\n\
  repo.worktree-dir      directory new worktrees are created under\n\
  repo.cd-after-new      emit a cd directive after 'ezs new' (true/false)\n\
  repo.auto-draft-wip    create draft PRs for WIP head commits (true/false)";

pub fn run(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => get(&key),
        ConfigAction::Set { key, value } => set(&key, &value),
        ConfigAction::List => list(),
    }
}

fn get(key: &str) -> Result<()> {
    let config = GlobalConfig::load()?;
    let value = match key {
        "base-branch" => config.base_branch.clone(),
        "forge-token" => config.forge_token.clone().unwrap_or_default(),
        _ if key.starts_with("repo.") => {
            let repo = Repo::discover()?;
            let prefs = config.prefs_for(&repo.root);
            match key {
                "repo.base-branch" => prefs.base_branch.unwrap_or_default(),
                "repo.worktree-dir" => prefs
                    .worktree_base_dir
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                "repo.cd-after-new" => prefs.cd_after_new.to_string(),
                "repo.auto-draft-wip" => prefs.auto_draft_wip_commits.to_string(),
                _ => bail!("Unknown key '{}'.\n{}", key, KEYS_HELP),
            }
        }
        _ => bail!("Unknown key '{}'.\n{}", key, KEYS_HELP),
    };
    ui::line(&value);
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let mut config = GlobalConfig::load()?;
    match key {
        "base-branch" => config.base_branch = value.to_string(),
        "forge-token" => config.forge_token = Some(value.to_string()),
        _ if key.starts_with("repo.") => {
            let repo = Repo::discover()?;
            let prefs = config.prefs_mut(&repo.root);
            match key {
                "repo.base-branch" => prefs.base_branch = Some(value.to_string()),
                "repo.worktree-dir" => prefs.worktree_base_dir = Some(PathBuf::from(value)),
                "repo.cd-after-new" => prefs.cd_after_new = parse_bool(key, value)?,
                "repo.auto-draft-wip" => prefs.auto_draft_wip_commits = parse_bool(key, value)?,
                _ => bail!("Unknown key '{}'.\n{}", key, KEYS_HELP),
            }
        }
        _ => bail!("Unknown key '{}'.\n{}", key, KEYS_HELP),
    }
    config.save()?;
    ui::success(&format!("{} = {}", key, value));
    Ok(())
}

fn list() -> Result<()> {
    let config = GlobalConfig::load()?;
    ui::line(&format!("base-branch = {}", config.base_branch));
    ui::line(&format!(
        "forge-token = {}",
        if config.forge_token.is_some() { "(set)" } else { "(unset)" }
    ));

    if let Ok(repo) = Repo::discover() {
        let prefs = config.prefs_for(&repo.root);
        ui::line(&format!(
            "repo.base-branch = {}",
            prefs.base_branch.unwrap_or_else(|| "(global)".to_string())
        ));
        ui::line(&format!(
            "repo.worktree-dir = {}",
            prefs
                .worktree_base_dir
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(default)".to_string())
        ));
        ui::line(&format!("repo.cd-after-new = {}", prefs.cd_after_new));
        ui::line(&format!("repo.auto-draft-wip = {}", prefs.auto_draft_wip_commits));
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => bail!("Value for '{}' must be true or false, got '{}'", key, value),
    }
}
