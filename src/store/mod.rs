//! Persistent state under the ezstack home directory.
//!
//! Layout (`EZSTACK_HOME`, default `~/.ezstack`):
//! - `config.json` - global + per-repo preferences
//! - `repos/<hash-of-repo-path>/stacks.json` - stack tree document
//! - `repos/<hash-of-repo-path>/cache.json` - branch cache
//!
//! Saves are atomic (temp file + rename). Loads tolerate missing files by
//! returning empty documents; corrupt files fail with a recovery hint.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

mod global;
mod repo;

pub use global::{GlobalConfig, RepoPrefs};
pub use repo::{CacheDoc, CacheEntry, StackDoc, StackRecord, TreeNode};

/// Environment variable overriding the config home
pub const HOME_ENV: &str = "EZSTACK_HOME";

/// Resolve the config home directory.
pub fn config_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".ezstack"))
}

/// Stable key for a repository: prefix of the SHA-256 of its canonical
/// main-worktree path.
pub fn repo_key(repo_path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repo_path.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    hex_prefix(&digest, 16)
}

/// Per-repo state directory: `<home>/repos/<key>`.
pub fn repo_state_dir(repo_path: &Path) -> Result<PathBuf> {
    Ok(config_home()?.join("repos").join(repo_key(repo_path)))
}

/// Short hash identifying a stack, derived from its root branch name.
/// Addressable by prefix (≥ 3 chars).
pub fn stack_hash(root: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(root.as_bytes());
    let digest = hasher.finalize();
    hex_prefix(&digest, 8)
}

fn hex_prefix(digest: &[u8], len: usize) -> String {
    let mut out = String::with_capacity(len);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
        if out.len() >= len {
            break;
        }
    }
    out.truncate(len);
    out
}

/// Write a JSON document atomically: temp file in the same directory, then
/// rename over the target.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("No parent directory for {}", path.display()))?;
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let content = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", tmp.display()))?;
    Ok(())
}

/// Load a JSON document; a missing file yields the default.
pub fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| {
        format!(
            "State file {} is corrupted. To recover, delete the file:\n  rm {}",
            path.display(),
            path.display()
        )
    })
}
