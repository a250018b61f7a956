//! Remote operations: fetch, push, divergence, remote branch listing.

use anyhow::{bail, Result};

use super::Git;

/// Remote name ezstack operates against
pub const REMOTE: &str = "origin";

/// How to push a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushMode {
    Normal,
    ForceWithLease,
    SetUpstream,
}

/// Local/remote divergence of a branch against its upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct Divergence {
    pub diverged: bool,
    pub local_ahead: usize,
    pub remote_behind: usize,
}

impl Git {
    /// Fetch all remotes, pruning deleted refs.
    pub fn fetch_all_prune(&self) -> Result<()> {
        self.run_ok(&["fetch", "--all", "--prune"])?;
        Ok(())
    }

    /// Push `branch` to origin.
    ///
    /// Returns `Ok(false)` when the push was rejected because the remote
    /// advanced (caller may retry with `ForceWithLease`); other failures
    /// are errors.
    pub fn push(&self, branch: &str, mode: PushMode) -> Result<bool> {
        let output = match mode {
            PushMode::Normal => self.run(&["push", "--quiet", REMOTE, branch])?,
            PushMode::ForceWithLease => {
                self.run(&["push", "--quiet", "--force-with-lease", REMOTE, branch])?
            }
            PushMode::SetUpstream => self.run(&["push", "--quiet", "-u", REMOTE, branch])?,
        };

        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("[rejected]")
            || stderr.contains("stale info")
            || stderr.contains("fetch first")
            || stderr.contains("non-fast-forward")
        {
            return Ok(false);
        }
        bail!("git push failed for '{}': {}", branch, stderr.trim());
    }

    /// Divergence of `branch` against `origin/<branch>`.
    ///
    /// A branch with no upstream has not diverged.
    pub fn has_diverged(&self, branch: &str) -> Result<Divergence> {
        let upstream = format!("{}/{}", REMOTE, branch);
        let probe = self.run(&["rev-parse", "--verify", "--quiet", &upstream])?;
        if !probe.status.success() {
            return Ok(Divergence::default());
        }

        let out = self.run_ok(&[
            "rev-list",
            "--left-right",
            "--count",
            &format!("{}...{}", branch, upstream),
        ])?;

        let mut fields = out.split_whitespace();
        let local_ahead: usize = fields.next().unwrap_or("0").parse().unwrap_or(0);
        let remote_behind: usize = fields.next().unwrap_or("0").parse().unwrap_or(0);

        Ok(Divergence {
            diverged: local_ahead > 0 && remote_behind > 0,
            local_ahead,
            remote_behind,
        })
    }

    /// Branch names present on origin.
    pub fn list_remote_branches(&self) -> Result<Vec<String>> {
        let out = self.run_ok(&["ls-remote", "--heads", REMOTE])?;
        let mut branches = Vec::new();
        for line in out.lines() {
            if let Some(name) = line.split('\t').nth(1).and_then(|r| r.strip_prefix("refs/heads/")) {
                branches.push(name.to_string());
            }
        }
        Ok(branches)
    }

    /// URL of the origin remote.
    pub fn remote_url(&self) -> Result<String> {
        self.run_ok(&["remote", "get-url", REMOTE])
    }
}
