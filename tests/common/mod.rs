use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Path to the ezs binary under test
pub fn ezs_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ezs"))
}

/// Run ezs in `dir` with an isolated config home.
pub fn run_ezs(dir: &Path, home: &Path, args: &[&str]) -> Result<Output> {
    Ok(Command::new(ezs_binary())
        .args(args)
        .current_dir(dir)
        .env("EZSTACK_HOME", home)
        .stdin(Stdio::null())
        .output()?)
}

/// Run ezs, asserting success; returns (stdout, stderr).
pub fn run_ezs_ok(dir: &Path, home: &Path, args: &[&str]) -> Result<(String, String)> {
    let output = run_ezs(dir, home, args)?;
    assert!(
        output.status.success(),
        "ezs {:?} failed:\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok((
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    ))
}

/// Run git directly (bypassing ezs)
#[allow(dead_code)]
pub fn run_git(dir: &Path, args: &[&str]) -> Result<Output> {
    Ok(Command::new("git").args(args).current_dir(dir).output()?)
}

fn run_git_ok(dir: &Path, args: &[&str]) {
    let output = run_git(dir, args).expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Initialize a test git repository with one commit on main, and point the
/// repo's worktree directory inside `dir` so tests stay self-contained.
pub fn init_test_repo(dir: &Path, home: &Path) -> Result<()> {
    run_git_ok(dir, &["init", "-b", "main"]);
    run_git_ok(dir, &["config", "user.name", "Test User"]);
    run_git_ok(dir, &["config", "user.email", "test@example.com"]);
    // Prevent editors from blocking tests
    run_git_ok(dir, &["config", "core.editor", "true"]);
    run_git_ok(dir, &["config", "sequence.editor", "true"]);

    fs::write(dir.join("README.md"), "# Test Repo\n")?;
    run_git_ok(dir, &["add", "."]);
    run_git_ok(dir, &["commit", "-m", "Initial commit"]);

    let wt_dir = dir.join(".ezs-worktrees");
    run_ezs_ok(
        dir,
        home,
        &["config", "set", "repo.worktree-dir", wt_dir.to_str().unwrap()],
    )?;
    Ok(())
}

/// Commit a file in the given directory (any worktree)
#[allow(dead_code)]
pub fn commit_file(dir: &Path, file: &str, content: &str, message: &str) -> Result<()> {
    fs::write(dir.join(file), content)?;
    run_git_ok(dir, &["add", "."]);
    run_git_ok(dir, &["commit", "-m", message]);
    Ok(())
}

#[allow(dead_code)]
pub fn get_current_branch(dir: &Path) -> Result<String> {
    let output = run_git(dir, &["branch", "--show-current"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[allow(dead_code)]
pub fn git_branch_exists(dir: &Path, name: &str) -> Result<bool> {
    let output = run_git(dir, &["branch", "--list", name])?;
    Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
}

/// Load the persisted stack document from the config home.
#[allow(dead_code)]
pub fn load_stacks_json(home: &Path) -> Result<serde_json::Value> {
    let repos = home.join("repos");
    for entry in fs::read_dir(&repos)? {
        let path = entry?.path().join("stacks.json");
        if path.exists() {
            let content = fs::read_to_string(path)?;
            return Ok(serde_json::from_str(&content)?);
        }
    }
    anyhow::bail!("no stacks.json found under {}", repos.display())
}

/// The worktree directory ezs created for `branch`.
#[allow(dead_code)]
pub fn worktree_path(dir: &Path, branch: &str) -> PathBuf {
    dir.join(".ezs-worktrees").join(branch.replace('/', "-"))
}
