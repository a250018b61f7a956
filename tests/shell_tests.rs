mod common;

use anyhow::Result;
use common::*;
use std::process::Command;
use tempfile::TempDir;

#[test]
fn test_shell_init_prints_wrapper_on_stdout() -> Result<()> {
    let home = TempDir::new()?;
    let dir = TempDir::new()?;

    let output = Command::new(ezs_binary())
        .arg("--shell-init")
        .current_dir(dir.path())
        .env("EZSTACK_HOME", home.path())
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ezs() {"));
    assert!(stdout.contains(r#"command ezs "$@""#));
    assert!(stdout.contains("eval"));
    assert!(output.stderr.is_empty());
    Ok(())
}

#[test]
fn test_version_flag() -> Result<()> {
    let output = Command::new(ezs_binary()).arg("--version").output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn test_unknown_command_exits_nonzero() -> Result<()> {
    let home = TempDir::new()?;
    let dir = TempDir::new()?;
    let output = run_ezs(dir.path(), home.path(), &["frobnicate"])?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn test_outside_git_repo_is_precondition_error() -> Result<()> {
    let home = TempDir::new()?;
    let dir = TempDir::new()?;

    let output = run_ezs(dir.path(), home.path(), &["list"])?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("git repository"),
        "error should name the precondition: {}",
        stderr
    );
    Ok(())
}

#[test]
fn test_wrapper_evals_cd_directive_end_to_end() -> Result<()> {
    let home = TempDir::new()?;
    let repo = TempDir::new()?;
    init_test_repo(repo.path(), home.path())?;
    run_ezs_ok(repo.path(), home.path(), &["new", "feature-1"])?;

    // Simulate the wrapper: eval the goto output and print the resulting pwd
    let script = format!(
        r#"out="$({} goto feature-1)" && eval "$out" && pwd"#,
        ezs_binary().display()
    );
    let output = Command::new("sh")
        .args(["-c", &script])
        .current_dir(repo.path())
        .env("EZSTACK_HOME", home.path())
        .output()?;

    assert!(output.status.success());
    let pwd = String::from_utf8_lossy(&output.stdout);
    assert!(
        pwd.trim_end().ends_with("feature-1"),
        "wrapper should land in the worktree: {}",
        pwd
    );
    Ok(())
}
