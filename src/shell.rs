//! Shell integration.
//!
//! Commands that change the user's directory cannot do so from a child
//! process, so `goto|go|new|delete|del|rm|sync` print a single
//! `cd <path>` line on stdout for the wrapper from `--shell-init` to
//! `eval`. Everything else the program prints goes to stderr.

use std::path::Path;

/// Shell function printed by `--shell-init`, for `eval "$(ezs --shell-init)"`.
pub fn shell_init_script() -> String {
    r#"# ezstack shell integration
ezs() {
    local __ezs_out
    __ezs_out="$(command ezs "$@")" || return $?
    if [ -n "$__ezs_out" ]; then
        eval "$__ezs_out"
    fi
}
"#
    .to_string()
}

/// Emit a cd directive on stdout.
pub fn emit_cd(path: &Path) {
    println!("cd {}", quote(&path.to_string_lossy()));
}

/// Single-quote a path for POSIX shells.
fn quote(s: &str) -> String {
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || "/._-~".contains(c)) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_wraps_binary_and_evals() {
        let script = shell_init_script();
        assert!(script.contains("ezs() {"));
        assert!(script.contains(r#"command ezs "$@""#));
        assert!(script.contains("eval"));
    }

    #[test]
    fn test_quote_plain_path_unchanged() {
        assert_eq!(quote("/home/user/repo-worktrees/feature"), "/home/user/repo-worktrees/feature");
    }

    #[test]
    fn test_quote_path_with_spaces() {
        assert_eq!(quote("/tmp/my repo"), "'/tmp/my repo'");
    }

    #[test]
    fn test_quote_path_with_single_quote() {
        assert_eq!(quote("/tmp/it's"), r"'/tmp/it'\''s'");
    }

    #[test]
    fn test_quote_empty() {
        assert_eq!(quote(""), "''");
    }
}
