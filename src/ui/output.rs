//! Output functions for consistent message formatting.
//!
//! Every function here writes to stderr: stdout is reserved for shell
//! directives (`cd <path>`) consumed by the wrapper from `--shell-init`.
//! A shell doing `eval "$(ezs ...)"` must never see decorative text.

use colored::Colorize;
use std::io::IsTerminal;

use super::style::*;

// ──────────────────────────────────────────────────────────────
// Primary output functions
// ──────────────────────────────────────────────────────────────

/// Print success message: "✓ {message}" in green
pub fn success(message: &str) {
    eprintln!("{} {}", MARK_SUCCESS.green(), message);
}

/// Print bold success message: "✓ {message}" in bold green
pub fn success_bold(message: &str) {
    eprintln!("{} {}", MARK_SUCCESS.green().bold(), message.green().bold());
}

/// Print error message: "✗ {message}" in red
pub fn error(message: &str) {
    eprintln!("{} {}", MARK_ERROR.red(), message);
}

/// Print warning message: "! {message}" in yellow
pub fn warning(message: &str) {
    eprintln!("{} {}", MARK_WARNING.yellow().bold(), message);
}

/// Print step/progress message: "→ {message}" in blue
pub fn step(message: &str) {
    eprintln!("{} {}", MARK_STEP.blue(), message);
}

/// Print indented item: "  • {message}"
pub fn bullet(message: &str) {
    eprintln!("  {} {}", MARK_BULLET, message);
}

/// Print indented success: "  ✓ {message}" in green
pub fn bullet_success(message: &str) {
    eprintln!("  {} {}", MARK_SUCCESS.green(), message);
}

/// Print indented error: "  ✗ {message}" in red
pub fn bullet_error(message: &str) {
    eprintln!("  {} {}", MARK_ERROR.red(), message);
}

/// Print a raw line (no marker)
pub fn line(message: &str) {
    eprintln!("{}", message);
}

// ──────────────────────────────────────────────────────────────
// TTY-aware output
// ──────────────────────────────────────────────────────────────

/// Print hint only in TTY mode (skipped in CI/logs)
pub fn hint(message: &str) {
    if std::io::stderr().is_terminal() {
        eprintln!("{}", dim_style(message));
    }
}

/// Print blank line only in TTY mode
pub fn blank() {
    if std::io::stderr().is_terminal() {
        eprintln!();
    }
}

// ──────────────────────────────────────────────────────────────
// Formatted output helpers
// ──────────────────────────────────────────────────────────────

/// Format a branch name in the standard style
pub fn print_branch(name: &str) -> String {
    format!("{}", branch_style(name))
}

/// Format a parent branch name in the standard style
pub fn print_parent(name: &str) -> String {
    format!("{}", parent_style(name))
}

/// Format a command in the standard style
pub fn print_cmd(cmd: &str) -> String {
    format!("{}", cmd_style(cmd))
}

/// Format a URL in the standard style
pub fn print_url(url: &str) -> String {
    format!("{}", url_style(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_helpers() {
        assert!(!print_branch("feature").is_empty());
        assert!(!print_parent("main").is_empty());
        assert!(!print_cmd("ezs sync").is_empty());
        assert!(!print_url("https://example.com").is_empty());
    }

    #[test]
    fn test_output_functions_dont_panic() {
        success("test success");
        success_bold("test bold success");
        error("test error");
        warning("test warning");
        step("test step");
        bullet("test bullet");
        bullet_success("test bullet success");
        bullet_error("test bullet error");
        line("test line");
    }
}
