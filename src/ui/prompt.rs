//! Interactive prompts using dialoguer.
//!
//! All functions gracefully handle non-TTY environments.

use anyhow::{bail, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, Editor, Select};
use std::io::IsTerminal;

// ──────────────────────────────────────────────────────────────
// Confirmation prompts
// ──────────────────────────────────────────────────────────────

/// Confirmation prompt with default value.
///
/// In non-TTY mode, returns an error asking for --auto.
pub fn confirm(message: &str, default: bool) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        bail!("This operation requires confirmation. Use --auto to skip in non-interactive mode.");
    }

    let result = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(default)
        .interact()?;

    Ok(result)
}

/// Confirmation prompt that defaults to the safe option in non-TTY.
///
/// Unlike `confirm()`, this doesn't error in non-TTY - it returns `false`.
/// Use for optional confirmations where skipping is acceptable.
pub fn confirm_optional(message: &str, default: bool) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        return Ok(false);
    }

    let result = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(default)
        .interact()?;

    Ok(result)
}

// ──────────────────────────────────────────────────────────────
// Selection prompts
// ──────────────────────────────────────────────────────────────

/// Single selection from a list.
///
/// Returns the index of the selected item. Errors in non-TTY mode.
pub fn select<T: std::fmt::Display>(message: &str, items: &[T]) -> Result<usize> {
    if !std::io::stdin().is_terminal() {
        bail!("Interactive selection required. Specify the value directly or run in a terminal.");
    }

    if items.is_empty() {
        bail!("No items to select from");
    }

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .items(items)
        .default(0)
        .interact()?;

    Ok(selection)
}

// ──────────────────────────────────────────────────────────────
// Editor
// ──────────────────────────────────────────────────────────────

/// Open $EDITOR on the given text and return the edited result.
///
/// Returns the original text unchanged in non-TTY mode or when the user
/// aborts the editor without saving.
pub fn edit_text(text: &str) -> Result<String> {
    if !std::io::stdin().is_terminal() {
        return Ok(text.to_string());
    }

    match Editor::new().edit(text)? {
        Some(edited) => Ok(edited),
        None => Ok(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_errors_in_non_tty() {
        let result = confirm("Test?", false);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("--auto"));
    }

    #[test]
    fn test_confirm_optional_returns_false_in_non_tty() {
        let result = confirm_optional("Test?", true);
        assert!(result.is_ok());
        assert!(!result.unwrap());
    }

    #[test]
    fn test_select_errors_in_non_tty() {
        let items = vec!["a", "b", "c"];
        let result = select("Choose:", &items);
        assert!(result.is_err());
    }

    #[test]
    fn test_edit_text_passthrough_in_non_tty() {
        let result = edit_text("body text").unwrap();
        assert_eq!(result, "body text");
    }
}
