//! Style constants and color helpers.
//!
//! Centralizes all styling decisions for consistent output.

use colored::{ColoredString, Colorize};

// ──────────────────────────────────────────────────────────────
// Markers
// ──────────────────────────────────────────────────────────────

/// Success marker: ✓
pub const MARK_SUCCESS: &str = "✓";
/// Error/failure marker: ✗
pub const MARK_ERROR: &str = "✗";
/// Warning marker: !
pub const MARK_WARNING: &str = "!";
/// Progress/step marker: →
pub const MARK_STEP: &str = "→";
/// Bullet marker: •
pub const MARK_BULLET: &str = "•";

// ──────────────────────────────────────────────────────────────
// Spinner styles
// ──────────────────────────────────────────────────────────────

/// Braille spinner frames
pub const SPINNER_FRAMES: &str = "⡀⡄⡆⡇⠇⠏⠋⠉";

// ──────────────────────────────────────────────────────────────
// Color helper functions
// ──────────────────────────────────────────────────────────────

/// Format branch name (green)
pub fn branch_style<S: AsRef<str>>(s: S) -> ColoredString {
    s.as_ref().green()
}

/// Format parent branch name (blue)
pub fn parent_style<S: AsRef<str>>(s: S) -> ColoredString {
    s.as_ref().blue()
}

/// Format command text (cyan)
pub fn cmd_style<S: AsRef<str>>(s: S) -> ColoredString {
    s.as_ref().cyan()
}

/// Format URL (cyan)
pub fn url_style<S: AsRef<str>>(s: S) -> ColoredString {
    s.as_ref().cyan()
}

/// Format subdued/secondary text (bright black/gray)
pub fn dim_style<S: AsRef<str>>(s: S) -> ColoredString {
    s.as_ref().bright_black()
}
