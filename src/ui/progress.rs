//! Progress indicators: spinners, including the delayed variant.
//!
//! All functions gracefully degrade when stderr is not a TTY. Long-running
//! external calls (fetch, worktree add, rebase) use `delayed_spinner`, which
//! stays silent for a grace period so fast calls produce no output at all.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::output;
use super::style::*;

/// Grace period before a delayed spinner surfaces
const SPINNER_GRACE: Duration = Duration::from_millis(1500);

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars(SPINNER_FRAMES)
        .template("{spinner:.blue} {msg}")
        .expect("Invalid spinner template")
}

// ──────────────────────────────────────────────────────────────
// Immediate spinners
// ──────────────────────────────────────────────────────────────

/// Create a spinner for indeterminate operations.
///
/// Returns `Some(ProgressBar)` in TTY mode, `None` otherwise.
/// When not in TTY, prints a plain step message instead.
pub fn spinner(message: &str) -> Option<ProgressBar> {
    if !std::io::stderr().is_terminal() {
        output::step(message);
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

/// Finish spinner with success message.
pub fn spinner_success(spinner: Option<ProgressBar>, message: &str) {
    match spinner {
        Some(pb) => pb.finish_with_message(format!("{} {}", MARK_SUCCESS.green(), message)),
        None => output::bullet_success(message),
    }
}

// ──────────────────────────────────────────────────────────────
// Delayed spinner
// ──────────────────────────────────────────────────────────────

/// A spinner that surfaces only after a grace period.
///
/// Wraps a hidden `ProgressBar`; a background thread reveals it once the
/// grace period elapses, unless the operation finished first. Fast calls
/// therefore stay completely silent.
pub struct DelayedSpinner {
    pb: ProgressBar,
    done: Arc<Mutex<bool>>,
}

/// Start a delayed spinner for a long-running external call.
pub fn delayed_spinner(message: &str) -> DelayedSpinner {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::hidden());
    pb.set_style(spinner_style());
    pb.set_message(message.to_string());

    let done = Arc::new(Mutex::new(false));

    if std::io::stderr().is_terminal() {
        let pb2 = pb.clone();
        let done2 = Arc::clone(&done);
        thread::spawn(move || {
            thread::sleep(SPINNER_GRACE);
            // Lock excludes a concurrent finish; never surface after done.
            if let Ok(done) = done2.lock() {
                if !*done {
                    pb2.set_draw_target(ProgressDrawTarget::stderr());
                    pb2.enable_steady_tick(Duration::from_millis(80));
                }
            }
        });
    }

    DelayedSpinner { pb, done }
}

impl DelayedSpinner {
    fn stop(&self) {
        if let Ok(mut done) = self.done.lock() {
            *done = true;
        }
        self.pb.finish_and_clear();
    }

    /// Clear the spinner (if it surfaced) and print a success message.
    pub fn finish_success(&self, message: &str) {
        self.stop();
        output::success(message);
    }

    /// Clear the spinner (if it surfaced) and print a warning message.
    pub fn finish_warning(&self, message: &str) {
        self.stop();
        output::warning(message);
    }

    /// Clear the spinner without printing anything.
    pub fn finish_quiet(&self) {
        self.stop();
    }
}

// An early `?` must not leave the background thread free to surface a
// spinner for an operation that already failed.
impl Drop for DelayedSpinner {
    fn drop(&mut self) {
        self.stop();
    }
}
