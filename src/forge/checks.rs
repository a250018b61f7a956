//! Parser for `pr checks` human output.
//!
//! The CLI prints either a one-line summary
//! ("1 cancelled, 0 failing, 3 successful, 1 skipped, and 2 pending checks")
//! or a table with one check per line whose status column is one of
//! `pass | fail | pending | running`. Both localisation-free forms are
//! parsed; anything else aggregates to Unknown.

use regex::Regex;
use std::sync::OnceLock;

use super::types::{CheckState, CheckSummary};

fn summary_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(\d+) cancelled, (\d+) failing, (\d+) successful, (\d+) skipped, and (\d+) pending checks",
        )
        .expect("Invalid checks summary regex")
    })
}

/// Parse `pr checks` output into an aggregate summary.
pub fn parse_checks(output: &str) -> CheckSummary {
    if output.trim().is_empty() {
        return CheckSummary {
            state: CheckState::None,
            summary: "no checks".to_string(),
            ..Default::default()
        };
    }

    if let Some(caps) = summary_line_re().captures(output) {
        let num = |i: usize| caps[i].parse::<usize>().unwrap_or(0);
        let cancelled = num(1);
        let failed = num(2) + cancelled;
        let passed = num(3);
        let skipped = num(4);
        let pending = num(5);
        return aggregate(passed, failed, pending, passed + failed + pending + skipped);
    }

    // Token counting over the per-check table
    let mut passed = 0;
    let mut failed = 0;
    let mut pending = 0;
    let mut lines = 0;
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        lines += 1;
        for token in line.split(['\t', ',', ' ']) {
            match token {
                "pass" => {
                    passed += 1;
                    break;
                }
                "fail" => {
                    failed += 1;
                    break;
                }
                "pending" | "running" => {
                    pending += 1;
                    break;
                }
                _ => {}
            }
        }
    }

    if passed + failed + pending == 0 && lines > 0 {
        return CheckSummary {
            state: CheckState::Unknown,
            summary: "unknown check status".to_string(),
            ..Default::default()
        };
    }

    aggregate(passed, failed, pending, passed + failed + pending)
}

fn aggregate(passed: usize, failed: usize, pending: usize, total: usize) -> CheckSummary {
    let (state, summary) = if total == 0 {
        (CheckState::None, "no checks".to_string())
    } else if failed > 0 {
        (CheckState::Failure, format!("{}/{} failed", failed, total))
    } else if pending > 0 {
        (CheckState::Pending, format!("{}/{} pending", pending, total))
    } else {
        (CheckState::Success, format!("{}/{} passed", passed, total))
    };

    CheckSummary {
        state,
        passed,
        failed,
        pending,
        total,
        summary,
    }
}
