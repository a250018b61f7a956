//! GitHub CLI (`gh`) forge implementation.

use colored::Colorize;
use std::process::{Command, Output};

use super::checks::parse_checks;
use super::types::{CheckSummary, PrDetails, PrState, PrSummary, RepoSlug};
use super::{Forge, ForgeError};
use crate::context::ExecutionContext;

/// JSON fields requested from `gh pr view`
const PR_VIEW_FIELDS: &str =
    "number,url,title,body,state,baseRefName,headRefName,mergedAt,mergeable,isDraft,reviewDecision";

/// JSON fields requested from `gh pr list`
const PR_LIST_FIELDS: &str = "number,title,headRefName,url,author";

pub struct GhForge {
    slug: RepoSlug,
    /// Token forwarded as GH_TOKEN when configured
    token: Option<String>,
}

impl GhForge {
    pub fn new(slug: RepoSlug, token: Option<String>) -> Self {
        Self { slug, token }
    }

    /// Run `gh <args> -R owner/repo`.
    fn run_gh(&self, args: &[&str]) -> Result<Output, ForgeError> {
        if ExecutionContext::is_verbose() {
            eprintln!("  {} gh {} -R {}", "[cmd]".dimmed(), args.join(" "), self.slug);
        }

        let mut cmd = Command::new("gh");
        cmd.args(args).arg("-R").arg(self.slug.to_string());
        if let Some(ref token) = self.token {
            cmd.env("GH_TOKEN", token);
        }

        cmd.output()
            .map_err(|e| ForgeError::Failed(format!("Failed to run 'gh {}'. Is gh installed? ({})", args.join(" "), e)))
    }

    /// Run and require success, classifying stderr on failure.
    fn run_gh_ok(&self, args: &[&str]) -> Result<Output, ForgeError> {
        let output = self.run_gh(args)?;
        if output.status.success() {
            return Ok(output);
        }
        Err(self.error_from(args, &output))
    }

    fn error_from(&self, args: &[&str], output: &Output) -> ForgeError {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if let Some(err) = ForgeError::classify(&stderr, &self.slug) {
            return err;
        }
        ForgeError::Failed(format!("gh {} failed: {}", args.join(" "), stderr.trim()))
    }

    fn parse_pr_details(&self, stdout: &[u8]) -> Result<PrDetails, ForgeError> {
        let json: serde_json::Value = serde_json::from_slice(stdout)
            .map_err(|e| ForgeError::Failed(format!("Failed to parse gh pr view output: {}", e)))?;
        Ok(pr_details_from_json(&json))
    }

    fn view_pr(&self, pr_ref: &str) -> Result<PrDetails, ForgeError> {
        let output = self.run_gh_ok(&["pr", "view", pr_ref, "--json", PR_VIEW_FIELDS])?;
        self.parse_pr_details(&output.stdout)
    }
}

fn pr_details_from_json(json: &serde_json::Value) -> PrDetails {
    PrDetails {
        number: json["number"].as_u64().unwrap_or(0),
        url: json["url"].as_str().unwrap_or("").to_string(),
        title: json["title"].as_str().unwrap_or("").to_string(),
        body: json["body"].as_str().unwrap_or("").to_string(),
        state: PrState::parse(json["state"].as_str().unwrap_or("OPEN")),
        base_ref: json["baseRefName"].as_str().unwrap_or("").to_string(),
        head_ref: json["headRefName"].as_str().unwrap_or("").to_string(),
        merged_at: json["mergedAt"].as_str().unwrap_or("").to_string(),
        mergeable: json["mergeable"].as_str().unwrap_or("").to_string(),
        is_draft: json["isDraft"].as_bool().unwrap_or(false),
        review_decision: json["reviewDecision"].as_str().unwrap_or("").to_string(),
    }
}

impl Forge for GhForge {
    fn slug(&self) -> &RepoSlug {
        &self.slug
    }

    fn create_pr(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
        draft: bool,
    ) -> Result<PrDetails, ForgeError> {
        let mut args = vec![
            "pr", "create", "--head", head, "--base", base, "--title", title, "--body", body,
        ];
        if draft {
            args.push("--draft");
        }

        self.run_gh_ok(&args)?;
        // gh prints only the URL; re-view for the full record
        self.view_pr(head)
    }

    fn pr_by_number(&self, number: u64) -> Result<PrDetails, ForgeError> {
        self.view_pr(&number.to_string())
    }

    fn pr_for_branch(&self, branch: &str) -> Result<Option<PrDetails>, ForgeError> {
        let args = ["pr", "view", branch, "--json", PR_VIEW_FIELDS];
        let output = self.run_gh(&args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // No PR for this branch is an answer, not an error
            if stderr.contains("no pull requests found") || stderr.contains("no open pull requests") {
                return Ok(None);
            }
            return Err(self.error_from(&args, &output));
        }

        Ok(Some(self.parse_pr_details(&output.stdout)?))
    }

    fn list_open_prs(&self) -> Result<Vec<PrSummary>, ForgeError> {
        let output = self.run_gh_ok(&["pr", "list", "--state", "open", "--json", PR_LIST_FIELDS])?;

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ForgeError::Failed(format!("Failed to parse gh pr list output: {}", e)))?;

        let mut prs = Vec::new();
        if let Some(arr) = json.as_array() {
            for pr in arr {
                prs.push(PrSummary {
                    number: pr["number"].as_u64().unwrap_or(0),
                    title: pr["title"].as_str().unwrap_or("").to_string(),
                    head_ref: pr["headRefName"].as_str().unwrap_or("").to_string(),
                    url: pr["url"].as_str().unwrap_or("").to_string(),
                    author: pr["author"]["login"].as_str().unwrap_or("").to_string(),
                });
            }
        }
        Ok(prs)
    }

    fn edit_pr_body(&self, number: u64, body: &str) -> Result<(), ForgeError> {
        self.run_gh_ok(&["pr", "edit", &number.to_string(), "--body", body])?;
        Ok(())
    }

    fn edit_pr_base(&self, number: u64, base: &str) -> Result<(), ForgeError> {
        self.run_gh_ok(&["pr", "edit", &number.to_string(), "--base", base])?;
        Ok(())
    }

    fn checks_for_branch(&self, branch: &str) -> Result<CheckSummary, ForgeError> {
        let args = ["pr", "checks", branch];
        let output = self.run_gh(&args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        // Exit code 1 with output means failing checks, which is still data
        if !output.status.success() && stdout.trim().is_empty() {
            return Err(self.error_from(&args, &output));
        }

        Ok(parse_checks(&stdout))
    }
}
