//! In-memory forge for tests.
//!
//! Stores PRs in a mutex-guarded map and answers the `Forge` trait without
//! spawning any subprocess. Numbers are assigned by the caller so tests can
//! assert against stable identities.

use std::collections::HashMap;
use std::sync::Mutex;

use super::types::{CheckState, CheckSummary, PrDetails, PrState, PrSummary, RepoSlug};
use super::{Forge, ForgeError};

#[derive(Default)]
struct MockState {
    /// head branch -> PR record
    prs: HashMap<String, PrDetails>,
    /// head branch -> check summary
    checks: HashMap<String, CheckSummary>,
    /// counts of body/base edits for assertions
    body_edits: usize,
    base_edits: usize,
    /// simulate auth failure on every call
    auth_failure: bool,
}

pub struct MockForge {
    slug: RepoSlug,
    state: Mutex<MockState>,
}

impl MockForge {
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            slug: RepoSlug {
                owner: owner.to_string(),
                repo: repo.to_string(),
            },
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn add_pr(&self, branch: &str, number: u64, state: PrState) {
        let merged_at = if state == PrState::Merged {
            "2026-01-01T00:00:00Z".to_string()
        } else {
            String::new()
        };
        let pr = PrDetails {
            number,
            url: format!("https://github.com/{}/pull/{}", self.slug, number),
            title: format!("PR for {}", branch),
            body: String::new(),
            state,
            base_ref: "main".to_string(),
            head_ref: branch.to_string(),
            merged_at,
            mergeable: "MERGEABLE".to_string(),
            is_draft: false,
            review_decision: String::new(),
        };
        self.state.lock().unwrap().prs.insert(branch.to_string(), pr);
    }

    pub fn set_body(&self, branch: &str, body: &str) {
        if let Some(pr) = self.state.lock().unwrap().prs.get_mut(branch) {
            pr.body = body.to_string();
        }
    }

    pub fn set_checks(&self, branch: &str, checks: CheckSummary) {
        self.state.lock().unwrap().checks.insert(branch.to_string(), checks);
    }

    pub fn fail_auth(&self) {
        self.state.lock().unwrap().auth_failure = true;
    }

    pub fn body_of(&self, branch: &str) -> Option<String> {
        self.state.lock().unwrap().prs.get(branch).map(|pr| pr.body.clone())
    }

    pub fn base_of(&self, branch: &str) -> Option<String> {
        self.state.lock().unwrap().prs.get(branch).map(|pr| pr.base_ref.clone())
    }

    pub fn body_edit_count(&self) -> usize {
        self.state.lock().unwrap().body_edits
    }

    pub fn base_edit_count(&self) -> usize {
        self.state.lock().unwrap().base_edits
    }

    fn check_auth(&self) -> Result<(), ForgeError> {
        if self.state.lock().unwrap().auth_failure {
            return Err(ForgeError::AuthRequired);
        }
        Ok(())
    }
}

impl Forge for MockForge {
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
        self.check_auth()?;
        let mut state = self.state.lock().unwrap();
        let number = state.prs.values().map(|pr| pr.number).max().unwrap_or(0) + 1;
        let pr = PrDetails {
            number,
            url: format!("https://github.com/{}/pull/{}", self.slug, number),
            title: title.to_string(),
            body: body.to_string(),
            state: PrState::Open,
            base_ref: base.to_string(),
            head_ref: head.to_string(),
            merged_at: String::new(),
            mergeable: "MERGEABLE".to_string(),
            is_draft: draft,
            review_decision: String::new(),
        };
        state.prs.insert(head.to_string(), pr.clone());
        Ok(pr)
    }

    fn pr_by_number(&self, number: u64) -> Result<PrDetails, ForgeError> {
        self.check_auth()?;
        self.state
            .lock()
            .unwrap()
            .prs
            .values()
            .find(|pr| pr.number == number)
            .cloned()
            .ok_or_else(|| ForgeError::Failed(format!("no PR #{}", number)))
    }

    fn pr_for_branch(&self, branch: &str) -> Result<Option<PrDetails>, ForgeError> {
        self.check_auth()?;
        Ok(self.state.lock().unwrap().prs.get(branch).cloned())
    }

    fn list_open_prs(&self) -> Result<Vec<PrSummary>, ForgeError> {
        self.check_auth()?;
        let state = self.state.lock().unwrap();
        let mut prs: Vec<PrSummary> = state
            .prs
            .values()
            .filter(|pr| pr.state == PrState::Open)
            .map(|pr| PrSummary {
                number: pr.number,
                title: pr.title.clone(),
                head_ref: pr.head_ref.clone(),
                url: pr.url.clone(),
                author: "mock-user".to_string(),
            })
            .collect();
        prs.sort_by_key(|pr| pr.number);
        Ok(prs)
    }

    fn edit_pr_body(&self, number: u64, body: &str) -> Result<(), ForgeError> {
        self.check_auth()?;
        let mut state = self.state.lock().unwrap();
        state.body_edits += 1;
        match state.prs.values_mut().find(|pr| pr.number == number) {
            Some(pr) => {
                pr.body = body.to_string();
                Ok(())
            }
            None => Err(ForgeError::Failed(format!("no PR #{}", number))),
        }
    }

    fn edit_pr_base(&self, number: u64, base: &str) -> Result<(), ForgeError> {
        self.check_auth()?;
        let mut state = self.state.lock().unwrap();
        state.base_edits += 1;
        match state.prs.values_mut().find(|pr| pr.number == number) {
            Some(pr) => {
                pr.base_ref = base.to_string();
                Ok(())
            }
            None => Err(ForgeError::Failed(format!("no PR #{}", number))),
        }
    }

    fn checks_for_branch(&self, branch: &str) -> Result<CheckSummary, ForgeError> {
        self.check_auth()?;
        let state = self.state.lock().unwrap();
        if let Some(checks) = state.checks.get(branch) {
            return Ok(checks.clone());
        }
        if state.prs.contains_key(branch) {
            return Ok(CheckSummary {
                state: CheckState::None,
                summary: "no checks".to_string(),
                ..Default::default()
            });
        }
        Err(ForgeError::Failed(format!("no PR for branch {}", branch)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_create_and_lookup() {
        let forge = MockForge::new("acme", "widgets");
        let pr = forge.create_pr("Title", "Body", "feature", "main", false).unwrap();
        assert_eq!(pr.number, 1);

        let found = forge.pr_for_branch("feature").unwrap().unwrap();
        assert_eq!(found.number, 1);
        assert_eq!(forge.pr_by_number(1).unwrap().head_ref, "feature");
    }

    #[test]
    fn test_mock_edits() {
        let forge = MockForge::new("acme", "widgets");
        forge.add_pr("feature", 5, PrState::Open);

        forge.edit_pr_body(5, "new body").unwrap();
        forge.edit_pr_base(5, "develop").unwrap();

        assert_eq!(forge.body_of("feature").unwrap(), "new body");
        assert_eq!(forge.base_of("feature").unwrap(), "develop");
        assert_eq!(forge.body_edit_count(), 1);
        assert_eq!(forge.base_edit_count(), 1);
    }

    #[test]
    fn test_mock_seeded_checks_returned() {
        let forge = MockForge::new("acme", "widgets");
        forge.add_pr("feature", 1, PrState::Open);
        forge.set_checks(
            "feature",
            CheckSummary {
                state: CheckState::Failure,
                passed: 1,
                failed: 2,
                pending: 0,
                total: 3,
                summary: "2/3 failed".to_string(),
            },
        );

        let checks = forge.checks_for_branch("feature").unwrap();
        assert_eq!(checks.state, CheckState::Failure);
        assert_eq!(checks.summary, "2/3 failed");
    }

    #[test]
    fn test_mock_auth_failure() {
        let forge = MockForge::new("acme", "widgets");
        forge.fail_auth();
        assert!(matches!(
            forge.pr_for_branch("x"),
            Err(ForgeError::AuthRequired)
        ));
    }

    #[test]
    fn test_mock_numbers_increment() {
        let forge = MockForge::new("acme", "widgets");
        forge.add_pr("a", 3, PrState::Open);
        let pr = forge.create_pr("t", "b", "b-branch", "main", false).unwrap();
        assert_eq!(pr.number, 4);
    }
}
