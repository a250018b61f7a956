//! Bounded-parallel PR status fetching.
//!
//! Fetching status for N branches fans out over a small worker pool: at
//! most [`MAX_CONCURRENT_FORGE_CALLS`] CLI invocations run at once. Each
//! branch launches its two sub-queries (PR details and checks) in parallel
//! and joins them locally. The shared status map is behind a single mutex;
//! callers persist cache updates only after all workers have joined.

use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::types::{CheckSummary, PrDetails};
use super::{Forge, ForgeError};

/// Upper bound on concurrent forge CLI calls.
pub const MAX_CONCURRENT_FORGE_CALLS: usize = 10;

/// Joined PR + checks result for one branch.
#[derive(Debug, Default)]
pub struct BranchPrStatus {
    pub branch: String,
    pub pr: Option<PrDetails>,
    pub checks: Option<CheckSummary>,
    /// First classified error, if either sub-query failed
    pub error: Option<ForgeError>,
}

/// Fetch PR details and check status for every branch.
///
/// Results come back in input order. Individual failures are recorded per
/// branch rather than failing the whole batch.
pub async fn fetch_statuses(forge: Arc<dyn Forge>, branches: Vec<String>) -> Vec<BranchPrStatus> {
    let statuses: Arc<Mutex<HashMap<String, BranchPrStatus>>> = Arc::new(Mutex::new(HashMap::new()));

    // Two sub-queries per branch share the call budget
    let per_branch = (MAX_CONCURRENT_FORGE_CALLS / 2).max(1);

    futures::stream::iter(branches.iter().cloned())
        .for_each_concurrent(per_branch, |branch| {
            let forge = Arc::clone(&forge);
            let statuses = Arc::clone(&statuses);
            async move {
                let pr_task = {
                    let forge = Arc::clone(&forge);
                    let branch = branch.clone();
                    tokio::task::spawn_blocking(move || forge.pr_for_branch(&branch))
                };
                let checks_task = {
                    let forge = Arc::clone(&forge);
                    let branch = branch.clone();
                    tokio::task::spawn_blocking(move || forge.checks_for_branch(&branch))
                };

                let (pr_res, checks_res) = tokio::join!(pr_task, checks_task);

                let mut status = BranchPrStatus {
                    branch: branch.clone(),
                    ..Default::default()
                };

                match pr_res {
                    Ok(Ok(pr)) => status.pr = pr,
                    Ok(Err(e)) => status.error = Some(e),
                    Err(join) => status.error = Some(ForgeError::Failed(join.to_string())),
                }
                match checks_res {
                    Ok(Ok(checks)) => status.checks = Some(checks),
                    // A branch without a PR has no checks; keep the first error
                    Ok(Err(e)) => {
                        if status.error.is_none() && status.pr.is_some() {
                            status.error = Some(e);
                        }
                    }
                    Err(join) => {
                        if status.error.is_none() {
                            status.error = Some(ForgeError::Failed(join.to_string()));
                        }
                    }
                }

                if let Ok(mut map) = statuses.lock() {
                    map.insert(branch, status);
                }
            }
        })
        .await;

    let mut map = match statuses.lock() {
        Ok(mut guard) => std::mem::take(&mut *guard),
        Err(_) => HashMap::new(),
    };
    branches
        .iter()
        .map(|b| {
            map.remove(b).unwrap_or_else(|| BranchPrStatus {
                branch: b.clone(),
                ..Default::default()
            })
        })
        .collect()
}
