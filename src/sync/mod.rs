//! Synchronization engine: planning (what each branch needs) and
//! execution (topological rebase pass with callbacks).

pub mod executor;
pub mod planner;

pub use executor::{execute, BranchSyncResult, RebaseRequest, SyncCallbacks, SyncSummary};
pub use planner::{
    base_target, classify_branch, detect_sync_needed, detect_sync_needed_all_stacks,
    detect_sync_needed_for_branch, plan_order_all, PlanEntry, SyncAction, SyncNeed,
};
