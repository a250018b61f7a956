//! Execution context for the ezstack CLI.
//!
//! Provides task-local storage for the global --verbose flag. Uses
//! tokio::task_local so the flag survives async task migrations without
//! being threaded through every function signature.

use std::cell::RefCell;
use std::future::Future;

// Thread-local fallback for synchronous code paths
thread_local! {
    static SYNC_CONTEXT: RefCell<ExecutionContext> = RefCell::new(ExecutionContext::default());
}

// Task-local for async code paths (preserved across .await points)
tokio::task_local! {
    static ASYNC_CONTEXT: ExecutionContext;
}

/// Global execution context for the current CLI invocation
#[derive(Clone, Copy, Default)]
pub struct ExecutionContext {
    /// Echo git/forge commands being executed
    pub verbose: bool,
}

impl ExecutionContext {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Initialize the thread-local context (for synchronous code paths)
    pub fn init(verbose: bool) {
        SYNC_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = ExecutionContext { verbose };
        });
    }

    /// Check if verbose mode is enabled
    ///
    /// Checks task-local context first (for async code), falls back to thread-local.
    pub fn is_verbose() -> bool {
        if let Ok(verbose) = ASYNC_CONTEXT.try_with(|ctx| ctx.verbose) {
            return verbose;
        }
        SYNC_CONTEXT.with(|ctx| ctx.borrow().verbose)
    }
}

/// Run an async function with the given execution context.
///
/// The context is propagated across .await points and thread migrations.
pub async fn with_context<F, T>(ctx: ExecutionContext, f: F) -> T
where
    F: Future<Output = T>,
{
    ASYNC_CONTEXT.scope(ctx, f).await
}
