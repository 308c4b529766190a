//! Health and snapshot types exposed alongside the event stream.

use std::sync::Arc;

use lex_tree::Context;

/// A snapshot of the worker's published tree.
#[derive(Debug, Clone)]
pub struct RootHandle {
    /// The tree as of `generation`.
    pub root: Arc<Context>,
    /// Monotonically increasing count of rebuilds that have completed
    /// (successfully or as a logged-and-skipped no-op), including this one.
    pub generation: u64,
}

/// The worker's current activity, for health/diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// No rebuild in flight; the published tree reflects every submission
    /// received so far.
    Idle,
    /// A rebuild is currently running on the background task.
    Rebuilding,
}
