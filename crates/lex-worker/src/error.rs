//! Errors a `Worker` can report.

use thiserror::Error;

/// Failures from driving a `Worker`.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// `update` was called after `shutdown`.
    #[error("the worker has already shut down")]
    Closed,
    /// The background task panicked instead of returning.
    #[error("the worker's background task panicked")]
    TaskPanicked,
}
