//! Errors a rebuild can report.

use thiserror::Error;

/// Failures from building or rebuilding a tree.
///
/// A well-formed previous tree should never actually trigger these; they
/// exist so a caller handing `rebuild` a tree it didn't get from this crate
/// (or one desynced from the text it's paired with) gets a diagnosable error
/// instead of a panic.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The restart point's path didn't resolve against the previous tree.
    #[error("restart path {path:?} does not resolve against the previous tree")]
    Inconsistent {
        /// The path that failed to resolve.
        path: Vec<usize>,
    },
    /// The caller's cancellation signal was observed between events before
    /// the replay reconverged.
    #[error("rebuild cancelled before reconvergence")]
    Cancelled,
}
