//! Runs a [`lex-builder`] `Builder` on a background task, coalescing edits
//! and publishing each rebuild for readers to observe (spec §4.5).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod error;
mod status;
mod worker;

pub use error::WorkerError;
pub use lex_builder::BuildEvent;
pub use status::{RootHandle, WorkerStatus};
pub use worker::Worker;
