//! Folds a lexer's event stream into a tree, and re-lexes only what an edit
//! invalidated (spec §4.4).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod builder;
mod config;
mod error;
mod event;

pub use builder::{Builder, RebuildResult};
pub use config::Config;
pub use error::BuildError;
pub use event::{BuildEvent, BuildStats, NodePath};
