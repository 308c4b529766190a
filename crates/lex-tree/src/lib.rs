//! The token/context tree: the shape of a completed lex, plus the minimum
//! positional queries needed to state and test the spec's tree invariants.
//! Construction and incremental re-splicing live in `lex-builder`.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod node;
mod query;

pub use node::{Context, ContextRef, GroupIndex, LexiconId, Node, Token};
pub use query::{ancestors_of, token_at};
