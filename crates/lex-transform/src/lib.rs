//! A cached bottom-up transform of a context tree, invalidated by node
//! identity rather than by content (spec §4.6).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod cache;
mod transformer;

pub use cache::TransformCache;
pub use transformer::{recompute_missing, Transformer, TransformedOrRaw};
