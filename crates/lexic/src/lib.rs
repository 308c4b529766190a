//! Incremental, context-sensitive lexing engine.
//!
//! This crate re-exports the whole engine stack: author a grammar with the
//! types in the "grammar authoring" section below, build a tree with
//! [`Builder`], and run it incrementally off the caller's thread with
//! [`Worker`]. See each re-exported item's own crate
//! (`lex-grammar`/`lex-tree`/`lex-builder`/`lex-worker`/...) for the full
//! design rationale; this crate adds no behavior of its own.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Spans and edits.
pub use lex_span::{Edit, LineIndex, Span};

// Grammar authoring surface (spec §6 "Grammar authoring surface").
pub use lex_grammar::{
    chars, words, ActionSpec, Arg, DynFn, DynItem, EvalCtx, GrammarError, Language, Lexicon,
    LexiconEntry, LexiconRefSpec, LexiconSpec, PatternSpec, ReFlags, RuleSpec, TargetItem, Targets,
    Value,
};
pub use lex_tree::{ancestors_of, token_at, Context, ContextRef, GroupIndex, LexiconId, Node, Token};

// Lexer (stack machine over a grammar).
//
// `lex_engine::GroupIndex` is the same underlying alias (`i32`) as
// `lex_tree::GroupIndex` above and describes the same "position within a
// bygroup group" concept, so only one is re-exported here to avoid two
// identical-but-distinct types at this facade's surface.
pub use lex_engine::{ActionId, Event, LexError, Lexeme, Lexer, Target};

// Tree builder: one-shot and incremental.
pub use lex_builder::{
    BuildError, BuildEvent, BuildStats, Builder, Config as BuilderConfig, NodePath, RebuildResult,
};

// Background worker.
pub use lex_worker::{RootHandle, Worker, WorkerError, WorkerStatus};

// Transformer hook / cache (spec §4.6).
pub use lex_transform::{recompute_missing, Transformer, TransformCache, TransformedOrRaw};
