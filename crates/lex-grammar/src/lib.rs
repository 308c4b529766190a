//! Grammar model: languages, lexicons, rules, and the dynamic rule-item
//! evaluator. `lex-grammar` owns everything a grammar *author* touches; it
//! has no notion of an active lex — that's `lex-engine`, which consults
//! these types to drive a `Lexer`.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod dynamic;
mod error;
mod language;
mod lexicon;
mod rule;
pub mod validate;

pub use dynamic::{chars, words, DynFn, DynItem, EvalCtx, Value};
pub use error::GrammarError;
pub use language::{Language, LexiconEntry};
pub use lexicon::{Lexicon, LexiconSpec, ReFlags};
pub use rule::{ActionSpec, Arg, LexiconRefSpec, PatternSpec, RuleSpec, TargetItem, Targets};
