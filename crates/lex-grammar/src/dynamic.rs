//! The dynamic rule-item language: `TEXT`, `MATCH`, `MATCH[n]`, `ARG`,
//! `call`, `select`, and literals, plus the convenience builders authors use
//! instead of hand-assembling the tagged union (spec §3 "dynamic rule
//! items", §9 "model as a small tagged-union AST").

use std::sync::Arc;

use crate::error::GrammarError;
use crate::rule::{Arg, LexiconRefSpec};

/// Result of evaluating a [`DynItem`]. The same value type backs patterns,
/// actions, and targets; which shapes are acceptable depends on where the
/// item appeared (enforced by the caller, not by this type).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A string — e.g. the matched text, a group, or a literal.
    Str(Arc<str>),
    /// An integer — e.g. a target push/pop count.
    Int(i32),
    /// An opaque action label.
    Action(Arc<str>),
    /// A reference to another lexicon, as a push target.
    Lexicon(LexiconRefSpec),
    /// `SKIP` — emit no token.
    Skip,
    /// `None` — e.g. a pattern that should be omitted from the alternation.
    None,
    /// A flattened list of values (targets are a sequence; `bygroup` is a
    /// sequence of per-group actions).
    List(Vec<Value>),
}

impl Value {
    /// Convenience constructor for a string value.
    #[must_use]
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }
}

/// A function usable with `call(fn, *args)`. Must be pure and total: no
/// panics, no side effects — the evaluator assumes it can be called
/// repeatedly with the same arguments and get the same result.
pub type DynFn = fn(&[Value]) -> Value;

/// The dynamic rule-item tagged union (spec §9).
#[derive(Clone)]
pub enum DynItem {
    /// `TEXT` — the full matched text. Only meaningful at match time.
    Text,
    /// `MATCH` — the full match, same as `TEXT` when used as a value.
    Match,
    /// `MATCH[n]` — the rule's own `n`-th capture group. `0` is the whole
    /// match. Only meaningful at match time.
    MatchIndex(usize),
    /// `ARG` — the enclosing lexicon's argument, if any.
    Arg,
    /// `call(fn, *args)` — apply a function to evaluated arguments.
    Call(DynFn, Vec<DynItem>),
    /// `select(index, *items)` — evaluate `index`, then return the
    /// evaluated item at that position.
    Select(Box<DynItem>, Vec<DynItem>),
    /// A literal value, not further evaluated.
    Literal(Value),
}

impl std::fmt::Debug for DynItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DynItem::Text => write!(f, "Text"),
            DynItem::Match => write!(f, "Match"),
            DynItem::MatchIndex(n) => write!(f, "MatchIndex({n})"),
            DynItem::Arg => write!(f, "Arg"),
            DynItem::Call(_, args) => write!(f, "Call(<fn>, {args:?})"),
            DynItem::Select(index, items) => write!(f, "Select({index:?}, {items:?})"),
            DynItem::Literal(v) => write!(f, "Literal({v:?})"),
        }
    }
}

/// What's available while evaluating a [`DynItem`].
///
/// A lexicon's *pattern* is built once, when the lexicon is compiled —
/// before any rule has fired — so only `ARG` is defined. A rule's *action*
/// and *targets* are evaluated once per match, with the full match
/// available.
pub enum EvalCtx<'a> {
    /// Building a lexicon's pattern: only `ARG` is defined.
    Build {
        /// The lexicon's own argument, if it is a derived lexicon.
        arg: Option<&'a Arg>,
    },
    /// A rule just fired: the full match is available.
    Match {
        /// The full matched text (`TEXT`/`MATCH`/`MATCH[0]`).
        whole: &'a str,
        /// Looks up the rule's own `n`-th capture group (`n >= 1`) by
        /// re-running the rule's pattern against `whole`. Returns `None` if
        /// the group didn't participate in the match.
        group: &'a dyn Fn(usize) -> Option<&'a str>,
        /// The lexicon's own argument, if any.
        arg: Option<&'a Arg>,
    },
}

impl DynItem {
    /// Evaluates this item bottom-up against `ctx` (spec §4.2 step 1:
    /// "substitute placeholders; reduce `call`/`select` bottom-up").
    ///
    /// # Errors
    ///
    /// Returns an error if `TEXT`/`MATCH`/`MATCH[n]` is used in
    /// [`EvalCtx::Build`], where no match exists yet.
    pub fn eval(&self, ctx: &EvalCtx<'_>) -> Result<Value, GrammarError> {
        match self {
            DynItem::Text | DynItem::Match => match ctx {
                EvalCtx::Match { whole, .. } => Ok(Value::str(*whole)),
                EvalCtx::Build { .. } => Err(build_ctx_error()),
            },
            DynItem::MatchIndex(0) => match ctx {
                EvalCtx::Match { whole, .. } => Ok(Value::str(*whole)),
                EvalCtx::Build { .. } => Err(build_ctx_error()),
            },
            DynItem::MatchIndex(n) => match ctx {
                EvalCtx::Match { group, .. } => {
                    Ok(group(*n).map_or(Value::None, Value::str))
                }
                EvalCtx::Build { .. } => Err(build_ctx_error()),
            },
            DynItem::Arg => {
                let arg = match ctx {
                    EvalCtx::Build { arg } | EvalCtx::Match { arg, .. } => arg,
                };
                Ok(arg.map_or(Value::None, |a| Value::Str(a.clone())))
            }
            DynItem::Literal(v) => Ok(v.clone()),
            DynItem::Call(f, args) => {
                let evaluated =
                    args.iter().map(|a| a.eval(ctx)).collect::<Result<Vec<_>, _>>()?;
                Ok(f(&evaluated))
            }
            DynItem::Select(index, items) => {
                let index_value = index.eval(ctx)?;
                let Value::Int(i) = index_value else {
                    return Ok(Value::None);
                };
                match usize::try_from(i).ok().and_then(|i| items.get(i)) {
                    Some(item) => item.eval(ctx),
                    None => Ok(Value::None),
                }
            }
        }
    }
}

/// Build-time placeholder error: this is raised internally then converted by
/// the caller (which knows the lexicon/rule index for a good error message).
/// Carrying no context here keeps `DynItem::eval` independent of grammar
/// bookkeeping.
fn build_ctx_error() -> GrammarError {
    GrammarError::MatchContextUnavailable { lexicon: String::new(), rule_index: 0 }
}

/// Convenience builder: a pattern that matches any of the given literal
/// words, as a `\b`-delimited alternation of escaped strings.
#[must_use]
pub fn words(words: &[&str]) -> String {
    let mut alts: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    alts.sort_by(|a, b| b.len().cmp(&a.len()));
    format!(r"\b(?:{})\b", alts.join("|"))
}

/// Convenience builder: a pattern matching one character from the given
/// character-class body (the part that goes inside `[...]`).
#[must_use]
pub fn chars(class_body: &str) -> String {
    format!("[{class_body}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(args: &[Value]) -> Value {
        match args {
            [Value::Int(n)] => Value::Int(n * 2),
            _ => Value::None,
        }
    }

    #[test]
    fn text_and_match_index_zero_are_the_whole_match() {
        let ctx = EvalCtx::Match { whole: "123abc", group: &|_| None, arg: None };
        assert_eq!(DynItem::Text.eval(&ctx).unwrap(), Value::str("123abc"));
        assert_eq!(DynItem::MatchIndex(0).eval(&ctx).unwrap(), Value::str("123abc"));
    }

    #[test]
    fn match_in_build_context_is_an_error() {
        let ctx = EvalCtx::Build { arg: None };
        assert!(DynItem::Text.eval(&ctx).is_err());
        assert!(DynItem::MatchIndex(1).eval(&ctx).is_err());
    }

    #[test]
    fn arg_is_available_in_both_contexts() {
        let arg: Arg = Arc::from("mark");
        let build = EvalCtx::Build { arg: Some(&arg) };
        assert_eq!(DynItem::Arg.eval(&build).unwrap(), Value::str("mark"));
        let matched = EvalCtx::Match { whole: "x", group: &|_| None, arg: Some(&arg) };
        assert_eq!(DynItem::Arg.eval(&matched).unwrap(), Value::str("mark"));
    }

    #[test]
    fn call_reduces_arguments_bottom_up() {
        let item = DynItem::Call(double, vec![DynItem::Literal(Value::Int(21))]);
        let ctx = EvalCtx::Build { arg: None };
        assert_eq!(item.eval(&ctx).unwrap(), Value::Int(42));
    }

    #[test]
    fn select_picks_the_evaluated_item_at_index() {
        let item = DynItem::Select(
            Box::new(DynItem::Literal(Value::Int(1))),
            vec![Value::Int(10), Value::Int(20), Value::Int(30)]
                .into_iter()
                .map(DynItem::Literal)
                .collect(),
        );
        let ctx = EvalCtx::Build { arg: None };
        assert_eq!(item.eval(&ctx).unwrap(), Value::Int(20));
    }

    #[test]
    fn match_index_looks_up_named_group() {
        let ctx = EvalCtx::Match {
            whole: "key=value",
            group: &|n| if n == 1 { Some("value") } else { None },
            arg: None,
        };
        assert_eq!(DynItem::MatchIndex(1).eval(&ctx).unwrap(), Value::str("value"));
        assert_eq!(DynItem::MatchIndex(2).eval(&ctx).unwrap(), Value::None);
    }

    #[test]
    fn words_builds_boundary_delimited_alternation_longest_first() {
        let pat = words(&["if", "ifdef"]);
        assert!(pat.starts_with(r"\b(?:ifdef|if)\b"));
    }
}
