//! Rule types: `(pattern, action, targets)` (spec §3 "Rule"), plus the
//! lexicon-reference and target-item types a rule's targets are built from.

use std::sync::Arc;

use crate::dynamic::DynItem;

/// A derived lexicon's hashable argument. `Arc<str>` keeps cloning cheap
/// since the same argument value is threaded through every dynamic-item
/// evaluation for that lexicon's rules.
pub type Arg = Arc<str>;

/// A rule's pattern (spec §3: "either a regex string ... or evaluates to
/// `None`").
#[derive(Debug, Clone)]
pub enum PatternSpec {
    /// A literal regex source string.
    Static(String),
    /// Computed once, at lexicon-build time, from the enclosing lexicon's
    /// `ARG` (no match exists yet, so `TEXT`/`MATCH` are unavailable here).
    Dynamic(DynItem),
    /// The rule has no pattern and never participates in matching.
    None,
}

/// A rule's action (spec §3: "opaque value, `SKIP`, or a dynamic action").
#[derive(Debug, Clone)]
pub enum ActionSpec {
    /// No token is emitted; the rule's targets still apply.
    Skip,
    /// A single, statically-known action label.
    Literal(Arc<str>),
    /// Evaluated per match; yields `SKIP`, a single action, or (via
    /// `bygroup`) a list consumed as one action per captured group.
    Dynamic(DynItem),
    /// `bygroup(a1, a2, …)` — one token per non-empty numbered group
    /// `1..=n`, each using the corresponding entry's action.
    ByGroup(Vec<ActionSpec>),
}

/// A reference to a (possibly derived) lexicon from a target or a dynamic
/// item. Resolution against a live `Language` happens in `lex-engine`, which
/// is the only crate that holds a `Language` while lexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexiconRefSpec {
    /// A plain, non-derived lexicon, or a derived one with a fixed `arg`
    /// known at grammar-authoring time.
    Static {
        /// Name of the target lexicon within the same language.
        name: &'static str,
        /// Argument for a derived lexicon; `None` for a plain one.
        arg: Option<Arg>,
    },
}

impl LexiconRefSpec {
    /// Name of the referenced lexicon.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            LexiconRefSpec::Static { name, .. } => name,
        }
    }

    /// Argument the referenced lexicon should be derived with, if any.
    #[must_use]
    pub fn arg(&self) -> Option<&Arg> {
        match self {
            LexiconRefSpec::Static { arg, .. } => arg.as_ref(),
        }
    }
}

/// One element of a rule's target list (spec §3 "targets": "integers and
/// lexicon references").
#[derive(Debug, Clone)]
pub enum TargetItem {
    /// Positive: push the *current* lexicon this many times. Zero: no-op.
    /// Negative: pop `|n|` levels (never popping the root).
    Int(i32),
    /// Push a specific (possibly derived) lexicon.
    Push(LexiconRefSpec),
}

/// A rule's full target list, static or computed from the match.
#[derive(Debug, Clone)]
pub enum Targets {
    /// A fixed list of target items.
    Static(Vec<TargetItem>),
    /// Evaluated once per match; must flatten to a sequence of `int` and/or
    /// lexicon-reference values (spec §4.2 step 2).
    Dynamic(DynItem),
}

impl Targets {
    /// An empty, static target list — the rule doesn't change the stack.
    #[must_use]
    pub fn none() -> Self {
        Targets::Static(Vec::new())
    }
}

/// A single rule, as authored: `(pattern, action, targets)` plus the
/// per-rule `unstable_left` marker the builder's restart-point search
/// consults (spec §4.4 step 2: "further [left] if the immediate left
/// neighbors were produced by a zero-width or lookbehind-sensitive rule").
#[derive(Debug, Clone)]
pub struct RuleSpec {
    /// The rule's pattern.
    pub pattern: PatternSpec,
    /// The rule's action.
    pub action: ActionSpec,
    /// The rule's targets.
    pub targets: Targets,
    /// Whether this rule's matches are unsafe restart points: zero-width or
    /// dependent on lookbehind context that a restart from just past them
    /// could miss. Defaults to `false`.
    pub unstable_left: bool,
}

impl RuleSpec {
    /// Creates a rule with `unstable_left` defaulted to `false`.
    #[must_use]
    pub fn new(pattern: PatternSpec, action: ActionSpec, targets: Targets) -> Self {
        Self { pattern, action, targets, unstable_left: false }
    }

    /// Marks this rule as an unstable left-context (zero-width or
    /// lookbehind-sensitive) for the builder's restart-point search.
    #[must_use]
    pub fn unstable_left(mut self) -> Self {
        self.unstable_left = true;
        self
    }
}
