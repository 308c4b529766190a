use std::sync::Arc;

use lex_grammar::Lexicon;
use lex_span::Span;

/// An opaque action label attached to a lexeme (spec glossary "Action").
pub type ActionId = Arc<str>;

/// Position of a lexeme within a `bygroup` group, mirroring
/// `lex_tree::GroupIndex`: positive is a 1-based position, the last
/// member's position is negated. `None` outside of a `bygroup` action.
pub type GroupIndex = i32;

/// One lexeme: its span, action, and (for a `bygroup` action) its position
/// within the group.
pub type Lexeme = (Span, ActionId, Option<GroupIndex>);

/// One step of the lexer: the lexemes produced at this position, plus the
/// stack mutation they trigger, if any (spec §4.3 "Event").
#[derive(Debug, Clone)]
pub struct Event {
    /// How this event changes the lexicon stack, if at all.
    pub target: Option<Target>,
    /// Lexemes produced by this step, in order.
    pub lexemes: Vec<Lexeme>,
    /// Whether the rule that fired this event is marked `unstable_left`:
    /// its match can extend leftward depending on what precedes it, so a
    /// restart point just past it is not trustworthy (spec §4.4 step 2).
    pub unstable_left: bool,
}

/// A target's net effect on the lexicon stack: pop `pop` levels, then push
/// each lexicon in `push`, in order (spec §4.3: "positive int → push
/// current `n` times; `0` → noop; negative → pop `|n|` levels, never
/// popping the root; `Lexicon` → push").
#[derive(Debug, Clone, Default)]
pub struct Target {
    /// Number of stack levels to pop before pushing (never the root).
    pub pop: u32,
    /// Lexicons to push, in order, after popping.
    pub push: Vec<Arc<Lexicon>>,
}

impl Target {
    /// Whether this target is a pure no-op (spec "`0` → noop").
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.pop == 0 && self.push.is_empty()
    }
}
