//! `Token`, `Context`, and `Node` — the tree's atoms (spec §3 "Tree
//! entities").

use std::sync::Arc;

use lex_grammar::Lexicon;
use lex_span::Span;

/// Identifies a lexicon within a tree. Contexts and the lexer both hold
/// `Arc<Lexicon>` handles; `Language::get` guarantees equal `(name, arg)`
/// pairs resolve to the same underlying `Lexicon`, so two `LexiconId`s are
/// the same lexicon iff `Arc::ptr_eq` (or, equivalently, structural
/// equality — `Lexicon` doesn't implement `PartialEq` itself, so ptr
/// identity is how callers compare).
pub type LexiconId = Arc<Lexicon>;

/// A non-owning reference to an ancestor context: the sequence of child
/// indices from the root down to (but not including) the node itself.
/// Spec §9: "avoid cycles by never strong-owning upward" — an index path
/// is plain data, not a pointer, so the tree stays ordinary `Send + Sync`
/// owned data with no reference counting needed for parent links.
pub type ContextRef = Vec<usize>;

/// `group` position within a multi-token group produced by one regex match
/// (spec §3 "GroupToken", §9 "fixes the index form"). Positive values are a
/// group member's 1-based position; the last member's index is negated.
pub type GroupIndex = i32;

/// A single emitted token (spec §3 "Token").
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token's text.
    pub text: Box<str>,
    /// Start byte offset.
    pub pos: u32,
    /// The opaque action label the firing rule assigned.
    pub action: Arc<str>,
    /// Path to the enclosing context from the tree root.
    pub parent: ContextRef,
    /// Position within a multi-token group, if this token was produced as
    /// part of one (spec §3 "GroupToken").
    pub group: Option<GroupIndex>,
    /// Whether the rule that produced this token is marked `unstable_left`
    /// — an unsafe restart boundary the builder's restart-point search
    /// must walk past rather than trust (spec §4.4 step 2).
    pub unstable_left: bool,
}

impl Token {
    /// Creates a token outside of any group.
    #[must_use]
    pub fn new(text: impl Into<Box<str>>, pos: u32, action: Arc<str>, parent: ContextRef) -> Self {
        Self { text: text.into(), pos, action, parent, group: None, unstable_left: false }
    }

    /// End byte offset (`pos + text.len()`).
    #[must_use]
    pub fn end(&self) -> u32 {
        self.pos + self.text.len() as u32
    }

    /// This token's span.
    #[must_use]
    pub fn span(&self) -> Span {
        Span::new(self.pos, self.end())
    }

    /// Whether this token is the last member of a group (negative
    /// `group` index).
    #[must_use]
    pub fn is_last_in_group(&self) -> bool {
        self.group.is_some_and(|g| g < 0)
    }
}

/// One child of a [`Context`]: either a leaf [`Token`] or a nested
/// sub-context (spec §3: `Node = Token(Token) | Context(Context)`).
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A leaf token.
    Token(Token),
    /// A nested context.
    Context(Context),
}

impl Node {
    /// Start byte offset, recursing into a context's first child.
    #[must_use]
    pub fn pos(&self) -> u32 {
        match self {
            Node::Token(t) => t.pos,
            Node::Context(c) => c.pos(),
        }
    }

    /// End byte offset, recursing into a context's last child.
    #[must_use]
    pub fn end(&self) -> u32 {
        match self {
            Node::Token(t) => t.end(),
            Node::Context(c) => c.end(),
        }
    }

    /// This node's own `parent` path, if it has one (the root context
    /// doesn't).
    #[must_use]
    pub fn parent(&self) -> Option<&ContextRef> {
        match self {
            Node::Token(t) => Some(&t.parent),
            Node::Context(c) => c.parent.as_ref(),
        }
    }

    /// Borrows the token, if this node is one.
    #[must_use]
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Node::Token(t) => Some(t),
            Node::Context(_) => None,
        }
    }

    /// Borrows the context, if this node is one.
    #[must_use]
    pub fn as_context(&self) -> Option<&Context> {
        match self {
            Node::Context(c) => Some(c),
            Node::Token(_) => None,
        }
    }
}

/// An ordered sequence of children belonging to one lexicon (spec §3
/// "Context").
///
/// A context is never materialized with zero children (spec "Lifecycle":
/// "a context is never empty after completion; if the lexer would finish
/// one with no children, it is discarded before attachment") — callers
/// that build a `Context` directly, rather than through `lex-builder`, are
/// responsible for upholding that themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// The lexicon this context is an instance of.
    pub lexicon: LexiconId,
    /// Path to the enclosing context, or `None` for the root.
    pub parent: Option<ContextRef>,
    /// Ordered children; never empty for a fully-built context.
    pub children: Vec<Node>,
}

impl Context {
    /// Creates the root context for `lexicon` (no parent).
    #[must_use]
    pub fn root(lexicon: LexiconId) -> Self {
        Self { lexicon, parent: None, children: Vec::new() }
    }

    /// Creates a non-root context.
    #[must_use]
    pub fn new(lexicon: LexiconId, parent: ContextRef) -> Self {
        Self { lexicon, parent: Some(parent), children: Vec::new() }
    }

    /// Start byte offset: the first child's `pos` (spec invariant 2). `0`
    /// for an empty context (should not occur outside of construction).
    #[must_use]
    pub fn pos(&self) -> u32 {
        self.children.first().map_or(0, Node::pos)
    }

    /// End byte offset: the last child's `end` (spec invariant 2). `0` for
    /// an empty context.
    #[must_use]
    pub fn end(&self) -> u32 {
        self.children.last().map_or(0, Node::end)
    }

    /// Whether this context has no children. A fully-built tree never
    /// contains one (spec "Lifecycle").
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// This context's span.
    #[must_use]
    pub fn span(&self) -> Span {
        Span::new(self.pos(), self.end())
    }

    /// Opaque equality against a lexicon: compares [`Context::lexicon`] by
    /// pointer identity (spec §3: "opaque equality against a lexicon
    /// compares `lexicon`").
    #[must_use]
    pub fn is_lexicon(&self, lexicon: &LexiconId) -> bool {
        Arc::ptr_eq(&self.lexicon, lexicon)
    }

    /// Resolves an index path to the node it addresses, walking down from
    /// this context (treated as the root of the path).
    #[must_use]
    pub fn resolve(&self, path: &[usize]) -> Option<&Node> {
        let (&i, rest) = path.split_first()?;
        let child = self.children.get(i)?;
        if rest.is_empty() {
            Some(child)
        } else {
            match child {
                Node::Context(ctx) => ctx.resolve(rest),
                Node::Token(_) => None,
            }
        }
    }

    /// Resolves an index path to the context it addresses. An empty path
    /// resolves to `self`.
    #[must_use]
    pub fn resolve_context(&self, path: &[usize]) -> Option<&Context> {
        if path.is_empty() {
            return Some(self);
        }
        self.resolve(path)?.as_context()
    }

    /// Mutably resolves an index path to the context it addresses. An
    /// empty path resolves to `self`. Used by the builder to splice a
    /// subtree in place.
    pub fn resolve_context_mut(&mut self, path: &[usize]) -> Option<&mut Context> {
        if path.is_empty() {
            return Some(self);
        }
        let (&i, rest) = path.split_first()?;
        match self.children.get_mut(i)? {
            Node::Context(ctx) => ctx.resolve_context_mut(rest),
            Node::Token(_) => None,
        }
    }
}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        &*self.text == other
    }
}

impl PartialEq<LexiconId> for Context {
    fn eq(&self, other: &LexiconId) -> bool {
        self.is_lexicon(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_grammar::{Language, LexiconEntry, LexiconSpec};

    fn test_language() -> Language {
        static ENTRIES: &[LexiconEntry] =
            &[LexiconEntry { name: "root", build: |_| LexiconSpec::default() }];
        Language::new("test", ENTRIES)
    }

    #[test]
    fn token_opaque_equality_compares_text() {
        let tok = Token::new("hello", 0, Arc::from("Text"), vec![]);
        assert_eq!(tok, *"hello");
        assert_ne!(tok, *"world");
    }

    #[test]
    fn context_derives_pos_and_end_from_children() {
        let lang = test_language();
        let lexicon = lang.get("root", None).unwrap();
        let mut ctx = Context::root(lexicon);
        ctx.children.push(Node::Token(Token::new("abc", 3, Arc::from("Text"), vec![])));
        ctx.children.push(Node::Token(Token::new("de", 7, Arc::from("Text"), vec![])));
        assert_eq!(ctx.pos(), 3);
        assert_eq!(ctx.end(), 9);
    }

    #[test]
    fn resolve_walks_nested_contexts() {
        let lang = test_language();
        let lexicon = lang.get("root", None).unwrap();
        let mut root = Context::root(lexicon.clone());
        let mut child = Context::new(lexicon, vec![0]);
        child.children.push(Node::Token(Token::new("x", 0, Arc::from("Text"), vec![0, 0])));
        root.children.push(Node::Context(child));

        let resolved = root.resolve(&[0, 0]).unwrap();
        assert_eq!(resolved.as_token().unwrap().text.as_ref(), "x");
        assert!(root.resolve(&[1]).is_none());
    }

    #[test]
    fn group_membership_marks_the_last_member() {
        let mut tok = Token::new("a", 0, Arc::from("Text"), vec![]);
        tok.group = Some(1);
        assert!(!tok.is_last_in_group());
        tok.group = Some(-2);
        assert!(tok.is_last_in_group());
    }
}
