//! The bottom-up transform itself.

use std::sync::Arc;

use lex_tree::{Context, LexiconId, Node, Token};

use crate::cache::TransformCache;

/// One child passed to [`Transformer::transform`]: a raw leaf token exactly
/// as the lexer produced it, or a nested context's already-computed value.
#[derive(Debug)]
pub enum TransformedOrRaw<'a, V> {
    /// A leaf token.
    Token(&'a Token),
    /// A nested context's value, computed (or reused from cache) before its
    /// parent is transformed.
    Context(Arc<V>),
}

/// Computes a value for one context from its lexicon name and its
/// children's values.
///
/// Implementors are looked up by the firing context's lexicon (spec §4.6:
/// "a transform function ... is called with its children"); a single
/// `Transformer` typically matches on `lexicon.name()` to dispatch.
pub trait Transformer<V> {
    /// Transforms one context given its children, document order, with any
    /// nested context already transformed.
    fn transform(&self, lexicon: &LexiconId, children: &[TransformedOrRaw<'_, V>]) -> V;
}

/// Fills in whatever `cache` doesn't already have cached for `root`'s
/// current generation, bottom-up, and returns the root's value.
///
/// Splicing a reused subtree to a new position never invalidates it on its
/// own — only an explicit [`TransformCache::invalidate`] call does — so a
/// rebuild that moves a subtree without touching its content keeps that
/// subtree's transformed value for free.
pub fn recompute_missing<V>(
    root: &Context,
    cache: &mut TransformCache<V>,
    transformer: &dyn Transformer<V>,
) -> Arc<V> {
    compute(root, Vec::new(), cache, transformer)
}

fn compute<V>(
    ctx: &Context,
    path: lex_tree::ContextRef,
    cache: &mut TransformCache<V>,
    transformer: &dyn Transformer<V>,
) -> Arc<V> {
    if let Some(cached) = cache.get(&path) {
        return cached;
    }

    let mut children = Vec::with_capacity(ctx.children.len());
    for (index, child) in ctx.children.iter().enumerate() {
        match child {
            Node::Token(token) => children.push(TransformedOrRaw::Token(token)),
            Node::Context(child_ctx) => {
                let mut child_path = path.clone();
                child_path.push(index);
                let value = compute(child_ctx, child_path, cache, transformer);
                children.push(TransformedOrRaw::Context(value));
            }
        }
    }

    let value = Arc::new(transformer.transform(&ctx.lexicon, &children));
    cache.insert(path, Arc::clone(&value));
    value
}

#[cfg(test)]
mod tests {
    use std::sync::Arc as StdArc;

    use lex_grammar::{Arg, Language, LexiconEntry, LexiconSpec};

    use super::*;

    fn test_language() -> Language {
        static ENTRIES: &[LexiconEntry] = &[
            LexiconEntry { name: "root", build: |_: Option<&Arg>| LexiconSpec::default() },
            LexiconEntry { name: "group", build: |_: Option<&Arg>| LexiconSpec::default() },
        ];
        Language::new("test", ENTRIES)
    }

    struct Joiner;

    impl Transformer<String> for Joiner {
        fn transform(&self, lexicon: &LexiconId, children: &[TransformedOrRaw<'_, String>]) -> String {
            let joined = children
                .iter()
                .map(|child| match child {
                    TransformedOrRaw::Token(t) => t.text.to_string(),
                    TransformedOrRaw::Context(v) => (**v).clone(),
                })
                .collect::<Vec<_>>()
                .join(",");
            format!("{}({joined})", lexicon.name())
        }
    }

    #[test]
    fn recompute_missing_folds_bottom_up() {
        let lang = test_language();
        let root_lexicon = lang.get("root", None).unwrap();
        let group_lexicon = lang.get("group", None).unwrap();

        let mut root = Context::root(root_lexicon);
        root.children.push(Node::Token(Token::new("a", 0, StdArc::from("Text"), vec![0])));
        let mut group = Context::new(group_lexicon, vec![1]);
        group.children.push(Node::Token(Token::new("b", 1, StdArc::from("Text"), vec![1, 0])));
        root.children.push(Node::Context(group));

        let mut cache = TransformCache::new();
        let value = recompute_missing(&root, &mut cache, &Joiner);

        assert_eq!(*value, "root(a,group(b))");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn a_cached_subtree_is_not_retransformed() {
        struct CountingJoiner {
            calls: std::cell::Cell<usize>,
        }
        impl Transformer<String> for CountingJoiner {
            fn transform(&self, lexicon: &LexiconId, children: &[TransformedOrRaw<'_, String>]) -> String {
                self.calls.set(self.calls.get() + 1);
                Joiner.transform(lexicon, children)
            }
        }

        let lang = test_language();
        let root_lexicon = lang.get("root", None).unwrap();
        let group_lexicon = lang.get("group", None).unwrap();

        let mut root = Context::root(root_lexicon);
        root.children.push(Node::Token(Token::new("a", 0, StdArc::from("Text"), vec![0])));
        let mut group = Context::new(group_lexicon, vec![1]);
        group.children.push(Node::Token(Token::new("b", 1, StdArc::from("Text"), vec![1, 0])));
        root.children.push(Node::Context(group));

        let transformer = CountingJoiner { calls: std::cell::Cell::new(0) };
        let mut cache = TransformCache::new();
        recompute_missing(&root, &mut cache, &transformer);
        assert_eq!(transformer.calls.get(), 2);

        // Invalidate only the root; the nested group's entry survives.
        cache.invalidate(&[]);
        recompute_missing(&root, &mut cache, &transformer);
        assert_eq!(transformer.calls.get(), 3);
    }
}
