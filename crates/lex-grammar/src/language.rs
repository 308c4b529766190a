//! `Language`: a namespace grouping lexicons (spec §3 "Language" — "purely a
//! scope; never instantiated [as lexer state]").

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::GrammarError;
use crate::lexicon::{Lexicon, LexiconSpec};
use crate::rule::Arg;

/// One lexicon's builder function, as registered on a [`Language`].
pub struct LexiconEntry {
    /// The lexicon's name, unique within the language.
    pub name: &'static str,
    /// Builds the lexicon's rules and defaults. Called once per distinct
    /// `arg` the language is asked for (spec §3: "a lexicon is identified
    /// by `(Language, name, arg)` and is cached").
    pub build: fn(Option<&Arg>) -> LexiconSpec,
}

/// A named collection of lexicons, identified by `(Language, name, arg)`
/// (spec §3). `Language` itself holds no lexer state — it is a registry a
/// `Lexer` consults to resolve `Rule` targets into live `Lexicon`s, compiling
/// and caching each one the first time it's asked for.
pub struct Language {
    name: &'static str,
    entries: &'static [LexiconEntry],
    cache: RwLock<HashMap<(String, Option<Arg>), Arc<Lexicon>>>,
}

impl Language {
    /// Creates a language over a static table of lexicon builders.
    #[must_use]
    pub fn new(name: &'static str, entries: &'static [LexiconEntry]) -> Self {
        Self { name, entries, cache: RwLock::new(HashMap::new()) }
    }

    /// This language's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Every lexicon name this language declares a builder for.
    pub fn lexicon_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    /// Resolves `(name, arg)` to a compiled lexicon, building and caching it
    /// on first use. Subsequent calls with an equal `(name, arg)` return a
    /// clone of the same `Arc` (spec §3 invariant: "equal identities yield
    /// the same lexicon object").
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::UndefinedLexicon`] if no entry named `name`
    /// exists, or whatever [`Lexicon::build`] reports for a malformed
    /// lexicon definition.
    pub fn get(&self, name: &str, arg: Option<&Arg>) -> Result<Arc<Lexicon>, GrammarError> {
        let key = (name.to_string(), arg.cloned());
        #[allow(clippy::expect_used)]
        if let Some(hit) = self.cache.read().expect("lexicon cache lock poisoned").get(&key) {
            return Ok(hit.clone());
        }

        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| GrammarError::UndefinedLexicon {
                lexicon: self.name.to_string(),
                reference: name.to_string(),
            })?;

        let spec: LexiconSpec = (entry.build)(arg);
        let built = Arc::new(Lexicon::build(entry.name, arg.cloned(), spec)?);

        #[allow(clippy::expect_used)]
        self.cache.write().expect("lexicon cache lock poisoned").insert(key, built.clone());
        Ok(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{ActionSpec, PatternSpec, RuleSpec, Targets};

    fn root_spec(_arg: Option<&Arg>) -> LexiconSpec {
        LexiconSpec {
            rules: vec![RuleSpec::new(
                PatternSpec::Static(r"\d+".to_string()),
                ActionSpec::Literal(Arc::from("Number")),
                Targets::none(),
            )],
            ..Default::default()
        }
    }

    static ENTRIES: &[LexiconEntry] = &[LexiconEntry { name: "root", build: root_spec }];

    #[test]
    fn repeated_get_returns_the_same_cached_lexicon() {
        let lang = Language::new("test", ENTRIES);
        let a = lang.get("root", None).unwrap();
        let b = lang.get("root", None).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn undefined_lexicon_is_reported() {
        let lang = Language::new("test", ENTRIES);
        let err = lang.get("nope", None).unwrap_err();
        assert!(matches!(err, GrammarError::UndefinedLexicon { .. }));
    }
}
