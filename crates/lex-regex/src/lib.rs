//! Regex layer: compiles a lexicon's rule patterns into one alternation and
//! runs anchored, walk-forward matches against it.
//!
//! Compilation is deferred until first use and memoized (spec §4.1); a rule
//! whose pattern evaluates to `None` is omitted from the alternation but
//! keeps its numeric slot so the firing rule's index is still meaningful to
//! the caller.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Regex compile-time flags a lexicon applies to its aggregated pattern.
///
/// These map directly onto [`RegexBuilder`] options; spec §3 leaves the
/// flag set abstract ("regex flags used to compile the aggregated
/// pattern"), so we expose the handful the `regex` crate supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReFlags {
    /// Case-insensitive matching.
    pub case_insensitive: bool,
    /// `^`/`$` match at line boundaries, not just start/end of haystack.
    pub multi_line: bool,
    /// `.` matches `\n` as well.
    pub dot_matches_new_line: bool,
}

/// Errors raised compiling a lexicon's aggregated pattern.
#[derive(Debug, Error)]
pub enum RegexError {
    /// One of the rule's patterns failed to compile on its own.
    #[error("rule {rule_index} pattern is invalid: {source}")]
    InvalidPattern {
        /// Index of the offending rule within the lexicon.
        rule_index: usize,
        /// Underlying `regex` crate error.
        #[source]
        source: regex::Error,
    },
    /// The combined alternation failed to compile (should only happen for
    /// pathological rule counts exceeding the regex crate's group limit).
    #[error("combined alternation failed to compile: {0}")]
    InvalidAlternation(regex::Error),
}

/// One rule pattern as seen by the regex layer: either a literal regex
/// source, or "no pattern" (the rule is skipped, e.g. because a dynamic
/// pattern item evaluated to `None`).
#[derive(Debug, Clone)]
pub enum RulePattern {
    /// A regex source string.
    Source(String),
    /// The rule has no pattern and never participates in matching.
    None,
}

/// Name of the capture group used to identify which rule fired.
fn group_name(index: usize) -> String {
    format!("rule_{index}")
}

/// A lexicon's patterns, compiled into a single alternation.
///
/// Each participating rule's pattern is wrapped in a named group
/// `(?P<rule_N>...)` so [`RegexMatch::rule_index`] can recover which rule
/// fired without re-running each pattern individually.
pub struct CompiledLexicon {
    patterns: Vec<RulePattern>,
    flags: ReFlags,
    compiled: OnceLock<Result<Regex, RegexError>>,
}

impl CompiledLexicon {
    /// Creates a lazily-compiled alternation over `patterns`. Compilation
    /// does not happen until [`CompiledLexicon::find_at`] is first called.
    #[must_use]
    pub fn new(patterns: Vec<RulePattern>, flags: ReFlags) -> Self {
        Self { patterns, flags, compiled: OnceLock::new() }
    }

    fn compile(&self) -> &Result<Regex, RegexError> {
        self.compiled.get_or_init(|| {
            let mut alternatives = Vec::with_capacity(self.patterns.len());
            for (i, pattern) in self.patterns.iter().enumerate() {
                let RulePattern::Source(src) = pattern else { continue };
                // Validate in isolation first so a bad rule reports its own
                // index rather than a confusing combined-alternation error.
                Regex::new(src).map_err(|source| RegexError::InvalidPattern {
                    rule_index: i,
                    source,
                })?;
                alternatives.push(format!("(?P<{}>{})", group_name(i), src));
            }

            if alternatives.is_empty() {
                // An empty alternation would match the empty string
                // everywhere; represent "no rules" as a pattern that never
                // matches instead.
                alternatives.push(r"\A\z\A".to_string());
            }

            let combined = alternatives.join("|");
            RegexBuilder::new(&combined)
                .case_insensitive(self.flags.case_insensitive)
                .multi_line(self.flags.multi_line)
                .dot_matches_new_line(self.flags.dot_matches_new_line)
                .build()
                .map_err(RegexError::InvalidAlternation)
        })
    }

    /// Forces compilation now, surfacing the result. Lexicon construction
    /// calls this so an invalid pattern is reported at build time rather
    /// than silently deferred to the first lex.
    ///
    /// # Errors
    ///
    /// Returns the same [`RegexError`] compilation would fail with.
    pub fn ensure_compiled(&self) -> Result<(), &RegexError> {
        self.compile().as_ref().map(|_| ())
    }

    /// Finds the next match at or after byte offset `pos` in `text`.
    ///
    /// This is a walk-forward search, not a `^`-anchored match: spec §4.1
    /// calls for "anchored search from a given position (walk-forward until
    /// next match)", i.e. `regex::Regex::captures_at` semantics.
    ///
    /// # Errors
    ///
    /// Returns the same [`RegexError`] that compilation failed with, if it
    /// did; compilation is attempted once and the result memoized.
    pub fn find_at<'s, 't>(
        &'s self,
        text: &'t str,
        pos: usize,
    ) -> Result<Option<RegexMatch<'t>>, &'s RegexError> {
        let regex = self.compile().as_ref()?;
        let Some(captures) = regex.captures_at(text, pos) else {
            return Ok(None);
        };
        #[allow(clippy::expect_used)]
        let whole = captures.get(0).expect("capture group 0 always matches");
        #[allow(clippy::expect_used)]
        let rule_index = self
            .patterns
            .iter()
            .enumerate()
            .find_map(|(i, p)| {
                matches!(p, RulePattern::Source(_))
                    .then(|| captures.name(&group_name(i)))
                    .flatten()
                    .map(|_| i)
            })
            .expect("a combined-alternation match always names exactly one rule group");

        Ok(Some(RegexMatch { captures, rule_index, start: whole.start(), end: whole.end() }))
    }
}

/// A single match of a lexicon's compiled alternation.
pub struct RegexMatch<'t> {
    captures: regex::Captures<'t>,
    /// Index of the rule whose pattern matched.
    pub rule_index: usize,
    /// Start byte offset of the whole match.
    pub start: usize,
    /// End byte offset of the whole match.
    pub end: usize,
}

impl<'t> RegexMatch<'t> {
    /// The full matched text (`MATCH[0]`/`TEXT` in spec §3's dynamic item
    /// language).
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn whole(&self) -> &'t str {
        self.captures.get(0).expect("capture group 0 always matches").as_str()
    }

    /// A numbered capture group from the *rule's own* pattern. Since rules
    /// are combined under one outer named group, a rule author's group `n`
    /// is this rule's `n`-th group after its own wrapping group; we expose
    /// raw access by absolute group index within the whole alternation for
    /// simplicity, leaving group-numbering translation to `lex-grammar`
    /// (which knows how many groups precede a given rule).
    #[must_use]
    pub fn group(&self, absolute_index: usize) -> Option<&'t str> {
        self.captures.get(absolute_index).map(|m| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon(patterns: &[&str]) -> CompiledLexicon {
        CompiledLexicon::new(
            patterns.iter().map(|p| RulePattern::Source((*p).to_string())).collect(),
            ReFlags::default(),
        )
    }

    #[test]
    fn finds_first_alternative_in_priority_order() {
        let lex = lexicon(&[r"\d+", r"\w+"]);
        let m = lex.find_at("abc 123", 0).unwrap().unwrap();
        assert_eq!(m.rule_index, 1);
        assert_eq!(m.whole(), "abc");
    }

    #[test]
    fn walks_forward_from_position() {
        let lex = lexicon(&[r"\d+"]);
        let m = lex.find_at("abc 123 def", 4).unwrap().unwrap();
        assert_eq!(m.whole(), "123");
        assert_eq!(m.start, 4);
    }

    #[test]
    fn skips_none_patterns_but_keeps_slots() {
        let lex = CompiledLexicon::new(
            vec![RulePattern::None, RulePattern::Source(r"\d+".to_string())],
            ReFlags::default(),
        );
        let m = lex.find_at("42", 0).unwrap().unwrap();
        assert_eq!(m.rule_index, 1);
    }

    #[test]
    fn invalid_pattern_reports_its_index() {
        let lex = lexicon(&[r"\d+", "(unclosed"]);
        let err = lex.find_at("x", 0).unwrap_err();
        match err {
            RegexError::InvalidPattern { rule_index, .. } => assert_eq!(*rule_index, 1),
            other => panic!("expected InvalidPattern, got {other:?}"),
        }
    }

    #[test]
    fn no_match_returns_none() {
        let lex = lexicon(&[r"\d+"]);
        assert!(lex.find_at("abc", 0).unwrap().is_none());
    }
}
