//! A compiled lexicon: the rules, built-once patterns, and the special
//! `DEFAULT_ACTION`/`DEFAULT_TARGET` entries a lexer drives against one
//! position at a time.

use std::sync::{Arc, OnceLock};

use lex_regex::{CompiledLexicon, RegexMatch, RulePattern};
use regex::Regex;

pub use lex_regex::ReFlags;

use crate::dynamic::{DynItem, EvalCtx, Value};
use crate::error::GrammarError;
use crate::rule::{ActionSpec, Arg, PatternSpec, RuleSpec, Targets};

/// Everything a lexicon-builder function returns (spec §6 "each lexicon is
/// defined by a generator-like function returning rules").
#[derive(Debug, Clone, Default)]
pub struct LexiconSpec {
    /// Ordered rules; order is match priority.
    pub rules: Vec<RuleSpec>,
    /// `DEFAULT_ACTION`, if declared.
    pub default_action: Option<ActionSpec>,
    /// `DEFAULT_TARGET`, if declared.
    pub default_target: Option<Targets>,
    /// Regex flags applied to the compiled alternation.
    pub re_flags: ReFlags,
    /// Whether the lexicon that *pushes* this one attributes its triggering
    /// lexemes to the new child context instead of itself.
    pub consume: bool,
}

struct CompiledRule {
    pattern_source: Option<String>,
    action: ActionSpec,
    targets: Targets,
    unstable_left: bool,
    standalone: OnceLock<Option<Regex>>,
}

/// A named, lazily-compiled set of rules belonging to one language (spec §3
/// "Lexicon").
pub struct Lexicon {
    name: Arc<str>,
    arg: Option<Arg>,
    consume: bool,
    default_action: Option<ActionSpec>,
    default_target: Option<Targets>,
    rules: Vec<CompiledRule>,
    compiled: CompiledLexicon,
}

impl Lexicon {
    /// Builds a lexicon from its spec, evaluating dynamic patterns against
    /// `arg` (the only thing available before any rule has fired) and
    /// eagerly compiling the aggregated alternation so a bad pattern is
    /// reported now rather than at first lex.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError`] if `default_action` and `default_target` are
    /// both set, a dynamic pattern needs `TEXT`/`MATCH`, a dynamic pattern
    /// evaluates to a non-string, or a pattern fails to compile.
    pub fn build(name: &str, arg: Option<Arg>, spec: LexiconSpec) -> Result<Self, GrammarError> {
        if spec.default_action.is_some() && spec.default_target.is_some() {
            return Err(GrammarError::ConflictingDefaults { lexicon: name.to_string() });
        }

        let build_ctx = EvalCtx::Build { arg: arg.as_ref() };
        let mut patterns = Vec::with_capacity(spec.rules.len());
        let mut rules = Vec::with_capacity(spec.rules.len());
        for (i, rule) in spec.rules.into_iter().enumerate() {
            let source = match rule.pattern {
                PatternSpec::Static(s) => Some(s),
                PatternSpec::None => None,
                PatternSpec::Dynamic(item) => {
                    match item.eval(&build_ctx).map_err(|_| GrammarError::MatchContextUnavailable {
                        lexicon: name.to_string(),
                        rule_index: i,
                    })? {
                        Value::Str(s) => Some(s.to_string()),
                        Value::None => None,
                        _ => {
                            return Err(GrammarError::InvalidDynamicPattern {
                                lexicon: name.to_string(),
                                rule_index: i,
                            })
                        }
                    }
                }
            };
            patterns.push(match &source {
                Some(s) => RulePattern::Source(s.clone()),
                None => RulePattern::None,
            });
            rules.push(CompiledRule {
                pattern_source: source,
                action: rule.action,
                targets: rule.targets,
                unstable_left: rule.unstable_left,
                standalone: OnceLock::new(),
            });
        }

        let compiled = CompiledLexicon::new(patterns, spec.re_flags);
        compiled.ensure_compiled().map_err(|source| GrammarError::InvalidPattern {
            lexicon: name.to_string(),
            rule_index: find_offending_rule(&rules, source),
            message: source.to_string(),
        })?;

        Ok(Self {
            name: Arc::from(name),
            arg,
            consume: spec.consume,
            default_action: spec.default_action,
            default_target: spec.default_target,
            rules,
            compiled,
        })
    }

    /// This lexicon's name within its language.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This lexicon's argument, if it's a derived lexicon.
    #[must_use]
    pub fn arg(&self) -> Option<&Arg> {
        self.arg.as_ref()
    }

    /// Whether the lexicon that pushed this one should attribute its
    /// triggering lexemes to this new context.
    #[must_use]
    pub fn consume(&self) -> bool {
        self.consume
    }

    /// `DEFAULT_ACTION`, if declared.
    #[must_use]
    pub fn default_action(&self) -> Option<&ActionSpec> {
        self.default_action.as_ref()
    }

    /// `DEFAULT_TARGET`, if declared.
    #[must_use]
    pub fn default_target(&self) -> Option<&Targets> {
        self.default_target.as_ref()
    }

    /// Number of rules (including rules with no pattern).
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// A rule's action.
    #[must_use]
    pub fn rule_action(&self, rule_index: usize) -> Option<&ActionSpec> {
        self.rules.get(rule_index).map(|r| &r.action)
    }

    /// A rule's targets.
    #[must_use]
    pub fn rule_targets(&self, rule_index: usize) -> Option<&Targets> {
        self.rules.get(rule_index).map(|r| &r.targets)
    }

    /// Whether a rule is an unstable restart point (spec §4.4 step 2).
    #[must_use]
    pub fn rule_unstable_left(&self, rule_index: usize) -> bool {
        self.rules.get(rule_index).is_some_and(|r| r.unstable_left)
    }

    /// Finds the next match at or after byte offset `pos` (spec §4.1).
    ///
    /// # Errors
    ///
    /// Returns the compile error if the aggregated pattern failed to
    /// compile (shouldn't happen: [`Lexicon::build`] already forced and
    /// rejected that case).
    pub fn find_at<'s, 't>(
        &'s self,
        text: &'t str,
        pos: usize,
    ) -> Result<Option<RegexMatch<'t>>, &'s lex_regex::RegexError> {
        self.compiled.find_at(text, pos)
    }

    /// Looks up a rule's own local capture group `n` (`n >= 1`) within its
    /// matched substring. `lex-regex` compiles every rule's pattern into one
    /// combined alternation, so there is no single absolute-to-local group
    /// mapping to thread around; instead this re-runs the rule's own
    /// pattern, in isolation, against the text it already matched.
    #[must_use]
    pub fn local_group<'t>(&self, rule_index: usize, whole: &'t str, n: usize) -> Option<&'t str> {
        self.local_captures(rule_index, whole)?.get(n).map(|m| m.as_str())
    }

    /// Like [`Lexicon::local_group`], but also returns the group's byte
    /// range within `whole` — callers (the lexer, assembling `bygroup`
    /// tokens) need the offsets to place each token, not just its text.
    #[must_use]
    pub fn local_group_span(&self, rule_index: usize, whole: &str, n: usize) -> Option<(usize, usize)> {
        let m = self.local_captures(rule_index, whole)?.get(n)?;
        Some((m.start(), m.end()))
    }

    fn local_captures<'t>(&self, rule_index: usize, whole: &'t str) -> Option<regex::Captures<'t>> {
        let rule = self.rules.get(rule_index)?;
        let source = rule.pattern_source.as_deref()?;
        let re = rule.standalone.get_or_init(|| Regex::new(source).ok()).as_ref()?;
        re.captures(whole)
    }
}

fn find_offending_rule(rules: &[CompiledRule], err: &lex_regex::RegexError) -> usize {
    match err {
        lex_regex::RegexError::InvalidPattern { rule_index, .. } => *rule_index,
        lex_regex::RegexError::InvalidAlternation(_) => rules.len(),
    }
}
