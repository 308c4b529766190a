//! Ahead-of-time grammar validation: build every lexicon a language declares
//! (with no `arg`, since derived-lexicon variants can't be enumerated
//! statically) and report every problem found, not just the first.
//!
//! Complements, but doesn't replace, the lazy fail-at-use behavior of
//! [`crate::Language::get`] — a grammar author can call [`validate`] once,
//! up front, instead of discovering problems lexicon-by-lexicon as a
//! document happens to exercise them.

use crate::error::GrammarError;
use crate::language::Language;
use crate::rule::{LexiconRefSpec, TargetItem, Targets};

/// Builds every lexicon `lang` declares and collects every [`GrammarError`]
/// encountered, across all of them, instead of stopping at the first.
#[must_use]
pub fn validate(lang: &Language) -> Vec<GrammarError> {
    let mut errors = Vec::new();
    let known: Vec<&str> = lang.lexicon_names().collect();

    for name in lang.lexicon_names() {
        match lang.get(name, None) {
            Ok(lexicon) => {
                for i in 0..lexicon.rule_count() {
                    if let Some(targets) = lexicon.rule_targets(i) {
                        check_static_targets(name, targets, &known, &mut errors);
                    }
                }
                if let Some(targets) = lexicon.default_target() {
                    check_static_targets(name, targets, &known, &mut errors);
                }
            }
            Err(e) => errors.push(e),
        }
    }

    errors
}

fn check_static_targets(
    lexicon: &str,
    targets: &Targets,
    known: &[&str],
    errors: &mut Vec<GrammarError>,
) {
    let Targets::Static(items) = targets else {
        // Dynamic targets are only resolvable against an actual match;
        // nothing to check statically.
        return;
    };
    for item in items {
        if let TargetItem::Push(LexiconRefSpec::Static { name, .. }) = item {
            if !known.contains(name) {
                errors.push(GrammarError::UndefinedLexicon {
                    lexicon: lexicon.to_string(),
                    reference: (*name).to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::language::LexiconEntry;
    use crate::lexicon::LexiconSpec;
    use crate::rule::{ActionSpec, PatternSpec, RuleSpec};

    fn root_spec(_arg: Option<&crate::rule::Arg>) -> LexiconSpec {
        LexiconSpec {
            rules: vec![RuleSpec::new(
                PatternSpec::Static(r#"""#.to_string()),
                ActionSpec::Literal(Arc::from("String")),
                Targets::Static(vec![TargetItem::Push(LexiconRefSpec::Static {
                    name: "string",
                    arg: None,
                })]),
            )],
            ..Default::default()
        }
    }

    fn broken_root_spec(_arg: Option<&crate::rule::Arg>) -> LexiconSpec {
        LexiconSpec {
            rules: vec![RuleSpec::new(
                PatternSpec::Static(r#"""#.to_string()),
                ActionSpec::Literal(Arc::from("String")),
                Targets::Static(vec![TargetItem::Push(LexiconRefSpec::Static {
                    name: "nonexistent",
                    arg: None,
                })]),
            )],
            ..Default::default()
        }
    }

    static GOOD_ENTRIES: &[LexiconEntry] = &[
        LexiconEntry { name: "root", build: root_spec },
        LexiconEntry { name: "string", build: |_| LexiconSpec::default() },
    ];

    static BAD_ENTRIES: &[LexiconEntry] =
        &[LexiconEntry { name: "root", build: broken_root_spec }];

    #[test]
    fn validate_is_clean_for_a_well_formed_language() {
        let lang = Language::new("good", GOOD_ENTRIES);
        assert!(validate(&lang).is_empty());
    }

    #[test]
    fn validate_reports_dangling_targets_without_stopping_early() {
        let lang = Language::new("bad", BAD_ENTRIES);
        let errors = validate(&lang);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], GrammarError::UndefinedLexicon { .. }));
    }
}
