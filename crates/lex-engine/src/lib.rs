//! Stack-based lexer: drives a grammar over text, producing a stream of
//! events a tree builder can fold into a parse tree.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod error;
mod event;
mod lexer;

pub use error::LexError;
pub use event::{ActionId, Event, GroupIndex, Lexeme, Target};
pub use lexer::Lexer;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lex_grammar::{
        ActionSpec, Arg, DynItem, Language, LexiconEntry, LexiconRefSpec, LexiconSpec, PatternSpec,
        RuleSpec, TargetItem, Targets, Value,
    };

    use super::*;

    fn root_spec(_arg: Option<&Arg>) -> LexiconSpec {
        LexiconSpec {
            rules: vec![
                RuleSpec::new(
                    PatternSpec::Static(r"\d+".to_string()),
                    ActionSpec::Literal(Arc::from("Number")),
                    Targets::none(),
                ),
                RuleSpec::new(
                    PatternSpec::Static(r#"""#.to_string()),
                    ActionSpec::Skip,
                    Targets::Static(vec![TargetItem::Push(LexiconRefSpec::Static {
                        name: "string",
                        arg: None,
                    })]),
                ),
            ],
            default_action: Some(ActionSpec::Skip),
            ..Default::default()
        }
    }

    fn string_spec(_arg: Option<&Arg>) -> LexiconSpec {
        LexiconSpec {
            rules: vec![RuleSpec::new(
                PatternSpec::Static(r#"""#.to_string()),
                ActionSpec::Skip,
                Targets::Static(vec![TargetItem::Int(-1)]),
            )],
            default_action: Some(ActionSpec::Literal(Arc::from("StringBody"))),
            ..Default::default()
        }
    }

    static ENTRIES: &[LexiconEntry] = &[
        LexiconEntry { name: "root", build: root_spec },
        LexiconEntry { name: "string", build: string_spec },
    ];

    #[test]
    fn pushes_and_pops_across_a_quoted_string() {
        let lang = Language::new("test", ENTRIES);
        let root = lang.get("root", None).unwrap();
        let mut lexer = Lexer::new(&lang, root, r#"12 "ab" 34"#);

        let mut actions = Vec::new();
        while let Some(event) = lexer.next_event() {
            for (_, action, _group) in event.lexemes {
                actions.push(action.to_string());
            }
        }
        assert_eq!(actions, vec!["Number", "StringBody", "Number"]);
        assert_eq!(lexer.stack().len(), 1);
    }

    #[test]
    fn default_target_cycle_is_broken_by_advancing_one_character() {
        fn ping_spec(_arg: Option<&Arg>) -> LexiconSpec {
            LexiconSpec {
                default_target: Some(Targets::Static(vec![TargetItem::Push(LexiconRefSpec::Static {
                    name: "pong",
                    arg: None,
                })])),
                ..Default::default()
            }
        }
        fn pong_spec(_arg: Option<&Arg>) -> LexiconSpec {
            LexiconSpec {
                default_target: Some(Targets::Static(vec![TargetItem::Push(LexiconRefSpec::Static {
                    name: "ping",
                    arg: None,
                })])),
                ..Default::default()
            }
        }
        static PING_PONG: &[LexiconEntry] = &[
            LexiconEntry { name: "ping", build: ping_spec },
            LexiconEntry { name: "pong", build: pong_spec },
        ];
        let lang = Language::new("pingpong", PING_PONG);
        let root = lang.get("ping", None).unwrap();
        let mut lexer = Lexer::new(&lang, root, "abc");

        // Neither lexicon has any rules, so the circular DEFAULT_TARGET can
        // never itself advance `pos`; this only terminates (rather than
        // looping forever) because the revisit check forces a one-character
        // advance each time it would re-open an already-open context.
        assert!(lexer.next_event().is_none());
        assert_eq!(lexer.pos(), 3);
    }

    #[test]
    fn dynamic_action_reports_the_matched_text() {
        fn upper(args: &[Value]) -> Value {
            match args {
                [Value::Str(s)] => Value::str(s.to_uppercase()),
                _ => Value::None,
            }
        }
        fn root_spec(_arg: Option<&Arg>) -> LexiconSpec {
            LexiconSpec {
                rules: vec![RuleSpec::new(
                    PatternSpec::Static(r"[a-z]+".to_string()),
                    ActionSpec::Dynamic(DynItem::Call(upper, vec![DynItem::Text])),
                    Targets::none(),
                )],
                default_action: Some(ActionSpec::Skip),
                ..Default::default()
            }
        }
        static ENTRIES: &[LexiconEntry] = &[LexiconEntry { name: "root", build: root_spec }];
        let lang = Language::new("test", ENTRIES);
        let root = lang.get("root", None).unwrap();
        let mut lexer = Lexer::new(&lang, root, "hi");
        let event = lexer.next_event().unwrap();
        assert_eq!(event.lexemes[0].1.as_ref(), "HI");
    }

    #[test]
    fn bygroup_stamps_position_with_the_last_negated() {
        fn root_spec(_arg: Option<&Arg>) -> LexiconSpec {
            LexiconSpec {
                rules: vec![RuleSpec::new(
                    PatternSpec::Static(r"(\w+)=(\w+)".to_string()),
                    ActionSpec::ByGroup(vec![
                        ActionSpec::Literal(Arc::from("Key")),
                        ActionSpec::Literal(Arc::from("Value")),
                    ]),
                    Targets::none(),
                )],
                ..Default::default()
            }
        }
        static ENTRIES: &[LexiconEntry] = &[LexiconEntry { name: "root", build: root_spec }];
        let lang = Language::new("test", ENTRIES);
        let root = lang.get("root", None).unwrap();
        let mut lexer = Lexer::new(&lang, root, "key=value");
        let event = lexer.next_event().unwrap();
        assert_eq!(event.lexemes.len(), 2);
        assert_eq!(event.lexemes[0].2, Some(1));
        assert_eq!(event.lexemes[1].2, Some(-2));
    }
}
