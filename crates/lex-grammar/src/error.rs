use thiserror::Error;

/// Structural problems detected when a lexicon is built or by
/// [`crate::validate`]: invalid regex, conflicting defaults, bad target
/// types, dangling lexicon references. Spec §7 — fails loudly at first use,
/// never silently degrades.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// A lexicon declared both `DEFAULT_ACTION` and `DEFAULT_TARGET`.
    #[error("lexicon {lexicon:?} declares both DEFAULT_ACTION and DEFAULT_TARGET")]
    ConflictingDefaults {
        /// Name of the offending lexicon.
        lexicon: String,
    },
    /// A rule, or `DEFAULT_ACTION`/`DEFAULT_TARGET`, referenced a lexicon
    /// name the language has no builder for.
    #[error("lexicon {lexicon:?} references undefined lexicon {reference:?}")]
    UndefinedLexicon {
        /// Name of the lexicon containing the dangling reference.
        lexicon: String,
        /// The undefined name it referenced.
        reference: String,
    },
    /// One of a lexicon's rule patterns failed to compile.
    #[error("lexicon {lexicon:?} rule {rule_index}: {message}")]
    InvalidPattern {
        /// Name of the lexicon containing the bad rule.
        lexicon: String,
        /// Index of the offending rule.
        rule_index: usize,
        /// Rendering of the underlying regex-layer error.
        message: String,
    },
    /// Dynamic-item evaluation at build time (pattern construction, which
    /// only has `ARG` available) referenced `TEXT`/`MATCH`, which do not
    /// exist until a rule fires.
    #[error("lexicon {lexicon:?} rule {rule_index}: pattern references MATCH/TEXT, which are only available at match time")]
    MatchContextUnavailable {
        /// Name of the lexicon containing the bad rule.
        lexicon: String,
        /// Index of the offending rule.
        rule_index: usize,
    },
    /// A dynamic target evaluated to a value that isn't `int` or a lexicon
    /// reference.
    #[error("lexicon {lexicon:?} rule {rule_index}: target evaluated to a non-target value")]
    InvalidTargetValue {
        /// Name of the lexicon containing the bad rule.
        lexicon: String,
        /// Index of the offending rule.
        rule_index: usize,
    },
    /// A dynamic pattern evaluated to something other than a string or
    /// `None`.
    #[error("lexicon {lexicon:?} rule {rule_index}: dynamic pattern evaluated to a non-string value")]
    InvalidDynamicPattern {
        /// Name of the lexicon containing the bad rule.
        lexicon: String,
        /// Index of the offending rule.
        rule_index: usize,
    },
}
