use thiserror::Error;

/// Dynamic-item evaluation raised at match time (spec §7 "LexError"). The
/// lexer logs and skips the offending rule rather than propagating this —
/// it's exposed mainly so tests and `tracing` subscribers can inspect what
/// went wrong, not as something callers are expected to handle per event.
#[derive(Debug, Error)]
pub enum LexError {
    /// A dynamic action or target item failed to evaluate (e.g. `MATCH[n]`
    /// referenced a group absent from this rule's pattern, or `ARG` was
    /// referenced on a non-derived lexicon in a way the grammar didn't
    /// expect).
    #[error("lexicon {lexicon:?} rule {rule_index}: dynamic evaluation failed: {message}")]
    DynamicEvalFailed {
        /// Name of the lexicon whose rule failed to evaluate.
        lexicon: String,
        /// Index of the offending rule.
        rule_index: usize,
        /// Human-readable detail.
        message: String,
    },
    /// A dynamic target, once flattened, contained a value that isn't
    /// `int` or a lexicon reference.
    #[error("lexicon {lexicon:?} rule {rule_index}: target evaluated to a non-target value")]
    InvalidTargetValue {
        /// Name of the lexicon whose rule produced the bad target.
        lexicon: String,
        /// Index of the offending rule.
        rule_index: usize,
    },
    /// A target referenced a lexicon the language has no builder for.
    #[error("lexicon {lexicon:?} rule {rule_index} references undefined lexicon {reference:?}")]
    UndefinedLexicon {
        /// Name of the lexicon whose rule referenced the dangling name.
        lexicon: String,
        /// Index of the offending rule.
        rule_index: usize,
        /// The undefined name it referenced.
        reference: String,
    },
}
