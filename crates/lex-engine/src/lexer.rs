//! The stack-based lexer itself (spec §4.3).

use std::sync::Arc;

use lex_grammar::{ActionSpec, DynItem, EvalCtx, GrammarError, Language, Lexicon, LexiconRefSpec, TargetItem, Targets, Value};
use lex_span::Span;

use crate::error::LexError;
use crate::event::{Event, Lexeme, Target};

/// A pull-based lexer over one `Language`: a stack of active lexicons
/// (bottom = root), the current position, and the text buffer (spec §4.3
/// "State").
pub struct Lexer<'a> {
    language: &'a Language,
    stack: Vec<Arc<Lexicon>>,
    text: &'a str,
    pos: u32,
}

impl<'a> Lexer<'a> {
    /// Starts a fresh lex of `text` under `root`, at position `0`.
    #[must_use]
    pub fn new(language: &'a Language, root: Arc<Lexicon>, text: &'a str) -> Self {
        Self { language, stack: vec![root], text, pos: 0 }
    }

    /// Resumes a lex mid-stream with an already-established lexicon stack
    /// and position — what the builder's incremental rebuild uses to
    /// replay from a restart point (spec §4.4 step 3) instead of
    /// re-lexing from the start of the document.
    ///
    /// # Panics
    ///
    /// Panics if `stack` is empty; a lexer always has at least the root
    /// lexicon open.
    #[must_use]
    pub fn resume(language: &'a Language, stack: Vec<Arc<Lexicon>>, text: &'a str, pos: u32) -> Self {
        assert!(!stack.is_empty(), "lexer stack must contain at least the root lexicon");
        Self { language, stack, text, pos }
    }

    /// Current byte position.
    #[must_use]
    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// Current lexicon stack, bottom (root) first.
    #[must_use]
    pub fn stack(&self) -> &[Arc<Lexicon>] {
        &self.stack
    }

    /// Pulls the next event, or `None` at end of input (spec §4.3 step 4).
    pub fn next_event(&mut self) -> Option<Event> {
        loop {
            if self.pos as usize >= self.text.len() {
                return None;
            }
            #[allow(clippy::expect_used)]
            let top = self.stack.last().expect("stack never empties below the root").clone();

            match top.find_at(self.text, self.pos as usize) {
                Ok(Some(m)) => {
                    let q = m.start as u32;
                    let mut lexemes = Vec::new();
                    if q > self.pos {
                        if let Some(default_action) = top.default_action() {
                            if let Some(tok) = eval_default_action(&top, default_action, self.text, self.pos, q) {
                                lexemes.push(tok);
                            }
                        }
                    }

                    match self.eval_action(&top, m.rule_index, m.start as u32, m.end as u32, m.whole()) {
                        Ok(mut toks) => lexemes.append(&mut toks),
                        Err(e) => {
                            tracing::warn!(%e, "lex error evaluating action; skipping rule");
                            self.pos = (m.end as u32).max(self.pos + 1);
                            continue;
                        }
                    }

                    let target = match top.rule_targets(m.rule_index) {
                        Some(targets) => {
                            match self.eval_targets(&top, m.rule_index, targets, m.whole()) {
                                Ok(t) => Some(t),
                                Err(e) => {
                                    tracing::warn!(%e, "lex error evaluating target; skipping rule");
                                    self.pos = (m.end as u32).max(self.pos + 1);
                                    continue;
                                }
                            }
                        }
                        None => None,
                    };

                    self.pos = m.end as u32;
                    if let Some(t) = &target {
                        self.apply_target(t);
                    }
                    let unstable_left = top.rule_unstable_left(m.rule_index);
                    return Some(Event { target, lexemes, unstable_left });
                }
                Ok(None) => {
                    if let Some(default_target) = top.default_target() {
                        match self.eval_default_target(&top, default_target) {
                            Ok(t) if t.is_noop() || self.would_revisit(&t) => {
                                self.pos += 1;
                            }
                            Ok(t) => self.apply_target(&t),
                            Err(e) => {
                                tracing::warn!(%e, "lex error evaluating DEFAULT_TARGET");
                                self.pos += 1;
                            }
                        }
                        continue;
                    } else if self.stack.len() > 1 {
                        self.stack.pop();
                        continue;
                    }
                    self.pos += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "lexicon pattern failed to compile; treating as no match");
                    self.pos += 1;
                }
            }
        }
    }

    fn eval_action(
        &self,
        top: &Lexicon,
        rule_index: usize,
        start: u32,
        end: u32,
        whole: &str,
    ) -> Result<Vec<Lexeme>, LexError> {
        #[allow(clippy::expect_used)]
        let action = top
            .rule_action(rule_index)
            .expect("rule_index came from a match against this lexicon's own rules");
        match action {
            ActionSpec::Skip => Ok(Vec::new()),
            ActionSpec::Literal(name) => Ok(vec![(Span::new(start, end), name.clone(), None)]),
            ActionSpec::Dynamic(item) => {
                let value = eval_with_rule_groups(item, top, rule_index, whole)
                    .map_err(|source| dynamic_err(top, rule_index, &source))?;
                single_lexeme(value, start, end)
                    .map_err(|()| invalid_value_err(top, rule_index))
            }
            ActionSpec::ByGroup(actions) => self.eval_bygroup(top, rule_index, start, whole, actions),
        }
    }

    /// Evaluates a `bygroup` action: one lexeme per non-empty numbered
    /// group, each stamped with its 1-based position in the group — the
    /// last one's position negated (spec §3 "GroupToken").
    fn eval_bygroup(
        &self,
        top: &Lexicon,
        rule_index: usize,
        match_start: u32,
        whole: &str,
        actions: &[ActionSpec],
    ) -> Result<Vec<Lexeme>, LexError> {
        let mut out = Vec::new();
        for (i, action) in actions.iter().enumerate() {
            let n = i + 1;
            let Some((local_start, local_end)) = top.local_group_span(rule_index, whole, n) else {
                continue;
            };
            if local_start == local_end {
                continue;
            }
            let abs_start = match_start + local_start as u32;
            let abs_end = match_start + local_end as u32;
            let group_text = &whole[local_start..local_end];
            let name = match action {
                ActionSpec::Skip => continue,
                ActionSpec::Literal(name) => name.clone(),
                ActionSpec::Dynamic(item) => {
                    let ctx = EvalCtx::Match { whole: group_text, group: &|_| None, arg: top.arg() };
                    let value = item
                        .eval(&ctx)
                        .map_err(|source| dynamic_err(top, rule_index, &source))?;
                    match value {
                        Value::Skip | Value::None => continue,
                        Value::Str(s) | Value::Action(s) => s,
                        _ => return Err(invalid_value_err(top, rule_index)),
                    }
                }
                ActionSpec::ByGroup(_) => {
                    return Err(LexError::DynamicEvalFailed {
                        lexicon: top.name().to_string(),
                        rule_index,
                        message: "nested bygroup is not supported".to_string(),
                    })
                }
            };
            out.push((Span::new(abs_start, abs_end), name));
        }
        let last = out.len();
        Ok(out
            .into_iter()
            .enumerate()
            .map(|(i, (span, name))| {
                let position = if i + 1 == last { -((i as i32) + 1) } else { (i as i32) + 1 };
                (span, name, Some(position))
            })
            .collect())
    }

    fn eval_targets(
        &self,
        top: &Lexicon,
        rule_index: usize,
        targets: &Targets,
        whole: &str,
    ) -> Result<Target, LexError> {
        let values = match targets {
            Targets::Static(items) => items.iter().map(target_item_to_value).collect(),
            Targets::Dynamic(item) => {
                let value = eval_with_rule_groups(item, top, rule_index, whole)
                    .map_err(|source| dynamic_err(top, rule_index, &source))?;
                flatten_value(value)
            }
        };
        self.resolve_target_values(values, top, rule_index)
    }

    fn eval_default_target(&self, top: &Lexicon, targets: &Targets) -> Result<Target, LexError> {
        let values = match targets {
            Targets::Static(items) => items.iter().map(target_item_to_value).collect(),
            Targets::Dynamic(item) => {
                let ctx = EvalCtx::Build { arg: top.arg() };
                let value = item.eval(&ctx).map_err(|_| LexError::DynamicEvalFailed {
                    lexicon: top.name().to_string(),
                    rule_index: usize::MAX,
                    message: "DEFAULT_TARGET referenced MATCH/TEXT, unavailable without a match"
                        .to_string(),
                })?;
                flatten_value(value)
            }
        };
        self.resolve_target_values(values, top, usize::MAX)
    }

    fn resolve_target_values(
        &self,
        values: Vec<Value>,
        top: &Lexicon,
        rule_index: usize,
    ) -> Result<Target, LexError> {
        enum Op {
            Repeat(u32),
            Named(LexiconRefSpec),
        }

        let mut pop_total: i64 = 0;
        let mut ops = Vec::new();
        for v in values {
            match v {
                Value::Int(n) if n < 0 => pop_total += i64::from(-n),
                Value::Int(0) | Value::None => {}
                Value::Int(n) => ops.push(Op::Repeat(n as u32)),
                Value::Lexicon(spec) => ops.push(Op::Named(spec)),
                _ => return Err(invalid_value_err(top, rule_index)),
            }
        }

        let max_pop = (self.stack.len() - 1) as i64;
        let pop = pop_total.clamp(0, max_pop) as u32;
        let mut current = self.stack[self.stack.len() - 1 - pop as usize].clone();
        let mut push = Vec::new();
        for op in ops {
            match op {
                Op::Repeat(n) => {
                    for _ in 0..n {
                        push.push(current.clone());
                    }
                }
                Op::Named(spec) => {
                    let lex = self.language.get(spec.name(), spec.arg()).map_err(|_| {
                        LexError::UndefinedLexicon {
                            lexicon: top.name().to_string(),
                            rule_index,
                            reference: spec.name().to_string(),
                        }
                    })?;
                    push.push(lex.clone());
                    current = lex;
                }
            }
        }
        Ok(Target { pop, push })
    }

    fn apply_target(&mut self, target: &Target) {
        for _ in 0..target.pop {
            if self.stack.len() > 1 {
                self.stack.pop();
            }
        }
        for lex in &target.push {
            self.stack.push(lex.clone());
        }
    }

    /// Whether applying `target` would push a lexicon already open on the
    /// stack without popping — the circular `DEFAULT_TARGET` case spec
    /// §4.2 calls out, broken by advancing one character instead.
    fn would_revisit(&self, target: &Target) -> bool {
        target.pop == 0
            && target.push.iter().any(|pushed| self.stack.iter().any(|open| Arc::ptr_eq(open, pushed)))
    }
}

fn target_item_to_value(item: &TargetItem) -> Value {
    match item {
        TargetItem::Int(n) => Value::Int(*n),
        TargetItem::Push(spec) => Value::Lexicon(spec.clone()),
    }
}

fn eval_with_rule_groups(
    item: &DynItem,
    top: &Lexicon,
    rule_index: usize,
    whole: &str,
) -> Result<Value, GrammarError> {
    let group = |n: usize| top.local_group(rule_index, whole, n);
    let ctx = EvalCtx::Match { whole, group: &group, arg: top.arg() };
    item.eval(&ctx)
}

fn eval_default_action(
    top: &Lexicon,
    action: &ActionSpec,
    text: &str,
    start: u32,
    end: u32,
) -> Option<Lexeme> {
    let gap = &text[start as usize..end as usize];
    let name = match action {
        ActionSpec::Skip => return None,
        ActionSpec::Literal(name) => name.clone(),
        ActionSpec::Dynamic(item) => {
            let ctx = EvalCtx::Match { whole: gap, group: &|_| None, arg: top.arg() };
            match item.eval(&ctx) {
                Ok(Value::Str(s) | Value::Action(s)) => s,
                Ok(Value::Skip | Value::None) => return None,
                Ok(_) | Err(_) => {
                    tracing::warn!(lexicon = top.name(), "DEFAULT_ACTION evaluation failed");
                    return None;
                }
            }
        }
        ActionSpec::ByGroup(_) => {
            tracing::warn!(lexicon = top.name(), "DEFAULT_ACTION cannot use bygroup");
            return None;
        }
    };
    Some((Span::new(start, end), name, None))
}

fn single_lexeme(value: Value, start: u32, end: u32) -> Result<Vec<Lexeme>, ()> {
    match value {
        Value::Skip | Value::None => Ok(Vec::new()),
        Value::Str(s) | Value::Action(s) => Ok(vec![(Span::new(start, end), s, None)]),
        _ => Err(()),
    }
}

fn flatten_value(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.into_iter().flat_map(flatten_value).collect(),
        other => vec![other],
    }
}

fn dynamic_err(top: &Lexicon, rule_index: usize, source: &GrammarError) -> LexError {
    LexError::DynamicEvalFailed {
        lexicon: top.name().to_string(),
        rule_index,
        message: source.to_string(),
    }
}

fn invalid_value_err(top: &Lexicon, rule_index: usize) -> LexError {
    LexError::InvalidTargetValue { lexicon: top.name().to_string(), rule_index }
}
