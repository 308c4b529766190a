//! Folds a lexer's event stream into a tree, and re-lexes only what an edit
//! invalidated (spec §4.4).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lex_engine::{Event, Lexer};
use lex_grammar::Language;
use lex_span::Edit;
use lex_tree::{ancestors_of, Context, ContextRef, LexiconId, Node, Token};

use crate::config::Config;
use crate::error::BuildError;
use crate::event::{BuildEvent, BuildStats};

/// Builds a tree from scratch, or incrementally rebuilds one after an edit.
///
/// A `Builder` is cheap to create and holds no tree state of its own between
/// calls; the tree it produces is the caller's to keep and pass back into
/// the next `rebuild`.
pub struct Builder<'a> {
    language: &'a Language,
    root: LexiconId,
    config: Config,
    events: Vec<BuildEvent>,
}

impl<'a> Builder<'a> {
    /// Creates a builder that lexes `root` over `language`.
    #[must_use]
    pub fn new(language: &'a Language, root: LexiconId) -> Self {
        Self { language, root, config: Config::default(), events: Vec::new() }
    }

    /// Overrides the default rebuild heuristics.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// The build log from the most recent `tree` or `rebuild` call.
    #[must_use]
    pub fn events(&self) -> &[BuildEvent] {
        &self.events
    }

    /// Lexes `text` from scratch into a complete tree.
    #[must_use]
    pub fn tree(&mut self, text: &str) -> Context {
        self.events.clear();
        let mut lexer = Lexer::new(self.language, self.root.clone(), text);
        let mut stack = vec![Context::root(self.root.clone())];
        while let Some(event) = lexer.next_event() {
            let depth = lexer.stack().len();
            let _ = self.apply_event(&mut stack, event, text, depth);
        }
        self.close_remaining(&mut stack);
        self.events.push(BuildEvent::Finished);
        #[allow(clippy::expect_used)]
        stack.pop().expect("root frame is always present")
    }

    /// Re-lexes `new_text` starting from a restart point to the left of
    /// `edit`, reusing as much of `old_root` as the reconvergence heuristic
    /// (`Config::reuse_run_len`) allows.
    ///
    /// `cancel` is checked between every lexer event; once observed set, the
    /// replay aborts without touching `old_root` and returns
    /// [`BuildError::Cancelled`] (spec §4.5 "in-flight interrupt").
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Inconsistent`] if `old_root` doesn't resolve the
    /// restart path the search computed — only possible if `old_root` wasn't
    /// produced by this crate for text related to `new_text` by `edit`.
    ///
    /// Returns [`BuildError::Cancelled`] if `cancel` is observed set before
    /// the replay reconverges or reaches the end of `new_text`.
    pub fn rebuild(
        &mut self,
        old_root: &Context,
        new_text: &str,
        edit: Edit,
        cancel: &AtomicBool,
    ) -> Result<RebuildResult, BuildError> {
        self.events.clear();
        self.events.push(BuildEvent::Replace);

        let mut flat_old = Vec::new();
        flatten(old_root, &mut flat_old);

        let (mut stack, restart_pos, mut old_cursor, restart_walk_len) =
            self.seed_replay(old_root, &flat_old, edit)?;

        if let Some(last) = stack.last() {
            let path = last.parent.clone().unwrap_or_default();
            self.events.push(BuildEvent::Invalidate(path));
        }

        let mut lexer = Lexer::resume(
            self.language,
            stack.iter().map(|c| c.lexicon.clone()).collect(),
            new_text,
            restart_pos,
        );

        let mut run = 0usize;
        let mut nodes_relexed = 0usize;
        let mut replay_events = 0usize;
        let mut converged = false;

        while let Some(event) = lexer.next_event() {
            if cancel.load(Ordering::Acquire) {
                return Err(BuildError::Cancelled);
            }
            replay_events += 1;
            let lexemes = event.lexemes.clone();
            let depth = lexer.stack().len();
            let ancestry = self.apply_event(&mut stack, event, new_text, depth);
            nodes_relexed += lexemes.len();

            for (span, action, _group) in &lexemes {
                let is_match = old_cursor < flat_old.len() && {
                    let old_tok = flat_old[old_cursor];
                    *old_tok.text == *span.slice(new_text)
                        && *old_tok.action == **action
                        && span.start == edit.translate(old_tok.pos)
                        && stacks_match(&ancestry, old_root, &old_tok.parent)
                };
                if is_match {
                    run += 1;
                    old_cursor += 1;
                    if run >= self.config.reuse_run_len {
                        converged = true;
                        break;
                    }
                } else {
                    run = 0;
                    old_cursor = (old_cursor + 1).min(flat_old.len());
                }
            }
            if converged {
                break;
            }
        }

        let nodes_reused = if converged {
            let m = old_cursor - 1;
            let m_path = flat_old[m].parent.clone();
            let ancestors = ancestors_of(old_root, &m_path);
            let reused = flat_old.len() - old_cursor;
            splice_reused_suffix(&mut stack, &ancestors, &m_path, edit.delta());
            reused
        } else {
            0
        };

        let open_lexicons = if converged { Vec::new() } else { lexer.stack().to_vec() };

        self.close_remaining(&mut stack);
        self.events.push(BuildEvent::Finished);
        #[allow(clippy::expect_used)]
        let root = stack.pop().expect("root frame is always present");

        let stats = BuildStats { nodes_reused, nodes_relexed, restart_walk_len, replay_events };
        Ok(RebuildResult { root, start: restart_pos, end: lexer.pos(), open_lexicons, stats })
    }

    /// Applies one lexer event, returning the lexicon-identity chain the
    /// stack held at the instant its lexemes were actually attached (not
    /// necessarily the stack as left after the event's own target runs) —
    /// this is what `rebuild` compares against the old tree's ancestry, so
    /// it has to reflect attachment time, not call-return time.
    ///
    /// `next_event` can silently pop lexicons with no match and no
    /// `DEFAULT_TARGET` before it ever finds the rule that actually fires,
    /// without surfacing those pops as events of their own — `final_depth`
    /// (the engine's live stack length right after the call) is how we
    /// recover them. The rule's own `target.pop`/`target.push` tell us how
    /// much of the gap between the stack size before this call and
    /// `final_depth` belongs to this event's own target versus to pops that
    /// happened earlier in the same call; lexemes attach at the depth the
    /// rule actually matched at (after any such earlier silent pops, before
    /// its own target is applied).
    fn apply_event(
        &mut self,
        stack: &mut Vec<Context>,
        event: Event,
        text: &str,
        final_depth: usize,
    ) -> Vec<LexiconId> {
        let pop_own = event.target.as_ref().map_or(0, |t| t.pop as usize);
        let push_own = event.target.as_ref().map_or(0, |t| t.push.len());
        let match_depth = (final_depth + pop_own).saturating_sub(push_own).max(1);

        self.pop_to(stack, match_depth);

        let consume_into_child =
            event.target.as_ref().and_then(|t| t.push.first()).is_some_and(|lex| lex.consume());
        let ancestry = if consume_into_child {
            None
        } else {
            let ancestry = stack_ancestry(stack);
            attach_lexemes(stack, &event.lexemes, text, event.unstable_left);
            Some(ancestry)
        };

        if let Some(target) = &event.target {
            self.pop_to(stack, match_depth.saturating_sub(target.pop as usize));
            for lexicon in &target.push {
                let path = next_child_path(stack);
                stack.push(Context::new(lexicon.clone(), path));
            }
        }

        match ancestry {
            Some(ancestry) => ancestry,
            None => {
                let ancestry = stack_ancestry(stack);
                attach_lexemes(stack, &event.lexemes, text, event.unstable_left);
                ancestry
            }
        }
    }

    /// Pops frames down to `target_len` (never below the root), attaching
    /// non-empty ones as children and emitting `Updated` for each, and
    /// silently discarding any that finished empty.
    fn pop_to(&mut self, stack: &mut Vec<Context>, target_len: usize) {
        while stack.len() > target_len.max(1) {
            #[allow(clippy::expect_used)]
            let finished = stack.pop().expect("checked len > 1 before popping");
            if finished.is_empty() {
                continue;
            }
            let start = finished.pos();
            let end = finished.end();
            attach_node(stack, Node::Context(finished));
            self.events.push(BuildEvent::Updated { start, end });
        }
    }

    /// Pops every frame above the root at the end of a build, attaching
    /// non-empty ones as children and emitting `Updated` for each.
    fn close_remaining(&mut self, stack: &mut Vec<Context>) {
        self.pop_to(stack, 1);
    }

    /// Finds the restart point to the left of `edit`, walking further left
    /// past zero-width tokens and tokens whose firing rule is marked
    /// `unstable_left` (the restart-instability signals a completed tree
    /// still carries, short of re-lexing everything), and seeds the
    /// per-level frames with the unaffected prefix of the old tree.
    fn seed_replay(
        &self,
        old_root: &Context,
        flat_old: &[&Token],
        edit: Edit,
    ) -> Result<(Vec<Context>, u32, usize, usize), BuildError> {
        let first_after = flat_old.partition_point(|t| t.end() <= edit.pos);
        if first_after == 0 {
            return Ok((vec![Context::root(self.root.clone())], 0, 0, 0));
        }

        let mut idx = first_after - 1;
        let mut walked = 0usize;
        while idx > 0
            && (flat_old[idx].span().is_empty() || flat_old[idx].unstable_left)
            && walked < self.config.restart_walk_limit
        {
            idx -= 1;
            walked += 1;
        }

        let restart_path = flat_old[idx].parent.clone();
        let ancestors = ancestors_of(old_root, &restart_path);
        if ancestors.is_empty() {
            return Err(BuildError::Inconsistent { path: restart_path });
        }
        let frames = seed_prefix_frames(&ancestors, &restart_path);
        let new_pos = edit.translate(flat_old[idx].end());
        Ok((frames, new_pos, idx + 1, walked))
    }
}

/// The outcome of a `Builder::rebuild` call.
#[derive(Debug, Clone)]
pub struct RebuildResult {
    /// The rebuilt tree.
    pub root: Context,
    /// Start byte offset of the region that was actually re-lexed.
    pub start: u32,
    /// End byte offset of the region that was actually re-lexed.
    pub end: u32,
    /// Lexicons still open on the stack at the end of lexing — non-empty
    /// only when the rebuild ran off the end of the text with an unclosed
    /// construct (e.g. an unterminated string) and never reconverged.
    pub open_lexicons: Vec<LexiconId>,
    /// How much of the rebuild was reused versus re-lexed.
    pub stats: BuildStats,
}

fn attach_lexemes(stack: &mut [Context], lexemes: &[lex_engine::Lexeme], text: &str, unstable_left: bool) {
    let Some(top) = stack.last_mut() else { return };
    let own_path = top.parent.clone().unwrap_or_default();
    for (span, action, group) in lexemes {
        let mut path = own_path.clone();
        path.push(top.children.len());
        let mut tok = Token::new(span.slice(text), span.start, action.clone(), path);
        tok.group = *group;
        tok.unstable_left = unstable_left;
        top.children.push(Node::Token(tok));
    }
}

/// Snapshots the lexicon-identity chain the stack currently holds, bottom
/// (root) to top.
fn stack_ancestry(stack: &[Context]) -> Vec<LexiconId> {
    stack.iter().map(|c| c.lexicon.clone()).collect()
}

fn attach_node(stack: &mut [Context], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn next_child_path(stack: &[Context]) -> ContextRef {
    #[allow(clippy::expect_used)]
    let top = stack.last().expect("at least the root frame is always present");
    let mut path = top.parent.clone().unwrap_or_default();
    path.push(top.children.len());
    path
}

/// Collects every token in `ctx`, in document order.
fn flatten<'c>(ctx: &'c Context, out: &mut Vec<&'c Token>) {
    for child in &ctx.children {
        match child {
            Node::Token(t) => out.push(t),
            Node::Context(c) => flatten(c, out),
        }
    }
}

/// Seeds one frame per ancestor level with the old tree's content strictly
/// before the restart point (inclusive, at the innermost level, of the
/// restart token itself — everything up to and including it is untouched).
fn seed_prefix_frames(ancestors: &[&Context], restart_path: &[usize]) -> Vec<Context> {
    ancestors
        .iter()
        .enumerate()
        .map(|(level, old_ctx)| {
            let keep_end = if level + 1 == ancestors.len() {
                restart_path[level] + 1
            } else {
                restart_path[level]
            };
            let mut ctx = if level == 0 {
                Context::root(old_ctx.lexicon.clone())
            } else {
                Context::new(old_ctx.lexicon.clone(), old_ctx.parent.clone().unwrap_or_default())
            };
            ctx.children = old_ctx.children[..keep_end].to_vec();
            ctx
        })
        .collect()
}

/// Whether an ancestry snapshot taken at attachment time matches the old
/// tree's ancestor chain for `old_path`, lexicon-for-lexicon by identity.
fn stacks_match(new_ancestry: &[LexiconId], old_root: &Context, old_path: &[usize]) -> bool {
    let old_ancestors = ancestors_of(old_root, old_path);
    new_ancestry.len() == old_ancestors.len()
        && new_ancestry.iter().zip(old_ancestors.iter()).all(|(n, o)| Arc::ptr_eq(n, &o.lexicon))
}

/// Deep-clones `node`, shifting every descendant token's position by `delta`
/// and recomputing every descendant's `parent` path to reflect `index`'s
/// position under `parent_path` in the new tree.
fn rebase(node: &Node, delta: i64, parent_path: &ContextRef, index: usize) -> Node {
    let mut own_path = parent_path.clone();
    own_path.push(index);
    match node {
        Node::Token(t) => {
            let new_pos = (i64::from(t.pos) + delta).max(0) as u32;
            let mut nt = Token::new(t.text.clone(), new_pos, t.action.clone(), own_path);
            nt.group = t.group;
            nt.unstable_left = t.unstable_left;
            Node::Token(nt)
        }
        Node::Context(c) => {
            let mut nc = Context::new(c.lexicon.clone(), own_path.clone());
            nc.children =
                c.children.iter().enumerate().map(|(i, child)| rebase(child, delta, &own_path, i)).collect();
            Node::Context(nc)
        }
    }
}

/// Grafts everything after the converged token, at every ancestor level, in
/// from innermost to root, shifting positions by `delta` as it goes. Leaves
/// `new_stack` with exactly the root frame, fully populated.
fn splice_reused_suffix(
    new_stack: &mut Vec<Context>,
    ancestors_old: &[&Context],
    m_path: &[usize],
    delta: i64,
) {
    for level in (0..ancestors_old.len()).rev() {
        let old_ctx = ancestors_old[level];
        let cut_after = m_path[level];
        {
            #[allow(clippy::expect_used)]
            let new_frame = new_stack.last_mut().expect("one new frame per ancestor level");
            let own_path = new_frame.parent.clone().unwrap_or_default();
            let start_index = new_frame.children.len();
            for (offset, child) in old_ctx.children[cut_after + 1..].iter().enumerate() {
                new_frame.children.push(rebase(child, delta, &own_path, start_index + offset));
            }
        }
        if level == 0 {
            break;
        }
        #[allow(clippy::expect_used)]
        let finished = new_stack.pop().expect("frame just extended is still present");
        if let Some(parent) = new_stack.last_mut() {
            parent.children.push(Node::Context(finished));
        }
    }
}
