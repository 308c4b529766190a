//! The build log a single `tree`/`rebuild` call produces.

use lex_tree::ContextRef;

/// An index path addressing a node in a tree, relative to its root.
pub type NodePath = ContextRef;

/// One step of a build, in the order `tree`/`rebuild` emit them: any
/// `Replace` comes first, then `Invalidate`s, then `Updated`s, then exactly
/// one `Finished`.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    /// A rebuild is replacing part of the previous tree. Emitted once, at
    /// the start of `Builder::rebuild`; never emitted by `Builder::tree`.
    Replace,
    /// The subtree rooted at `path` (in the previous tree) is being
    /// discarded and re-lexed.
    Invalidate(NodePath),
    /// A context finished and was attached to its parent, covering
    /// `[start, end)` of the text.
    Updated {
        /// Start byte offset of the finished context.
        start: u32,
        /// End byte offset of the finished context.
        end: u32,
    },
    /// The build is complete; the returned tree is final.
    Finished,
}

/// Counters describing how much of a rebuild was actually re-lexed versus
/// reused from the previous tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildStats {
    /// Tokens spliced in from the previous tree without being re-lexed.
    pub nodes_reused: usize,
    /// Lexemes produced by re-running the lexer.
    pub nodes_relexed: usize,
    /// How many tokens the restart-point search walked past (zero for a
    /// full `tree` build).
    pub restart_walk_len: usize,
    /// Number of lexer events processed during replay.
    pub replay_events: usize,
}
