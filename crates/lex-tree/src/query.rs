//! Positional lookup. Deliberately minimal — spec §1 excludes the
//! tree-query mini-DSL from this core's scope, but stating and testing the
//! invariants needs at least "find the token at a position" and "find its
//! ancestors".

use crate::node::{Context, Node, Token};

/// Finds the token covering byte offset `pos`, returning its full index
/// path from the root alongside a reference to it.
///
/// A zero-width token only matches a `pos` exactly equal to its own
/// position; a non-zero-width token matches the half-open range
/// `[pos, end)`, consistent with how spans are treated everywhere else in
/// this tree (spec invariant 1 permits zero-width tokens from non-default
/// rules).
#[must_use]
pub fn token_at(root: &Context, pos: u32) -> Option<(Vec<usize>, &Token)> {
    let mut path = Vec::new();
    find_in(root, pos, &mut path)
}

fn find_in<'a>(ctx: &'a Context, pos: u32, path: &mut Vec<usize>) -> Option<(Vec<usize>, &'a Token)> {
    for (i, child) in ctx.children.iter().enumerate() {
        if !contains_pos(child, pos) {
            continue;
        }
        path.push(i);
        let found = match child {
            Node::Token(t) => Some((path.clone(), t)),
            Node::Context(c) => find_in(c, pos, path),
        };
        path.pop();
        if found.is_some() {
            return found;
        }
    }
    None
}

fn contains_pos(node: &Node, pos: u32) -> bool {
    let (start, end) = (node.pos(), node.end());
    if start == end {
        start == pos
    } else {
        start <= pos && pos < end
    }
}

/// Returns every context strictly containing the node at `path`, root
/// first. An empty `path` (the root itself) has no ancestors and returns
/// an empty list.
#[must_use]
pub fn ancestors_of<'a>(root: &'a Context, path: &[usize]) -> Vec<&'a Context> {
    if path.is_empty() {
        return Vec::new();
    }
    let mut out = vec![root];
    let mut current = root;
    for &i in &path[..path.len() - 1] {
        let Some(Node::Context(c)) = current.children.get(i) else { break };
        current = c;
        out.push(current);
    }
    out
}
