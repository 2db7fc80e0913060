//! Route resolution.
//!
//! [`resolve`] walks a route tree against a token sequence and returns the
//! deepest matching node together with the number of tokens consumed as its
//! alias trail.
//!
//! Rules:
//! - A default root matches at depth 0, even with no tokens.
//! - Otherwise the first token must match a root alias.
//! - Each further token is tried against every subroute with that alias.
//!   The deepest candidate wins; among equally deep candidates the one
//!   registered last wins.
//! - Default subroutes are never descended into.

use crate::route::Route;

/// A resolved route and the path that led to it.
#[derive(Debug, Clone)]
pub struct Resolution<'r> {
    chain: Vec<&'r Route>,
    depth: usize,
}

impl<'r> Resolution<'r> {
    /// The matched route.
    pub fn route(&self) -> &'r Route {
        // chain always holds at least the root
        self.chain[self.chain.len() - 1]
    }

    /// Routes from the root down to the match, inclusive.
    pub fn chain(&self) -> &[&'r Route] {
        &self.chain
    }

    /// Number of leading tokens consumed as the alias trail.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Finds the deepest route in `root`'s tree that matches `tokens`.
///
/// Returns `None` when the message is not addressed to this tree.
pub fn resolve<'r>(root: &'r Route, tokens: &[String]) -> Option<Resolution<'r>> {
    if root.is_default() {
        return Some(Resolution {
            chain: vec![root],
            depth: 0,
        });
    }

    let first = tokens.first()?;
    if !root.has_alias(first) {
        return None;
    }

    let (chain, depth) = descend(root, tokens, 1);
    Some(Resolution { chain, depth })
}

/// Returns the best path below `node`, which matched `tokens[..depth]`.
fn descend<'r>(node: &'r Route, tokens: &[String], depth: usize) -> (Vec<&'r Route>, usize) {
    let mut best: Option<(Vec<&'r Route>, usize)> = None;

    if let Some(next) = tokens.get(depth) {
        for child in node.find_all(next) {
            let candidate = descend(child, tokens, depth + 1);
            // `>=` lets later siblings shadow earlier ones at equal depth
            if best.as_ref().is_none_or(|(_, d)| candidate.1 >= *d) {
                best = Some(candidate);
            }
        }
    }

    match best {
        Some((path, d)) => {
            let mut chain = Vec::with_capacity(path.len() + 1);
            chain.push(node);
            chain.extend(path);
            (chain, d)
        }
        None => (vec![node], depth),
    }
}
