//! Matching a [`Pattern`] against a [`Node`] tree (spec §3 `Matcher`, §4.G).
//!
//! A pattern matches a candidate node when: its own hole/literal
//! constraint accepts the candidate, and its pattern children can be
//! found, in order, among the candidate's children — not necessarily
//! contiguous or exhaustive (spec §4.G: "ordered subsequence", i.e. a
//! pattern may ignore extra candidate children between the ones it cares
//! about). `match_all` tries every node of the tree as a candidate root, in
//! pre-order, and is exhaustive rather than reentrancy-aware: nested
//! matches (a match inside another match) are both reported, the same way
//! ast-grep's `Visitor::reentrant(true)` behaves by default.

use crate::cancel::CancellationToken;
use crate::node::Node;
use crate::pattern::{Pattern, PatternAction, PatternKind, PatternNode};
use crate::traversal::Pre;

/// One embedded edit found while matching, ready to be handed to
/// [`crate::patcher`]: `anchor` is the *candidate* node this pattern
/// position matched, not the pattern node itself.
#[derive(Debug, Clone)]
pub struct Edit {
  pub anchor: Node,
  pub action: PatternAction,
  pub insertions: Vec<Node>,
}

/// One occurrence of a pattern within a tree.
#[derive(Debug, Clone)]
pub struct Match {
  pub root: Node,
  pub edits: Vec<Edit>,
}

pub struct Matcher;

impl Matcher {
  /// Every node in `tree` (pre-order) whose subtree matches `pattern`.
  ///
  /// `cancel` is checked once per candidate root (spec §5: "checked only
  /// at safe points" — between matches here, never inside `match_node`'s
  /// own recursion). On cancellation, returns an empty set rather than a
  /// partial one (spec §5: "on cancel they return a partial DummyNode /
  /// empty set" — the latter for `Matcher`, since a partial match set is
  /// not a meaningfully smaller one to a caller).
  pub fn match_all(pattern: &Pattern, tree: &Node, cancel: Option<&CancellationToken>) -> Vec<Match> {
    let mut out = Vec::new();
    for candidate in Pre::new(tree) {
      if cancel.is_some_and(CancellationToken::is_cancelled) {
        return Vec::new();
      }
      if let Some(edits) = match_node(&pattern.root, candidate) {
        out.push(Match { root: candidate.clone(), edits });
      }
    }
    out
  }

  /// Whether `pattern` matches `candidate` itself (not its descendants).
  pub fn matches(pattern: &Pattern, candidate: &Node) -> bool {
    match_node(&pattern.root, candidate).is_some()
  }
}

fn match_node(pattern: &PatternNode, candidate: &Node) -> Option<Vec<Edit>> {
  if !pattern.belongs_to_required_group(candidate) {
    return None;
  }
  if let PatternKind::Literal { data: Some(expected), .. } = &pattern.kind {
    if expected != candidate.data() {
      return None;
    }
  }
  let children_pattern: &[PatternNode] = match &pattern.kind {
    PatternKind::Literal { children, .. } => children,
    PatternKind::Hole(_) => &[],
  };

  let mut edits = Vec::new();
  if !match_subsequence(children_pattern, candidate.children(), &mut edits) {
    return None;
  }

  if !matches!(pattern.action, PatternAction::None) || !pattern.insert_after.is_empty() {
    edits.push(Edit {
      anchor: candidate.clone(),
      action: pattern.action.clone(),
      insertions: pattern.insert_after.clone(),
    });
  }
  Some(edits)
}

/// Finds an assignment of `patterns` to an ordered subsequence of
/// `candidates` (each pattern consuming exactly one candidate, in order,
/// skipping any candidates in between), accumulating edits as it goes.
/// Backtracks on failure; candidate lists in this crate are small enough
/// (one node's direct children) that this is not worth memoizing.
fn match_subsequence(patterns: &[PatternNode], candidates: &[Node], edits: &mut Vec<Edit>) -> bool {
  if patterns.is_empty() {
    return true;
  }
  if candidates.is_empty() {
    return false;
  }
  let (first_pattern, rest_patterns) = patterns.split_first().expect("non-empty");
  if let Some(mut head_edits) = match_node(first_pattern, &candidates[0]) {
    let mut trial = edits.clone();
    trial.append(&mut head_edits);
    if match_subsequence(rest_patterns, &candidates[1..], &mut trial) {
      *edits = trial;
      return true;
    }
  }
  match_subsequence(patterns, &candidates[1..], edits)
}
