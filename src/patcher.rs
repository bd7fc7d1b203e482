//! Applying a matched [`Pattern`]'s embedded edits back into its tree (spec
//! §3 `Patcher`, §4.H).
//!
//! `DefaultPatcher::patch` finds every match, discards any match whose
//! root strictly contains another match's root ("innermost-match-wins":
//! outer matches yield to the more specific nested ones so the same edit
//! is never applied twice at two nesting levels), then folds every
//! surviving match's edits into one [`DiffTreeBuilder`] keyed by anchor
//! identity — the same identity-anchored mechanism [`crate::traversal::NodeReplacer`]
//! uses for a single swap, generalized here to many. A conflicting edit
//! (the builder's stacking rules reject it) is skipped and recorded as an
//! [`CoreError::IncompatibleTransform`] warning rather than aborting the
//! whole patch.

use crate::cancel::CancellationToken;
use crate::diff::DiffTreeBuilder;
use crate::error::CoreError;
use crate::matcher::{Match, Matcher};
use crate::node::{dummy_node, Node};
use crate::pattern::{Pattern, PatternAction};
use crate::traversal::Pre;

pub struct DefaultPatcher;

impl DefaultPatcher {
  /// Returns the patched tree and any non-fatal warnings. If `pattern`
  /// matches nowhere, returns a deep copy of `tree` unchanged (spec §4.H:
  /// "deep-copy if no matches").
  ///
  /// `cancel` is checked before matching starts and again before the edits
  /// are folded in; on cancellation returns `dummy_node()` rather than a
  /// patched tree (spec §5: "on cancel they return a partial DummyNode").
  pub fn patch(pattern: &Pattern, tree: &Node, cancel: Option<&CancellationToken>) -> (Node, Vec<CoreError>) {
    if cancel.is_some_and(CancellationToken::is_cancelled) {
      return (dummy_node(), Vec::new());
    }
    let matches = Matcher::match_all(pattern, tree, cancel);
    if cancel.is_some_and(CancellationToken::is_cancelled) {
      return (dummy_node(), Vec::new());
    }
    if matches.is_empty() {
      return (tree.deep_clone(), Vec::new());
    }

    let kept = innermost_only(&matches);
    let mut builder = DiffTreeBuilder::new(tree.clone());
    let mut warnings = Vec::new();

    for m in &kept {
      for edit in &m.edits {
        let applied = match &edit.action {
          PatternAction::None => true,
          PatternAction::Replace(replacement) => builder.replace_node(&edit.anchor, replacement.clone()),
          PatternAction::Delete => builder.delete_node(&edit.anchor),
        };
        if !applied {
          warnings.push(CoreError::IncompatibleTransform {
            reason: format!("conflicting edit at `{}` node", edit.anchor.type_name()),
          });
          continue;
        }
        for insertion in &edit.insertions {
          if !builder.insert_node(&edit.anchor, insertion.clone()) {
            warnings.push(CoreError::IncompatibleTransform {
              reason: format!("insertion rejected at deleted anchor `{}`", edit.anchor.type_name()),
            });
          }
        }
      }
    }

    for warning in &warnings {
      tracing::warn!("{warning}");
    }

    (builder.build().after(), warnings)
  }
}

/// Drops any match whose root strictly contains another match's root.
fn innermost_only(matches: &[Match]) -> Vec<&Match> {
  matches
    .iter()
    .filter(|candidate| {
      !matches
        .iter()
        .any(|other| !other.root.is_same_node(&candidate.root) && contains(&candidate.root, &other.root))
    })
    .collect()
}

fn contains(ancestor: &Node, other: &Node) -> bool {
  Pre::new(ancestor).skip(1).any(|n| n.is_same_node(other))
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::pattern::PatternBuilder;
  use crate::types::{ChildDescriptor, SimpleType, Type};

  fn leaf(name: &str, data: &str) -> Node {
    let ty = SimpleType::new(name).into_ref();
    let mut b = ty.new_builder();
    b.set_data(data);
    b.set_children_list(vec![]);
    b.create_node().unwrap()
  }

  fn branch(name: &str, children: Vec<Node>) -> Node {
    let descriptors: Vec<_> = children
      .iter()
      .map(|c| ChildDescriptor::required(c.type_name()))
      .collect();
    let ty = SimpleType::new(name).with_children(descriptors).into_ref();
    let mut b = ty.new_builder();
    b.set_data("");
    b.set_children_list(children);
    b.create_node().unwrap()
  }

  /// A node whose hierarchy also includes `"Any"`, so a hole declared
  /// against a plain `"Any"`-typed node matches it regardless of its own
  /// concrete type name.
  fn any_typed(name: &str, children: Vec<Node>) -> Node {
    let descriptors: Vec<_> = children
      .iter()
      .map(|c| ChildDescriptor::required(c.type_name()))
      .collect();
    let ty = SimpleType::new(name)
      .with_children(descriptors)
      .with_hierarchy(vec![name.to_string(), "Any".to_string()])
      .into_ref();
    let mut b = ty.new_builder();
    b.set_data("");
    b.set_children_list(children);
    b.create_node().unwrap()
  }

  #[test]
  fn test_patch_replaces_matched_node() {
    let tree = branch("X", vec![leaf("A", "1"), leaf("B", "2")]);
    let pattern = Pattern::new(PatternBuilder::with_action(
      PatternBuilder::literal("A", None::<String>, vec![]),
      PatternAction::Replace(leaf("C", "9")),
    ));
    let (patched, warnings) = DefaultPatcher::patch(&pattern, &tree, None);
    assert!(warnings.is_empty());
    assert_eq!(patched.child(0).unwrap().type_name(), "C");
  }

  #[test]
  fn test_patch_deletes_matched_node() {
    let tree = branch("X", vec![leaf("A", ""), leaf("B", "")]);
    let pattern = Pattern::new(PatternBuilder::with_action(
      PatternBuilder::literal("A", None::<String>, vec![]),
      PatternAction::Delete,
    ));
    let (patched, _) = DefaultPatcher::patch(&pattern, &tree, None);
    assert_eq!(patched.child_count(), 1);
    assert_eq!(patched.child(0).unwrap().type_name(), "B");
  }

  #[test]
  fn test_patch_with_no_match_deep_copies() {
    let tree = branch("X", vec![leaf("A", "")]);
    let pattern = Pattern::new(PatternBuilder::literal("Nonexistent", None::<String>, vec![]));
    let (patched, warnings) = DefaultPatcher::patch(&pattern, &tree, None);
    assert!(warnings.is_empty());
    assert!(patched.deep_compare(&tree));
    assert!(!patched.is_same_node(&tree));
  }

  #[test]
  fn test_innermost_match_wins_on_overlap() {
    // pattern matches any "A" node; tree nests an A inside an A. Both
    // matches target a Delete action, but the outer one's edit must not
    // also try to delete/replace through the (already handled) inner node.
    let inner = any_typed("A", vec![any_typed("Leaf", vec![])]);
    let outer = any_typed("A", vec![inner]);
    let tree = branch("Root", vec![outer]);
    let pattern = Pattern::new(PatternBuilder::with_action(
      PatternBuilder::literal("A", None::<String>, vec![PatternBuilder::make_hole(&leaf("Any", ""))]),
      PatternAction::Replace(leaf("Replaced", "")),
    ));
    let (patched, warnings) = DefaultPatcher::patch(&pattern, &tree, None);
    assert!(warnings.is_empty());
    // only the innermost "A" (containing Leaf) is replaced; the outer "A"
    // survives as a rebuilt ancestor, not itself replaced.
    let root_child = patched.child(0).unwrap();
    assert_eq!(root_child.type_name(), "A");
    assert_eq!(root_child.child(0).unwrap().type_name(), "Replaced");
  }

  #[test]
  fn test_patch_returns_dummy_node_when_cancelled() {
    let tree = branch("X", vec![leaf("A", "")]);
    let pattern = Pattern::new(PatternBuilder::with_action(
      PatternBuilder::literal("A", None::<String>, vec![]),
      PatternAction::Delete,
    ));
    let token = crate::cancel::CancellationToken::new();
    token.cancel();
    let (patched, warnings) = DefaultPatcher::patch(&pattern, &tree, Some(&token));
    assert!(warnings.is_empty());
    assert_eq!(patched.type_name(), "\u{2205}");
  }
}
