//! Difference trees: an edit overlay on top of an immutable base [`Node`]
//! tree (spec §3 `DiffNode`, §4.F).
//!
//! A [`DiffTreeBuilder`] anchors edits to existing nodes by identity (the
//! same `is_same_node` notion [`crate::traversal::NodeReplacer`] uses, not
//! structural equality — two structurally identical nodes are still
//! distinct anchors). [`DiffNode::before`] and [`DiffNode::after`] project
//! the overlay back to the original and edited trees respectively.

use crate::node::{dummy_node, Node};
use crate::traversal::Pre;
use std::collections::HashMap;
use std::sync::Arc;

/// A single pending insertion, ordered relative to its siblings at the same
/// anchor.
#[derive(Debug, Clone)]
pub struct Insertion {
  pub node: Node,
}

#[derive(Debug, Clone)]
enum Edit {
  None,
  Replace(Node),
  Delete,
}

#[derive(Debug, Clone, Default)]
struct Entry {
  edit: Option<Edit>,
  insert_after: Vec<Insertion>,
  /// Insertions anchored directly on this node acting as a *parent*, placed
  /// at the front of its children (spec §4.F: "inserts node immediately
  /// after after in after's parent (or at front if after == parent)").
  insert_front: Vec<Insertion>,
}

impl Entry {
  fn edit(&self) -> &Edit {
    self.edit.as_ref().unwrap_or(&Edit::None)
  }
}

/// The current effective edit at one anchor, as seen from outside the
/// builder (spec §4.F `Action`).
#[derive(Debug, Clone)]
pub enum Action {
  None,
  Insert(Vec<Insertion>),
  Replace(Node),
  Delete,
  /// An insertion queued ahead of a replace at the same anchor.
  InsertThenReplace(Vec<Insertion>, Node),
  /// An insertion queued ahead of a delete at the same anchor.
  InsertThenDelete(Vec<Insertion>),
}

/// The ordered sequence of non-trivial `(anchor, Action)` pairs recorded on
/// a [`DiffNode`], in pre-order of the base tree (spec §4.F `ActionList`).
pub struct ActionList {
  entries: Vec<(Node, Action)>,
}

impl ActionList {
  pub fn iter(&self) -> impl Iterator<Item = &(Node, Action)> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Accumulates edits against a base tree, identity-anchored (spec §4.F).
///
/// Stacking rules, applied per anchor, in call order:
/// - a second edit at an already-`Delete`d anchor is rejected (`false`);
/// - `replace` after `replace` keeps the latest replacement;
/// - `replace` after `delete` on the same anchor is impossible (delete is
///   terminal, per the rule above) — but `delete` after `replace` *is*
///   accepted and turns the anchor into a `Delete`;
/// - `insert` at the same anchor always appends, preserving call order,
///   unless the anchor is already `Delete`d.
pub struct DiffTreeBuilder {
  base: Node,
  entries: HashMap<usize, Entry>,
}

impl DiffTreeBuilder {
  pub fn new(base: Node) -> Self {
    Self { base, entries: HashMap::new() }
  }

  /// Whether `node` occurs, by identity, somewhere in the base tree (spec
  /// §4.F/§7: every edit operation is a `ReferenceNotFound` when it is
  /// not).
  fn is_reachable(&self, node: &Node) -> bool {
    Pre::new(&self.base).any(|n| n.is_same_node(node))
  }

  pub fn insert_node(&mut self, anchor: &Node, new_node: Node) -> bool {
    if !self.is_reachable(anchor) {
      return false;
    }
    let entry = self.entries.entry(anchor.node_id()).or_default();
    if matches!(entry.edit(), Edit::Delete) {
      return false;
    }
    entry.insert_after.push(Insertion { node: new_node });
    true
  }

  /// Inserts `new_node` at the front of `parent`'s children (spec §4.F:
  /// `after == parent`). `parent` must itself be reachable in the base tree
  /// and not deleted; rejected (`false`) otherwise.
  pub fn insert_front(&mut self, parent: &Node, new_node: Node) -> bool {
    if !self.is_reachable(parent) {
      return false;
    }
    let entry = self.entries.entry(parent.node_id()).or_default();
    if matches!(entry.edit(), Edit::Delete) {
      return false;
    }
    entry.insert_front.push(Insertion { node: new_node });
    true
  }

  pub fn replace_node(&mut self, anchor: &Node, new_node: Node) -> bool {
    if !self.is_reachable(anchor) {
      return false;
    }
    let entry = self.entries.entry(anchor.node_id()).or_default();
    if matches!(entry.edit(), Edit::Delete) {
      return false;
    }
    entry.edit = Some(Edit::Replace(new_node));
    true
  }

  pub fn delete_node(&mut self, anchor: &Node) -> bool {
    if !self.is_reachable(anchor) {
      return false;
    }
    let entry = self.entries.entry(anchor.node_id()).or_default();
    if matches!(entry.edit(), Edit::Delete) {
      return false;
    }
    entry.edit = Some(Edit::Delete);
    true
  }

  /// The action currently recorded at `anchor`, for inspection before
  /// committing to [`build`](Self::build).
  pub fn action_at(&self, anchor: &Node) -> Action {
    match self.entries.get(&anchor.node_id()) {
      None => Action::None,
      Some(entry) => action_of(entry),
    }
  }

  /// Pending front-of-children insertions recorded on `parent` (spec §4.F
  /// `after == parent`), separate from `action_at` which reports the
  /// edit/insert-after recorded on `parent` as a child *slot* of its own
  /// parent — a node can carry both at once.
  pub fn front_insertions_at(&self, parent: &Node) -> Vec<Insertion> {
    self
      .entries
      .get(&parent.node_id())
      .map(|e| e.insert_front.clone())
      .unwrap_or_default()
  }

  pub fn build(self) -> DiffNode {
    DiffNode { base: self.base, entries: Arc::new(self.entries) }
  }
}

fn action_of(entry: &Entry) -> Action {
  match (entry.edit(), entry.insert_after.is_empty()) {
    (Edit::None, true) => Action::None,
    (Edit::None, false) => Action::Insert(entry.insert_after.clone()),
    (Edit::Replace(n), true) => Action::Replace(n.clone()),
    (Edit::Replace(n), false) => Action::InsertThenReplace(entry.insert_after.clone(), n.clone()),
    (Edit::Delete, true) => Action::Delete,
    (Edit::Delete, false) => Action::InsertThenDelete(entry.insert_after.clone()),
  }
}

/// The committed overlay: a base tree plus the edits anchored to it. Cheap
/// to `Clone` — the entry map is shared via `Arc`.
#[derive(Clone)]
pub struct DiffNode {
  base: Node,
  entries: Arc<HashMap<usize, Entry>>,
}

impl DiffNode {
  /// The tree as it stood before any edit (spec §4.F `before()`).
  pub fn before(&self) -> Node {
    self.base.clone()
  }

  /// The tree with every recorded edit applied (spec §4.F `after()`):
  /// deleted nodes and their subtrees vanish, replaced nodes swap in
  /// whole, and each anchor's insertions appear immediately after it among
  /// its parent's children.
  pub fn after(&self) -> Node {
    project(&self.base, &self.entries)
  }

  pub fn actions(&self) -> ActionList {
    let mut entries = Vec::new();
    collect_actions(&self.base, &self.entries, &mut entries);
    ActionList { entries }
  }
}

fn collect_actions(node: &Node, entries: &HashMap<usize, Entry>, out: &mut Vec<(Node, Action)>) {
  if let Some(entry) = entries.get(&node.node_id()) {
    if !entry.insert_front.is_empty() {
      out.push((node.clone(), Action::Insert(entry.insert_front.clone())));
    }
    out.push((node.clone(), action_of(entry)));
  }
  if matches!(entries.get(&node.node_id()).map(Entry::edit), Some(Edit::Delete)) {
    return;
  }
  for child in node.children() {
    collect_actions(child, entries, out);
  }
}

fn project(node: &Node, entries: &HashMap<usize, Entry>) -> Node {
  let own = entries.get(&node.node_id());
  if matches!(own.map(Entry::edit), Some(Edit::Delete)) {
    return dummy_node();
  }

  let mut new_children = Vec::with_capacity(node.child_count());
  if let Some(entry) = own {
    new_children.extend(entry.insert_front.iter().map(|ins| ins.node.clone()));
  }
  for child in node.children() {
    let child_entry = entries.get(&child.node_id());
    let deleted = matches!(child_entry.map(Entry::edit), Some(Edit::Delete));
    if !deleted {
      new_children.push(project(child, entries));
    }
    if let Some(entry) = child_entry {
      new_children.extend(entry.insert_after.iter().map(|ins| ins.node.clone()));
    }
  }

  match own.map(Entry::edit) {
    Some(Edit::Replace(replacement)) => replacement.clone(),
    _ => {
      let unchanged = new_children.len() == node.child_count()
        && new_children.iter().zip(node.children()).all(|(a, b)| a.is_same_node(b));
      if unchanged {
        node.clone()
      } else {
        rebuild_with_children(node, new_children)
      }
    }
  }
}

fn rebuild_with_children(node: &Node, children: Vec<Node>) -> Node {
  let mut builder = node.ty().clone().new_builder();
  builder.set_fragment(node.fragment().clone());
  builder.set_data(node.data());
  let ok = builder.set_children_list(children);
  debug_assert!(ok, "diff projection: edited children must still satisfy the parent's type");
  builder
    .create_node()
    .expect("diff projection: node was valid before the edit and must remain valid")
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::types::{ChildDescriptor, SimpleType, Type};

  fn leaf(name: &str, data: &str) -> Node {
    let ty = SimpleType::new(name).into_ref();
    let mut b = ty.new_builder();
    b.set_data(data);
    b.set_children_list(vec![]);
    b.create_node().unwrap()
  }

  // No descriptors at all: `SimpleType` defaults to `allow_trailing(true)`,
  // so every child is accepted as trailing regardless of its type. A
  // per-instance `required(exact_type)` schema (as `traversal.rs`'s and
  // `node.rs`'s `branch()` helpers use) would reject these fixtures the
  // moment a test edits a slot to hold a *different* type than it declared
  // at construction — exactly what replace/delete do here.
  fn branch(name: &str, children: Vec<Node>) -> Node {
    let ty = SimpleType::new(name).into_ref();
    let mut b = ty.new_builder();
    b.set_data("");
    b.set_children_list(children);
    b.create_node().unwrap()
  }

  /// X(Y, A(B, D), Z) -> replace B with C -> X(Y, A(C, D), Z)
  #[test]
  fn test_replace_example_from_spec() {
    let b = leaf("B", "");
    let d = leaf("D", "");
    let a = branch("A", vec![b.clone(), d]);
    let tree = branch("X", vec![leaf("Y", ""), a, leaf("Z", "")]);

    let mut builder = DiffTreeBuilder::new(tree);
    assert!(builder.replace_node(&b, leaf("C", "")));
    let diff = builder.build();

    let after = diff.after();
    let a_after = after.child(1).unwrap();
    assert_eq!(a_after.type_name(), "A");
    assert_eq!(a_after.child(0).unwrap().type_name(), "C");
    assert_eq!(a_after.child(1).unwrap().type_name(), "D");
  }

  /// X(Y, A(B, D), Z) -> delete B -> X(Y, A(D), Z)
  #[test]
  fn test_delete_example_from_spec() {
    let b = leaf("B", "");
    let d = leaf("D", "");
    let a = branch("A", vec![b.clone(), d]);
    let tree = branch("X", vec![leaf("Y", ""), a, leaf("Z", "")]);

    let mut builder = DiffTreeBuilder::new(tree.clone());
    assert!(builder.delete_node(&b));
    let diff = builder.build();

    let after = diff.after();
    let a_after = after.child(1).unwrap();
    assert_eq!(a_after.child_count(), 1);
    assert_eq!(a_after.child(0).unwrap().type_name(), "D");
    assert!(diff.before().deep_compare(&tree));
  }

  #[test]
  fn test_delete_then_anything_is_rejected() {
    let b = leaf("B", "");
    let tree = branch("A", vec![b.clone()]);
    let mut builder = DiffTreeBuilder::new(tree);
    assert!(builder.delete_node(&b));
    assert!(!builder.replace_node(&b, leaf("C", "")));
    assert!(!builder.delete_node(&b));
    assert!(!builder.insert_node(&b, leaf("E", "")));
  }

  #[test]
  fn test_edits_on_a_node_absent_from_the_base_tree_are_rejected() {
    let tree = branch("A", vec![leaf("B", "")]);
    let stray = leaf("Z", ""); // structurally unrelated, never part of `tree`
    let mut builder = DiffTreeBuilder::new(tree);
    assert!(!builder.replace_node(&stray, leaf("C", "")));
    assert!(!builder.delete_node(&stray));
    assert!(!builder.insert_node(&stray, leaf("E", "")));
    assert!(!builder.insert_front(&stray, leaf("E", "")));
  }

  #[test]
  fn test_replace_then_replace_keeps_latest() {
    let b = leaf("B", "");
    let tree = branch("A", vec![b.clone()]);
    let mut builder = DiffTreeBuilder::new(tree);
    assert!(builder.replace_node(&b, leaf("C1", "")));
    assert!(builder.replace_node(&b, leaf("C2", "")));
    let diff = builder.build();
    let after = diff.after();
    assert_eq!(after.child(0).unwrap().type_name(), "C2");
  }

  #[test]
  fn test_replace_then_delete_becomes_delete() {
    let b = leaf("B", "");
    let tree = branch("A", vec![b.clone()]);
    let mut builder = DiffTreeBuilder::new(tree);
    assert!(builder.replace_node(&b, leaf("C", "")));
    assert!(builder.delete_node(&b));
    let diff = builder.build();
    assert_eq!(diff.after().child_count(), 0);
  }

  #[test]
  fn test_insert_front_places_node_before_all_children() {
    let tree = branch("A", vec![leaf("B", ""), leaf("C", "")]);
    let mut builder = DiffTreeBuilder::new(tree.clone());
    assert!(builder.insert_front(&tree, leaf("Z", "")));
    let diff = builder.build();
    let after = diff.after();
    assert_eq!(after.child_count(), 3);
    assert_eq!(after.child(0).unwrap().type_name(), "Z");
    assert_eq!(after.child(1).unwrap().type_name(), "B");
    assert_eq!(after.child(2).unwrap().type_name(), "C");
  }

  #[test]
  fn test_same_anchor_inserts_preserve_order() {
    let b = leaf("B", "");
    let tree = branch("A", vec![b.clone()]);
    let mut builder = DiffTreeBuilder::new(tree);
    assert!(builder.insert_node(&b, leaf("I1", "")));
    assert!(builder.insert_node(&b, leaf("I2", "")));
    let diff = builder.build();
    let after = diff.after();
    assert_eq!(after.child_count(), 3);
    assert_eq!(after.child(1).unwrap().type_name(), "I1");
    assert_eq!(after.child(2).unwrap().type_name(), "I2");
  }
}
