//! `ExtNode`: a read-only overlay that adds parent/sibling/index context to
//! an otherwise-parentless [`Node`] (spec §3 `ExtNode`, §4.D).
//!
//! `Node` itself stores no parent pointer — keeping it free of back-edges is
//! what lets the same subtree be shared structurally by many trees (spec
//! §9 Design Notes: "cyclic ownership avoided ... index-based parent links
//! on the extended overlay only"). `ExtNode` is built in one recursive pass
//! over a plain tree and wraps every node with the context queries that
//! need a parent to answer.

use crate::node::Node;
use std::sync::{Arc, Weak};

struct ExtNodeData {
  node: Node,
  parent: Option<Weak<ExtNodeData>>,
  index: usize,
  absolute_hash: u32,
  /// Every child's overlay, built alongside this node in the same pass —
  /// `ext_child` reads from here rather than re-deriving a child's context
  /// on each call (spec §4.D: "filled during construction in a single
  /// pass").
  children: Vec<ExtNode>,
}

/// A node plus its position within the overlay it was created from. Cheap
/// to `Clone` (an `Arc` bump), like `Node`. The parent link is a `Weak`
/// reference (see [`ExtNodeCreator::create`]) so a node and its children
/// holding each other, one up and one down, never forms an `Arc` reference
/// cycle.
#[derive(Clone)]
pub struct ExtNode(Arc<ExtNodeData>);

impl ExtNode {
  pub fn node(&self) -> &Node {
    &self.0.node
  }

  /// `None` only for the overlay's root.
  pub fn parent(&self) -> Option<ExtNode> {
    self.0.parent.as_ref()?.upgrade().map(ExtNode)
  }

  /// This node's position among its parent's children; `0` for the root.
  pub fn index(&self) -> usize {
    self.0.index
  }

  pub fn ext_child(&self, i: usize) -> Option<ExtNode> {
    self.0.children.get(i).cloned()
  }

  /// Memoized: computed once when this overlay node was created, same
  /// value as `self.node().absolute_hash()`.
  pub fn absolute_hash(&self) -> u32 {
    self.0.absolute_hash
  }

  /// This node's immediate left sibling under the same parent, if any.
  pub fn left(&self) -> Option<ExtNode> {
    let parent = self.parent()?;
    if self.index() == 0 {
      return None;
    }
    parent.ext_child(self.index() - 1)
  }

  /// This node's immediate right sibling under the same parent, if any.
  pub fn right(&self) -> Option<ExtNode> {
    let parent = self.parent()?;
    parent.ext_child(self.index() + 1)
  }

  pub fn get_prototype(&self) -> &Node {
    self.node()
  }

  pub fn get_parent_prototype(&self) -> Option<Node> {
    self.parent().map(|p| p.node().clone())
  }

  pub fn get_left_prototype(&self) -> Option<Node> {
    self.left().map(|e| e.node().clone())
  }

  pub fn get_right_prototype(&self) -> Option<Node> {
    self.right().map(|e| e.node().clone())
  }
}

/// Builds a full `ExtNode` overlay over `root` in a single pass (spec §4.D
/// `ExtNodeCreator`).
pub struct ExtNodeCreator;

impl ExtNodeCreator {
  pub fn create(root: &Node) -> ExtNode {
    build(root.clone(), None, 0)
  }
}

/// Builds one overlay node and, recursively, all of its descendants.
/// `Arc::new_cyclic` hands back a `Weak` reference to the `Arc` being
/// constructed before it is fully initialized, so each child can be built
/// — with its overlay's `children` already populated — while still
/// carrying a (non-owning) pointer back up to this node.
fn build(node: Node, parent: Option<Weak<ExtNodeData>>, index: usize) -> ExtNode {
  let absolute_hash = node.absolute_hash();
  let node_for_children = node.clone();
  let data = Arc::new_cyclic(|weak_self| {
    let children = node_for_children
      .children()
      .iter()
      .enumerate()
      .map(|(i, child)| build(child.clone(), Some(weak_self.clone()), i))
      .collect();
    ExtNodeData {
      node,
      parent,
      index,
      absolute_hash,
      children,
    }
  });
  ExtNode(data)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::types::{ChildDescriptor, SimpleType, Type};

  fn leaf(name: &str) -> Node {
    let ty = SimpleType::new(name).into_ref();
    let mut b = ty.new_builder();
    b.set_data("");
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

  #[test]
  fn test_root_has_no_parent() {
    let tree = branch("X", vec![leaf("A")]);
    let ext = ExtNodeCreator::create(&tree);
    assert!(ext.parent().is_none());
    assert_eq!(ext.index(), 0);
  }

  #[test]
  fn test_child_knows_its_parent_and_index() {
    let tree = branch("X", vec![leaf("A"), leaf("B")]);
    let ext = ExtNodeCreator::create(&tree);
    let first = ext.ext_child(0).unwrap();
    assert_eq!(first.index(), 0);
    assert_eq!(first.get_parent_prototype().unwrap().type_name(), "X");
  }

  #[test]
  fn test_siblings() {
    let tree = branch("X", vec![leaf("A"), leaf("B"), leaf("C")]);
    let ext = ExtNodeCreator::create(&tree);
    let middle = ext.ext_child(1).unwrap();
    assert_eq!(middle.get_left_prototype().unwrap().type_name(), "A");
    assert_eq!(middle.get_right_prototype().unwrap().type_name(), "C");
  }

  #[test]
  fn test_boundary_siblings_are_none() {
    let tree = branch("X", vec![leaf("A"), leaf("B")]);
    let ext = ExtNodeCreator::create(&tree);
    let first = ext.ext_child(0).unwrap();
    let last = ext.ext_child(1).unwrap();
    assert!(first.get_left_prototype().is_none());
    assert!(last.get_right_prototype().is_none());
  }

  #[test]
  fn test_ext_child_is_served_from_the_cache_built_at_construction() {
    // two calls for the same index must hand back the *same* overlay
    // allocation, not two freshly rebuilt ones.
    let tree = branch("X", vec![leaf("A")]);
    let ext = ExtNodeCreator::create(&tree);
    let a1 = ext.ext_child(0).unwrap();
    let a2 = ext.ext_child(0).unwrap();
    assert!(Arc::ptr_eq(&a1.0, &a2.0));
  }

  #[test]
  fn test_grandchildren_are_populated_in_the_same_pass() {
    let leafy = branch("Y", vec![leaf("A")]);
    let tree = branch("X", vec![leafy]);
    let ext = ExtNodeCreator::create(&tree);
    let grandchild = ext.ext_child(0).unwrap().ext_child(0).unwrap();
    assert_eq!(grandchild.node().type_name(), "A");
    assert_eq!(grandchild.get_parent_prototype().unwrap().type_name(), "Y");
  }
}
