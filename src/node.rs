//! [`Node`]: the immutable, typed tree node every other component in this
//! crate builds on (spec §3). Built exclusively through [`Builder`]; once
//! constructed its type, data and children never change (spec's
//! "Immutability" testable property, §8).

use crate::fragment::Fragment;
use crate::types::{DummyType, Type, TypeRef};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

fn fnv1a(bytes: &[u8]) -> u32 {
  const OFFSET: u32 = 0x811c_9dc5;
  const PRIME: u32 = 0x0100_0193;
  bytes.iter().fold(OFFSET, |h, b| (h ^ *b as u32).wrapping_mul(PRIME))
}

/// Type name and data only, per spec §4.B.
fn local_hash_of(type_name: &str, data: &str) -> u32 {
  let mut h = fnv1a(type_name.as_bytes());
  h ^= fnv1a(data.as_bytes()).rotate_left(13);
  h
}

const PRIME_MIX: u32 = 0x0100_0193;

/// Extends `local` with the ordered sequence of child absolute hashes; the
/// exact mixing function is left to the implementer by spec §4.B as long as
/// it is deterministic and order-sensitive, which this satisfies by folding
/// left-to-right with a multiply that does not commute with itself.
fn absolute_hash_of(local: u32, children: &[Node]) -> u32 {
  children.iter().fold(local, |h, c| {
    h.wrapping_mul(PRIME_MIX) ^ c.absolute_hash()
  })
}

struct NodeData {
  ty: TypeRef,
  data: String,
  children: Vec<Node>,
  fragment: Fragment,
  local_hash: u32,
  absolute_hash: u32,
}

/// An immutable node. Cheap to `Clone` (an `Arc` bump); `Send + Sync`
/// because `NodeData` never changes after construction, so a built `Tree`
/// can be shared and read from multiple threads without coordination
/// (spec §5).
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
  pub(crate) fn from_parts(
    ty: TypeRef,
    data: String,
    children: Vec<Node>,
    fragment: Fragment,
  ) -> Self {
    let local_hash = local_hash_of(ty.name(), &data);
    let absolute_hash = absolute_hash_of(local_hash, &children);
    Node(Arc::new(NodeData {
      ty,
      data,
      children,
      fragment,
      local_hash,
      absolute_hash,
    }))
  }

  pub fn ty(&self) -> &TypeRef {
    &self.0.ty
  }

  pub fn type_name(&self) -> &str {
    self.0.ty.name()
  }

  pub fn data(&self) -> &str {
    &self.0.data
  }

  pub fn children(&self) -> &[Node] {
    &self.0.children
  }

  pub fn child(&self, index: usize) -> Option<&Node> {
    self.0.children.get(index)
  }

  pub fn child_count(&self) -> usize {
    self.0.children.len()
  }

  pub fn fragment(&self) -> &Fragment {
    &self.0.fragment
  }

  pub fn belongs_to_group(&self, name: &str) -> bool {
    self.0.ty.belongs_to_group(name)
  }

  pub fn local_hash(&self) -> u32 {
    self.0.local_hash
  }

  pub fn absolute_hash(&self) -> u32 {
    self.0.absolute_hash
  }

  /// Identity comparison (same underlying allocation), distinct from the
  /// structural `PartialEq` below. [`crate::traversal::NodeReplacer`] and
  /// [`crate::diff::DiffTreeBuilder`] locate nodes by this identity, not by
  /// `deep_compare`.
  pub fn is_same_node(&self, other: &Node) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }

  /// A stable identifier for the underlying allocation, useful for
  /// dedup/debugging; not meaningful across process runs.
  pub fn node_id(&self) -> usize {
    Arc::as_ptr(&self.0) as *const () as usize
  }

  /// Structural equality: type name, data, child counts, and each child
  /// pair recursively (spec §4.B `deepCompare`).
  pub fn deep_compare(&self, other: &Node) -> bool {
    if self.is_same_node(other) {
      return true;
    }
    if self.type_name() != other.type_name() || self.data() != other.data() {
      return false;
    }
    let (a, b) = (self.children(), other.children());
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.deep_compare(y))
  }

  /// Rebuilds the subtree from scratch via the builder protocol, preserving
  /// fragments (spec §4.B `deepClone`). Always succeeds: a node that built
  /// successfully once necessarily satisfies its own type's descriptors
  /// again.
  pub fn deep_clone(&self) -> Node {
    let children: Vec<Node> = self.children().iter().map(Node::deep_clone).collect();
    let mut builder = self.ty().clone().new_builder();
    builder.set_fragment(self.fragment().clone());
    builder.set_data(self.data());
    let ok = builder.set_children_list(children);
    debug_assert!(ok, "deep_clone: node's own children must satisfy its type");
    builder
      .create_node()
      .expect("deep_clone: node was valid once and must remain valid")
  }
}

impl fmt::Debug for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Node")
      .field("type", &self.type_name())
      .field("data", &self.data())
      .field("children", &self.children().len())
      .finish()
  }
}

impl PartialEq for Node {
  fn eq(&self, other: &Self) -> bool {
    self.deep_compare(other)
  }
}
impl Eq for Node {}

impl Hash for Node {
  fn hash<H: Hasher>(&self, state: &mut H) {
    // `deep_compare(a, b) ⇒ absolute_hash(a) == absolute_hash(b)` (spec §8
    // "Hash consistency"), so hashing on `absolute_hash` alone satisfies
    // the `Eq`/`Hash` contract.
    state.write_u32(self.absolute_hash());
  }
}

/// The empty-set singleton node (spec §3 `DummyNode`): zero children, empty
/// data, type name `∅`.
pub fn dummy_node() -> Node {
  Node::from_parts(DummyType::get(), String::new(), Vec::new(), Fragment::empty())
}

/// A thin wrapper owning a root node (spec §3 `Tree`).
#[derive(Clone)]
pub struct Tree {
  root: Node,
}

impl Tree {
  pub fn new(root: Node) -> Self {
    Self { root }
  }

  pub fn root(&self) -> &Node {
    &self.root
  }

  pub fn into_root(self) -> Node {
    self.root
  }
}
