//! Tree-wide algorithms built only on [`Node`]'s public surface: pre-order
//! iteration, subtree-identity grouping, identity-based replacement, and
//! the child-list allocator the [`crate::types::Builder`] protocol uses.
//!
//! Unlike a tree-sitter-backed cursor, a `Node`'s children are an owned
//! `Vec` already resident in memory, so there is no cursor API to wrap —
//! these traversals walk an explicit stack instead, which keeps them
//! iterative (spec §5: "no recursive traversal without an explicit stack")
//! without needing anything like tree-sitter's `TreeCursor`.

use crate::node::Node;
use crate::types::ChildDescriptor;
use std::collections::HashMap;
use std::fmt;

/// Iterative pre-order iterator over a subtree, root first.
pub struct Pre<'a> {
  stack: Vec<&'a Node>,
}

impl<'a> Pre<'a> {
  pub fn new(root: &'a Node) -> Self {
    Self { stack: vec![root] }
  }
}

impl<'a> Iterator for Pre<'a> {
  type Item = &'a Node;

  fn next(&mut self) -> Option<Self::Item> {
    let node = self.stack.pop()?;
    for child in node.children().iter().rev() {
      self.stack.push(child);
    }
    Some(node)
  }
}

impl<'a> std::iter::FusedIterator for Pre<'a> {}

/// Finds the first node in pre-order satisfying `predicate` (spec §4.E
/// `DeepTraversal.findFirstFromRoot`).
pub struct DeepTraversal;

impl DeepTraversal {
  pub fn find_first_from_root<'a>(
    root: &'a Node,
    mut predicate: impl FnMut(&Node) -> bool,
  ) -> Option<&'a Node> {
    Pre::new(root).find(|n| predicate(n))
  }
}

/// Groups of structurally-identical subtrees (`deep_compare` true pairwise),
/// each group containing two or more occurrences (spec §4.E `Identical`).
///
/// Candidates are first bucketed by `absolute_hash` so the pairwise
/// `deep_compare` calls only ever run within a bucket of equal-hash nodes,
/// not across the whole tree.
pub struct Identical;

impl Identical {
  pub fn find_in(root: &Node) -> Vec<Vec<Node>> {
    let mut buckets: HashMap<u32, Vec<Node>> = HashMap::new();
    for node in Pre::new(root) {
      buckets.entry(node.absolute_hash()).or_default().push(node.clone());
    }
    let mut classes = Vec::new();
    for (_, bucket) in buckets {
      let mut remaining = bucket;
      while let Some(first) = remaining.pop() {
        let mut class = vec![first.clone()];
        remaining.retain(|candidate| {
          if candidate.deep_compare(&first) {
            class.push(candidate.clone());
            false
          } else {
            true
          }
        });
        if class.len() >= 2 {
          classes.push(class);
        }
      }
    }
    classes
  }
}

/// Rebuilds a tree with one node — located by exact identity, not structural
/// equality — swapped for a replacement (spec §4.E `NodeReplacer.replace`).
pub struct NodeReplacer;

impl NodeReplacer {
  /// Returns the new root and the index the replacement occupies among its
  /// immediate parent's children, or `(dummy_node(), -1)` if `target` is not
  /// found anywhere in `root` by identity.
  pub fn replace(root: &Node, target: &Node, replacement: Node) -> (Node, isize) {
    match replace_rec(root, target, &replacement) {
      Some((new_root, index)) => (new_root, index),
      None => (crate::node::dummy_node(), -1),
    }
  }
}

/// Returns `Some((rebuilt_subtree, child_index_of_replacement))` where
/// `child_index_of_replacement` is relative to the *immediate parent* of the
/// replaced node (so it is only meaningful at the level the swap happened;
/// ancestors above it are rebuilt but report whatever index their own
/// modified child occupies).
fn replace_rec(node: &Node, target: &Node, replacement: &Node) -> Option<(Node, isize)> {
  if node.is_same_node(target) {
    return Some((replacement.clone(), -1));
  }
  for (i, child) in node.children().iter().enumerate() {
    if child.is_same_node(target) {
      let mut children = node.children().to_vec();
      children[i] = replacement.clone();
      return Some((rebuild(node, children), i as isize));
    }
    if let Some((new_child, _)) = replace_rec(child, target, replacement) {
      let mut children = node.children().to_vec();
      children[i] = new_child;
      return Some((rebuild(node, children), i as isize));
    }
  }
  None
}

fn rebuild(node: &Node, children: Vec<Node>) -> Node {
  let mut builder = node.ty().clone().new_builder();
  builder.set_fragment(node.fragment().clone());
  builder.set_data(node.data());
  let ok = builder.set_children_list(children);
  debug_assert!(ok, "rebuild: replacement children must still satisfy the parent's type");
  builder
    .create_node()
    .expect("rebuild: node was valid before replacement and must remain valid")
}

/// Why [`allocate`] rejected a candidate child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
  MissingRequiredChild { descriptor_index: usize, group: String },
  UnexpectedTrailingChildren { count: usize },
}

impl fmt::Display for AllocationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AllocationError::MissingRequiredChild { descriptor_index, group } => write!(
        f,
        "missing required child at position {descriptor_index} (expected group `{group}`)"
      ),
      AllocationError::UnexpectedTrailingChildren { count } => {
        write!(f, "{count} trailing child(ren) not accepted by this type")
      }
    }
  }
}

/// Matches a flat candidate child list against a type's declared
/// [`ChildDescriptor`]s, in order (spec §4.B allocation rules / the
/// "NodeAllocator"):
///
/// - Descriptors are consumed left to right; a candidate is accepted into
///   descriptor `i` iff its type `belongs_to_group(descriptor[i].child_type_name)`.
/// - An optional descriptor with no matching next candidate is simply
///   skipped, consuming nothing.
/// - A required descriptor with no matching next candidate fails the whole
///   allocation.
/// - Children left over after all descriptors are processed are accepted
///   only if `allow_trailing` is set; otherwise allocation fails.
pub fn allocate(
  descriptors: &[ChildDescriptor],
  children: Vec<Node>,
  allow_trailing: bool,
) -> Result<Vec<Node>, AllocationError> {
  let mut out = Vec::with_capacity(children.len());
  let mut iter = children.into_iter().peekable();

  for (i, descriptor) in descriptors.iter().enumerate() {
    let matches_next = iter
      .peek()
      .map(|c| c.belongs_to_group(&descriptor.child_type_name))
      .unwrap_or(false);
    if matches_next {
      out.push(iter.next().expect("peeked Some"));
    } else if !descriptor.optional {
      return Err(AllocationError::MissingRequiredChild {
        descriptor_index: i,
        group: descriptor.child_type_name.clone(),
      });
    }
  }

  let trailing: Vec<Node> = iter.collect();
  if !trailing.is_empty() && !allow_trailing {
    return Err(AllocationError::UnexpectedTrailingChildren { count: trailing.len() });
  }
  out.extend(trailing);
  Ok(out)
}
