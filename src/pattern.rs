//! Patterns: trees with holes, matched against real [`Node`] trees by
//! [`crate::matcher`] and applied by [`crate::patcher`] (spec §3
//! `PatternNode`, §4.G).
//!
//! A pattern node is either a [`Hole`] — matching any node whose type
//! belongs to the declaration site's own group — or a literal node
//! constraining type and (optionally) data, whose own children must appear
//! as an ordered subsequence of the candidate's children. A pattern node
//! can additionally carry an embedded [`PatternAction`] (spec §4.F's
//! `Action`, reused here rather than re-invented): when a pattern matches,
//! [`crate::patcher`] applies that action at the matched counterpart.

use crate::node::Node;

/// A wildcard pattern position. `group` is the type (or hierarchy group)
/// the declaration site belongs to; a hole constrained to "any type at
/// all" is not a mode spec §3/§4.G describes — "holes: positions declared
/// by (node, holeId) that match any subtree having the same type as the
/// declaration site" — so `group` is always present, derived from the
/// node that was turned into a hole.
#[derive(Debug, Clone)]
pub struct Hole {
  pub group: String,
}

#[derive(Debug, Clone)]
pub enum PatternKind {
  Hole(Hole),
  /// `data: None` matches any data (spec §4.G: "empty data as wildcard").
  Literal {
    type_name: String,
    data: Option<String>,
    children: Vec<PatternNode>,
  },
}

/// What happens to a matched counterpart when this pattern is patched in.
/// Unlike a plain [`crate::diff::Action`], `Insert` here does not apply to
/// the node this `PatternAction` is attached to — insertions are tracked
/// separately on [`PatternNode::insert_after`] precisely because an insert
/// needs no matched counterpart at all, while `Replace`/`Delete` do (spec
/// §4.G).
#[derive(Debug, Clone)]
pub enum PatternAction {
  None,
  Replace(Node),
  Delete,
}

#[derive(Debug, Clone)]
pub struct PatternNode {
  pub kind: PatternKind,
  pub action: PatternAction,
  /// Literal nodes to splice in immediately after this position's matched
  /// counterpart, when/if this pattern matches. These never themselves
  /// need a counterpart in the candidate tree.
  pub insert_after: Vec<Node>,
}

impl PatternNode {
  pub fn belongs_to_required_group(&self, candidate: &Node) -> bool {
    match &self.kind {
      PatternKind::Hole(hole) => candidate.belongs_to_group(&hole.group),
      PatternKind::Literal { type_name, .. } => candidate.type_name() == type_name,
    }
  }
}

/// A pattern ready to be matched: one root [`PatternNode`].
#[derive(Debug, Clone)]
pub struct Pattern {
  pub root: PatternNode,
}

impl Pattern {
  pub fn new(root: PatternNode) -> Self {
    Self { root }
  }
}

/// Assembles [`PatternNode`]s (spec §4.G `PatternBuilder`).
pub struct PatternBuilder;

impl PatternBuilder {
  /// A hole matching any node whose type belongs to `declaration_site`'s
  /// own group — spec §3: holes match "any subtree having the same type as
  /// the declaration site." `declaration_site` need not be part of the
  /// tree being matched; only its type is consulted.
  pub fn make_hole(declaration_site: &Node) -> PatternNode {
    PatternNode {
      kind: PatternKind::Hole(Hole { group: declaration_site.type_name().to_string() }),
      action: PatternAction::None,
      insert_after: Vec::new(),
    }
  }

  /// A literal pattern node. `data: None` matches any data.
  pub fn literal(
    type_name: impl Into<String>,
    data: Option<impl Into<String>>,
    children: Vec<PatternNode>,
  ) -> PatternNode {
    PatternNode {
      kind: PatternKind::Literal {
        type_name: type_name.into(),
        data: data.map(Into::into),
        children,
      },
      action: PatternAction::None,
      insert_after: Vec::new(),
    }
  }

  pub fn with_action(mut node: PatternNode, action: PatternAction) -> PatternNode {
    node.action = action;
    node
  }

  pub fn with_insertions(mut node: PatternNode, insertions: Vec<Node>) -> PatternNode {
    node.insert_after = insertions;
    node
  }

  /// A literal pattern node matching `node`'s own type/data exactly, with
  /// every child turned into a hole (a quick way to say "this shape, any
  /// grandchildren").
  pub fn from_node_shape(node: &Node) -> PatternNode {
    let children = node.children().iter().map(Self::make_hole).collect();
    Self::literal(node.type_name(), Some(node.data()), children)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::types::{SimpleType, Type};

  fn leaf(name: &str, data: &str) -> Node {
    let ty = SimpleType::new(name).into_ref();
    let mut b = ty.new_builder();
    b.set_data(data);
    b.set_children_list(vec![]);
    b.create_node().unwrap()
  }

  #[test]
  fn test_hole_matches_same_type_as_declaration_site() {
    let hole = PatternBuilder::make_hole(&leaf("Anything", "x"));
    assert!(hole.belongs_to_required_group(&leaf("Anything", "z")));
  }

  #[test]
  fn test_hole_with_group_constrains() {
    let hole = PatternBuilder::make_hole(&leaf("Expr", ""));
    assert!(!hole.belongs_to_required_group(&leaf("Stmt", "")));
  }

  #[test]
  fn test_literal_matches_by_type_name_only() {
    let lit = PatternBuilder::literal("X", None::<String>, vec![]);
    assert!(lit.belongs_to_required_group(&leaf("X", "anything")));
    assert!(!lit.belongs_to_required_group(&leaf("Y", "anything")));
  }
}
