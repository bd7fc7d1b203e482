/*!
This crate represents, diffs, pattern-matches and patches language-agnostic
abstract syntax trees.

It does not parse any particular language, nor does it render DOT/JSON, nor
talk to a graph database — those are external collaborators with their own
seams ([`sink::TreeSink`], [`sink::TreeSource`]). What it does provide is
the tree itself ([`node::Node`], [`types::Type`], [`types::Builder`]), an
edit overlay for describing changes ([`diff::DiffNode`]), pattern matching
with holes over that tree ([`pattern::Pattern`], [`matcher::Matcher`]) and
patching matches back in ([`patcher::DefaultPatcher`]), and a fixpoint
converter pipeline for folding flat child sequences into typed nodes
([`convert::Transformer`]).
*/

pub mod cancel;
pub mod convert;
pub mod diff;
pub mod draft;
pub mod error;
pub mod ext_node;
pub mod fragment;
pub mod matcher;
pub mod node;
pub mod patcher;
pub mod pattern;
pub mod sink;
pub mod traversal;
pub mod types;

pub use cancel::CancellationToken;
pub use convert::{AdHocFactory, ConvertResult, Converter, Extracted, NodeFactory, Transformer};
pub use diff::{Action, ActionList, DiffNode, DiffTreeBuilder, Insertion};
pub use draft::{node_to_draft_string, parse as parse_draft, parse_with_registry as parse_draft_with_registry, Constructor, Registry};
pub use error::CoreError;
pub use ext_node::{ExtNode, ExtNodeCreator};
pub use fragment::{Fragment, Position, Source};
pub use matcher::{Edit as MatchEdit, Match, Matcher};
pub use node::{dummy_node, Node, Tree};
pub use patcher::DefaultPatcher;
pub use pattern::{Hole, Pattern, PatternAction, PatternBuilder, PatternKind, PatternNode};
pub use sink::{TreeSink, TreeSource};
pub use traversal::{allocate, AllocationError, DeepTraversal, Identical, NodeReplacer, Pre};
pub use types::{Builder, ChildDescriptor, DraftType, DummyType, SimpleType, Type, TypeRef};

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_draft_parse_example() {
    // spec §8 scenario: a draft string round-trips to a tree with the
    // expected shape and data.
    let tree = parse_draft(r#"X<"root">(Y<"a">, Z(W))"#).unwrap();
    assert_eq!(tree.type_name(), "X");
    assert_eq!(tree.data(), "root");
    assert_eq!(tree.child_count(), 2);
    assert_eq!(tree.child(0).unwrap().data(), "a");
    assert_eq!(tree.child(1).unwrap().child(0).unwrap().type_name(), "W");
  }

  #[test]
  fn test_identical_subtree_count_example() {
    // X(Y, A(B, D), Z) where A(B, D) is repeated once more: three equal
    // leaf "D" occurrences across the tree, forming one identity class.
    let tree = parse_draft("X(Y, A(D), A(D), Z)").unwrap();
    let classes = Identical::find_in(&tree);
    let total: usize = classes.iter().map(Vec::len).sum();
    assert!(total >= 3);
  }

  #[test]
  fn test_pattern_with_hole_example() {
    // each hole matches any subtree sharing its declaration site's type —
    // here a throwaway "Name"/"Arg"-typed node stands in for each slot.
    let tree = parse_draft(r#"Call(Name<"f">, Arg<"1">, Arg<"2">)"#).unwrap();
    let name_site = parse_draft("Name").unwrap();
    let arg_site = parse_draft("Arg").unwrap();
    let pattern = Pattern::new(PatternBuilder::literal(
      "Call",
      None::<String>,
      vec![
        PatternBuilder::make_hole(&name_site),
        PatternBuilder::make_hole(&arg_site),
        PatternBuilder::make_hole(&arg_site),
      ],
    ));
    assert!(Matcher::matches(&pattern, &tree));
  }

  #[test]
  fn test_end_to_end_match_and_patch() {
    let tree = parse_draft(r#"X(Y, A(B, D), Z)"#).unwrap();
    let b_hole = PatternBuilder::with_action(
      PatternBuilder::literal("B", None::<String>, vec![]),
      PatternAction::Replace(parse_draft(r#"C"#).unwrap()),
    );
    let d_site = parse_draft("D").unwrap();
    let pattern = Pattern::new(PatternBuilder::literal(
      "A",
      None::<String>,
      vec![b_hole, PatternBuilder::make_hole(&d_site)],
    ));
    let (patched, warnings) = DefaultPatcher::patch(&pattern, &tree, None);
    assert!(warnings.is_empty());
    let a = patched.child(1).unwrap();
    assert_eq!(a.child(0).unwrap().type_name(), "C");
    assert_eq!(a.child(1).unwrap().type_name(), "D");
  }
}
