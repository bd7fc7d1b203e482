//! Folding a flat child sequence into typed nodes (spec §3 `Converter`,
//! §4.I `Transformer`).
//!
//! A [`Converter`] looks at a window starting at some position in a flat
//! list and optionally claims a prefix of it, replacing that prefix with
//! one typed node. [`Transformer::transform`] runs every registered
//! converter left to right, repeating full passes over the (shrinking)
//! list until a pass makes no further progress — a fixpoint, since later
//! passes can fold nodes that an earlier pass just produced (spec §4.I:
//! "left-to-right fixpoint").

use crate::cancel::CancellationToken;
use crate::node::Node;
use crate::traversal::Pre;
use crate::types::{ChildDescriptor, SimpleType, Type};
use std::fmt;

/// What a [`Converter`] hands back when it claims a prefix of the window it
/// was given.
pub struct ConvertResult {
  pub node: Node,
  /// How many items of the window this result replaces; must be at least
  /// 1, or `Transformer::transform` would never make progress.
  pub consumed: usize,
}

/// Builds typed nodes on a [`Converter`]'s behalf, so a converter does not
/// need to hardcode a concrete [`crate::types::Type`] — in a real dialect
/// this would be backed by that dialect's node-type catalogue (spec §6:
/// "language-specific node catalogues" are an external collaborator, out
/// of scope here); this crate ships only the generic fallback below.
pub trait NodeFactory {
  fn create(&self, type_name: &str, data: &str, children: Vec<Node>) -> Option<Node>;
}

/// A `NodeFactory` that declares a fresh [`SimpleType`] per call, with one
/// required child descriptor per child actually passed in. Adequate for
/// tests and for converters that don't need a stable, shared `Type`
/// identity across calls.
pub struct AdHocFactory;

impl NodeFactory for AdHocFactory {
  fn create(&self, type_name: &str, data: &str, children: Vec<Node>) -> Option<Node> {
    let descriptors: Vec<_> = children.iter().map(|c| ChildDescriptor::required(c.type_name())).collect();
    let ty = SimpleType::new(type_name).with_children(descriptors).into_ref();
    let mut builder = ty.new_builder();
    builder.set_data(data);
    builder.set_children_list(children);
    builder.create_node()
  }
}

/// One rewrite rule in a [`Transformer`]'s pipeline (spec §4.I `Converter`).
pub trait Converter: fmt::Debug {
  /// `window` starts at `start_index` in the overall sequence being folded
  /// (only used for diagnostics — the converter itself only ever looks at
  /// `window`'s own contents). Returns `None` to decline, or `Some` to
  /// claim a prefix of `window`.
  fn convert(&self, window: &[Node], start_index: usize, factory: &dyn NodeFactory) -> Option<ConvertResult>;
}

/// Scratch container a [`Converter`] can use mid-pass to accumulate
/// partial results before deciding whether it has enough to claim a span
/// (spec §4.I `Extracted`) — e.g. a converter scanning for a closing
/// delimiter pushes candidates here as it goes, then discards them if the
/// delimiter never turns up.
#[derive(Default)]
pub struct Extracted {
  items: Vec<Node>,
}

impl Extracted {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, node: Node) {
    self.items.push(node);
  }

  pub fn items(&self) -> &[Node] {
    &self.items
  }

  pub fn into_items(self) -> Vec<Node> {
    self.items
  }

  pub fn clear(&mut self) {
    self.items.clear();
  }
}

pub struct Transformer;

impl Transformer {
  /// Runs `converters`, left to right, over `children`, repeating full
  /// passes until one changes nothing. Capped at `children.len() *
  /// converters.len() + 1` passes — comfortably more than any
  /// non-pathological pipeline needs, since each pass that makes progress
  /// strictly shrinks the sequence — past which it gives up and logs a
  /// warning rather than looping forever (spec §4.I: "termination /
  /// pass-cap with warning").
  pub fn transform(
    children: Vec<Node>,
    converters: &[Box<dyn Converter>],
    cancel: Option<&CancellationToken>,
  ) -> Vec<Node> {
    let mut current = children;
    let max_passes = current.len().saturating_mul(converters.len().max(1)) + 1;
    let mut pass = 0;

    loop {
      if cancel.is_some_and(CancellationToken::is_cancelled) {
        break;
      }
      pass += 1;
      if pass > max_passes {
        tracing::warn!(
          "Transformer::transform did not reach a fixpoint within {max_passes} passes; stopping with {} node(s) left",
          current.len()
        );
        break;
      }

      let (next, changed, cancelled_mid_pass) = run_one_pass(&current, converters, cancel);
      current = next;
      if cancelled_mid_pass || !changed {
        break;
      }
    }

    current
  }
}

impl Transformer {
  /// Runs the whole-tree fixpoint (spec §4.I pseudocode verbatim): each
  /// pass visits every node in the tree and folds its own immediate
  /// children via [`run_one_pass`], rebuilding any node whose children
  /// changed; passes repeat until none of them change anything. Unlike
  /// [`Transformer::transform`] (a single node's flat child list), this
  /// recurses into every descendant, so a converter anywhere in the tree —
  /// not just at the root — gets a chance to fire each pass.
  ///
  /// Capped at `node_count * converters.len() + 1` passes, mirroring the
  /// flat-list cap; past it, logs a warning and returns the tree as it
  /// stood after the last completed pass (spec §4.I: "implementers must
  /// bound pass count ... and surface a non-fatal warning on cap hit").
  pub fn transform_tree(
    root: Node,
    converters: &[Box<dyn Converter>],
    cancel: Option<&CancellationToken>,
  ) -> Node {
    let node_count = Pre::new(&root).count();
    let max_passes = node_count.saturating_mul(converters.len().max(1)) + 1;
    let mut current = root;
    let mut pass = 0;

    loop {
      if cancel.is_some_and(CancellationToken::is_cancelled) {
        break;
      }
      pass += 1;
      if pass > max_passes {
        tracing::warn!(
          "Transformer::transform_tree did not reach a fixpoint within {max_passes} passes; stopping"
        );
        break;
      }
      let (next, changed) = transform_pass(&current, converters, cancel);
      current = next;
      if !changed {
        break;
      }
    }

    current
  }
}

/// One whole-tree pass: children are folded bottom-up so a parent's
/// `run_one_pass` call sees each child already settled for this pass,
/// without re-feeding a just-produced node back through the same pass
/// (spec §4.I: "rewritten nodes are not rescanned within the same pass").
fn transform_pass(node: &Node, converters: &[Box<dyn Converter>], cancel: Option<&CancellationToken>) -> (Node, bool) {
  let mut any_changed = false;
  let transformed_children: Vec<Node> = node
    .children()
    .iter()
    .map(|c| {
      let (tc, changed) = transform_pass(c, converters, cancel);
      any_changed |= changed;
      tc
    })
    .collect();

  let (folded, changed_here, _cancelled) = run_one_pass(&transformed_children, converters, cancel);
  any_changed |= changed_here;

  let children_differ = folded.len() != node.child_count()
    || folded.iter().zip(node.children()).any(|(a, b)| !a.is_same_node(b));

  if !children_differ {
    return (node.clone(), any_changed);
  }

  let mut builder = node.ty().clone().new_builder();
  builder.set_fragment(node.fragment().clone());
  builder.set_data(node.data());
  if !builder.set_children_list(folded) {
    // the converted children no longer satisfy this node's descriptors;
    // leave the node as it was rather than building an invalid result.
    return (node.clone(), any_changed);
  }
  match builder.create_node() {
    Some(rebuilt) => (rebuilt, true),
    None => (node.clone(), any_changed),
  }
}

fn run_one_pass(
  current: &[Node],
  converters: &[Box<dyn Converter>],
  cancel: Option<&CancellationToken>,
) -> (Vec<Node>, bool, bool) {
  let factory = AdHocFactory;
  let mut next = Vec::with_capacity(current.len());
  let mut changed = false;
  let mut i = 0;

  while i < current.len() {
    if cancel.is_some_and(CancellationToken::is_cancelled) {
      next.extend(current[i..].iter().cloned());
      return (next, changed, true);
    }
    let mut claimed = false;
    for converter in converters {
      if let Some(result) = converter.convert(&current[i..], i, &factory) {
        let consumed = result.consumed.max(1);
        next.push(result.node);
        i += consumed;
        changed = true;
        claimed = true;
        break;
      }
    }
    if !claimed {
      next.push(current[i].clone());
      i += 1;
    }
  }

  (next, changed, false)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::types::SimpleType;
  use std::sync::Once;

  static INIT_TRACING: Once = Once::new();

  /// Routes `tracing` output to the test harness's captured writer so the
  /// pass-cap warning below is actually observable with `--nocapture`,
  /// instead of going nowhere for want of a subscriber.
  fn init_tracing() {
    INIT_TRACING.call_once(|| {
      tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .init();
    });
  }

  fn leaf(name: &str, data: &str) -> Node {
    let ty = SimpleType::new(name).into_ref();
    let mut b = ty.new_builder();
    b.set_data(data);
    b.set_children_list(vec![]);
    b.create_node().unwrap()
  }

  fn branch(name: &str, children: Vec<Node>) -> Node {
    let descriptors: Vec<_> = children.iter().map(|_| crate::types::ChildDescriptor::optional("Any")).collect();
    let ty = SimpleType::new(name).with_children(descriptors).allow_trailing(true).into_ref();
    let mut b = ty.new_builder();
    b.set_data("");
    b.set_children_list(children);
    b.create_node().unwrap()
  }

  #[derive(Debug)]
  struct AdditionFolder;

  impl Converter for AdditionFolder {
    fn convert(&self, window: &[Node], _start_index: usize, factory: &dyn NodeFactory) -> Option<ConvertResult> {
      let lhs = window.first()?;
      let op = window.get(1)?;
      let rhs = window.get(2)?;
      if op.type_name() != "Plus" {
        return None;
      }
      if !matches!(lhs.type_name(), "Number" | "Addition") || rhs.type_name() != "Number" {
        return None;
      }
      let node = factory.create("Addition", "", vec![lhs.clone(), rhs.clone()])?;
      Some(ConvertResult { node, consumed: 3 })
    }
  }

  #[test]
  fn test_addition_folding_left_to_right_fixpoint() {
    // 1 + 2 + 3  ->  Addition(Addition(1,2), 3)
    let tokens = vec![
      leaf("Number", "1"),
      leaf("Plus", ""),
      leaf("Number", "2"),
      leaf("Plus", ""),
      leaf("Number", "3"),
    ];
    let converters: Vec<Box<dyn Converter>> = vec![Box::new(AdditionFolder)];
    let result = Transformer::transform(tokens, &converters, None);
    assert_eq!(result.len(), 1);
    let top = &result[0];
    assert_eq!(top.type_name(), "Addition");
    assert_eq!(top.child(1).unwrap().data(), "3");
    let left = top.child(0).unwrap();
    assert_eq!(left.type_name(), "Addition");
    assert_eq!(left.child(0).unwrap().data(), "1");
    assert_eq!(left.child(1).unwrap().data(), "2");
  }

  #[test]
  fn test_transform_leaves_unmatched_children_untouched() {
    let tokens = vec![leaf("Foo", ""), leaf("Bar", "")];
    let converters: Vec<Box<dyn Converter>> = vec![Box::new(AdditionFolder)];
    let result = Transformer::transform(tokens, &converters, None);
    assert_eq!(result.len(), 2);
  }

  #[test]
  fn test_transform_tree_folds_inside_nested_children() {
    // the additions live two levels down from the root; transform_tree must
    // still find and fold them, not just the root's own direct children.
    let inner = branch(
      "Block",
      vec![leaf("Number", "1"), leaf("Plus", ""), leaf("Number", "2")],
    );
    let root = branch("Program", vec![inner]);
    let converters: Vec<Box<dyn Converter>> = vec![Box::new(AdditionFolder)];
    let result = Transformer::transform_tree(root, &converters, None);
    let block = result.child(0).unwrap();
    assert_eq!(block.child_count(), 1);
    assert_eq!(block.child(0).unwrap().type_name(), "Addition");
  }

  #[test]
  fn test_transform_tree_is_idempotent_at_fixpoint() {
    let tokens = vec![leaf("Number", "1"), leaf("Plus", ""), leaf("Number", "2")];
    let root = branch("Program", tokens);
    let converters: Vec<Box<dyn Converter>> = vec![Box::new(AdditionFolder)];
    let once = Transformer::transform_tree(root, &converters, None);
    let twice = Transformer::transform_tree(once.clone(), &converters, None);
    assert!(once.deep_compare(&twice));
  }

  /// Claims one node and rebuilds an equal one in its place every pass —
  /// always reports progress, so the pipeline never reaches a fixpoint and
  /// `Transformer::transform` must give up at its pass cap.
  #[derive(Debug)]
  struct NeverSettles;

  impl Converter for NeverSettles {
    fn convert(&self, window: &[Node], _start_index: usize, factory: &dyn NodeFactory) -> Option<ConvertResult> {
      let only = window.first()?;
      if only.type_name() != "Number" {
        return None;
      }
      let node = factory.create("Number", only.data(), vec![])?;
      Some(ConvertResult { node, consumed: 1 })
    }
  }

  #[test]
  fn test_pass_cap_hit_logs_a_warning() {
    init_tracing();
    let tokens = vec![leaf("Number", "1")];
    let converters: Vec<Box<dyn Converter>> = vec![Box::new(NeverSettles)];
    let result = Transformer::transform(tokens, &converters, None);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].type_name(), "Number");
  }

  #[test]
  fn test_transform_respects_cancellation() {
    let tokens = vec![
      leaf("Number", "1"),
      leaf("Plus", ""),
      leaf("Number", "2"),
      leaf("Plus", ""),
      leaf("Number", "3"),
    ];
    let converters: Vec<Box<dyn Converter>> = vec![Box::new(AdditionFolder)];
    let token = CancellationToken::new();
    token.cancel();
    let result = Transformer::transform(tokens.clone(), &converters, Some(&token));
    assert_eq!(result.len(), tokens.len());
  }
}
