//! Seams for everything this crate deliberately does not implement: DOT
//! and other graph visualisations, graph-database persistence, JSON tree
//! descriptors, file/IO readers, and language-specific node catalogues
//! (spec §6, all external collaborators — explicit Non-goals of this
//! crate). These traits exist so a downstream adapter can plug into the
//! tree model without this crate depending on any particular rendering or
//! storage library; none of the traits below are implemented here.

use crate::fragment::Source;
use crate::node::Node;

/// Something that can receive a built tree for external consumption — a
/// DOT writer, a graph-DB loader, a JSON serializer. Intentionally
/// minimal: this crate has no opinion on the destination format.
pub trait TreeSink {
  /// Consumes a full tree. Implementations decide what "emit" means.
  fn emit(&mut self, root: &Node);
}

/// Something that can hand this crate a freshly-parsed tree plus the
/// [`Source`] it came from — the seam a language-specific front end would
/// implement, were one shipped (it is not; see spec §6 "file/IO readers").
pub trait TreeSource {
  fn load(&self) -> Option<(Node, Source)>;
}
