//! `DraftNode`: a lightweight, untyped node used to sketch trees by hand —
//! in tests, in the REPL-ish scenarios spec §8 describes, and as the
//! Converter pipeline's scratch representation before a real `Type` is
//! assigned (see [`crate::convert`]).
//!
//! A draft tree is written in a small mini-language (spec §4.C):
//!
//! ```text
//! node   := IDENT [ '<' STRING '>' ] [ '(' [ list ] ')' ]
//! list   := node { ',' node }
//! IDENT  := [A-Za-z_][A-Za-z0-9_]*
//! STRING := '"' (any char, backslash-escaped) '"'
//! ```
//!
//! `X<"a">(Y, Z<"1">)` parses to a node named `X` carrying data `a` and two
//! children `Y` (no data, no children) and `Z` carrying data `1`.

use crate::error::CoreError;
use crate::node::Node;
use crate::types::{DraftType, Type};
use std::collections::HashMap;

/// A one-shot assembler for a single [`DraftType`] node (spec §4.C
/// `Constructor`). Unlike [`crate::types::Builder`] this has no child-slot
/// validation to satisfy — `DraftType` accepts any data, any children — so
/// the only failure mode is "no name was ever set".
#[derive(Default)]
pub struct Constructor {
  name: Option<String>,
  data: String,
  children: Vec<Node>,
}

impl Constructor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
    self.name = Some(name.into());
    self
  }

  pub fn set_data(&mut self, data: impl Into<String>) -> &mut Self {
    self.data = data.into();
    self
  }

  pub fn add_child(&mut self, child: Node) -> &mut Self {
    self.children.push(child);
    self
  }

  pub fn set_children_list(&mut self, children: Vec<Node>) -> &mut Self {
    self.children = children;
    self
  }

  pub fn is_valid(&self) -> bool {
    self.name.is_some()
  }

  pub fn create_node(&self) -> Option<Node> {
    let name = self.name.clone()?;
    let ty = DraftType::named(name);
    let mut builder = ty.new_builder();
    builder.set_data(&self.data);
    builder.set_children_list(self.children.clone());
    builder.create_node()
  }

  /// Re-emits this (unbuilt) constructor's contents in mini-language form,
  /// the canonical round-trip counterpart to [`parse`].
  pub fn to_draft_string(&self) -> String {
    to_draft_string_parts(self.name.as_deref().unwrap_or(""), &self.data, &self.children)
  }
}

/// Backslash-escapes `"` and `\` for round-tripping through [`parse`].
fn escape_data(data: &str) -> String {
  let mut out = String::with_capacity(data.len());
  for c in data.chars() {
    if c == '"' || c == '\\' {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

fn to_draft_string_parts(name: &str, data: &str, children: &[Node]) -> String {
  let mut out = String::from(name);
  if !data.is_empty() {
    out.push('<');
    out.push('"');
    out.push_str(&escape_data(data));
    out.push('"');
    out.push('>');
  }
  if !children.is_empty() {
    out.push('(');
    for (i, child) in children.iter().enumerate() {
      if i > 0 {
        out.push_str(", ");
      }
      out.push_str(&node_to_draft_string(child));
    }
    out.push(')');
  }
  out
}

/// The canonical mini-language emitter for an already-built node.
pub fn node_to_draft_string(node: &Node) -> String {
  to_draft_string_parts(node.type_name(), node.data(), node.children())
}

/// A name → occurrences registry optionally populated while parsing, so
/// callers can look every node of a given draft name back up after the
/// fact without re-walking the tree (spec §4.C's trailing registry
/// argument). Kept as `Vec` rather than a true set: two structurally
/// identical draft nodes are still distinct occurrences worth keeping, and
/// `Node`'s `Hash`/`Eq` are structural (see `crate::node`), so a `HashSet`
/// here would silently collapse them.
pub type Registry = HashMap<String, Vec<Node>>;

/// Parses a single draft tree, ignoring ASCII whitespace between tokens.
pub fn parse(input: &str) -> Result<Node, CoreError> {
  let mut parser = Parser { bytes: input.as_bytes(), pos: 0, registry: None };
  let node = parser.parse_node()?;
  parser.skip_ws();
  if parser.pos != parser.bytes.len() {
    return Err(parser.error("unexpected trailing input"));
  }
  Ok(node)
}

/// Like [`parse`], additionally recording every parsed node under its draft
/// name in a [`Registry`].
pub fn parse_with_registry(input: &str) -> Result<(Node, Registry), CoreError> {
  let mut parser = Parser { bytes: input.as_bytes(), pos: 0, registry: Some(Registry::new()) };
  let node = parser.parse_node()?;
  parser.skip_ws();
  if parser.pos != parser.bytes.len() {
    return Err(parser.error("unexpected trailing input"));
  }
  Ok((node, parser.registry.unwrap()))
}

struct Parser<'a> {
  bytes: &'a [u8],
  pos: usize,
  registry: Option<Registry>,
}

impl<'a> Parser<'a> {
  fn error(&self, message: &str) -> CoreError {
    let (row, column) = self.row_col();
    CoreError::ParseError { row, column, message: message.to_string() }
  }

  fn row_col(&self) -> (usize, usize) {
    let consumed = &self.bytes[..self.pos];
    let row = 1 + consumed.iter().filter(|b| **b == b'\n').count();
    let column = match consumed.iter().rposition(|b| *b == b'\n') {
      Some(last_nl) => self.pos - last_nl,
      None => self.pos + 1,
    };
    (row, column)
  }

  fn peek(&self) -> Option<u8> {
    self.bytes.get(self.pos).copied()
  }

  fn skip_ws(&mut self) {
    while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
      self.pos += 1;
    }
  }

  fn expect(&mut self, byte: u8) -> Result<(), CoreError> {
    if self.peek() == Some(byte) {
      self.pos += 1;
      Ok(())
    } else {
      Err(self.error(&format!("expected `{}`", byte as char)))
    }
  }

  fn parse_name(&mut self) -> Result<String, CoreError> {
    let start = self.pos;
    if !matches!(self.peek(), Some(b) if b.is_ascii_alphabetic() || b == b'_') {
      return Err(self.error("expected a node name"));
    }
    while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
      self.pos += 1;
    }
    Ok(String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned())
  }

  /// Reads a `"..."` literal with backslash escapes (spec §4.C: "STRING is
  /// double-quoted with backslash escapes"): a backslash consumes the next
  /// byte literally, so `\"` embeds a quote and `\\` embeds a backslash.
  fn parse_quoted_data(&mut self) -> Result<String, CoreError> {
    self.expect(b'"')?;
    let mut data = Vec::new();
    loop {
      match self.peek() {
        None => return Err(self.error("unterminated string literal")),
        Some(b'"') => break,
        Some(b'\\') => {
          self.pos += 1;
          match self.peek() {
            Some(escaped) => {
              data.push(escaped);
              self.pos += 1;
            }
            None => return Err(self.error("unterminated escape sequence")),
          }
        }
        Some(b) => {
          data.push(b);
          self.pos += 1;
        }
      }
    }
    self.expect(b'"')?;
    Ok(String::from_utf8_lossy(&data).into_owned())
  }

  fn parse_node(&mut self) -> Result<Node, CoreError> {
    self.skip_ws();
    let name = self.parse_name()?;
    self.skip_ws();

    let mut constructor = Constructor::new();
    constructor.set_name(name.clone());

    if self.peek() == Some(b'<') {
      self.pos += 1;
      self.skip_ws();
      let data = self.parse_quoted_data()?;
      self.skip_ws();
      self.expect(b'>')?;
      constructor.set_data(data);
    }

    self.skip_ws();
    if self.peek() == Some(b'(') {
      self.pos += 1;
      self.skip_ws();
      let mut children = Vec::new();
      if self.peek() != Some(b')') {
        loop {
          children.push(self.parse_node()?);
          self.skip_ws();
          if self.peek() == Some(b',') {
            self.pos += 1;
            continue;
          }
          break;
        }
      }
      self.skip_ws();
      self.expect(b')')?;
      constructor.set_children_list(children);
    }

    let node = constructor
      .create_node()
      .ok_or_else(|| self.error("failed to build draft node"))?;
    if let Some(registry) = &mut self.registry {
      registry.entry(name).or_default().push(node.clone());
    }
    Ok(node)
  }
}
