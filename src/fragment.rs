//! Maps nodes back to source spans for diagnostics.
//!
//! `Source` owns the text a [`Fragment`] is carved out of; `Position` is a
//! single `(row, column)` point tied to a `Source`; `Fragment` is the
//! `(begin, end)` pair used to locate a node. None of this module is
//! required to build or match trees — it exists purely so a node can answer
//! "where did this come from" for error messages and external tooling.

use std::sync::Arc;

/// A named, line-indexed source text.
///
/// Two `Source`s are equal iff they share the same name; this is the
/// identity `Position`/`Fragment` comparisons rely on to detect a
/// cross-source comparison (a [`crate::error::CoreError::DomainMismatch`]).
#[derive(Debug, Clone)]
pub struct Source {
  name: Arc<str>,
  lines: Arc<[String]>,
}

impl Source {
  pub fn new(name: impl Into<Arc<str>>, text: &str) -> Self {
    let lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    Self {
      name: name.into(),
      lines: lines.into(),
    }
  }

  /// A source with no backing text, used for synthetic/generated nodes.
  pub fn empty() -> Self {
    Self::new("<empty>", "")
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  fn line(&self, row: usize) -> &str {
    self.lines.get(row - 1).map(String::as_str).unwrap_or("")
  }

  /// Extracts the text delimited by `begin`..`end` (1-based, inclusive of
  /// `begin`'s column, exclusive of `end`'s column), honoring `end.row` as
  /// authoritative for the last line (see `spec` Design Note 9b).
  pub fn text_of(&self, begin: &Position, end: &Position) -> String {
    assert_eq!(
      begin.source.name, self.name,
      "fragment begin position does not belong to this source"
    );
    assert_eq!(
      end.source.name, self.name,
      "fragment end position does not belong to this source"
    );
    if begin.row == end.row {
      let line = self.line(begin.row);
      let start = (begin.column - 1).min(line.len());
      let stop = (end.column - 1).min(line.len());
      return line[start..stop.max(start)].to_string();
    }
    let mut out = String::new();
    let first = self.line(begin.row);
    let start = (begin.column - 1).min(first.len());
    out.push_str(&first[start..]);
    for row in (begin.row + 1)..end.row {
      out.push('\n');
      out.push_str(self.line(row));
    }
    out.push('\n');
    let last = self.line(end.row);
    let stop = (end.column - 1).min(last.len());
    out.push_str(&last[..stop]);
    out
  }
}

impl PartialEq for Source {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.name, &other.name) || self.name == other.name
  }
}
impl Eq for Source {}

/// A 1-based `(row, column)` point within a [`Source`].
#[derive(Debug, Clone)]
pub struct Position {
  source: Source,
  row: usize,
  column: usize,
}

impl Position {
  pub fn new(source: Source, row: usize, column: usize) -> Self {
    assert!(row >= 1 && column >= 1, "Position is 1-based");
    Self {
      source,
      row,
      column,
    }
  }

  pub fn source(&self) -> &Source {
    &self.source
  }
  pub fn row(&self) -> usize {
    self.row
  }
  pub fn column(&self) -> usize {
    self.column
  }

  fn same_source(&self, other: &Self) -> bool {
    self.source == other.source
  }
}

impl PartialEq for Position {
  fn eq(&self, other: &Self) -> bool {
    self.same_source(other) && self.row == other.row && self.column == other.column
  }
}

/// Total order only within a shared `Source`; comparing positions from
/// different sources is undefined per `spec` §3, so `partial_cmp` returns
/// `None` rather than panicking — callers that need the fatal "domain
/// mismatch" behavior should use [`Position::checked_cmp`].
impl PartialOrd for Position {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    if !self.same_source(other) {
      return None;
    }
    Some((self.row, self.column).cmp(&(other.row, other.column)))
  }
}

impl Position {
  /// Like `partial_cmp`, but panics with a `DomainMismatch` message instead
  /// of returning `None` when the two positions come from different
  /// sources. Use this where a cross-source comparison is a programmer
  /// error rather than an expected "not comparable" outcome.
  pub fn checked_cmp(&self, other: &Self) -> std::cmp::Ordering {
    self.partial_cmp(other).unwrap_or_else(|| {
      panic!(
        "{}",
        crate::error::CoreError::domain_mismatch(self.source.name(), other.source.name())
      )
    })
  }
}

/// A `(begin, end)` span within a single [`Source`].
#[derive(Debug, Clone)]
pub struct Fragment {
  begin: Position,
  end: Position,
  source: Source,
}

impl Fragment {
  /// Builds a fragment. Panics (`DomainMismatch`) if `begin`, `end` and
  /// `source` do not all agree on the same underlying source — creating a
  /// fragment across sources is a programmer error (`spec` §3/§7).
  pub fn new(begin: Position, end: Position, source: Source) -> Self {
    if begin.source != source || end.source != source {
      panic!(
        "{}",
        crate::error::CoreError::domain_mismatch(source.name(), begin.source.name())
      );
    }
    Self { begin, end, source }
  }

  /// An empty fragment carrying no source information, used by synthetic
  /// nodes (e.g. ones built purely in-memory by a converter).
  pub fn empty() -> Self {
    let source = Source::empty();
    let pos = Position::new(source.clone(), 1, 1);
    Self {
      begin: pos.clone(),
      end: pos,
      source,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.source.name() == "<empty>"
  }

  pub fn begin(&self) -> &Position {
    &self.begin
  }
  pub fn end(&self) -> &Position {
    &self.end
  }
  pub fn source(&self) -> &Source {
    &self.source
  }

  pub fn as_string(&self) -> String {
    self.source.text_of(&self.begin, &self.end)
  }
}
