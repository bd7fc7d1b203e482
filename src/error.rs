//! Error kinds for the core library.
//!
//! Most operations in this crate recover locally and report failure as a
//! `bool` or `Option`/`Result` at the call site (see [`crate::node::Builder`],
//! [`crate::diff::DiffTreeBuilder`]). `CoreError` exists for the smaller set
//! of cases that are either fatal (programmer error) or worth surfacing as a
//! structured value to a caller that wants to report several at once (e.g.
//! [`crate::patcher::DefaultPatcher`] collecting `IncompatibleTransform`
//! warnings across multiple match sites).

use thiserror::Error;

/// Errors that can be surfaced from the core library.
///
/// `ValidationFailure` and `ReferenceNotFound` are recovered locally by
/// callers (returned as `bool`/`Option` at the relevant API); they are
/// included here mainly so logs and test failures have one canonical
/// vocabulary to render them with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
  #[error("validation failed for type `{type_name}`: {reason}")]
  ValidationFailure { type_name: String, reason: String },

  #[error("reference not found")]
  ReferenceNotFound,

  #[error("domain mismatch: cannot compare positions from `{left}` and `{right}`")]
  DomainMismatch { left: String, right: String },

  #[error("parse error at {row}:{column}: {message}")]
  ParseError {
    row: usize,
    column: usize,
    message: String,
  },

  #[error("incompatible transform: {reason}")]
  IncompatibleTransform { reason: String },
}

impl CoreError {
  pub(crate) fn domain_mismatch(left: &str, right: &str) -> Self {
    CoreError::DomainMismatch {
      left: left.to_string(),
      right: right.to_string(),
    }
  }
}
