//! Cooperative cancellation (spec §5 — ambient concern, not in spec.md's
//! component table): a handle threaded optionally into the long-running
//! operations ([`crate::convert::Transformer::transform`],
//! [`crate::matcher::Matcher::match_all`], [`crate::patcher::DefaultPatcher::patch`])
//! and checked only at their named safe points, never in a hot inner loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply-cloned cancellation flag. `None` everywhere this crate takes
/// `Option<&CancellationToken>` means "never cancel".
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
  pub fn new() -> Self {
    Self(Arc::new(AtomicBool::new(false)))
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_cancellation_is_visible_across_clones() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());
    token.cancel();
    assert!(clone.is_cancelled());
  }
}
