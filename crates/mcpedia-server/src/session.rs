//! In-memory registry of handshake sessions.
//!
//! Sessions are issued by `initialize` and live until the process exits.

use std::{
  collections::HashSet,
  sync::{PoisonError, RwLock},
};

use axum::http::HeaderName;
use uuid::Uuid;

/// Header carrying the session id in both directions.
pub static SESSION_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");

#[derive(Debug, Default)]
pub struct SessionRegistry {
  ids: RwLock<HashSet<String>>,
}

impl SessionRegistry {
  pub fn new() -> Self { Self::default() }

  /// Mint and remember a fresh session id.
  pub fn issue(&self) -> String {
    let id = Uuid::new_v4().simple().to_string();
    self
      .ids
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(id.clone());
    id
  }

  pub fn contains(&self, id: &str) -> bool {
    self
      .ids
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .contains(id)
  }

  pub fn len(&self) -> usize {
    self.ids.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn issued_ids_are_unique_and_known() {
    let sessions = SessionRegistry::new();
    let a = sessions.issue();
    let b = sessions.issue();
    assert_ne!(a, b);
    assert!(sessions.contains(&a));
    assert!(sessions.contains(&b));
    assert!(!sessions.contains("forged"));
    assert_eq!(sessions.len(), 2);
  }
}
