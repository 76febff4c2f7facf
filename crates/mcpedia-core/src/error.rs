//! Error taxonomy shared by every layer of the store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Bad or missing input, including oversized content.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("entry not found: {0}")]
  NotFound(String),

  #[error("an entry with slug {0:?} already exists")]
  DuplicateSlug(String),

  #[error("database is locked; write operations are disabled")]
  Locked,

  #[error("database is already locked")]
  AlreadyLocked,

  #[error("database is not locked")]
  NotLocked,

  #[error("invalid lock token")]
  InvalidToken,

  /// Storage contention or an expired deadline. Retrying may succeed.
  #[error("storage temporarily unavailable: {0}")]
  Transient(String),

  #[error("internal storage error: {0}")]
  Internal(String),
}

impl Error {
  /// Stable machine-readable name of the failure class.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Validation(_) => "validation",
      Self::NotFound(_) => "not_found",
      Self::DuplicateSlug(_) => "duplicate_slug",
      Self::Locked => "locked",
      Self::AlreadyLocked => "already_locked",
      Self::NotLocked => "not_locked",
      Self::InvalidToken => "invalid_token",
      Self::Transient(_) => "transient",
      Self::Internal(_) => "internal",
    }
  }

  pub fn is_transient(&self) -> bool { matches!(self, Self::Transient(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
