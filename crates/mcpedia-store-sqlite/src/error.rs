//! Error type for `mcpedia-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] mcpedia_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("corrupt row: {0}")]
  CorruptRow(String),

  #[error("password hash error: {0}")]
  Hash(String),

  /// The call did not finish before the store's deadline.
  #[error("storage call exceeded its {0:?} deadline")]
  DeadlineExceeded(std::time::Duration),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  /// Whether retrying the same call could succeed.
  pub fn is_transient(&self) -> bool {
    match self {
      Error::DeadlineExceeded(_) => true,
      Error::Core(e) => e.is_transient(),
      Error::Sqlite(e) => is_busy(e),
      Error::Database(tokio_rusqlite::Error::Rusqlite(e)) => is_busy(e),
      _ => false,
    }
  }
}

fn is_busy(e: &rusqlite::Error) -> bool {
  matches!(
    e.sqlite_error_code(),
    Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
  )
}

fn is_constraint(e: &rusqlite::Error) -> bool {
  matches!(e.sqlite_error_code(), Some(ErrorCode::ConstraintViolation))
}

/// A `UNIQUE` constraint failed. `entries.slug` is the only unique column a
/// plain insert can collide on; tag names go through `INSERT OR IGNORE`.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _) if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

fn classify(e: &rusqlite::Error) -> mcpedia_core::Error {
  if is_busy(e) {
    mcpedia_core::Error::Transient(e.to_string())
  } else if is_unique_violation(e) {
    let detail = match e {
      rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.clone(),
      other => other.to_string(),
    };
    mcpedia_core::Error::DuplicateSlug(detail)
  } else if is_constraint(e) {
    mcpedia_core::Error::Validation(e.to_string())
  } else {
    mcpedia_core::Error::Internal(e.to_string())
  }
}

impl From<Error> for mcpedia_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      Error::Sqlite(ref inner) => classify(inner),
      Error::Database(tokio_rusqlite::Error::Rusqlite(ref inner)) => classify(inner),
      Error::DeadlineExceeded(_) => mcpedia_core::Error::Transient(e.to_string()),
      other => mcpedia_core::Error::Internal(other.to_string()),
    }
  }
}
