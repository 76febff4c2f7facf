//! The single-row write lock.
//!
//! Only an argon2 PHC string of the secret is stored. State checks and
//! transitions happen inside one `IMMEDIATE` transaction so two concurrent
//! lockers cannot both succeed.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use rusqlite::{Connection, TransactionBehavior};

use crate::{Error, Result, deadline::Deadline};

pub fn is_locked(conn: &Connection) -> rusqlite::Result<bool> {
  conn.query_row("SELECT active FROM lock WHERE id = 1", [], |r| r.get(0))
}

/// Fail with [`Locked`](mcpedia_core::Error::Locked) while the lock is held.
/// Call inside the write transaction that is about to mutate.
pub fn ensure_unlocked(conn: &Connection) -> Result<()> {
  if is_locked(conn)? {
    return Err(mcpedia_core::Error::Locked.into());
  }
  Ok(())
}

fn require_secret(secret: &str) -> Result<()> {
  if secret.is_empty() {
    return Err(mcpedia_core::Error::Validation("lock token is required".into()).into());
  }
  Ok(())
}

pub fn lock(conn: &mut Connection, secret: &str, deadline: &Deadline) -> Result<()> {
  require_secret(secret)?;

  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(secret.as_bytes(), &salt)
    .map_err(|e| Error::Hash(e.to_string()))?
    .to_string();

  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  if is_locked(&tx)? {
    return Err(mcpedia_core::Error::AlreadyLocked.into());
  }
  tx.execute("UPDATE lock SET active = 1, token = ?1 WHERE id = 1", [&hash])?;
  deadline.claim_commit()?;
  tx.commit()?;
  Ok(())
}

pub fn unlock(conn: &mut Connection, secret: &str, deadline: &Deadline) -> Result<()> {
  require_secret(secret)?;

  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let (active, stored): (bool, String) =
    tx.query_row("SELECT active, token FROM lock WHERE id = 1", [], |r| {
      Ok((r.get(0)?, r.get(1)?))
    })?;
  if !active {
    return Err(mcpedia_core::Error::NotLocked.into());
  }

  let parsed = PasswordHash::new(&stored).map_err(|e| Error::Hash(e.to_string()))?;
  Argon2::default()
    .verify_password(secret.as_bytes(), &parsed)
    .map_err(|_| mcpedia_core::Error::InvalidToken)?;

  tx.execute("UPDATE lock SET active = 0, token = '' WHERE id = 1", [])?;
  deadline.claim_commit()?;
  tx.commit()?;
  Ok(())
}
