//! Per-call deadlines that stay decidable for writes.
//!
//! Timing out on the async side only stops the caller from waiting; the
//! closure already queued on the connection thread still runs. A [`Deadline`]
//! is shared by both sides, and whichever moves it out of `PENDING` first
//! decides the outcome. Either the connection thread claims the commit, and
//! the caller waits for the real result, or the caller abandons the call, and
//! the write rolls back.

use std::{
  sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
  },
  time::{Duration, Instant},
};

use crate::{Error, Result};

const PENDING: u8 = 0;
const COMMITTING: u8 = 1;
const ABANDONED: u8 = 2;

#[derive(Clone, Debug)]
pub struct Deadline {
  budget: Duration,
  at:     Instant,
  state:  Arc<AtomicU8>,
}

impl Deadline {
  pub fn new(budget: Duration) -> Self {
    Self {
      budget,
      at: Instant::now() + budget,
      state: Arc::new(AtomicU8::new(PENDING)),
    }
  }

  pub fn exceeded(&self) -> Error { Error::DeadlineExceeded(self.budget) }

  /// Fail once time has run out or the caller has stopped waiting.
  pub fn check(&self) -> Result<()> {
    if self.state.load(Ordering::Acquire) == ABANDONED || Instant::now() >= self.at {
      return Err(self.exceeded());
    }
    Ok(())
  }

  /// Take the right to commit. Call immediately before `tx.commit()`; on
  /// failure the transaction must be dropped so it rolls back.
  pub fn claim_commit(&self) -> Result<()> {
    if Instant::now() >= self.at {
      return Err(self.exceeded());
    }
    self
      .state
      .compare_exchange(PENDING, COMMITTING, Ordering::AcqRel, Ordering::Acquire)
      .map(|_| ())
      .map_err(|_| self.exceeded())
  }

  /// Stop waiting for the call. Returns `false` when a commit has already
  /// been claimed, in which case the caller must wait for its outcome.
  pub fn abandon(&self) -> bool {
    self
      .state
      .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn abandoned_call_cannot_commit() {
    let d = Deadline::new(Duration::from_secs(60));
    assert!(d.check().is_ok());
    assert!(d.abandon());
    assert!(d.check().unwrap_err().is_transient());
    assert!(d.claim_commit().is_err());
  }

  #[test]
  fn claimed_commit_cannot_be_abandoned() {
    let d = Deadline::new(Duration::from_secs(60));
    d.claim_commit().unwrap();
    assert!(!d.abandon());
  }

  #[test]
  fn expired_deadline_refuses_to_commit() {
    let d = Deadline::new(Duration::ZERO);
    assert!(d.check().is_err());
    assert!(matches!(d.claim_commit(), Err(Error::DeadlineExceeded(_))));
  }
}
