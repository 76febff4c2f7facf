//! Usage counters kept in `entry_stats`.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};

use crate::encode::{RawStats, encode_dt};

/// Which counter an event increments.
#[derive(Debug, Clone, Copy)]
pub enum Counter {
  Reads,
  Searches,
  Updates,
}

impl Counter {
  fn sql(self) -> &'static str {
    match self {
      Self::Reads => {
        "UPDATE entry_stats SET reads = reads + 1, last_read_at = ?1 WHERE entry_id = ?2"
      }
      Self::Searches => {
        "UPDATE entry_stats SET searches = searches + 1, last_search_at = ?1 \
         WHERE entry_id = ?2"
      }
      Self::Updates => {
        "UPDATE entry_stats SET updates = updates + 1, last_update_at = ?1 \
         WHERE entry_id = ?2"
      }
    }
  }
}

pub fn insert_zeroed(conn: &Connection, entry_id: i64) -> rusqlite::Result<()> {
  conn.execute("INSERT INTO entry_stats (entry_id) VALUES (?1)", [entry_id])?;
  Ok(())
}

/// Increment `counter` once for every id, in one short transaction.
pub fn bump(conn: &mut Connection, counter: Counter, entry_ids: &[i64]) -> rusqlite::Result<()> {
  if entry_ids.is_empty() {
    return Ok(());
  }
  let now = encode_dt(Utc::now());
  let tx = conn.transaction()?;
  {
    let mut stmt = tx.prepare_cached(counter.sql())?;
    for id in entry_ids {
      stmt.execute(rusqlite::params![now, id])?;
    }
  }
  tx.commit()
}

pub fn load(conn: &Connection, slug: &str) -> rusqlite::Result<Option<RawStats>> {
  conn
    .query_row(
      "SELECT s.reads, s.searches, s.updates, \
              s.last_read_at, s.last_search_at, s.last_update_at \
         FROM entry_stats s JOIN entries e ON e.id = s.entry_id \
        WHERE e.slug = ?1",
      [slug],
      |r| {
        Ok(RawStats {
          reads:          r.get(0)?,
          searches:       r.get(1)?,
          updates:        r.get(2)?,
          last_read_at:   r.get(3)?,
          last_search_at: r.get(4)?,
          last_update_at: r.get(5)?,
        })
      },
    )
    .optional()
}
