//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with microsecond precision.
//! Kinds are stored by their lowercase name.

use std::str::FromStr as _;

use chrono::{DateTime, SecondsFormat, Utc};
use mcpedia_core::{Entry, EntryKind, EntryStats};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── EntryKind ───────────────────────────────────────────────────────────────

pub fn decode_kind(s: &str) -> Result<EntryKind> {
  EntryKind::from_str(s).map_err(|_| Error::CorruptRow(format!("unknown kind: {s:?}")))
}

// ─── Entry rows ──────────────────────────────────────────────────────────────

/// Column list for full entry rows, aliased on `e`.
pub const ENTRY_COLUMNS: &str = "e.id, e.slug, e.title, e.description, e.content, e.kind, \
   e.language, e.domain, e.project, e.version, e.created_at, e.updated_at";

/// Same shape as [`ENTRY_COLUMNS`] with the content column blanked out.
pub const ENTRY_COLUMNS_NO_CONTENT: &str = "e.id, e.slug, e.title, e.description, '' AS content, \
   e.kind, e.language, e.domain, e.project, e.version, e.created_at, e.updated_at";

/// An `entries` row as read from SQLite, before decoding.
pub struct RawEntry {
  pub id:          i64,
  pub slug:        String,
  pub title:       String,
  pub description: String,
  pub content:     String,
  pub kind:        String,
  pub language:    String,
  pub domain:      String,
  pub project:     String,
  pub version:     i64,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawEntry {
  /// Read the first twelve columns in [`ENTRY_COLUMNS`] order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      slug:        row.get(1)?,
      title:       row.get(2)?,
      description: row.get(3)?,
      content:     row.get(4)?,
      kind:        row.get(5)?,
      language:    row.get(6)?,
      domain:      row.get(7)?,
      project:     row.get(8)?,
      version:     row.get(9)?,
      created_at:  row.get(10)?,
      updated_at:  row.get(11)?,
    })
  }

  pub fn into_entry(self, tags: Vec<String>, snippet: Option<String>) -> Result<Entry> {
    Ok(Entry {
      id: self.id,
      slug: self.slug,
      title: self.title,
      description: self.description,
      content: self.content,
      kind: decode_kind(&self.kind)?,
      language: self.language,
      domain: self.domain,
      project: self.project,
      version: self.version,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      tags,
      snippet,
    })
  }
}

// ─── Stats rows ──────────────────────────────────────────────────────────────

pub struct RawStats {
  pub reads:          i64,
  pub searches:       i64,
  pub updates:        i64,
  pub last_read_at:   Option<String>,
  pub last_search_at: Option<String>,
  pub last_update_at: Option<String>,
}

impl RawStats {
  pub fn into_stats(self) -> Result<EntryStats> {
    Ok(EntryStats {
      reads:          self.reads,
      searches:       self.searches,
      updates:        self.updates,
      last_read_at:   decode_opt_dt(self.last_read_at)?,
      last_search_at: decode_opt_dt(self.last_search_at)?,
      last_update_at: decode_opt_dt(self.last_update_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_keep_microseconds() {
    let now = Utc::now();
    let decoded = decode_dt(&encode_dt(now)).unwrap();
    assert_eq!(decoded.timestamp_micros(), now.timestamp_micros());
  }

  #[test]
  fn bad_timestamp_is_reported() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }

  #[test]
  fn unknown_kind_is_a_corrupt_row() {
    assert!(matches!(decode_kind("recipe"), Err(Error::CorruptRow(_))));
    assert_eq!(decode_kind("guide").unwrap(), EntryKind::Guide);
  }
}
