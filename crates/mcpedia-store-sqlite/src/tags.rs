//! Tag registry: the `tags` table and the `entry_tags` association.
//!
//! Tags come into existence on first use and are removed as soon as no entry
//! carries them. All functions run on the caller's connection so they join
//! whatever transaction is open.

use mcpedia_core::{TagCount, normalize_tags};
use rusqlite::Connection;

/// Replace the whole tag set of `entry_id` with `tags`.
///
/// Removes every current association first, then ensures each tag row and
/// association exists. Tags left without entries are deleted.
pub fn replace_tags<S: AsRef<str>>(
  conn: &Connection,
  entry_id: i64,
  tags: &[S],
) -> rusqlite::Result<()> {
  conn.execute("DELETE FROM entry_tags WHERE entry_id = ?1", [entry_id])?;

  let mut ensure_tag = conn.prepare_cached("INSERT OR IGNORE INTO tags (name) VALUES (?1)")?;
  let mut tag_id = conn.prepare_cached("SELECT id FROM tags WHERE name = ?1")?;
  let mut link = conn.prepare_cached(
    "INSERT OR IGNORE INTO entry_tags (entry_id, tag_id) VALUES (?1, ?2)",
  )?;

  for name in normalize_tags(tags) {
    ensure_tag.execute([&name])?;
    let id: i64 = tag_id.query_row([&name], |r| r.get(0))?;
    link.execute([entry_id, id])?;
  }

  gc_orphans(conn)?;
  Ok(())
}

/// Delete tag rows that no longer have any association.
pub fn gc_orphans(conn: &Connection) -> rusqlite::Result<usize> {
  conn.execute(
    "DELETE FROM tags WHERE NOT EXISTS \
       (SELECT 1 FROM entry_tags et WHERE et.tag_id = tags.id)",
    [],
  )
}

pub fn tags_for_entry(conn: &Connection, entry_id: i64) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare_cached(
    "SELECT t.name FROM tags t \
       JOIN entry_tags et ON et.tag_id = t.id \
      WHERE et.entry_id = ?1 \
      ORDER BY t.name",
  )?;
  stmt.query_map([entry_id], |r| r.get(0))?.collect()
}

/// Tags with at least one entry, most used first, then by name.
pub fn list_tags(conn: &Connection) -> rusqlite::Result<Vec<TagCount>> {
  let mut stmt = conn.prepare_cached(
    "SELECT t.name, COUNT(et.entry_id) AS n FROM tags t \
       JOIN entry_tags et ON et.tag_id = t.id \
      GROUP BY t.id \
     HAVING n > 0 \
      ORDER BY n DESC, t.name ASC",
  )?;
  stmt
    .query_map([], |r| Ok(TagCount { name: r.get(0)?, count: r.get(1)? }))?
    .collect()
}
