//! [`SqliteStore`]: the SQLite implementation of [`KnowledgeStore`].

use std::{path::Path, time::Duration};

use chrono::{TimeDelta, Utc};
use mcpedia_core::{
  CONTEXT_LIMIT_DEFAULT, Entry, EntryFilter, EntryPatch, EntryStats, KnowledgeStore, NewEntry,
  SEARCH_LIMIT_DEFAULT, TagCount, clamp_limit,
};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, ToSql};

use crate::{
  Error, Result,
  deadline::Deadline,
  encode::{ENTRY_COLUMNS, ENTRY_COLUMNS_NO_CONTENT, RawEntry, decode_dt, encode_dt},
  error::is_unique_violation,
  lock,
  query::{FilterSql, TagMode, fts_query},
  schema::{BUSY_TIMEOUT, SCHEMA},
  stats::{self, Counter},
  tags,
};

/// Deadline applied to every storage call unless overridden with
/// [`SqliteStore::with_deadline`].
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A knowledge store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:     tokio_rusqlite::Connection,
  deadline: Duration,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, deadline: DEFAULT_DEADLINE };
    store.init_schema(true).await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, deadline: DEFAULT_DEADLINE };
    store.init_schema(false).await?;
    Ok(store)
  }

  /// Bound every subsequent call by `deadline` instead of [`DEFAULT_DEADLINE`].
  pub fn with_deadline(mut self, deadline: Duration) -> Self {
    self.deadline = deadline;
    self
  }

  pub fn deadline(&self) -> Duration { self.deadline }

  async fn init_schema(&self, wal: bool) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        if wal {
          let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))?;
        }
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread, failing with
  /// [`Error::DeadlineExceeded`] if it does not finish in time.
  ///
  /// Writers must call [`Deadline::claim_commit`] right before committing.
  /// A call that times out after claiming is awaited to completion, so a
  /// reported deadline failure never hides a committed write.
  pub(crate) async fn run<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection, &Deadline) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let deadline = Deadline::new(self.deadline);
    let guard = deadline.clone();
    let call = self
      .conn
      .call(move |conn| Ok(guard.check().and_then(|()| f(conn, &guard))));
    tokio::pin!(call);

    match tokio::time::timeout(self.deadline, &mut call).await {
      Ok(res) => res?,
      Err(_) if deadline.abandon() => Err(deadline.exceeded()),
      Err(_) => {
        tracing::debug!("deadline passed mid-commit; waiting for the outcome");
        call.await?
      }
    }
  }

  /// Best-effort counter increment, detached from the caller. Failures are
  /// logged and dropped.
  fn bump(&self, counter: Counter, ids: Vec<i64>) {
    if ids.is_empty() {
      return;
    }
    let store = self.clone();
    tokio::spawn(async move {
      let result = store
        .run(move |conn, _| Ok(stats::bump(conn, counter, &ids)?))
        .await;
      if let Err(e) = result {
        tracing::warn!(?counter, error = %e, "failed to record entry usage");
      }
    });
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

/// Fetch one full entry (with tags) matching `cond`, which binds `?1`.
fn fetch_one(conn: &Connection, cond: &str, param: impl ToSql) -> Result<Option<Entry>> {
  let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE {cond}");
  let raw = conn
    .query_row(&sql, [param], RawEntry::from_row)
    .optional()?;
  raw
    .map(|raw| {
      let tags = tags::tags_for_entry(conn, raw.id)?;
      raw.into_entry(tags, None)
    })
    .transpose()
}

/// Run a multi-row entry query. When `snippet` is set, column 12 holds the
/// search snippet.
fn fetch_many(conn: &Connection, sql: &str, filter: &FilterSql, snippet: bool) -> Result<Vec<Entry>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map(filter.params(), |r| {
      let raw = RawEntry::from_row(r)?;
      let snippet: Option<String> = if snippet { Some(r.get(12)?) } else { None };
      Ok((raw, snippet))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows
    .into_iter()
    .map(|(raw, snippet)| {
      let tags = tags::tags_for_entry(conn, raw.id)?;
      raw.into_entry(tags, snippet)
    })
    .collect()
}

fn id_for_slug(conn: &Connection, slug: &str) -> Result<(i64, String)> {
  conn
    .query_row(
      "SELECT id, updated_at FROM entries WHERE slug = ?1",
      [slug],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()?
    .ok_or_else(|| mcpedia_core::Error::NotFound(slug.to_owned()).into())
}

/// Rebuild the full-text row for `id` from the stored entry.
fn reindex(conn: &Connection, id: i64) -> rusqlite::Result<()> {
  conn.execute("DELETE FROM entries_fts WHERE rowid = ?1", [id])?;
  conn.execute(
    "INSERT INTO entries_fts (rowid, title, description, content) \
     SELECT id, title, description, content FROM entries WHERE id = ?1",
    [id],
  )?;
  Ok(())
}

fn ids(entries: &[Entry]) -> Vec<i64> { entries.iter().map(|e| e.id).collect() }

// ─── KnowledgeStore impl ─────────────────────────────────────────────────────

impl KnowledgeStore for SqliteStore {
  type Error = Error;

  // ── Entries: writes ──────────────────────────────────────────────────────

  async fn create(&self, input: NewEntry) -> Result<Entry> {
    input.validate()?;

    let entry = self
      .run(move |conn, deadline| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        lock::ensure_unlocked(&tx)?;

        let slug = input.slug.trim().to_owned();
        let taken = tx
          .query_row("SELECT 1 FROM entries WHERE slug = ?1", [&slug], |_| Ok(()))
          .optional()?
          .is_some();
        if taken {
          return Err(mcpedia_core::Error::DuplicateSlug(slug).into());
        }

        let now = encode_dt(Utc::now());
        let inserted = tx.execute(
          "INSERT INTO entries (
             slug, title, description, content, kind,
             language, domain, project, version, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)",
          rusqlite::params![
            slug,
            input.title,
            input.description,
            input.content,
            input.kind.to_string(),
            input.language,
            input.domain,
            input.project,
            now,
          ],
        );
        if let Err(e) = &inserted
          && is_unique_violation(e)
        {
          return Err(mcpedia_core::Error::DuplicateSlug(slug).into());
        }
        inserted?;
        let id = tx.last_insert_rowid();

        reindex(&tx, id)?;
        stats::insert_zeroed(&tx, id)?;
        tags::replace_tags(&tx, id, &input.tags)?;

        let entry = fetch_one(&tx, "e.id = ?1", id)?
          .ok_or_else(|| Error::CorruptRow(format!("entry {id} vanished during create")))?;
        deadline.claim_commit()?;
        tx.commit()?;
        Ok(entry)
      })
      .await?;

    tracing::debug!(slug = %entry.slug, "created entry");
    Ok(entry)
  }

  async fn update<'a>(&'a self, slug: &'a str, patch: EntryPatch) -> Result<Entry> {
    patch.validate()?;
    let slug = slug.to_owned();

    let entry = self
      .run(move |conn, deadline| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        lock::ensure_unlocked(&tx)?;

        let (id, prev) = id_for_slug(&tx, &slug)?;
        // Keep updated_at strictly increasing even on a coarse clock.
        let floor = decode_dt(&prev)? + TimeDelta::microseconds(1);
        let now = Utc::now().max(floor);

        tx.execute(
          "UPDATE entries SET
             title       = COALESCE(?2, title),
             description = COALESCE(?3, description),
             content     = COALESCE(?4, content),
             kind        = COALESCE(?5, kind),
             language    = COALESCE(?6, language),
             domain      = COALESCE(?7, domain),
             project     = COALESCE(?8, project),
             version     = version + 1,
             updated_at  = ?9
           WHERE id = ?1",
          rusqlite::params![
            id,
            patch.title,
            patch.description,
            patch.content,
            patch.kind.map(|k| k.to_string()),
            patch.language,
            patch.domain,
            patch.project,
            encode_dt(now),
          ],
        )?;

        reindex(&tx, id)?;
        if let Some(new_tags) = &patch.tags {
          tags::replace_tags(&tx, id, new_tags)?;
        }

        let entry = fetch_one(&tx, "e.id = ?1", id)?
          .ok_or_else(|| Error::CorruptRow(format!("entry {id} vanished during update")))?;
        deadline.claim_commit()?;
        tx.commit()?;
        Ok(entry)
      })
      .await?;

    self.bump(Counter::Updates, vec![entry.id]);
    tracing::debug!(slug = %entry.slug, version = entry.version, "updated entry");
    Ok(entry)
  }

  async fn delete<'a>(&'a self, slug: &'a str) -> Result<()> {
    let slug = slug.to_owned();
    self
      .run(move |conn, deadline| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        lock::ensure_unlocked(&tx)?;

        let (id, _) = id_for_slug(&tx, &slug)?;
        tx.execute("DELETE FROM entries_fts WHERE rowid = ?1", [id])?;
        // Tag associations and the stats row go with the entry via cascade.
        tx.execute("DELETE FROM entries WHERE id = ?1", [id])?;
        tags::gc_orphans(&tx)?;
        deadline.claim_commit()?;
        tx.commit()?;
        tracing::debug!(%slug, "deleted entry");
        Ok(())
      })
      .await
  }

  // ── Entries: reads ───────────────────────────────────────────────────────

  async fn get<'a>(&'a self, slug: &'a str) -> Result<Entry> {
    let owned = slug.to_owned();
    let entry = self
      .run(move |conn, _| fetch_one(conn, "e.slug = ?1", owned))
      .await?
      .ok_or_else(|| mcpedia_core::Error::NotFound(slug.to_owned()))?;

    self.bump(Counter::Reads, vec![entry.id]);
    Ok(entry)
  }

  async fn list<'a>(&'a self, filter: &'a EntryFilter) -> Result<Vec<Entry>> {
    let sql = FilterSql::from_filter(filter, TagMode::Single);
    self
      .run(move |conn, _| {
        let q = format!(
          "SELECT {ENTRY_COLUMNS_NO_CONTENT} FROM entries e{}{} ORDER BY e.title, e.slug",
          sql.joins(),
          sql.where_clause(),
        );
        fetch_many(conn, &q, &sql, false)
      })
      .await
  }

  async fn search<'a>(
    &'a self,
    query: &'a str,
    filter: &'a EntryFilter,
    limit: Option<i64>,
  ) -> Result<Vec<Entry>> {
    let fts = fts_query(query)
      .ok_or_else(|| mcpedia_core::Error::Validation("search query is required".into()))?;
    let limit = clamp_limit(limit, SEARCH_LIMIT_DEFAULT);

    let mut sql = FilterSql::new();
    sql.push_cond("entries_fts MATCH ?", fts);
    sql.push_filter(filter, TagMode::Single);
    sql.push_param(i64::from(limit));

    let hits = self
      .run(move |conn, _| {
        let q = format!(
          "SELECT {ENTRY_COLUMNS_NO_CONTENT}, \
                  snippet(entries_fts, -1, '>>>', '<<<', '...', 32) \
             FROM entries_fts JOIN entries e ON e.id = entries_fts.rowid{}{} \
            ORDER BY entries_fts.rank LIMIT ?",
          sql.joins(),
          sql.where_clause(),
        );
        fetch_many(conn, &q, &sql, true)
      })
      .await?;

    self.bump(Counter::Searches, ids(&hits));
    Ok(hits)
  }

  async fn get_by_context<'a>(
    &'a self,
    filter: &'a EntryFilter,
    limit: Option<i64>,
  ) -> Result<Vec<Entry>> {
    let limit = clamp_limit(limit, CONTEXT_LIMIT_DEFAULT);
    let mut sql = FilterSql::from_filter(filter, TagMode::All);
    sql.push_param(i64::from(limit));

    let entries = self
      .run(move |conn, _| {
        let q = format!(
          "SELECT {ENTRY_COLUMNS} FROM entries e{}{} ORDER BY e.title, e.slug LIMIT ?",
          sql.joins(),
          sql.where_clause(),
        );
        fetch_many(conn, &q, &sql, false)
      })
      .await?;

    self.bump(Counter::Reads, ids(&entries));
    Ok(entries)
  }

  async fn all_entries(&self) -> Result<Vec<Entry>> {
    self
      .run(|conn, _| {
        let q = format!("SELECT {ENTRY_COLUMNS} FROM entries e ORDER BY e.title, e.slug");
        fetch_many(conn, &q, &FilterSql::new(), false)
      })
      .await
  }

  async fn get_stats<'a>(&'a self, slug: &'a str) -> Result<EntryStats> {
    let owned = slug.to_owned();
    let raw = self
      .run(move |conn, _| Ok(stats::load(conn, &owned)?))
      .await?
      .ok_or_else(|| mcpedia_core::Error::NotFound(slug.to_owned()))?;
    raw.into_stats()
  }

  // ── Tags ──────────────────────────────────────────────────────────────────

  async fn list_tags(&self) -> Result<Vec<TagCount>> {
    self.run(|conn, _| Ok(tags::list_tags(conn)?)).await
  }

  // ── Write lock ────────────────────────────────────────────────────────────

  async fn is_locked(&self) -> Result<bool> {
    self.run(|conn, _| Ok(lock::is_locked(conn)?)).await
  }

  async fn lock<'a>(&'a self, secret: &'a str) -> Result<()> {
    let secret = secret.to_owned();
    self.run(move |conn, deadline| lock::lock(conn, &secret, deadline)).await?;
    tracing::info!("write lock activated");
    Ok(())
  }

  async fn unlock<'a>(&'a self, secret: &'a str) -> Result<()> {
    let secret = secret.to_owned();
    self.run(move |conn, deadline| lock::unlock(conn, &secret, deadline)).await?;
    tracing::info!("write lock released");
    Ok(())
  }
}
