//! The `KnowledgeStore` trait.
//!
//! Implemented by storage backends (e.g. `mcpedia-store-sqlite`). The protocol
//! server depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::entry::{Entry, EntryFilter, EntryPatch, EntryStats, NewEntry, TagCount};

/// Abstraction over an MCPedia store backend.
///
/// Mutations (`create`, `update`, `delete`) are atomic: either every derived
/// structure (full-text index, tag associations, usage row) reflects the
/// change or none does. They fail with [`Error::Locked`](crate::Error::Locked)
/// while the write lock is held. Reads are never gated by the lock.
///
/// Usage counters are bumped as a side effect of `get`, `search` and
/// `get_by_context` (and by `update`). Counter failures are swallowed.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait KnowledgeStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Entries: writes ──────────────────────────────────────────────────

  /// Persist a new entry at version 1 with zeroed usage counters.
  fn create(
    &self,
    input: NewEntry,
  ) -> impl Future<Output = Result<Entry, Self::Error>> + Send + '_;

  /// Apply a partial update. The version is bumped by exactly one and
  /// `updated_at` refreshed even when the patch changes nothing.
  fn update<'a>(
    &'a self,
    slug: &'a str,
    patch: EntryPatch,
  ) -> impl Future<Output = Result<Entry, Self::Error>> + Send + 'a;

  /// Permanently remove an entry together with its index row, tag
  /// associations and usage row.
  fn delete<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Entries: reads ───────────────────────────────────────────────────

  /// Fetch one entry with full content. Counts as a read.
  fn get<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Entry, Self::Error>> + Send + 'a;

  /// Entries without content, ordered by title. Only the single `tag`
  /// filter applies.
  fn list<'a>(
    &'a self,
    filter: &'a EntryFilter,
  ) -> impl Future<Output = Result<Vec<Entry>, Self::Error>> + Send + 'a;

  /// Ranked full-text search over title, description and content. Results
  /// carry a snippet instead of content. Each hit counts as a search.
  fn search<'a>(
    &'a self,
    query: &'a str,
    filter: &'a EntryFilter,
    limit: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Entry>, Self::Error>> + Send + 'a;

  /// Full entries matching the filter, where `tags` must all be present.
  /// Each returned entry counts as a read.
  fn get_by_context<'a>(
    &'a self,
    filter: &'a EntryFilter,
    limit: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Entry>, Self::Error>> + Send + 'a;

  /// Every entry with full content, for export. Does not touch counters.
  fn all_entries(
    &self,
  ) -> impl Future<Output = Result<Vec<Entry>, Self::Error>> + Send + '_;

  fn get_stats<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<EntryStats, Self::Error>> + Send + 'a;

  // ── Tags ──────────────────────────────────────────────────────────────

  /// Tags with at least one entry, by count descending then name.
  fn list_tags(
    &self,
  ) -> impl Future<Output = Result<Vec<TagCount>, Self::Error>> + Send + '_;

  // ── Write lock ────────────────────────────────────────────────────────

  fn is_locked(
    &self,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Activate the write lock. Only a hash of `secret` is retained.
  fn lock<'a>(
    &'a self,
    secret: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Release the write lock; `secret` must match the one used to lock.
  fn unlock<'a>(
    &'a self,
    secret: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
