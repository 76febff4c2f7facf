//! Dynamic SQL for the filtered read paths (`list`, `search`,
//! `get_by_context`).
//!
//! Every fragment is built from fixed column names; caller-supplied values
//! only ever travel as bound parameters, in the order the conditions were
//! pushed.

use mcpedia_core::{EntryFilter, normalize_tags};
use rusqlite::types::Value;

/// Accumulated `JOIN`s, `WHERE` conditions and their parameters.
#[derive(Default)]
pub struct FilterSql {
  joins:  String,
  conds:  Vec<String>,
  params: Vec<Value>,
}

/// How tag filters are applied.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
  /// Only `filter.tag` is honoured.
  Single,
  /// `filter.tags` must all be present; falls back to `filter.tag` when empty.
  All,
}

impl FilterSql {
  pub fn new() -> Self { Self::default() }

  /// Build the metadata part of a query over `entries e`.
  pub fn from_filter(filter: &EntryFilter, mode: TagMode) -> Self {
    let mut sql = Self::new();
    sql.push_filter(filter, mode);
    sql
  }

  pub fn push_cond(&mut self, cond: &str, value: impl Into<Value>) {
    self.conds.push(cond.to_owned());
    self.params.push(value.into());
  }

  pub fn push_filter(&mut self, filter: &EntryFilter, mode: TagMode) {
    if let Some(kind) = filter.kind {
      self.push_cond("e.kind = ?", kind.to_string());
    }
    if let Some(language) = non_empty(&filter.language) {
      self.push_cond("e.language = ?", language.to_owned());
    }
    if let Some(domain) = non_empty(&filter.domain) {
      self.push_cond("e.domain = ?", domain.to_owned());
    }
    if let Some(project) = non_empty(&filter.project) {
      self.push_cond("e.project = ?", project.to_owned());
    }

    let required = match mode {
      TagMode::All => normalize_tags(&filter.tags),
      TagMode::Single => Vec::new(),
    };
    if required.is_empty() {
      if let Some(tag) = non_empty(&filter.tag) {
        self.push_tag_join(0, tag.trim().to_owned());
      }
    } else {
      for (i, tag) in required.into_iter().enumerate() {
        self.push_tag_join(i, tag);
      }
    }
  }

  /// Join the association table once per required tag so that every tag
  /// must be present on the same entry.
  fn push_tag_join(&mut self, i: usize, tag: String) {
    self.joins.push_str(&format!(
      " JOIN entry_tags et{i} ON et{i}.entry_id = e.id \
        JOIN tags t{i} ON t{i}.id = et{i}.tag_id"
    ));
    self.push_cond(&format!("t{i}.name = ?"), tag);
  }

  pub fn joins(&self) -> &str { &self.joins }

  /// ` WHERE a AND b`, or nothing when there are no conditions.
  pub fn where_clause(&self) -> String {
    if self.conds.is_empty() {
      String::new()
    } else {
      format!(" WHERE {}", self.conds.join(" AND "))
    }
  }

  pub fn push_param(&mut self, value: impl Into<Value>) { self.params.push(value.into()); }

  pub fn params(&self) -> rusqlite::ParamsFromIter<std::slice::Iter<'_, Value>> {
    rusqlite::params_from_iter(self.params.iter())
  }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
  s.as_deref().filter(|s| !s.trim().is_empty())
}

/// Turn free text into an FTS5 query.
///
/// Each whitespace-separated token is quoted so punctuation such as `-` or
/// `:` is matched literally instead of parsed as FTS5 syntax. A trailing `*`
/// survives as a prefix query. Tokens are AND-ed. Returns `None` when nothing
/// searchable is left.
pub fn fts_query(text: &str) -> Option<String> {
  let terms: Vec<String> = text
    .split_whitespace()
    .filter_map(|word| {
      let (word, prefix) = match word.strip_suffix('*') {
        Some(stem) => (stem, true),
        None => (word, false),
      };
      let word = word.trim_matches('*');
      if word.is_empty() {
        return None;
      }
      let quoted = format!("\"{}\"", word.replace('"', "\"\""));
      Some(if prefix { quoted + "*" } else { quoted })
    })
    .collect();

  if terms.is_empty() { None } else { Some(terms.join(" AND ")) }
}
