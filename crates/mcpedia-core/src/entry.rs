//! Entries, the unit of knowledge, and the value types that travel with them.
//!
//! An entry is identified externally by its slug, which never changes after
//! creation. The numeric `id` is the storage handle; it is stable for the
//! entry's lifetime but carries no meaning outside the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

/// Hard cap on entry content, in bytes.
pub const CONTENT_MAX_BYTES: usize = 32 * 1024;

pub const SEARCH_LIMIT_DEFAULT: u32 = 10;
pub const CONTEXT_LIMIT_DEFAULT: u32 = 20;
pub const LIMIT_MAX: u32 = 50;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// What sort of knowledge an entry holds.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
  #[default]
  Skill,
  Rule,
  Context,
  Pattern,
  Reference,
  Guide,
}

impl EntryKind {
  pub const ALL: [EntryKind; 6] = [
    Self::Skill,
    Self::Rule,
    Self::Context,
    Self::Pattern,
    Self::Reference,
    Self::Guide,
  ];

  /// Parse a kind name, reporting unknown names as a validation failure.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| {
      Error::Validation(format!(
        "kind {s:?} is not one of skill, rule, context, pattern, reference, guide"
      ))
    })
  }
}

// ─── Entry ───────────────────────────────────────────────────────────────────

/// A persisted knowledge entry.
///
/// Listings and search results leave `content` empty; `snippet` is only set
/// on search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
  pub id:          i64,
  pub slug:        String,
  pub title:       String,
  #[serde(default)]
  pub description: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub content:     String,
  #[serde(default)]
  pub kind:        EntryKind,
  #[serde(default)]
  pub language:    String,
  #[serde(default)]
  pub domain:      String,
  #[serde(default)]
  pub project:     String,
  pub version:     i64,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  #[serde(default)]
  pub tags:        Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub snippet:     Option<String>,
}

/// Input for creating an entry. The store assigns id, version and timestamps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEntry {
  pub slug:        String,
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub content:     String,
  #[serde(default)]
  pub kind:        EntryKind,
  #[serde(default)]
  pub language:    String,
  #[serde(default)]
  pub domain:      String,
  #[serde(default)]
  pub project:     String,
  #[serde(default)]
  pub tags:        Vec<String>,
}

impl NewEntry {
  pub fn new(
    slug: impl Into<String>,
    title: impl Into<String>,
    content: impl Into<String>,
  ) -> Self {
    Self {
      slug: slug.into(),
      title: title.into(),
      content: content.into(),
      ..Self::default()
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.slug.trim().is_empty() {
      return Err(Error::Validation("slug is required".into()));
    }
    if self.title.trim().is_empty() {
      return Err(Error::Validation("title is required".into()));
    }
    validate_content(&self.content)
  }
}

/// A partial update. Fields left as `None` are not touched.
///
/// `tags`, when present, replaces the entry's whole tag set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub content:     Option<String>,
  pub kind:        Option<EntryKind>,
  pub language:    Option<String>,
  pub domain:      Option<String>,
  pub project:     Option<String>,
  pub tags:        Option<Vec<String>>,
}

impl EntryPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(title) = &self.title
      && title.trim().is_empty()
    {
      return Err(Error::Validation("title must not be empty".into()));
    }
    match &self.content {
      Some(content) => validate_content(content),
      None => Ok(()),
    }
  }
}

fn validate_content(content: &str) -> Result<()> {
  if content.trim().is_empty() {
    return Err(Error::Validation("content is required".into()));
  }
  if content.len() > CONTENT_MAX_BYTES {
    return Err(Error::Validation(format!(
      "content is {} bytes; the limit is {CONTENT_MAX_BYTES}",
      content.len()
    )));
  }
  Ok(())
}

/// Trim tag names, drop blanks and collapse duplicates, keeping first-seen order.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(tags.len());
  for tag in tags {
    let tag = tag.as_ref().trim();
    if !tag.is_empty() && !out.iter().any(|t| t == tag) {
      out.push(tag.to_owned());
    }
  }
  out
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Metadata filter shared by list, search and context retrieval.
///
/// Empty strings are treated the same as `None`. `tags` (all must match) is
/// honoured by context retrieval only; when it is empty, `tag` applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFilter {
  pub kind:     Option<EntryKind>,
  pub language: Option<String>,
  pub domain:   Option<String>,
  pub project:  Option<String>,
  pub tag:      Option<String>,
  #[serde(default)]
  pub tags:     Vec<String>,
}

/// Resolve a caller-requested result limit: `None` gives `default`, anything
/// else is clamped into `1..=LIMIT_MAX`.
pub fn clamp_limit(requested: Option<i64>, default: u32) -> u32 {
  match requested {
    None => default,
    Some(n) => n.clamp(1, i64::from(LIMIT_MAX)) as u32,
  }
}

// ─── Usage ───────────────────────────────────────────────────────────────────

/// Per-entry usage counters. Timestamps stay `None` until the first event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryStats {
  pub reads:          i64,
  pub searches:       i64,
  pub updates:        i64,
  pub last_read_at:   Option<DateTime<Utc>>,
  pub last_search_at: Option<DateTime<Utc>>,
  pub last_update_at: Option<DateTime<Utc>>,
}

/// A tag and the number of entries currently carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
  pub name:  String,
  pub count: i64,
}
