//! The built-in usage guide.
//!
//! The guide is reserved under the slug [`GUIDE_SLUG`]. A stored entry with
//! that slug takes precedence; otherwise [`DEFAULT_GUIDE`] is served.

use chrono::{DateTime, Utc};
use mcpedia_core::{Entry, EntryKind, KnowledgeStore};

use crate::store_err;

pub const GUIDE_SLUG: &str = "how-to-use";
pub const GUIDE_URI: &str = "mcpedia://how-to-use";
pub const GUIDE_TITLE: &str = "How to Use MCPedia";

pub const DEFAULT_GUIDE: &str = "\
# How to Use MCPedia

MCPedia is a shared library of knowledge entries: skills, rules, context,
patterns, references and guides. Read from it before you start a task and
write back what you learn.

## Finding knowledge

- `get_entries_by_context` loads every entry for a language, domain, project
  or set of tags, with full content. Call it at the start of a task.
- `search_entries` runs a full-text search and returns snippets. Follow up
  with `get_entry` to read a hit in full.
- `list_entries` and `list_tags` show what exists without loading content.

## Recording knowledge

- `create_entry` saves a new entry. Pick a descriptive slug such as
  `rust-error-handling` and keep one concept per entry.
- `update_entry` changes only the fields you pass; `tags` replaces the whole
  tag set.
- `delete_entry` removes an entry permanently.

Writes fail while the library is locked. Reads always work.

## Resources and prompts

Entries are also readable as `mcpedia://entries/{slug}`. The
`apply-entry`, `review-with-entry` and `save-learnings` prompts wrap entries
in ready-made instructions.
";

/// The guide served when no stored entry claims [`GUIDE_SLUG`].
pub fn default_entry() -> Entry {
  Entry {
    id:          0,
    slug:        GUIDE_SLUG.into(),
    title:       GUIDE_TITLE.into(),
    description: "How to search, read and record knowledge in MCPedia".into(),
    content:     DEFAULT_GUIDE.into(),
    kind:        EntryKind::Guide,
    language:    String::new(),
    domain:      String::new(),
    project:     String::new(),
    version:     1,
    created_at:  DateTime::<Utc>::UNIX_EPOCH,
    updated_at:  DateTime::<Utc>::UNIX_EPOCH,
    tags:        Vec::new(),
    snippet:     None,
  }
}

/// Look up `slug`, falling back to the built-in guide for [`GUIDE_SLUG`].
pub async fn resolve_entry<S: KnowledgeStore>(
  store: &S,
  slug: &str,
) -> Result<Entry, mcpedia_core::Error> {
  match store.get(slug).await.map_err(store_err) {
    Err(mcpedia_core::Error::NotFound(_)) if slug == GUIDE_SLUG => Ok(default_entry()),
    other => other,
  }
}
