//! The eight callable tools.
//!
//! Tool failures are not protocol errors: they come back as a normal result
//! with `isError: true`, the error text, and `_meta.errorKind`.

use mcpedia_core::{
  EntryFilter, EntryKind, EntryPatch, Error as CoreError, KnowledgeStore, NewEntry,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  guide,
  rpc::{self, RpcError},
  store_err,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Tool {
  SearchEntries,
  GetEntry,
  GetEntriesByContext,
  ListEntries,
  ListTags,
  CreateEntry,
  UpdateEntry,
  DeleteEntry,
}

impl Tool {
  pub const ALL: [Tool; 8] = [
    Self::SearchEntries,
    Self::GetEntry,
    Self::GetEntriesByContext,
    Self::ListEntries,
    Self::ListTags,
    Self::CreateEntry,
    Self::UpdateEntry,
    Self::DeleteEntry,
  ];

  fn description(self) -> &'static str {
    match self {
      Self::SearchEntries => {
        "Search knowledge entries using full-text search. Returns matching entries with \
         snippets (no full content)."
      }
      Self::GetEntry => "Get a single knowledge entry by its slug, including full content.",
      Self::GetEntriesByContext => {
        "Get all entries matching the given context (language, domain, kind, tags, project). \
         Returns full content. Use this at the start of a task to load relevant knowledge."
      }
      Self::ListEntries => {
        "List all knowledge entries (slug, title, kind, language, domain; no content). \
         Supports optional filters."
      }
      Self::ListTags => "List all tags with their entry counts.",
      Self::CreateEntry => {
        "Create a new knowledge entry. Requires slug, title, and content. Blocked if the \
         database is locked."
      }
      Self::UpdateEntry => {
        "Update an existing knowledge entry by slug. Only provided fields are updated. \
         Blocked if the database is locked."
      }
      Self::DeleteEntry => "Delete a knowledge entry by slug. Blocked if the database is locked.",
    }
  }

  fn input_schema(self) -> Value {
    let string = |description: &str| json!({ "type": "string", "description": description });
    let strings = |description: &str| {
      json!({ "type": "array", "items": { "type": "string" }, "description": description })
    };
    let integer = |description: &str| json!({ "type": "integer", "description": description });

    match self {
      Self::SearchEntries => json!({
        "type": "object",
        "properties": {
          "query":    string("Search query"),
          "language": string("Filter by programming language"),
          "domain":   string("Filter by domain (e.g. fintech, ml, cli)"),
          "kind":     string("Filter by kind (skill, rule, context, pattern, reference, guide)"),
          "tag":      string("Filter by tag"),
          "project":  string("Filter by project"),
          "limit":    integer("Max results (default 10, max 50)"),
        },
        "required": ["query"],
      }),
      Self::GetEntry => json!({
        "type": "object",
        "properties": { "slug": string("The unique slug of the entry") },
        "required": ["slug"],
      }),
      Self::GetEntriesByContext => json!({
        "type": "object",
        "properties": {
          "language": string("Programming language"),
          "domain":   string("Domain"),
          "kind":     string("Entry kind"),
          "tags":     strings("Tags to match (all must be present)"),
          "tag":      string("Single tag to match when `tags` is not given"),
          "project":  string("Project slug"),
          "limit":    integer("Max results (default 20, max 50)"),
        },
      }),
      Self::ListEntries => json!({
        "type": "object",
        "properties": {
          "kind":     string("Filter by kind"),
          "language": string("Filter by language"),
          "domain":   string("Filter by domain"),
          "project":  string("Filter by project"),
          "tag":      string("Filter by tag"),
        },
      }),
      Self::ListTags => json!({ "type": "object", "additionalProperties": false }),
      Self::CreateEntry => json!({
        "type": "object",
        "properties": {
          "slug":        string("Unique slug (e.g. rust-error-handling)"),
          "title":       string("Entry title"),
          "content":     string("Main content (markdown, max 32KB)"),
          "description": string("Short summary for discovery"),
          "kind":        string("Entry kind: skill, rule, context, pattern, reference, guide"),
          "language":    string("Programming language"),
          "domain":      string("Domain"),
          "project":     string("Project slug"),
          "tags":        strings("Tags"),
        },
        "required": ["slug", "title", "content"],
      }),
      Self::UpdateEntry => json!({
        "type": "object",
        "properties": {
          "slug":        string("Slug of the entry to update"),
          "title":       string("New title"),
          "content":     string("New content"),
          "description": string("New description"),
          "kind":        string("New kind"),
          "language":    string("New language"),
          "domain":      string("New domain"),
          "project":     string("New project"),
          "tags":        strings("New tags (replaces all existing tags)"),
        },
        "required": ["slug"],
      }),
      Self::DeleteEntry => json!({
        "type": "object",
        "properties": { "slug": string("Slug of the entry to delete") },
        "required": ["slug"],
      }),
    }
  }

  fn definition(self) -> Value {
    json!({
      "name":        self.as_ref(),
      "description": self.description(),
      "inputSchema": self.input_schema(),
    })
  }

  /// Run the tool, returning the JSON text of its payload.
  async fn run<S: KnowledgeStore>(self, store: &S, args: Value) -> Result<String, CoreError> {
    match self {
      Self::SearchEntries => {
        let args: SearchArgs = parse_args(args)?;
        if args.query.trim().is_empty() {
          return Err(CoreError::Validation("query is required".into()));
        }
        let (filter, limit) = args.filter.into_filter()?;
        let hits = store.search(&args.query, &filter, limit).await.map_err(store_err)?;
        tracing::info!(tool = %self, query = %args.query, items = hits.len(), "tool call");
        to_text(&hits)
      }
      Self::GetEntry => {
        let SlugArgs { slug } = parse_args(args)?;
        let slug = require_slug(slug)?;
        let entry = guide::resolve_entry(store, &slug).await?;
        tracing::info!(tool = %self, %slug, "tool call");
        to_text(&entry)
      }
      Self::GetEntriesByContext => {
        let args: FilterArgs = parse_args(args)?;
        let (filter, limit) = args.into_filter()?;
        let entries = store.get_by_context(&filter, limit).await.map_err(store_err)?;
        tracing::info!(tool = %self, items = entries.len(), "tool call");
        to_text(&entries)
      }
      Self::ListEntries => {
        let args: FilterArgs = parse_args(args)?;
        let (filter, _) = args.into_filter()?;
        let entries = store.list(&filter).await.map_err(store_err)?;
        tracing::info!(tool = %self, items = entries.len(), "tool call");
        to_text(&entries)
      }
      Self::ListTags => {
        let tags = store.list_tags().await.map_err(store_err)?;
        tracing::info!(tool = %self, items = tags.len(), "tool call");
        to_text(&tags)
      }
      Self::CreateEntry => {
        let input = parse_args::<CreateArgs>(args)?.into_new_entry()?;
        let entry = store.create(input).await.map_err(store_err)?;
        tracing::info!(tool = %self, slug = %entry.slug, "tool call");
        to_text(&entry)
      }
      Self::UpdateEntry => {
        let args: UpdateArgs = parse_args(args)?;
        let slug = require_slug(args.slug.clone())?;
        let patch = args.into_patch()?;
        let entry = store.update(&slug, patch).await.map_err(store_err)?;
        tracing::info!(tool = %self, %slug, version = entry.version, "tool call");
        to_text(&entry)
      }
      Self::DeleteEntry => {
        let SlugArgs { slug } = parse_args(args)?;
        let slug = require_slug(slug)?;
        store.delete(&slug).await.map_err(store_err)?;
        tracing::info!(tool = %self, %slug, "tool call");
        to_text(&json!({ "deleted": slug }))
      }
    }
  }
}

// ─── Arguments ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FilterArgs {
  kind:     Option<String>,
  language: Option<String>,
  domain:   Option<String>,
  project:  Option<String>,
  tag:      Option<String>,
  tags:     Option<Vec<String>>,
  limit:    Option<i64>,
}

impl FilterArgs {
  fn into_filter(self) -> Result<(EntryFilter, Option<i64>), CoreError> {
    let filter = EntryFilter {
      kind:     parse_kind(self.kind)?,
      language: self.language,
      domain:   self.domain,
      project:  self.project,
      tag:      self.tag,
      tags:     self.tags.unwrap_or_default(),
    };
    Ok((filter, self.limit))
  }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
  #[serde(default)]
  query:  String,
  #[serde(flatten)]
  filter: FilterArgs,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SlugArgs {
  slug: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateArgs {
  slug:        String,
  title:       String,
  content:     String,
  description: Option<String>,
  kind:        Option<String>,
  language:    Option<String>,
  domain:      Option<String>,
  project:     Option<String>,
  tags:        Option<Vec<String>>,
}

impl CreateArgs {
  fn into_new_entry(self) -> Result<NewEntry, CoreError> {
    Ok(NewEntry {
      kind:        parse_kind(self.kind)?.unwrap_or_default(),
      slug:        self.slug,
      title:       self.title,
      content:     self.content,
      description: self.description.unwrap_or_default(),
      language:    self.language.unwrap_or_default(),
      domain:      self.domain.unwrap_or_default(),
      project:     self.project.unwrap_or_default(),
      tags:        self.tags.unwrap_or_default(),
    })
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpdateArgs {
  slug:        String,
  title:       Option<String>,
  content:     Option<String>,
  description: Option<String>,
  kind:        Option<String>,
  language:    Option<String>,
  domain:      Option<String>,
  project:     Option<String>,
  tags:        Option<Vec<String>>,
}

impl UpdateArgs {
  fn into_patch(self) -> Result<EntryPatch, CoreError> {
    let kind = match self.kind {
      Some(kind) => Some(EntryKind::parse(&kind)?),
      None => None,
    };
    Ok(EntryPatch {
      title: self.title,
      description: self.description,
      content: self.content,
      kind,
      language: self.language,
      domain: self.domain,
      project: self.project,
      tags: self.tags,
    })
  }
}

/// An absent or empty kind means "unspecified".
fn parse_kind(kind: Option<String>) -> Result<Option<EntryKind>, CoreError> {
  kind
    .filter(|k| !k.is_empty())
    .map(|k| EntryKind::parse(&k))
    .transpose()
}

fn require_slug(slug: String) -> Result<String, CoreError> {
  if slug.trim().is_empty() {
    return Err(CoreError::Validation("slug is required".into()));
  }
  Ok(slug)
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, CoreError> {
  serde_json::from_value(args)
    .map_err(|e| CoreError::Validation(format!("invalid arguments: {e}")))
}

fn to_text<T: Serialize + ?Sized>(value: &T) -> Result<String, CoreError> {
  serde_json::to_string(value).map_err(|e| CoreError::Internal(e.to_string()))
}

// ─── Results ─────────────────────────────────────────────────────────────────

pub fn success(text: String) -> Value {
  json!({
    "content": [{ "type": "text", "text": text }],
    "isError": false,
  })
}

pub fn failure(kind: &str, message: &str) -> Value {
  json!({
    "content": [{ "type": "text", "text": message }],
    "isError": true,
    "_meta": { "errorKind": kind },
  })
}

// ─── Methods ─────────────────────────────────────────────────────────────────

/// `tools/list`
pub fn list() -> Value {
  let tools: Vec<Value> = Tool::ALL.iter().map(|t| t.definition()).collect();
  tracing::info!(tool = "list", items = tools.len(), "tool call");
  json!({ "tools": tools })
}

#[derive(Deserialize)]
struct CallParams {
  name:      String,
  #[serde(default)]
  arguments: Value,
}

/// `tools/call`
pub async fn call<S: KnowledgeStore>(store: &S, params: Option<Value>) -> Result<Value, RpcError> {
  let CallParams { name, arguments } = rpc::parse_params(params)?;

  let Ok(tool) = name.parse::<Tool>() else {
    tracing::info!(tool = %name, "unknown tool");
    return Ok(failure("unknown_tool", &format!("Unknown tool: {name}")));
  };

  let arguments = match arguments {
    Value::Null => json!({}),
    other => other,
  };

  Ok(match tool.run(store, arguments).await {
    Ok(text) => success(text),
    Err(e) => {
      tracing::info!(%tool, kind = e.kind(), error = %e, "tool failed");
      failure(e.kind(), &e.to_string())
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tool_names_round_trip() {
    for tool in Tool::ALL {
      assert_eq!(tool.as_ref().parse::<Tool>().unwrap(), tool);
    }
    assert_eq!(Tool::GetEntriesByContext.as_ref(), "get_entries_by_context");
    assert!("bogus_tool".parse::<Tool>().is_err());
  }

  #[test]
  fn every_tool_has_an_object_schema() {
    let defs = list();
    let tools = defs["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 8);
    for tool in tools {
      assert_eq!(tool["inputSchema"]["type"], "object");
      assert!(tool["description"].as_str().is_some_and(|d| !d.is_empty()));
    }
  }

  #[test]
  fn empty_kind_is_unspecified_but_unknown_kind_fails() {
    assert_eq!(parse_kind(Some(String::new())).unwrap(), None);
    assert_eq!(parse_kind(Some("rule".into())).unwrap(), Some(EntryKind::Rule));
    assert!(matches!(parse_kind(Some("recipe".into())), Err(CoreError::Validation(_))));
  }

  #[test]
  fn wrong_argument_types_are_validation_errors() {
    let err = parse_args::<FilterArgs>(json!({ "limit": "ten" })).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
  }

  #[test]
  fn failure_carries_error_kind() {
    let v = failure("locked", "database is locked");
    assert_eq!(v["isError"], true);
    assert_eq!(v["_meta"]["errorKind"], "locked");
    assert_eq!(v["content"][0]["text"], "database is locked");
  }
}
