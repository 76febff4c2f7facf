//! Entries exposed as readable resources.
//!
//! `resources/list` pages through entries [`PAGE_SIZE`] at a time. The cursor
//! is the base64 of the decimal offset of the next page. The guide is left
//! out of the listing and is only reachable through [`GUIDE_URI`].

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use mcpedia_core::KnowledgeStore;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  guide::{self, GUIDE_SLUG, GUIDE_URI},
  rpc::{self, RpcError},
  store_err,
};

pub const PAGE_SIZE: usize = 50;
pub const ENTRY_URI_PREFIX: &str = "mcpedia://entries/";
const MIME_TYPE: &str = "text/markdown";

pub fn encode_cursor(offset: usize) -> String { B64.encode(offset.to_string()) }

pub fn decode_cursor(cursor: &str) -> Result<usize, RpcError> {
  B64
    .decode(cursor)
    .ok()
    .and_then(|bytes| String::from_utf8(bytes).ok())
    .and_then(|s| s.parse().ok())
    .ok_or_else(|| RpcError::invalid_params(format!("malformed cursor {cursor:?}")))
}

/// Map a resource URI to the slug it names.
fn slug_for_uri(uri: &str) -> Option<&str> {
  if uri == GUIDE_URI {
    return Some(GUIDE_SLUG);
  }
  uri.strip_prefix(ENTRY_URI_PREFIX).filter(|s| !s.is_empty())
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ListParams {
  cursor: Option<String>,
}

/// `resources/list`
pub async fn list<S: KnowledgeStore>(store: &S, params: Option<Value>) -> Result<Value, RpcError> {
  let ListParams { cursor } = rpc::parse_params(params)?;
  let offset = match cursor.as_deref().filter(|c| !c.is_empty()) {
    Some(c) => decode_cursor(c)?,
    None => 0,
  };

  let entries: Vec<_> = store
    .all_entries()
    .await
    .map_err(store_err)?
    .into_iter()
    .filter(|e| e.slug != GUIDE_SLUG)
    .collect();

  let total = entries.len();
  let end = offset.saturating_add(PAGE_SIZE).min(total);
  let page = entries.get(offset..end).unwrap_or_default();

  let resources: Vec<Value> = page
    .iter()
    .map(|e| {
      json!({
        "uri":         format!("{ENTRY_URI_PREFIX}{}", e.slug),
        "name":        e.slug,
        "title":       e.title,
        "description": e.description,
        "mimeType":    MIME_TYPE,
      })
    })
    .collect();

  tracing::info!(resource = "list", items = resources.len(), total, "resource call");

  let mut result = json!({ "resources": resources });
  if end < total {
    result["nextCursor"] = json!(encode_cursor(end));
  }
  Ok(result)
}

#[derive(Deserialize)]
struct ReadParams {
  uri: String,
}

/// `resources/read`
pub async fn read<S: KnowledgeStore>(store: &S, params: Option<Value>) -> Result<Value, RpcError> {
  let ReadParams { uri } = rpc::parse_params(params)?;
  let slug = slug_for_uri(&uri)
    .ok_or_else(|| RpcError::resource_not_found(format!("invalid resource URI {uri}")))?;

  let entry = guide::resolve_entry(store, slug).await?;
  tracing::info!(resource = "read", %slug, "resource call");

  Ok(json!({
    "contents": [{
      "uri":      uri,
      "mimeType": MIME_TYPE,
      "text":     entry.content,
    }],
  }))
}

/// `resources/templates/list`
pub fn templates() -> Value {
  tracing::info!(resource = "templates_list", items = 1, "resource call");
  json!({
    "resourceTemplates": [{
      "uriTemplate": format!("{ENTRY_URI_PREFIX}{{slug}}"),
      "name":        "MCPedia Entry",
      "description": "Access a knowledge entry by its slug",
      "mimeType":    MIME_TYPE,
    }],
  })
}
