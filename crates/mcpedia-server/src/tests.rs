//! End-to-end tests driving the router with `tower::ServiceExt::oneshot`.

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use mcpedia_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

async fn make_state(config: ServerConfig) -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  AppState::new(store, config)
}

async fn default_state() -> AppState<SqliteStore> { make_state(ServerConfig::default()).await }

async fn oneshot_raw(
  state: AppState<SqliteStore>,
  method: &str,
  headers: Vec<(header::HeaderName, &str)>,
  body: &str,
) -> Response {
  let mut builder = Request::builder().method(method).uri("/mcp");
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = builder.body(Body::from(body.to_string())).unwrap();
  router(state).oneshot(req).await.unwrap()
}

async fn body_json(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

/// Send one JSON-RPC call and decode the response envelope.
async fn call(state: &AppState<SqliteStore>, method: &str, params: Value) -> Value {
  let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
  let resp = oneshot_raw(state.clone(), "POST", vec![], &body.to_string()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  body_json(resp).await
}

/// Call a tool, returning `(isError, text)`.
async fn tool(state: &AppState<SqliteStore>, name: &str, args: Value) -> (bool, String) {
  let resp = call(state, "tools/call", json!({ "name": name, "arguments": args })).await;
  assert!(resp.get("error").is_none(), "unexpected protocol error: {resp}");
  let result = &resp["result"];
  let text = result["content"][0]["text"].as_str().unwrap().to_owned();
  (result["isError"].as_bool().unwrap(), text)
}

async fn tool_ok(state: &AppState<SqliteStore>, name: &str, args: Value) -> Value {
  let (is_error, text) = tool(state, name, args).await;
  assert!(!is_error, "{name} failed: {text}");
  serde_json::from_str(&text).unwrap()
}

async fn create(state: &AppState<SqliteStore>, slug: &str, title: &str, content: &str) {
  tool_ok(state, "create_entry", json!({ "slug": slug, "title": title, "content": content })).await;
}

// ── Transport ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_is_method_not_allowed() {
  let resp = oneshot_raw(default_state().await, "GET", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn root_path_also_serves_mcp() {
  let req = Request::builder()
    .method("POST")
    .uri("/")
    .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
    .unwrap();
  let resp = router(default_state().await).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(body_json(resp).await["result"], json!({}));
}

#[tokio::test]
async fn bearer_token_is_enforced() {
  let config = ServerConfig { token: Some("supersecret".into()), ..Default::default() };
  let state = make_state(config).await;
  let ping = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;

  let resp = oneshot_raw(state.clone(), "POST", vec![], ping).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

  let resp =
    oneshot_raw(state.clone(), "POST", vec![(header::AUTHORIZATION, "Bearer wrong")], ping).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let resp =
    oneshot_raw(state, "POST", vec![(header::AUTHORIZATION, "Bearer supersecret")], ping).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
  let big = "x".repeat(BODY_LIMIT + 1);
  let resp = oneshot_raw(default_state().await, "POST", vec![], &big).await;
  assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// ── Framing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_json_is_a_parse_error() {
  let resp = oneshot_raw(default_state().await, "POST", vec![], "not json").await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = body_json(resp).await;
  assert_eq!(body["error"]["code"], rpc::PARSE_ERROR);
  assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn non_object_envelope_is_an_invalid_request() {
  let resp = oneshot_raw(default_state().await, "POST", vec![], "[1, 2]").await;
  assert_eq!(body_json(resp).await["error"]["code"], rpc::INVALID_REQUEST);
}

#[tokio::test]
async fn wrong_version_is_an_invalid_request() {
  let body = r#"{"jsonrpc":"1.0","id":7,"method":"ping"}"#;
  let resp = oneshot_raw(default_state().await, "POST", vec![], body).await;
  let body = body_json(resp).await;
  assert_eq!(body["error"]["code"], rpc::INVALID_REQUEST);
  assert_eq!(body["id"], 7);
}

#[tokio::test]
async fn notifications_are_acknowledged_without_a_body() {
  let body = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
  let resp = oneshot_raw(default_state().await, "POST", vec![], body).await;
  assert_eq!(resp.status(), StatusCode::ACCEPTED);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  assert!(bytes.is_empty());
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
  let state = default_state().await;
  let resp = call(&state, "bogus/method", json!({})).await;
  assert_eq!(resp["error"]["code"], rpc::METHOD_NOT_FOUND);
}

// ── Handshake and sessions ──────────────────────────────────────────────────

#[tokio::test]
async fn initialize_issues_a_session_header() {
  let state = default_state().await;
  let body = json!({
    "jsonrpc": "2.0", "id": 1, "method": "initialize",
    "params": { "protocolVersion": "2025-11-25", "capabilities": {} },
  });
  let resp = oneshot_raw(state.clone(), "POST", vec![], &body.to_string()).await;
  let session = resp
    .headers()
    .get(&session::SESSION_HEADER)
    .expect("session header")
    .to_str()
    .unwrap()
    .to_owned();

  let body = body_json(resp).await;
  let result = &body["result"];
  assert_eq!(result["protocolVersion"], dispatch::PROTOCOL_VERSION);
  assert_eq!(result["serverInfo"]["name"], "mcpedia");
  for cap in ["tools", "resources", "prompts"] {
    assert!(result["capabilities"].get(cap).is_some(), "missing capability {cap}");
  }
  assert!(result.get("sessionId").is_none());
  assert!(state.sessions.contains(&session));

  let ping = r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#;
  let headers = vec![(session::SESSION_HEADER.clone(), session.as_str())];
  let resp = oneshot_raw(state.clone(), "POST", headers, ping).await;
  assert!(body_json(resp).await.get("error").is_none());
}

#[tokio::test]
async fn unknown_session_is_rejected() {
  let ping = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
  let resp = oneshot_raw(
    default_state().await,
    "POST",
    vec![(session::SESSION_HEADER.clone(), "forged")],
    ping,
  )
  .await;
  assert_eq!(body_json(resp).await["error"]["code"], rpc::INVALID_REQUEST);
}

#[tokio::test]
async fn session_can_be_made_mandatory() {
  let config = ServerConfig { require_session: true, ..Default::default() };
  let state = make_state(config).await;

  let resp = call(&state, "ping", json!({})).await;
  assert_eq!(resp["error"]["code"], rpc::INVALID_REQUEST);

  let resp = call(&state, "initialize", json!({})).await;
  assert!(resp.get("error").is_none());
}

// ── Tools ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn tools_list_publishes_eight_schemas() {
  let state = default_state().await;
  let resp = call(&state, "tools/list", json!({})).await;
  let tools = resp["result"]["tools"].as_array().unwrap();
  assert_eq!(tools.len(), 8);
  let names: Vec<_> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
  for want in [
    "search_entries",
    "get_entry",
    "get_entries_by_context",
    "list_entries",
    "list_tags",
    "create_entry",
    "update_entry",
    "delete_entry",
  ] {
    assert!(names.contains(&want), "missing tool {want}");
  }
}

#[tokio::test]
async fn create_get_update_delete_through_tools() {
  let state = default_state().await;
  let created = tool_ok(
    &state,
    "create_entry",
    json!({
      "slug": "go-err", "title": "Go errors", "content": "Wrap errors with %w.",
      "language": "go", "tags": ["errors"],
    }),
  )
  .await;
  assert_eq!(created["version"], 1);
  assert_eq!(created["kind"], "skill");

  let got = tool_ok(&state, "get_entry", json!({ "slug": "go-err" })).await;
  assert_eq!(got["content"], "Wrap errors with %w.");
  assert_eq!(got["tags"], json!(["errors"]));

  let updated =
    tool_ok(&state, "update_entry", json!({ "slug": "go-err", "title": "Go error wrapping" })).await;
  assert_eq!(updated["version"], 2);
  assert_eq!(updated["title"], "Go error wrapping");
  assert_eq!(updated["language"], "go");

  let deleted = tool_ok(&state, "delete_entry", json!({ "slug": "go-err" })).await;
  assert_eq!(deleted, json!({ "deleted": "go-err" }));

  let (is_error, _) = tool(&state, "get_entry", json!({ "slug": "go-err" })).await;
  assert!(is_error);
}

#[tokio::test]
async fn tool_failures_are_results_not_protocol_errors() {
  let state = default_state().await;
  create(&state, "dup", "Dup", "body").await;

  let resp = call(
    &state,
    "tools/call",
    json!({ "name": "create_entry", "arguments": { "slug": "dup", "title": "Again", "content": "x" } }),
  )
  .await;
  assert_eq!(resp["result"]["isError"], true);
  assert_eq!(resp["result"]["_meta"]["errorKind"], "duplicate_slug");

  for (name, args) in [
    ("search_entries", json!({})),
    ("get_entry", json!({})),
    ("update_entry", json!({})),
    ("delete_entry", json!({})),
    ("create_entry", json!({ "slug": "x" })),
    ("create_entry", json!({ "slug": "x", "title": "X", "content": "y", "kind": "recipe" })),
  ] {
    let (is_error, text) = tool(&state, name, args).await;
    assert!(is_error, "{name} should fail, got {text}");
  }

  let resp = call(&state, "tools/call", json!({ "name": "bogus_tool", "arguments": {} })).await;
  assert!(resp.get("error").is_none());
  assert_eq!(resp["result"]["isError"], true);
}

#[tokio::test]
async fn search_list_and_context_scenario() {
  let state = default_state().await;
  tool_ok(
    &state,
    "create_entry",
    json!({ "slug": "go-err", "title": "Go error handling", "content": "Wrap every error.",
            "language": "go", "tags": ["errors"] }),
  )
  .await;
  tool_ok(
    &state,
    "create_entry",
    json!({ "slug": "py-err", "title": "Python error handling", "content": "Raise on error.",
            "language": "python", "tags": ["errors"] }),
  )
  .await;

  let hits = tool_ok(&state, "search_entries", json!({ "query": "error", "language": "go" })).await;
  let hits = hits.as_array().unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0]["slug"], "go-err");
  assert!(hits[0].get("content").is_none());
  assert!(hits[0]["snippet"].is_string());

  let listed = tool_ok(&state, "list_entries", json!({ "language": "go" })).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);
  assert!(listed[0].get("content").is_none());

  let ctx = tool_ok(&state, "get_entries_by_context", json!({ "tags": ["errors"] })).await;
  let ctx = ctx.as_array().unwrap();
  assert_eq!(ctx.len(), 2);
  assert!(ctx.iter().all(|e| e["content"].is_string()));

  let limited =
    tool_ok(&state, "search_entries", json!({ "query": "error", "limit": 1 })).await;
  assert_eq!(limited.as_array().unwrap().len(), 1);

  let tags = tool_ok(&state, "list_tags", json!({})).await;
  assert_eq!(tags, json!([{ "name": "errors", "count": 2 }]));
}

#[tokio::test]
async fn writes_fail_while_locked() {
  let state = default_state().await;
  create(&state, "exists", "Exists", "body").await;
  state.store.lock("secret").await.unwrap();

  let resp = call(
    &state,
    "tools/call",
    json!({ "name": "update_entry", "arguments": { "slug": "exists", "title": "No" } }),
  )
  .await;
  assert_eq!(resp["result"]["isError"], true);
  assert_eq!(resp["result"]["_meta"]["errorKind"], "locked");

  let (is_error, _) = tool(&state, "get_entry", json!({ "slug": "exists" })).await;
  assert!(!is_error);

  state.store.unlock("secret").await.unwrap();
  tool_ok(&state, "update_entry", json!({ "slug": "exists", "title": "Now works" })).await;
}

// ── Guide ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn builtin_guide_is_served_until_overridden() {
  let state = default_state().await;

  let guide = tool_ok(&state, "get_entry", json!({ "slug": guide::GUIDE_SLUG })).await;
  assert_eq!(guide["title"], guide::GUIDE_TITLE);
  assert!(guide["content"].as_str().unwrap().contains("search_entries"));

  let resp = call(&state, "resources/read", json!({ "uri": guide::GUIDE_URI })).await;
  let text = resp["result"]["contents"][0]["text"].as_str().unwrap();
  assert!(text.contains("How to Use MCPedia"));

  create(&state, guide::GUIDE_SLUG, "Custom", "My custom guide.").await;
  let resp = call(&state, "resources/read", json!({ "uri": guide::GUIDE_URI })).await;
  assert_eq!(resp["result"]["contents"][0]["text"], "My custom guide.");

  let listed = call(&state, "resources/list", json!({})).await;
  assert_eq!(listed["result"]["resources"], json!([]));
}

// ── Resources ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn resources_paginate_fifty_at_a_time() {
  let state = default_state().await;
  for i in 0..55 {
    create(&state, &format!("pg-{i:03}"), &format!("Page {i:03}"), "content").await;
  }

  let first = call(&state, "resources/list", json!({})).await;
  let resources = first["result"]["resources"].as_array().unwrap();
  assert_eq!(resources.len(), 50);
  assert_eq!(resources[0]["uri"], "mcpedia://entries/pg-000");
  assert_eq!(resources[0]["mimeType"], "text/markdown");
  let cursor = first["result"]["nextCursor"].as_str().expect("cursor").to_owned();

  let second = call(&state, "resources/list", json!({ "cursor": cursor })).await;
  assert_eq!(second["result"]["resources"].as_array().unwrap().len(), 5);
  assert!(second["result"].get("nextCursor").is_none());
}

#[tokio::test]
async fn resource_read_and_errors() {
  let state = default_state().await;
  create(&state, "readme", "Read Me", "This is the content.").await;

  let resp = call(&state, "resources/read", json!({ "uri": "mcpedia://entries/readme" })).await;
  assert_eq!(resp["result"]["contents"][0]["text"], "This is the content.");

  let resp = call(&state, "resources/read", json!({ "uri": "bogus://x" })).await;
  assert_eq!(resp["error"]["code"], rpc::RESOURCE_NOT_FOUND);

  let resp = call(&state, "resources/read", json!({ "uri": "mcpedia://entries/nope" })).await;
  assert_eq!(resp["error"]["code"], rpc::RESOURCE_NOT_FOUND);
  assert_eq!(resp["error"]["data"]["errorKind"], "not_found");

  let resp = call(&state, "resources/list", json!({ "cursor": "!!!" })).await;
  assert_eq!(resp["error"]["code"], rpc::INVALID_PARAMS);

  let resp = call(&state, "resources/templates/list", json!({})).await;
  assert_eq!(resp["result"]["resourceTemplates"].as_array().unwrap().len(), 1);
}

// ── Prompts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn prompts_wrap_entries() {
  let state = default_state().await;
  create(&state, "ptest", "Prompt Test", "Follow these rules carefully.").await;

  let listed = call(&state, "prompts/list", json!({})).await;
  assert_eq!(listed["result"]["prompts"].as_array().unwrap().len(), 3);

  for name in ["apply-entry", "review-with-entry"] {
    let resp =
      call(&state, "prompts/get", json!({ "name": name, "arguments": { "slug": "ptest" } })).await;
    let text = resp["result"]["messages"][0]["content"]["text"].as_str().unwrap();
    assert!(text.contains("Follow these rules carefully."), "{name}: {text}");
    assert!(text.contains("Prompt Test"), "{name}: {text}");
  }

  let resp = call(&state, "prompts/get", json!({ "name": "save-learnings" })).await;
  let text = resp["result"]["messages"][0]["content"]["text"].as_str().unwrap();
  assert!(text.contains("create_entry"));
}

#[tokio::test]
async fn prompt_failures() {
  let state = default_state().await;

  let resp = call(&state, "prompts/get", json!({ "name": "apply-entry", "arguments": {} })).await;
  assert_eq!(resp["error"]["code"], rpc::INVALID_PARAMS);

  let resp = call(
    &state,
    "prompts/get",
    json!({ "name": "review-with-entry", "arguments": { "slug": "nope" } }),
  )
  .await;
  assert_eq!(resp["error"]["code"], rpc::RESOURCE_NOT_FOUND);

  let resp = call(&state, "prompts/get", json!({ "name": "nonexistent" })).await;
  assert!(resp.get("error").is_none());
  assert_eq!(resp["result"]["isError"], true);
}
