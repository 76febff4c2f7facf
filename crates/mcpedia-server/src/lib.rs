//! MCP protocol layer for MCPedia.
//!
//! Exposes an axum [`Router`] speaking JSON-RPC 2.0 over HTTP POST, backed by
//! any [`KnowledgeStore`]. Entries are offered to clients as tools, resources
//! and prompts.

pub mod auth;
pub mod dispatch;
pub mod error;
pub mod guide;
pub mod prompts;
pub mod resources;
pub mod rpc;
pub mod session;
pub mod tools;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  body::Body,
  extract::{Request, State},
  http::Method,
  response::{IntoResponse, Response},
  routing::any,
};
use bytes::Bytes;
use mcpedia_core::KnowledgeStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, verify_auth};
use session::{SESSION_HEADER, SessionRegistry};

/// Largest request body accepted.
pub const BODY_LIMIT: usize = 4 * 1024 * 1024;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `MCPEDIA_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Bearer token clients must send. Unset or empty disables auth.
  pub token:              Option<String>,
  /// Reject non-handshake calls that carry no session header.
  pub require_session:    bool,
  pub storage_timeout_ms: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_string(),
      port:               8080,
      store_path:         PathBuf::from("mcpedia.db"),
      token:              None,
      require_session:    false,
      storage_timeout_ms: 5_000,
    }
  }
}

impl ServerConfig {
  pub fn storage_timeout(&self) -> Duration { Duration::from_millis(self.storage_timeout_ms) }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: KnowledgeStore> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub auth:     Arc<AuthConfig>,
  pub sessions: Arc<SessionRegistry>,
}

impl<S: KnowledgeStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    Self {
      store:    Arc::new(store),
      auth:     Arc::new(AuthConfig::new(config.token.as_deref())),
      config:   Arc::new(config),
      sessions: Arc::new(SessionRegistry::new()),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] serving MCP on `/` and `/mcp`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: KnowledgeStore + Clone + 'static,
{
  Router::new()
    .route("/",    any(mcp_handler::<S>))
    .route("/mcp", any(mcp_handler::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn collect_body(req: Request<Body>) -> Result<Bytes, Response> {
  axum::body::to_bytes(req.into_body(), BODY_LIMIT)
    .await
    .map_err(|_| Error::PayloadTooLarge.into_response())
}

async fn mcp_handler<S>(State(state): State<AppState<S>>, req: Request<Body>) -> Response
where
  S: KnowledgeStore + Clone + 'static,
{
  if req.method() != Method::POST {
    return Error::MethodNotAllowed.into_response();
  }
  if let Err(e) = verify_auth(req.headers(), &state.auth) {
    return e.into_response();
  }

  let session = req
    .headers()
    .get(&SESSION_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::to_owned);

  let body = match collect_body(req).await {
    Ok(b) => b,
    Err(e) => return e,
  };
  dispatch::handle(&state, session.as_deref(), &body).await.into_response()
}

/// Lift a backend error into the shared taxonomy.
pub(crate) fn store_err<E: Into<mcpedia_core::Error>>(e: E) -> mcpedia_core::Error { e.into() }

#[cfg(test)]
mod tests;
