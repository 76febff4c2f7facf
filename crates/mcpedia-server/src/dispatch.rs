//! Request dispatch: envelope validation, the session check and the method
//! table.

use axum::{
  Json,
  http::{HeaderValue, StatusCode},
  response::{IntoResponse, Response},
};
use mcpedia_core::KnowledgeStore;
use serde_json::{Value, json};
use strum::{AsRefStr, EnumString};

use crate::{
  AppState, prompts, resources,
  rpc::{self, RpcError},
  session::{SESSION_HEADER, SessionRegistry},
  tools,
};

pub const PROTOCOL_VERSION: &str = "2025-11-25";
pub const SERVER_NAME: &str = "mcpedia";

/// Every method the server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
pub enum Method {
  #[strum(serialize = "initialize")]
  Initialize,
  #[strum(serialize = "ping")]
  Ping,
  #[strum(serialize = "tools/list")]
  ToolsList,
  #[strum(serialize = "tools/call")]
  ToolsCall,
  #[strum(serialize = "resources/list")]
  ResourcesList,
  #[strum(serialize = "resources/read")]
  ResourcesRead,
  #[strum(serialize = "resources/templates/list")]
  ResourceTemplatesList,
  #[strum(serialize = "prompts/list")]
  PromptsList,
  #[strum(serialize = "prompts/get")]
  PromptsGet,
}

/// What the transport should send back.
#[derive(Debug)]
pub enum Outcome {
  /// A notification was received; acknowledge with an empty 202.
  Accepted,
  Reply {
    response: rpc::Response,
    /// Set on a successful handshake; sent as the session header.
    session:  Option<String>,
  },
}

impl Outcome {
  fn reply(id: Value, result: Result<Value, RpcError>) -> Self {
    let response = match result {
      Ok(value) => rpc::Response::result(id, value),
      Err(error) => rpc::Response::error(id, error),
    };
    Self::Reply { response, session: None }
  }
}

impl IntoResponse for Outcome {
  fn into_response(self) -> Response {
    match self {
      Outcome::Accepted => StatusCode::ACCEPTED.into_response(),
      Outcome::Reply { response, session } => {
        let mut res = Json(response).into_response();
        if let Some(id) = session
          && let Ok(value) = HeaderValue::from_str(&id)
        {
          res.headers_mut().insert(SESSION_HEADER.clone(), value);
        }
        res
      }
    }
  }
}

/// Validate a presented session token. Absence is tolerated unless
/// `require` is set.
fn check_session(
  sessions: &SessionRegistry,
  require: bool,
  presented: Option<&str>,
) -> Result<(), RpcError> {
  match presented {
    Some(id) if sessions.contains(id) => Ok(()),
    Some(_) => Err(RpcError::invalid_request("invalid session")),
    None if require => Err(RpcError::invalid_request("session required; call initialize first")),
    None => Ok(()),
  }
}

fn initialize_result() -> Value {
  json!({
    "protocolVersion": PROTOCOL_VERSION,
    "capabilities": {
      "tools":     {},
      "resources": {},
      "prompts":   {},
    },
    "serverInfo": {
      "name":    SERVER_NAME,
      "version": env!("CARGO_PKG_VERSION"),
    },
  })
}

/// Handle one raw request body.
pub async fn handle<S>(state: &AppState<S>, session: Option<&str>, body: &[u8]) -> Outcome
where
  S: KnowledgeStore + Clone + 'static,
{
  let value: Value = match serde_json::from_slice(body) {
    Ok(v) => v,
    Err(e) => {
      tracing::debug!(error = %e, "unparseable request body");
      return Outcome::reply(Value::Null, Err(RpcError::parse_error()));
    }
  };
  let req: rpc::Request = match serde_json::from_value(value) {
    Ok(req) => req,
    Err(e) => return Outcome::reply(Value::Null, Err(RpcError::invalid_request(e))),
  };

  if req.jsonrpc != rpc::JSONRPC_VERSION {
    let id = req.id.unwrap_or(Value::Null);
    return Outcome::reply(id, Err(RpcError::invalid_request("jsonrpc must be \"2.0\"")));
  }

  let Some(id) = req.id else {
    tracing::debug!(method = %req.method, "notification");
    return Outcome::Accepted;
  };

  let method = req.method.parse::<Method>().ok();
  tracing::debug!(method = %req.method, "rpc call");

  if method != Some(Method::Initialize) {
    let presented = session.filter(|s| !s.is_empty());
    if let Err(e) = check_session(&state.sessions, state.config.require_session, presented) {
      return Outcome::reply(id, Err(e));
    }
  }

  let Some(method) = method else {
    return Outcome::reply(id, Err(RpcError::method_not_found(&req.method)));
  };

  let store = state.store.as_ref();
  let result = match method {
    Method::Initialize => {
      let session = state.sessions.issue();
      tracing::info!(sessions = state.sessions.len(), "session established");
      return Outcome::Reply {
        response: rpc::Response::result(id, initialize_result()),
        session:  Some(session),
      };
    }
    Method::Ping => Ok(json!({})),
    Method::ToolsList => Ok(tools::list()),
    Method::ToolsCall => tools::call(store, req.params).await,
    Method::ResourcesList => resources::list(store, req.params).await,
    Method::ResourcesRead => resources::read(store, req.params).await,
    Method::ResourceTemplatesList => Ok(resources::templates()),
    Method::PromptsList => Ok(prompts::list()),
    Method::PromptsGet => prompts::get(store, req.params).await,
  };

  if let Err(e) = &result {
    tracing::info!(method = method.as_ref(), code = e.code, error = %e.message, "rpc error");
  }
  Outcome::reply(id, result)
}
