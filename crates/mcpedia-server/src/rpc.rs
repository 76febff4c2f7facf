//! JSON-RPC 2.0 envelope types and error codes.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
/// Storage timed out or was contended; the call may be retried.
pub const STORAGE_UNAVAILABLE: i64 = -32001;
pub const RESOURCE_NOT_FOUND: i64 = -32002;

// ─── Envelopes ───────────────────────────────────────────────────────────────

/// An inbound call. A missing (or `null`) `id` marks a notification.
#[derive(Debug, Deserialize)]
pub struct Request {
  #[serde(default)]
  pub jsonrpc: String,
  #[serde(default)]
  pub id:      Option<Value>,
  #[serde(default)]
  pub method:  String,
  #[serde(default)]
  pub params:  Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
  pub jsonrpc: String,
  pub id:      Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result:  Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error:   Option<RpcError>,
}

impl Response {
  pub fn result(id: Value, result: Value) -> Self {
    Self { jsonrpc: JSONRPC_VERSION.into(), id, result: Some(result), error: None }
  }

  pub fn error(id: Value, error: RpcError) -> Self {
    Self { jsonrpc: JSONRPC_VERSION.into(), id, result: None, error: Some(error) }
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A protocol-level failure, returned in the `error` member.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{message} ({code})")]
pub struct RpcError {
  pub code:    i64,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data:    Option<Value>,
}

impl RpcError {
  pub fn new(code: i64, message: impl Into<String>) -> Self {
    Self { code, message: message.into(), data: None }
  }

  pub fn parse_error() -> Self { Self::new(PARSE_ERROR, "Parse error") }

  pub fn invalid_request(detail: impl std::fmt::Display) -> Self {
    Self::new(INVALID_REQUEST, format!("Invalid request: {detail}"))
  }

  pub fn method_not_found(method: &str) -> Self {
    Self::new(METHOD_NOT_FOUND, format!("Method not found: {method}"))
  }

  pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
    Self::new(INVALID_PARAMS, format!("Invalid params: {detail}"))
  }

  pub fn resource_not_found(detail: impl std::fmt::Display) -> Self {
    Self::new(RESOURCE_NOT_FOUND, format!("Resource not found: {detail}"))
  }
}

impl From<mcpedia_core::Error> for RpcError {
  fn from(e: mcpedia_core::Error) -> Self {
    use mcpedia_core::Error as E;
    let code = match &e {
      E::Validation(_) => INVALID_PARAMS,
      E::NotFound(_) => RESOURCE_NOT_FOUND,
      E::Transient(_) => STORAGE_UNAVAILABLE,
      _ => INTERNAL_ERROR,
    };
    Self {
      code,
      message: e.to_string(),
      data: Some(json!({ "errorKind": e.kind() })),
    }
  }
}

/// Deserialise method params, treating a missing `params` member as `{}`.
pub fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, RpcError> {
  let params = match params {
    None | Some(Value::Null) => json!({}),
    Some(v) => v,
  };
  serde_json::from_value(params).map_err(RpcError::invalid_params)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_id_is_a_notification() {
    let req: Request =
      serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
    assert!(req.id.is_none());

    let req: Request = serde_json::from_str(r#"{"jsonrpc":"2.0","id":0,"method":"ping"}"#).unwrap();
    assert_eq!(req.id, Some(json!(0)));
  }

  #[test]
  fn success_omits_error_member() {
    let json = serde_json::to_value(Response::result(json!(1), json!({}))).unwrap();
    assert_eq!(json, json!({ "jsonrpc": "2.0", "id": 1, "result": {} }));
  }

  #[test]
  fn store_errors_map_to_codes() {
    let cases = [
      (mcpedia_core::Error::Validation("x".into()), INVALID_PARAMS),
      (mcpedia_core::Error::NotFound("x".into()), RESOURCE_NOT_FOUND),
      (mcpedia_core::Error::Transient("x".into()), STORAGE_UNAVAILABLE),
      (mcpedia_core::Error::Locked, INTERNAL_ERROR),
    ];
    for (err, code) in cases {
      let kind = err.kind();
      let rpc = RpcError::from(err);
      assert_eq!(rpc.code, code);
      assert_eq!(rpc.data.unwrap()["errorKind"], kind);
    }
  }

  #[test]
  fn absent_params_parse_as_empty_object() {
    #[derive(Deserialize)]
    struct P {
      #[serde(default)]
      cursor: Option<String>,
    }
    let p: P = parse_params(None).unwrap();
    assert!(p.cursor.is_none());
    assert!(parse_params::<P>(Some(json!({ "cursor": 5 }))).is_err());
  }
}
