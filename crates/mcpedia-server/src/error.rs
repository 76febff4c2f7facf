//! Transport-level errors, raised before a request reaches the dispatcher.

use axum::{
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("method not allowed")]
  MethodNotAllowed,
  #[error("request body too large")]
  PayloadTooLarge,
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Bearer realm=\"mcpedia\""),
        );
        res
      }
      Error::MethodNotAllowed => {
        let mut res = (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response();
        res.headers_mut().insert(header::ALLOW, HeaderValue::from_static("POST"));
        res
      }
      Error::PayloadTooLarge => {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response()
      }
    }
  }
}
