//! Bearer-token check applied before any request reaches the dispatcher.

use axum::http::{HeaderMap, header};
use sha2::{Digest, Sha256};

use crate::error::Error;

/// The shared secret clients must present, if one is configured.
///
/// Only a SHA-256 digest is kept; presented tokens are digested and the two
/// fixed-length digests compared.
#[derive(Clone, Default)]
pub struct AuthConfig {
  token_digest: Option<[u8; 32]>,
}

impl AuthConfig {
  /// `None` or an empty token disables authentication.
  pub fn new(token: Option<&str>) -> Self {
    Self {
      token_digest: token.filter(|t| !t.is_empty()).map(digest),
    }
  }

  pub fn is_enabled(&self) -> bool { self.token_digest.is_some() }
}

fn digest(token: &str) -> [u8; 32] { Sha256::digest(token.as_bytes()).into() }

/// Verify the `Authorization: Bearer …` header against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let Some(expected) = &config.token_digest else {
    return Ok(());
  };

  let presented = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .ok_or(Error::Unauthorized)?;

  if digest(presented) != *expected {
    return Err(Error::Unauthorized);
  }
  Ok(())
}
