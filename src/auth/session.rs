//! Bearer token decoding
//!
//! The data service issues three-part tokens (`header.payload.signature`).
//! The client only reads the payload to learn who is logged in; the
//! signature is never checked here because the service performs the real
//! authorization on every request.

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Claims carried in the token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub id_user: i64,
    #[serde(default)]
    pub rol: Option<i32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub idcard: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub id_audit: Option<i64>,
    /// Issued-at, seconds since the epoch
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Decode the payload of a bearer token without verifying its signature
///
/// # Arguments
/// * `token` - Raw token as stored on disk
///
/// # Errors
/// Returns `Unauthorized` if the token is not three dot-separated parts or
/// the payload is not base64url-encoded JSON claims
pub fn decode_token(token: &str) -> Result<TokenClaims, AppError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(AppError::Unauthorized);
    }

    // Accept standard base64 and stray padding as well as base64url.
    let payload: String = parts[1]
        .chars()
        .filter(|c| *c != '=')
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload.as_bytes())
        .map_err(|_| AppError::Unauthorized)?;

    serde_json::from_slice(&payload_bytes).map_err(|_| AppError::Unauthorized)
}

/// Build an unsigned token carrying `claims`, for fixtures and local tooling
pub fn encode_unsigned_token(claims: &TokenClaims) -> Result<String, AppError> {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    Ok(format!("{header}.{payload}.unsigned"))
}
