//! Minimal JWT claim extraction.
//!
//! Tokens are decoded without signature verification: the provider issued
//! them over TLS and they are only inspected locally for expiry and identity
//! claims. Verification is the resource server's job.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

/// Claims this crate cares about. Unknown claims are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub phone_number_verified: bool,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Decode the payload segment of a JWT.
///
/// Returns `None` for anything that is not a well-formed three-segment token
/// with a base64url JSON payload. Callers treat `None` as "no usable claims"
/// and fail closed.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    segments.next()?;

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Expiry instant (unix seconds) of a token, or `None` if it cannot be read.
pub fn expires_at(token: &str) -> Option<i64> {
    decode_claims(token).map(|claims| claims.exp)
}

#[cfg(test)]
pub(crate) fn encode_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
    format!("{header}.{payload}.sig")
}
