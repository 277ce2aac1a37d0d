//! Non-verifying JWT claim decoding
//!
//! Decodes the middle base64url segment of a dot-separated token into a
//! claims map. The signature is deliberately not checked: claims read here
//! are presentation fields only and the backend independently validates
//! tokens before trusting them for authorization decisions.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::error::AuthError;

/// Decode the payload segment of a JWT into a claims map
///
/// Fails closed: any malformed input (missing segments, invalid base64url,
/// non-object payload) yields an empty map rather than an error, so callers
/// can always index into the result.
#[must_use]
pub fn decode_claims(token: &str) -> Map<String, Value> {
    try_decode_claims(token).unwrap_or_default()
}

/// Decode the payload segment of a JWT, reporting what went wrong
///
/// # Errors
/// Returns [`AuthError::MalformedToken`] if the token has no payload
/// segment, the segment is not valid base64url, or the payload is not a
/// JSON object.
pub fn try_decode_claims(token: &str) -> Result<Map<String, Value>, AuthError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::MalformedToken("missing payload segment".to_string()))?;

    // Tolerate padded input; JWTs are unpadded per RFC 7515.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::MalformedToken(format!("invalid base64url payload: {e}")))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(AuthError::MalformedToken("payload is not a JSON object".to_string())),
        Err(e) => Err(AuthError::MalformedToken(format!("payload is not JSON: {e}"))),
    }
}
