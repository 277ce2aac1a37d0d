//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for secure authorization without client secrets.
//! The verifier and challenge are generated together: the verifier is held
//! back for the token exchange while the challenge is sent to the
//! authorization endpoint, binding the eventual code to this client.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Default verifier length in characters (RFC 7636 allows 43-128).
pub const VERIFIER_LENGTH: usize = 128;

/// Unreserved characters permitted in a code verifier (RFC 7636 §4.1).
const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Generate a cryptographically secure code verifier
///
/// Returns a string of `length` characters drawn uniformly from the RFC 7636
/// unreserved set. The thread-local RNG is a CSPRNG, so no insecure fallback
/// path exists.
#[must_use]
pub fn generate_verifier(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..VERIFIER_CHARSET.len());
            VERIFIER_CHARSET[idx] as char
        })
        .collect()
}

/// Derive the code challenge from a verifier using SHA-256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier)))
/// without padding. Deterministic, pure function of the verifier.
#[must_use]
pub fn derive_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// PKCE challenge pair for one authorization attempt
///
/// The verifier is kept secret until the token exchange; the challenge is
/// sent in the authorization request for server-side validation.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Random 128-char string from the unreserved character set
    pub verifier: String,

    /// SHA-256 hash of the verifier, base64url encoded without padding
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh verifier/challenge pair with the default length.
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_verifier(VERIFIER_LENGTH);
        let challenge = derive_challenge(&verifier);
        Self { verifier, challenge }
    }

    /// Get the challenge method (always "S256" for SHA-256)
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}
