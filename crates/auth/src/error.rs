//! Error taxonomy for the authentication core
//!
//! Every fallible operation in this crate surfaces one of the variants below.
//! The session controller is the single place that decides whether a failure
//! clears the session; the token client only reports what happened.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Error type for authentication operations
#[derive(Debug, Error)]
pub enum AuthError {
    /// Callback arrived with no matching PKCE state. A verifier-less exchange
    /// is never attempted; the caller should restart the login flow.
    #[error("no PKCE verifier stored for this browsing context")]
    MissingVerifier,

    /// The identity provider rejected the authorization-code exchange.
    #[error("authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    /// The identity provider rejected the refresh-token grant.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// The identity provider rejected the password grant.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// A JWT could not be decoded. Claim decoding degrades to an empty
    /// profile instead of propagating this, since claims are display-only.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The identity provider could not be reached at all.
    #[error("identity provider unreachable: {0}")]
    ServiceUnavailable(String),

    /// The underlying HTTP client could not be constructed (TLS backend
    /// initialization).
    #[error("http client construction failed: {0}")]
    ClientBuild(String),

    /// An operation that requires a session was called without one.
    #[error("not authenticated")]
    NotAuthenticated,
}

/// Error body returned by the identity provider on non-2xx token responses
///
/// Standard OAuth 2.0 error response format (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
pub struct ProviderError {
    pub error: String,
    pub error_description: Option<String>,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ProviderError {}
