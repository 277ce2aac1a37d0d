//! Core authentication types
//!
//! Wire-level token responses, the persisted token bundle, the decoded user
//! profile, and the in-memory session state shared with the UI layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token response from the identity provider's token endpoint
///
/// Standard OAuth 2.0 token response format (RFC 6749). Every grant type
/// handled by this crate yields the same shape; unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,
    pub expires_in: i64,
}

/// The set of tokens persisted after a successful token-endpoint call
///
/// All four fields are required: a partial bundle is never constructed, so a
/// partial bundle is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,

    /// Access token lifetime in seconds, as reported by the provider
    pub expires_in: i64,
}

impl From<TokenResponse> for TokenBundle {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            id_token: response.id_token,
            expires_in: response.expires_in,
        }
    }
}

/// End-user identity decoded from ID token claims
///
/// Cached verbatim in storage at login time; not re-derived from the access
/// token on later loads. Serialized in camelCase to stay compatible with the
/// stored `auth_user` entry shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    /// Build a profile from decoded ID token claims
    ///
    /// Mapping: `sub` → id, `preferred_username` → username, `email` →
    /// email, `name` (falling back to `preferred_username`) → display name,
    /// `picture` → avatar URL. Every claim is optional: missing claims
    /// degrade to empty fields rather than failing, since these are
    /// presentation values only.
    #[must_use]
    pub fn from_claims(claims: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            claims.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
        };

        let username = text("preferred_username");
        let display_name = match claims.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => username.clone(),
        };

        Self {
            id: text("sub"),
            username,
            email: text("email"),
            display_name,
            avatar_url: claims.get("picture").and_then(Value::as_str).map(String::from),
        }
    }
}

/// In-memory session state derived from the credential store
///
/// Reconstructed at process start; never persisted directly. `is_loading`
/// is true only between startup and the completion of the restore pass, so
/// consumers can defer authenticated/unauthenticated decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub access_token: Option<String>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl Session {
    /// Initial state, entered once per process lifetime.
    #[must_use]
    pub fn loading() -> Self {
        Self { user: None, access_token: None, is_authenticated: false, is_loading: true }
    }

    /// State after a successful login, code exchange, or restore.
    #[must_use]
    pub fn authenticated(user: UserProfile, access_token: String) -> Self {
        Self {
            user: Some(user),
            access_token: Some(access_token),
            is_authenticated: true,
            is_loading: false,
        }
    }

    /// State after logout, a failed refresh, or an empty restore.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self { user: None, access_token: None, is_authenticated: false, is_loading: false }
    }
}
